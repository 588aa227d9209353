//! Document and file I/O
//!
//! Parsing and serialising run on the blocking pool so callers on the async
//! executor never stall on large documents.

use crate::constants::PDF_MEDIA_TYPE;
use crate::types::*;
use lopdf::Document;
use std::path::{Path, PathBuf};

/// A named blob handed in by the caller (a picked file or a captured photo)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file, naming it after its final path component
    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        Ok(Self { name, bytes })
    }

    /// Key used to recognise the same file handed in twice
    pub fn fingerprint(&self) -> (String, usize) {
        (self.name.clone(), self.bytes.len())
    }
}

/// A finished output document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}

impl OutputFile {
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            media_type: PDF_MEDIA_TYPE,
        }
    }

    /// Write into `dir` under the file's own name and return the path
    pub async fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.name);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }
}

/// Load a PDF from disk
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ComposeError::UnreadableSource(format!("{}: {}", path.display(), e)))?;
    load_pdf_bytes(bytes).await
}

/// Parse a PDF from memory. Parse failures and page-less documents are
/// reported as [`ComposeError::UnreadableSource`].
pub async fn load_pdf_bytes(bytes: Vec<u8>) -> Result<Document> {
    let doc = tokio::task::spawn_blocking(move || Document::load_mem(&bytes))
        .await?
        .map_err(|e| ComposeError::UnreadableSource(e.to_string()))?;

    if doc.get_pages().is_empty() {
        return Err(ComposeError::UnreadableSource(
            "document has no pages".to_string(),
        ));
    }
    Ok(doc)
}

/// Serialise a document to bytes
pub fn document_to_bytes(doc: &mut Document) -> Result<Vec<u8>> {
    let mut writer = Vec::new();
    doc.save_to(&mut writer)?;
    Ok(writer)
}

/// Save a document to disk
pub async fn save_pdf(mut doc: Document, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::task::spawn_blocking(move || document_to_bytes(&mut doc)).await??;
    tokio::fs::write(&path, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{OutputBuilder, SheetContent};

    fn one_page_pdf() -> Vec<u8> {
        let mut builder = OutputBuilder::new();
        builder
            .add_page(SheetSize::PORTRAIT, SheetContent::new())
            .unwrap();
        document_to_bytes(&mut builder.finish()).unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_through_bytes() {
        let doc = load_pdf_bytes(one_page_pdf()).await.unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[tokio::test]
    async fn test_garbage_is_unreadable_source() {
        let err = load_pdf_bytes(b"%PDF-nope".to_vec()).await.unwrap_err();
        assert!(matches!(err, ComposeError::UnreadableSource(_)));
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable_source() {
        let err = load_pdf("/definitely/not/here.pdf").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[tokio::test]
    async fn test_output_file_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let file = OutputFile::pdf("print_1.pdf", one_page_pdf());
        let path = file.write_to(dir.path()).await.unwrap();

        assert!(path.ends_with("print_1.pdf"));
        assert_eq!(file.media_type, "application/pdf");
        let read = InputFile::read(&path).await.unwrap();
        assert_eq!(read.name, "print_1.pdf");
        assert_eq!(read.bytes, file.bytes);
    }
}
