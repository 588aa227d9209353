use crate::{DocumentId, RuntimeError};
use lopdf::Document;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DOC_ID: AtomicU64 = AtomicU64::new(1);

struct LoadedDocument {
    name: String,
    doc: Arc<Document>,
}

/// Source documents loaded by the worker, keyed by handle
#[derive(Default)]
pub struct DocumentStore {
    documents: HashMap<DocumentId, LoadedDocument>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, doc: Document) -> DocumentId {
        let id = DocumentId(NEXT_DOC_ID.fetch_add(1, Ordering::SeqCst));
        self.documents.insert(
            id,
            LoadedDocument {
                name: name.into(),
                doc: Arc::new(doc),
            },
        );
        id
    }

    /// Name and a shared handle to the document
    pub fn get(&self, id: DocumentId) -> Result<(&str, Arc<Document>), RuntimeError> {
        self.documents
            .get(&id)
            .map(|loaded| (loaded.name.as_str(), Arc::clone(&loaded.doc)))
            .ok_or(RuntimeError::UnknownDocument(id))
    }

    pub fn remove(&mut self, id: DocumentId) -> bool {
        self.documents.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
