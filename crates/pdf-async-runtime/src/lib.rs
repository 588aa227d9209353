//! Command/update protocol between a front end and the PDF worker
//!
//! A front end sends [`PdfCommand`]s over an unbounded channel and receives
//! [`PdfUpdate`]s back. [`worker_task`] processes commands one at a time,
//! collapsing queued preview requests to the newest.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

mod store;
mod worker;

pub use store::DocumentStore;
pub use worker::worker_task;

// Re-export types from the library crate
pub use pdf_compose::{
    ComposeError, ComposeOptions, DocumentSnapshot, ImpositionSelection, ImpositionStatistics,
    Orientation,
};

/// Commands sent from a front end to the worker
#[derive(Debug)]
pub enum PdfCommand {
    /// Load a PDF for imposition
    ImposeLoad {
        input_path: PathBuf,
    },
    /// Render the selection's current sheet at the preview margin
    ImposePreview {
        doc_id: DocumentId,
        selection: ImpositionSelection,
    },
    ImposeCalculateStats {
        doc_id: DocumentId,
        selection: ImpositionSelection,
    },
    /// Impose the selection and write `edited_<name>` into `output_dir`
    ImposeExport {
        doc_id: DocumentId,
        selection: ImpositionSelection,
        output_dir: PathBuf,
    },
    /// Export an authoring snapshot as `print_<timestamp>.pdf` into `output_dir`
    ComposeExport {
        snapshot: Arc<DocumentSnapshot>,
        output_dir: PathBuf,
    },
    LoadConfig {
        path: PathBuf,
    },
    Close {
        doc_id: DocumentId,
    },
}

/// Updates sent from the worker to a front end
#[derive(Debug, Clone)]
pub enum PdfUpdate {
    Progress {
        operation: String,
        current: usize,
        total: usize,
    },
    ImposeLoaded {
        doc_id: DocumentId,
        name: String,
        page_count: usize,
        /// Initial range text covering every page
        range_text: String,
    },
    ImposePreviewGenerated {
        doc_id: DocumentId,
        sheet_index: usize,
        pdf_bytes: Vec<u8>,
    },
    ImposeStatsCalculated {
        stats: ImpositionStatistics,
    },
    ExportComplete {
        path: PathBuf,
        pages: usize,
    },
    ConfigLoaded {
        options: ComposeOptions,
    },
    Closed {
        doc_id: DocumentId,
    },
    Error {
        message: String,
    },
}

/// Handle to a loaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub u64);

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Unknown document {0:?}")]
    UnknownDocument(DocumentId),
    #[error(transparent)]
    Compose(#[from] ComposeError),
}
