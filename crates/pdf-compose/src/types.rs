use crate::constants::{A4_LONG_EDGE_PT, A4_SHORT_EDGE_PT};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Unreadable source document: {0}")]
    UnreadableSource(String),
    #[error("No page at index {0}")]
    UnknownPage(usize),
    #[error("Element {0} is not on this page")]
    UnknownElement(ElementId),
    #[error("No element selected")]
    NoSelection,
    #[error("Resource unavailable: {0}")]
    Resource(String),
    #[error("Invalid surface geometry {width}x{height}")]
    InvalidGeometry { width: f32, height: f32 },
    #[error("Export failed: {0}")]
    Export(String),
    #[error("An export is already running")]
    ExportBusy,
    #[error("Render superseded by a newer request")]
    Cancelled,
    #[error("No pages to export")]
    NoPages,
}

pub type Result<T> = std::result::Result<T, ComposeError>;

/// Coarse failure classes used to decide how a caller recovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input: recovered locally, at most one message.
    Input,
    /// A single resource could not be produced; prior state is intact.
    Resource,
    /// The whole export was aborted.
    Export,
    /// A newer request superseded this one.
    Cancelled,
}

impl ComposeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ComposeError::Config(_)
            | ComposeError::UnreadableSource(_)
            | ComposeError::UnknownPage(_)
            | ComposeError::UnknownElement(_)
            | ComposeError::NoSelection
            | ComposeError::NoPages => ErrorKind::Input,
            ComposeError::Image(_)
            | ComposeError::Resource(_)
            | ComposeError::InvalidGeometry { .. } => ErrorKind::Resource,
            ComposeError::Cancelled => ErrorKind::Cancelled,
            ComposeError::Pdf(_)
            | ComposeError::Io(_)
            | ComposeError::TaskJoin(_)
            | ComposeError::Export(_)
            | ComposeError::ExportBusy => ErrorKind::Export,
        }
    }

    /// Collapse a failure raised inside an export into the single aggregate
    /// export error. Cancellation and rejection pass through untouched.
    pub(crate) fn into_export(self) -> Self {
        match self {
            ComposeError::Export(_)
            | ComposeError::Cancelled
            | ComposeError::ExportBusy
            | ComposeError::NoPages => self,
            other => ComposeError::Export(other.to_string()),
        }
    }
}

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $counter:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        static $counter: AtomicU64 = AtomicU64::new(1);

        impl $name {
            /// Allocate a fresh, process-unique id.
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::SeqCst))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identity of an authoring page
    PageId,
    NEXT_PAGE_ID,
    "page-"
);
define_id!(
    /// Identity of a placed element
    ElementId,
    NEXT_ELEMENT_ID,
    "el-"
);
define_id!(
    /// Identity of a decoded image resource held by the document model
    ImageId,
    NEXT_IMAGE_ID,
    "img-"
);

// =============================================================================
// Sheet geometry
// =============================================================================

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Orientation {
    /// Portrait: height > width
    #[default]
    Portrait,
    /// Landscape: width > height
    Landscape,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical sheet size in points.
///
/// Authoring canvases, imposition grids and exported pages all derive their
/// extent from [`SheetSize::for_orientation`], so page-to-point math agrees
/// between preview and export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl SheetSize {
    pub const PORTRAIT: SheetSize = SheetSize {
        width_pt: A4_SHORT_EDGE_PT,
        height_pt: A4_LONG_EDGE_PT,
    };

    pub const LANDSCAPE: SheetSize = SheetSize {
        width_pt: A4_LONG_EDGE_PT,
        height_pt: A4_SHORT_EDGE_PT,
    };

    pub fn for_orientation(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Portrait => Self::PORTRAIT,
            Orientation::Landscape => Self::LANDSCAPE,
        }
    }
}

/// Statistics about an imposition selection
#[derive(Debug, Clone, PartialEq)]
pub struct ImpositionStatistics {
    /// Total number of pages in the source document
    pub source_pages: usize,
    /// Number of pages picked for output
    pub selected_pages: usize,
    /// Pages placed on each full sheet
    pub pages_per_sheet: usize,
    /// Number of output sheets
    pub output_sheets: usize,
    /// Pages on the final sheet (equals `pages_per_sheet` when it is full)
    pub pages_on_last_sheet: usize,
    /// Grid cells left empty across the whole output
    pub empty_cells: usize,
}
