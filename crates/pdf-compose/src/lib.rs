pub mod adjust;
mod cancel;
pub mod constants;
mod context;
mod document;
pub mod export;
mod interaction;
mod io;
pub mod layout;
mod options;
mod preview;
mod range;
pub mod render;
mod selection;
mod session;
mod stats;
mod types;

pub use adjust::{AdjustField, FilterSpec};
pub use cancel::{RenderGeneration, RenderTicket};
pub use context::{CanvasPoint, DevicePoint, RenderContext};
pub use document::*;
pub use export::{
    ExportJob, ExportProgress, JobStatus, export_authoring, export_authoring_sync,
    export_imposition, impose_sync,
};
pub use interaction::{FollowUp, InteractionController, MoveOutcome};
pub use io::{InputFile, OutputFile, document_to_bytes, load_pdf, load_pdf_bytes, save_pdf};
pub use options::*;
pub use preview::{generate_preview, generate_sheet_preview, render_authoring_preview, sheet_preview_plan};
pub use range::{format_page_ranges, parse_page_range};
pub use selection::ImpositionSelection;
pub use session::*;
pub use stats::calculate_statistics;
pub use types::*;
