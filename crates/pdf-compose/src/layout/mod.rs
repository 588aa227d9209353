//! Layout calculation modules for imposition
//!
//! This module handles the geometric side of N-up imposition:
//! - Grid layout (columns, rows, cell dimensions)
//! - Cell placement (fit-and-center scaling of source pages)

mod grid;
mod placement;
mod types;

pub use grid::*;
pub use placement::*;
pub use types::*;
