//! Grid layout calculation
//!
//! Maps a pages-per-sheet count to a column/row grid and cell geometry.
//! Everything here is pure: the same inputs always give the same grid.

use crate::types::{Orientation, SheetSize};

use super::{GridLayout, GridPosition, Rect};

// =============================================================================
// Grid Creation
// =============================================================================

/// Columns and rows for `pages_per_sheet` pages.
///
/// One page uses a single cell and two pages use a side-by-side strip; larger
/// counts use `ceil(sqrt(n))` columns and as many rows as needed. A zero count
/// is treated as one.
pub fn grid_dimensions(pages_per_sheet: usize) -> (usize, usize) {
    let pages = pages_per_sheet.max(1);
    let cols = match pages {
        1 => 1,
        2 => 2,
        n => ceil_sqrt(n),
    };
    (cols, pages.div_ceil(cols))
}

/// Create the grid for `pages_per_sheet` pages over a sheet of the given
/// orientation.
pub fn create_grid_layout(pages_per_sheet: usize, orientation: Orientation) -> GridLayout {
    let sheet = SheetSize::for_orientation(orientation);
    let (cols, rows) = grid_dimensions(pages_per_sheet);

    GridLayout {
        cols,
        rows,
        cell_width_pt: sheet.width_pt / cols as f32,
        cell_height_pt: sheet.height_pt / rows as f32,
        sheet,
    }
}

fn ceil_sqrt(n: usize) -> usize {
    let mut root = 1;
    while root * root < n {
        root += 1;
    }
    root
}

// =============================================================================
// Cell Calculations
// =============================================================================

/// Calculate the bounds of a cell at the given grid position.
///
/// Row 0 is the top row, so the y coordinate is inverted to match the
/// bottom-left origin of the output document.
pub fn cell_bounds(grid: &GridLayout, pos: GridPosition) -> Rect {
    let cell_x = pos.col as f32 * grid.cell_width_pt;
    let cell_y = grid.sheet.height_pt - (pos.row + 1) as f32 * grid.cell_height_pt;

    Rect::new(cell_x, cell_y, grid.cell_width_pt, grid.cell_height_pt)
}

// =============================================================================
// Tests
// =============================================================================
