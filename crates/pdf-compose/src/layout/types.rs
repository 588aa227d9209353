//! Layout data types for imposition
//!
//! These types sit between the grid calculation and PDF rendering. All
//! rectangles use output-document points with the origin at the bottom-left
//! of the sheet unless a method says otherwise.

use crate::types::SheetSize;

/// Position within the grid (row, column)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    /// Row index (0 = top row)
    pub row: usize,
    /// Column index (0 = leftmost column)
    pub col: usize,
}

impl GridPosition {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Grid layout for one output sheet
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    /// Number of columns in the page grid
    pub cols: usize,
    /// Number of rows in the page grid
    pub rows: usize,
    /// Width of each cell in points
    pub cell_width_pt: f32,
    /// Height of each cell in points
    pub cell_height_pt: f32,
    /// The sheet the grid is laid over
    pub sheet: SheetSize,
}

impl GridLayout {
    /// Total number of cells in the grid
    pub fn cell_count(&self) -> usize {
        self.cols * self.rows
    }

    /// Grid position of the `index`-th page on a sheet, filled row by row
    pub fn position_of(&self, index: usize) -> GridPosition {
        GridPosition::new(index / self.cols, index % self.cols)
    }
}

/// A rectangular area in points
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X position (left edge)
    pub x: f32,
    /// Y position (bottom edge)
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x coordinate
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge y coordinate
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Mirror the rectangle across the sheet's horizontal axis, converting
    /// between bottom-left and top-left origins.
    pub fn flipped(&self, sheet_height: f32) -> Rect {
        Rect::new(
            self.x,
            sheet_height - self.y - self.height,
            self.width,
            self.height,
        )
    }

    /// True if `inner` lies within this rectangle (with a small tolerance)
    pub fn contains_rect(&self, inner: &Rect) -> bool {
        const EPS: f32 = 1e-3;
        inner.x >= self.x - EPS
            && inner.y >= self.y - EPS
            && inner.right() <= self.right() + EPS
            && inner.top() <= self.top() + EPS
    }
}

/// Final placement of one source page inside a grid cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellPlacement {
    /// 1-based source page number
    pub source_page: u32,
    /// Grid cell the page occupies
    pub grid_pos: GridPosition,
    /// Bounds of the whole cell
    pub cell: Rect,
    /// Bounds of the scaled page, centered in the cell
    pub content_rect: Rect,
    /// Scale factor applied to the source page
    pub scale: f32,
}
