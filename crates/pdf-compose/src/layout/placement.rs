//! Page placement within grid cells
//!
//! A source page is scaled uniformly to fit its cell, shrunk by a margin
//! factor, and centered. The same calculation serves the on-screen preview
//! (larger safety margin) and the final export.

use crate::constants::DEFAULT_PAGE_DIMENSIONS;

use super::{CellPlacement, GridLayout, Rect, cell_bounds};

/// Fit a `page_width` x `page_height` page into `cell`, scaled by
/// `min(cell_w / page_w, cell_h / page_h) * margin_factor` and centered.
///
/// Returns the content rectangle and the applied scale. Degenerate page sizes
/// fall back to [`DEFAULT_PAGE_DIMENSIONS`].
pub fn place_in_cell(cell: &Rect, page_width: f32, page_height: f32, margin_factor: f32) -> (Rect, f32) {
    let (page_width, page_height) = sanitize_page_size(page_width, page_height);

    let scale = (cell.width / page_width).min(cell.height / page_height) * margin_factor;
    let draw_width = page_width * scale;
    let draw_height = page_height * scale;

    let content = Rect::new(
        cell.x + (cell.width - draw_width) / 2.0,
        cell.y + (cell.height - draw_height) / 2.0,
        draw_width,
        draw_height,
    );
    (content, scale)
}

/// Lay out one sheet's chunk of source pages, in selection order.
///
/// `page_size` returns the (width, height) of a 1-based source page. Pages
/// beyond the grid's cell count are ignored.
pub fn plan_sheet(
    grid: &GridLayout,
    chunk: &[u32],
    margin_factor: f32,
    mut page_size: impl FnMut(u32) -> (f32, f32),
) -> Vec<CellPlacement> {
    chunk
        .iter()
        .take(grid.cell_count())
        .enumerate()
        .map(|(index, &source_page)| {
            let grid_pos = grid.position_of(index);
            let cell = cell_bounds(grid, grid_pos);
            let (width, height) = page_size(source_page);
            let (content_rect, scale) = place_in_cell(&cell, width, height, margin_factor);

            CellPlacement {
                source_page,
                grid_pos,
                cell,
                content_rect,
                scale,
            }
        })
        .collect()
}

fn sanitize_page_size(width: f32, height: f32) -> (f32, f32) {
    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        (width, height)
    } else {
        DEFAULT_PAGE_DIMENSIONS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::create_grid_layout;
    use crate::types::Orientation;

    #[test]
    fn test_place_centers_and_scales() {
        let cell = Rect::new(0.0, 0.0, 200.0, 400.0);
        let (rect, scale) = place_in_cell(&cell, 100.0, 100.0, 1.0);

        assert_eq!(scale, 2.0);
        assert_eq!(rect, Rect::new(0.0, 100.0, 200.0, 200.0));
    }

    #[test]
    fn test_margin_factor_shrinks_content() {
        let cell = Rect::new(10.0, 20.0, 100.0, 100.0);
        let (rect, scale) = place_in_cell(&cell, 50.0, 50.0, 0.9);

        assert!((scale - 1.8).abs() < 1e-5);
        assert!((rect.width - 90.0).abs() < 1e-3);
        assert!((rect.x - 15.0).abs() < 1e-3);
        assert!((rect.y - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_degenerate_page_size_falls_back() {
        let cell = Rect::new(0.0, 0.0, 612.0, 792.0);
        let (rect, scale) = place_in_cell(&cell, 0.0, f32::NAN, 1.0);

        assert_eq!(scale, 1.0);
        assert_eq!(rect, cell);
    }

    #[test]
    fn test_plan_partial_sheet_fills_top_row() {
        let grid = create_grid_layout(4, Orientation::Portrait);
        let plan = plan_sheet(&grid, &[9, 10], 0.95, |_| (612.0, 792.0));

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].source_page, 9);
        assert_eq!(plan[1].grid_pos.col, 1);
        for placement in &plan {
            assert_eq!(placement.grid_pos.row, 0);
            assert!(placement.content_rect.y >= grid.sheet.height_pt / 2.0);
            assert!(placement.cell.contains_rect(&placement.content_rect));
        }
    }
}
