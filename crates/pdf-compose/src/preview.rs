//! Preview generation for both editors
//!
//! Imposition previews are real one-sheet documents built with the same
//! placement code as the export, only at the preview margin. Authoring
//! previews are rasterised through the same filter transform as the export.

use crate::cancel::RenderTicket;
use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::context::RenderContext;
use crate::document::DocumentSnapshot;
use crate::export::build_nup_sheet;
use crate::layout::{CellPlacement, plan_sheet};
use crate::options::ComposeOptions;
use crate::render::{OutputBuilder, get_page_dimensions, render_page_preview};
use crate::selection::ImpositionSelection;
use crate::types::*;
use image::RgbaImage;
use lopdf::Document;
use std::collections::HashMap;
use std::sync::Arc;

/// Build a one-page document showing the sheet currently selected
pub fn generate_sheet_preview(
    source: &Document,
    selection: &ImpositionSelection,
    options: &ComposeOptions,
    ticket: &RenderTicket,
) -> Result<Document> {
    let chunk = selection.current_chunk();
    if chunk.is_empty() {
        return Err(ComposeError::NoPages);
    }
    ticket.check()?;

    let source_pages = source.get_pages();
    let grid = selection.grid();
    let mut builder = OutputBuilder::new();
    let content = build_nup_sheet(
        builder.document_mut(),
        source,
        &source_pages,
        &grid,
        chunk,
        options.preview_margin_factor,
        &mut HashMap::new(),
    )?;
    builder.add_page(grid.sheet, content)?;

    ticket.check()?;
    Ok(builder.finish())
}

/// [`generate_sheet_preview`] on the blocking pool
pub async fn generate_preview(
    source: Arc<Document>,
    selection: ImpositionSelection,
    options: ComposeOptions,
    ticket: RenderTicket,
) -> Result<Document> {
    tokio::task::spawn_blocking(move || generate_sheet_preview(&source, &selection, &options, &ticket))
        .await?
}

/// Cell placements for the current sheet in top-left-origin coordinates,
/// for compositing page thumbnails onto a display surface
pub fn sheet_preview_plan(
    source: &Document,
    selection: &ImpositionSelection,
    options: &ComposeOptions,
) -> Vec<CellPlacement> {
    let source_pages = source.get_pages();
    let grid = selection.grid();
    let height = grid.sheet.height_pt;

    plan_sheet(
        &grid,
        selection.current_chunk(),
        options.preview_margin_factor,
        |page| {
            source_pages
                .get(&page)
                .map(|&id| get_page_dimensions(source, id))
                .unwrap_or(DEFAULT_PAGE_DIMENSIONS)
        },
    )
    .into_iter()
    .map(|placement| CellPlacement {
        cell: placement.cell.flipped(height),
        content_rect: placement.content_rect.flipped(height),
        ..placement
    })
    .collect()
}

/// Rasterise one authoring page on the blocking pool
pub async fn render_authoring_preview(
    snapshot: Arc<DocumentSnapshot>,
    page_index: usize,
    ctx: RenderContext,
    ticket: RenderTicket,
) -> Result<RgbaImage> {
    tokio::task::spawn_blocking(move || render_page_preview(&snapshot, page_index, &ctx, &ticket))
        .await?
}
