//! Export backends and job tracking
//!
//! Two backends produce finished documents:
//! - raster authoring export: each element is filtered, re-encoded as JPEG
//!   and placed on a sheet-sized page
//! - vector imposition export: source pages are embedded as Form XObjects and
//!   packed N-up, chunk by chunk
//!
//! Both report progress after every page or sheet, check their ticket before
//! each unit, and fail as a whole: any error inside an export becomes one
//! [`ComposeError::Export`] and no partial document is returned.

use crate::cancel::RenderTicket;
use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::document::DocumentSnapshot;
use crate::io::{OutputFile, document_to_bytes};
use crate::layout::{GridLayout, Rect, plan_sheet};
use crate::options::ComposeOptions;
use crate::render::*;
use crate::selection::ImpositionSelection;
use crate::types::*;
use lopdf::{Document, ObjectId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

// =============================================================================
// Progress and Job State
// =============================================================================

/// Units finished out of the total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportProgress {
    pub completed: usize,
    pub total: usize,
}

impl ExportProgress {
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f32 * 100.0 / self.total as f32
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Done,
    Failed,
}

/// Observable state of the most recent export
#[derive(Debug, Clone, Default)]
pub struct ExportJob {
    pub status: JobStatus,
    pub progress_percent: f32,
    pub result: Option<Arc<OutputFile>>,
    pub error: Option<String>,
}

/// Publishes [`ExportJob`] updates to any number of watchers
#[derive(Debug)]
pub struct ExportTracker {
    tx: watch::Sender<ExportJob>,
}

impl Default for ExportTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ExportJob::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<ExportJob> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ExportJob {
        self.tx.borrow().clone()
    }

    pub fn start(&self) {
        self.tx.send_replace(ExportJob {
            status: JobStatus::Running,
            ..Default::default()
        });
    }

    pub fn progress(&self, progress: ExportProgress) {
        self.tx
            .send_modify(|job| job.progress_percent = progress.percent());
    }

    pub fn finish(&self, file: Arc<OutputFile>) {
        self.tx.send_replace(ExportJob {
            status: JobStatus::Done,
            progress_percent: 100.0,
            result: Some(file),
            error: None,
        });
    }

    pub fn fail(&self, error: &ComposeError) {
        self.tx.send_modify(|job| {
            job.status = JobStatus::Failed;
            job.result = None;
            job.error = Some(error.to_string());
        });
    }

    /// Hand the finished file to the caller, leaving the job empty
    pub fn take_result(&self) -> Option<Arc<OutputFile>> {
        let mut taken = None;
        self.tx.send_if_modified(|job| {
            taken = job.result.take();
            if taken.is_some() {
                *job = ExportJob::default();
                true
            } else {
                false
            }
        });
        taken
    }
}

// =============================================================================
// Exclusive Export
// =============================================================================

/// Allows one export at a time per session
#[derive(Debug, Clone, Default)]
pub struct ExportLock {
    busy: Arc<AtomicBool>,
}

impl ExportLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock, or fail with [`ComposeError::ExportBusy`]
    pub fn try_acquire(&self) -> Result<ExportPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ComposeError::ExportBusy)?;
        Ok(ExportPermit {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// Held for the duration of one export; releases the lock on drop
#[derive(Debug)]
pub struct ExportPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for ExportPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// Raster Authoring Export
// =============================================================================

/// Build the authoring document: one sheet-sized page per authoring page,
/// each element embedded as a filtered JPEG.
pub fn export_authoring_sync(
    snapshot: &DocumentSnapshot,
    options: &ComposeOptions,
    ticket: &RenderTicket,
    progress: impl FnMut(ExportProgress),
) -> Result<Document> {
    render_authoring(snapshot, options, ticket, progress).map_err(ComposeError::into_export)
}

fn render_authoring(
    snapshot: &DocumentSnapshot,
    options: &ComposeOptions,
    ticket: &RenderTicket,
    mut progress: impl FnMut(ExportProgress),
) -> Result<Document> {
    let sheet = snapshot.sheet();
    let total = snapshot.pages.len();
    let mut builder = OutputBuilder::new();

    for (index, page) in snapshot.pages.iter().enumerate() {
        ticket.check()?;
        let mut content = SheetContent::new();

        for element in &page.elements {
            ticket.check()?;
            let pixels = filtered_image(element)?;
            let (width_px, height_px) = pixels.dimensions();
            let jpeg = encode_jpeg(&pixels, options.jpeg_quality)?;
            let image_id = embed_jpeg(builder.document_mut(), jpeg, width_px, height_px);

            let (width, height) = element.rendered_size();
            let rect = Rect::new(element.x, element.y, width, height).flipped(sheet.height_pt);
            content.place_image(image_id, &rect);
        }

        builder.add_page(sheet, content)?;
        progress(ExportProgress {
            completed: index + 1,
            total,
        });
    }

    Ok(builder.finish())
}

/// Render the authoring document off the executor and package it as
/// `print_<unix millis>.pdf`
pub async fn export_authoring(
    snapshot: Arc<DocumentSnapshot>,
    options: ComposeOptions,
    ticket: RenderTicket,
    progress: impl FnMut(ExportProgress) + Send + 'static,
) -> Result<OutputFile> {
    let bytes = tokio::task::spawn_blocking(move || {
        let mut doc = export_authoring_sync(&snapshot, &options, &ticket, progress)?;
        ticket.check()?;
        document_to_bytes(&mut doc).map_err(ComposeError::into_export)
    })
    .await
    .map_err(|e| ComposeError::TaskJoin(e).into_export())??;

    let name = format!("print_{}.pdf", chrono::Utc::now().timestamp_millis());
    log::info!("Authoring export finished: {} ({} bytes)", name, bytes.len());
    Ok(OutputFile::pdf(name, bytes))
}

// =============================================================================
// Vector Imposition Export
// =============================================================================

/// Paint one N-up sheet: every page of `chunk` placed in its grid cell at
/// `margin_factor`. Returns the sheet's content and the placements used.
pub fn build_nup_sheet(
    output: &mut Document,
    source: &Document,
    source_pages: &BTreeMap<u32, ObjectId>,
    grid: &GridLayout,
    chunk: &[u32],
    margin_factor: f32,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<SheetContent> {
    let placements = plan_sheet(grid, chunk, margin_factor, |page| {
        source_pages
            .get(&page)
            .map(|&id| get_page_dimensions(source, id))
            .unwrap_or(DEFAULT_PAGE_DIMENSIONS)
    });

    let mut content = SheetContent::new();
    for placement in &placements {
        let Some(&page_id) = source_pages.get(&placement.source_page) else {
            return Err(ComposeError::Export(format!(
                "Source page {} is missing",
                placement.source_page
            )));
        };
        let xobject_id = create_page_xobject(output, source, page_id, cache)?;
        let media_box = page_box(source, page_id);
        content.place_form(
            xobject_id,
            &placement.content_rect,
            placement.scale,
            (media_box.x, media_box.y),
        );
    }
    Ok(content)
}

/// Impose the selected pages of `source` N-up, one output page per sheet,
/// in selection order
pub fn impose_sync(
    source: &Document,
    selection: &ImpositionSelection,
    margin_factor: f32,
    ticket: &RenderTicket,
    progress: impl FnMut(ExportProgress),
) -> Result<Document> {
    if selection.selected_pages().is_empty() {
        return Err(ComposeError::NoPages);
    }
    impose_sheets(source, selection, margin_factor, ticket, progress)
        .map_err(ComposeError::into_export)
}

fn impose_sheets(
    source: &Document,
    selection: &ImpositionSelection,
    margin_factor: f32,
    ticket: &RenderTicket,
    mut progress: impl FnMut(ExportProgress),
) -> Result<Document> {
    let source_pages = source.get_pages();
    let grid = selection.grid();
    let total = selection.total_sheets();
    let mut builder = OutputBuilder::new();
    let mut cache = HashMap::new();

    for (index, chunk) in selection.chunks().enumerate() {
        ticket.check()?;
        let content = build_nup_sheet(
            builder.document_mut(),
            source,
            &source_pages,
            &grid,
            chunk,
            margin_factor,
            &mut cache,
        )?;
        builder.add_page(grid.sheet, content)?;
        progress(ExportProgress {
            completed: index + 1,
            total,
        });
    }

    Ok(builder.finish())
}

/// Impose off the executor at the export margin and package the result as
/// `edited_<source name>`
pub async fn export_imposition(
    source: Arc<Document>,
    source_name: &str,
    selection: ImpositionSelection,
    options: ComposeOptions,
    ticket: RenderTicket,
    progress: impl FnMut(ExportProgress) + Send + 'static,
) -> Result<OutputFile> {
    let bytes = tokio::task::spawn_blocking(move || {
        let mut doc = impose_sync(
            &source,
            &selection,
            options.export_margin_factor,
            &ticket,
            progress,
        )?;
        ticket.check()?;
        document_to_bytes(&mut doc).map_err(ComposeError::into_export)
    })
    .await
    .map_err(|e| ComposeError::TaskJoin(e).into_export())??;

    let name = format!("edited_{}", source_name);
    log::info!("Imposition export finished: {} ({} bytes)", name, bytes.len());
    Ok(OutputFile::pdf(name, bytes))
}
