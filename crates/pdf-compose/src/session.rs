//! Editing sessions
//!
//! A session binds the engine components to one editor: the authoring
//! session for image pages, the imposition session for re-paginating an
//! existing PDF. Each reports back through a [`SessionObserver`] and allows
//! one export at a time.

use crate::adjust::{self, AdjustField};
use crate::cancel::RenderGeneration;
use crate::context::{DevicePoint, RenderContext};
use crate::document::{DirtyNotice, DocumentModel, ElementPatch, decode_image};
use crate::export::*;
use crate::interaction::{InteractionController, MoveOutcome};
use crate::io::{InputFile, OutputFile, load_pdf_bytes};
use crate::layout::CellPlacement;
use crate::options::{ComposeOptions, PrintSettings};
use crate::preview::{generate_preview, render_authoring_preview, sheet_preview_plan};
use crate::selection::ImpositionSelection;
use crate::stats::calculate_statistics;
use crate::types::*;
use image::RgbaImage;
use lopdf::Document;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;

// =============================================================================
// Observer Contract
// =============================================================================

/// What the print pipeline receives after a successful export
#[derive(Debug, Clone)]
pub struct PrintConfirmation {
    pub file: Arc<OutputFile>,
    /// Pages in the exported document
    pub pages: usize,
    pub copies: u32,
    pub layout: Orientation,
}

/// Callbacks from a session to its host
pub trait SessionObserver: Send + Sync {
    /// Once per successful export
    fn on_confirm(&self, confirmation: PrintConfirmation);

    /// Once per captured photo accepted into the authoring document
    fn on_capture(&self, _file: &InputFile) {}

    /// The session was abandoned; its resources are already released
    fn on_close(&self) {}
}

/// An export that has taken the session's export lock but not yet run.
///
/// Holding one keeps every other export of the session rejected with
/// [`ComposeError::ExportBusy`] until it completes or is dropped.
pub struct PendingExport {
    permit: ExportPermit,
    tracker: Arc<ExportTracker>,
    observer: Arc<dyn SessionObserver>,
    settings: PrintSettings,
    job: Pin<Box<dyn Future<Output = Result<(OutputFile, usize)>> + Send>>,
}

impl PendingExport {
    /// Run the export. On success the observer's `on_confirm` fires once and
    /// the file is returned; on failure the job is marked failed.
    pub async fn run(self) -> Result<Arc<OutputFile>> {
        let PendingExport {
            permit,
            tracker,
            observer,
            settings,
            job,
        } = self;

        let outcome = job.await;
        let result = match outcome {
            Ok((file, pages)) => {
                let file = Arc::new(file);
                tracker.finish(Arc::clone(&file));
                observer.on_confirm(PrintConfirmation {
                    file: Arc::clone(&file),
                    pages,
                    copies: settings.copies(),
                    layout: settings.layout,
                });
                Ok(file)
            }
            Err(e) => {
                log::error!("Export failed: {}", e);
                tracker.fail(&e);
                Err(e)
            }
        };
        // The job state is final before the next export may start
        drop(permit);
        result
    }
}

fn progress_reporter(tracker: &Arc<ExportTracker>) -> impl FnMut(ExportProgress) + Send + 'static {
    let tracker = Arc::clone(tracker);
    move |progress| tracker.progress(progress)
}

// =============================================================================
// Authoring Session
// =============================================================================

/// Multi-page image authoring: place, drag, adjust, export as raster PDF
pub struct AuthoringSession {
    model: DocumentModel,
    controller: InteractionController,
    options: ComposeOptions,
    settings: PrintSettings,
    previews: RenderGeneration,
    exports: RenderGeneration,
    lock: ExportLock,
    tracker: Arc<ExportTracker>,
    captured: HashSet<(String, usize)>,
    observer: Arc<dyn SessionObserver>,
}

impl AuthoringSession {
    pub fn new(
        options: ComposeOptions,
        orientation: Orientation,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            model: DocumentModel::new(orientation, &options),
            controller: InteractionController::new(&options),
            settings: PrintSettings::new(1, orientation),
            options,
            previews: RenderGeneration::new(),
            exports: RenderGeneration::new(),
            lock: ExportLock::new(),
            tracker: Arc::new(ExportTracker::new()),
            captured: HashSet::new(),
            observer,
        })
    }

    pub fn model(&self) -> &DocumentModel {
        &self.model
    }

    pub fn current_page(&self) -> usize {
        self.controller.current_page()
    }

    pub fn selected(&self) -> Option<ElementId> {
        self.controller.selected()
    }

    pub fn print_settings(&self) -> &PrintSettings {
        &self.settings
    }

    pub fn print_settings_mut(&mut self) -> &mut PrintSettings {
        &mut self.settings
    }

    /// Dirty notices for preview subscribers
    pub fn subscribe(&self) -> watch::Receiver<DirtyNotice> {
        self.model.subscribe()
    }

    pub fn export_status(&self) -> watch::Receiver<ExportJob> {
        self.tracker.subscribe()
    }

    pub fn is_exporting(&self) -> bool {
        self.lock.is_busy()
    }

    // -- Images ---------------------------------------------------------------

    /// Decode an image and place it on the current page, fitted and centered.
    /// The new element becomes the selection.
    pub async fn add_image(&mut self, file: InputFile) -> Result<ElementId> {
        let image = decode_image(file.name, file.bytes).await?;
        let id = self
            .model
            .add_element(self.controller.current_page(), image, None)?;
        self.controller.select(Some(id));
        Ok(id)
    }

    /// Add several images. A file that fails to decode is reported in its
    /// slot and does not stop the others.
    pub async fn add_images(&mut self, files: Vec<InputFile>) -> Vec<Result<ElementId>> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let result = self.add_image(file).await;
            if let Err(e) = &result {
                log::warn!("Skipping image: {}", e);
            }
            results.push(result);
        }
        results
    }

    /// Accept a captured photo. The same capture handed in twice is only
    /// added once; `Ok(None)` reports the repeat.
    pub async fn capture(&mut self, file: InputFile) -> Result<Option<ElementId>> {
        if file.bytes.is_empty() {
            return Err(ComposeError::Resource(format!(
                "capture {} is not ready",
                file.name
            )));
        }
        let fingerprint = file.fingerprint();
        if self.captured.contains(&fingerprint) {
            log::debug!("Ignoring repeated capture {}", file.name);
            return Ok(None);
        }

        let id = self.add_image(file.clone()).await?;
        self.captured.insert(fingerprint);
        self.observer.on_capture(&file);
        Ok(Some(id))
    }

    // -- Pages ----------------------------------------------------------------

    pub fn add_page(&mut self) -> usize {
        self.model.add_page()
    }

    pub fn remove_page(&mut self, index: usize) -> Result<()> {
        self.model.remove_page(index)?;
        self.controller.sync(&self.model);
        Ok(())
    }

    pub fn set_current_page(&mut self, index: usize) -> Result<()> {
        self.controller.set_current_page(&self.model, index)
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.model.set_orientation(orientation);
        self.settings.layout = orientation;
    }

    // -- Pointer --------------------------------------------------------------

    pub fn pointer_down(&mut self, ctx: &RenderContext, point: DevicePoint) -> Option<ElementId> {
        self.controller.pointer_down(&self.model, ctx, point)
    }

    /// Drag the selection; a teleport switches the current page once the
    /// move has been committed
    pub fn pointer_move(&mut self, ctx: &RenderContext, point: DevicePoint) -> Result<MoveOutcome> {
        let outcome = self.controller.pointer_move(&mut self.model, ctx, point)?;
        self.controller.run_deferred();
        Ok(outcome)
    }

    pub fn pointer_up(&mut self) {
        self.controller.pointer_up();
    }

    // -- Selected Element -----------------------------------------------------

    fn target(&self) -> Result<(usize, ElementId)> {
        let id = self.controller.selected().ok_or(ComposeError::NoSelection)?;
        Ok((self.controller.current_page(), id))
    }

    /// Step a field of the selected element by `steps` increments
    pub fn nudge_selected(&mut self, field: AdjustField, steps: i32) -> Result<f32> {
        let (page, id) = self.target()?;
        adjust::nudge(&mut self.model, page, id, field, steps)
    }

    /// Set fields of the selected element directly (slider input), clamped
    pub fn update_selected(&mut self, patch: ElementPatch) -> Result<()> {
        let (page, id) = self.target()?;
        self.model.update_element(page, id, patch)
    }

    pub fn reset_selected(&mut self) -> Result<()> {
        let (page, id) = self.target()?;
        adjust::reset_element(&mut self.model, page, id)
    }

    pub fn toggle_grayscale_selected(&mut self) -> Result<bool> {
        let (page, id) = self.target()?;
        adjust::toggle_grayscale(&mut self.model, page, id)
    }

    pub fn remove_selected(&mut self) -> Result<()> {
        let (page, id) = self.target()?;
        self.model.remove_element(page, id)?;
        self.controller.select(None);
        Ok(())
    }

    /// Finish editing the selection
    pub fn deselect(&mut self) {
        self.controller.select(None);
    }

    // -- Rendering ------------------------------------------------------------

    /// Rasterise the current page. A newer preview request cancels this one.
    pub async fn render_preview(&self, ctx: RenderContext) -> Result<RgbaImage> {
        let ticket = self.previews.begin();
        render_authoring_preview(
            self.model.snapshot(),
            self.controller.current_page(),
            ctx,
            ticket,
        )
        .await
    }

    /// Take the export lock and capture the current snapshot
    pub fn begin_export(&self) -> Result<PendingExport> {
        let permit = self.lock.try_acquire()?;
        let snapshot = self.model.snapshot();
        let pages = snapshot.page_count();
        let ticket = self.exports.begin();
        self.tracker.start();

        let job = export_authoring(
            snapshot,
            self.options.clone(),
            ticket,
            progress_reporter(&self.tracker),
        );
        Ok(PendingExport {
            permit,
            tracker: Arc::clone(&self.tracker),
            observer: Arc::clone(&self.observer),
            settings: self.settings,
            job: Box::pin(async move { Ok((job.await?, pages)) }),
        })
    }

    /// Export every page as a raster PDF and confirm it to the observer
    pub async fn export(&self) -> Result<Arc<OutputFile>> {
        self.begin_export()?.run().await
    }

    /// Abandon the session: cancel outstanding work, release every image and
    /// notify the observer. Returns the number of images released.
    pub fn close(mut self) -> usize {
        self.previews.invalidate();
        self.exports.invalidate();
        let released = self.model.discard();
        self.observer.on_close();
        released
    }
}

// =============================================================================
// Imposition Session
// =============================================================================

/// N-up re-pagination of an existing PDF
pub struct ImpositionSession {
    source: Arc<Document>,
    source_name: String,
    selection: ImpositionSelection,
    range_input: String,
    options: ComposeOptions,
    settings: PrintSettings,
    previews: RenderGeneration,
    exports: RenderGeneration,
    lock: ExportLock,
    tracker: Arc<ExportTracker>,
    observer: Arc<dyn SessionObserver>,
}

impl ImpositionSession {
    /// Load the source document with every page selected, one per sheet
    pub async fn open(
        file: InputFile,
        options: ComposeOptions,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Self> {
        options.validate()?;
        let source = load_pdf_bytes(file.bytes).await?;
        let page_count = source.get_pages().len() as u32;
        log::info!("Opened {} with {} pages", file.name, page_count);

        Ok(Self {
            source: Arc::new(source),
            source_name: file.name,
            selection: ImpositionSelection::new(page_count),
            range_input: format!("1-{}", page_count),
            options,
            settings: PrintSettings::default(),
            previews: RenderGeneration::new(),
            exports: RenderGeneration::new(),
            lock: ExportLock::new(),
            tracker: Arc::new(ExportTracker::new()),
            observer,
        })
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn source(&self) -> &Document {
        &self.source
    }

    pub fn selection(&self) -> &ImpositionSelection {
        &self.selection
    }

    pub fn print_settings_mut(&mut self) -> &mut PrintSettings {
        &mut self.settings
    }

    pub fn export_status(&self) -> watch::Receiver<ExportJob> {
        self.tracker.subscribe()
    }

    pub fn statistics(&self) -> ImpositionStatistics {
        calculate_statistics(&self.selection)
    }

    // -- Selection ------------------------------------------------------------

    pub fn range_input(&self) -> &str {
        &self.range_input
    }

    /// Edit the range text without applying it
    pub fn set_range_input(&mut self, text: impl Into<String>) {
        self.range_input = text.into();
    }

    /// Replace the selection with the pages named by the range text
    pub fn apply_range(&mut self) -> &[u32] {
        self.selection.apply_range(&self.range_input);
        self.previews.invalidate();
        self.selection.selected_pages()
    }

    pub fn select_all(&mut self) {
        self.selection.select_all();
        self.previews.invalidate();
    }

    pub fn select_none(&mut self) {
        self.selection.select_none();
        self.previews.invalidate();
    }

    pub fn toggle_page(&mut self, page: u32) {
        self.selection.toggle_page(page);
        self.previews.invalidate();
    }

    pub fn set_pages_per_sheet(&mut self, pages_per_sheet: usize) {
        self.selection.set_pages_per_sheet(pages_per_sheet);
        self.previews.invalidate();
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.selection.set_orientation(orientation);
        self.settings.layout = orientation;
        self.previews.invalidate();
    }

    pub fn next_sheet(&mut self) -> usize {
        self.previews.invalidate();
        self.selection.next_sheet()
    }

    pub fn previous_sheet(&mut self) -> usize {
        self.previews.invalidate();
        self.selection.previous_sheet()
    }

    // -- Rendering ------------------------------------------------------------

    /// One-sheet document of the current sheet at the preview margin.
    /// A newer request or any selection change cancels this one.
    pub async fn preview(&self) -> Result<Document> {
        let ticket = self.previews.begin();
        generate_preview(
            Arc::clone(&self.source),
            self.selection.clone(),
            self.options.clone(),
            ticket,
        )
        .await
    }

    /// Where each page of the current sheet lands, top-left origin
    pub fn preview_plan(&self) -> Vec<CellPlacement> {
        sheet_preview_plan(&self.source, &self.selection, &self.options)
    }

    pub fn begin_export(&self) -> Result<PendingExport> {
        if self.selection.selected_pages().is_empty() {
            return Err(ComposeError::NoPages);
        }
        let permit = self.lock.try_acquire()?;
        let pages = self.selection.total_sheets();
        let ticket = self.exports.begin();
        self.tracker.start();

        let source = Arc::clone(&self.source);
        let source_name = self.source_name.clone();
        let selection = self.selection.clone();
        let options = self.options.clone();
        let progress = progress_reporter(&self.tracker);
        Ok(PendingExport {
            permit,
            tracker: Arc::clone(&self.tracker),
            observer: Arc::clone(&self.observer),
            settings: self.settings,
            job: Box::pin(async move {
                let file =
                    export_imposition(source, &source_name, selection, options, ticket, progress)
                        .await?;
                Ok((file, pages))
            }),
        })
    }

    /// Impose the selection at the export margin and confirm it to the
    /// observer
    pub async fn export(&self) -> Result<Arc<OutputFile>> {
        self.begin_export()?.run().await
    }

    pub fn close(self) {
        self.previews.invalidate();
        self.exports.invalidate();
        self.observer.on_close();
    }
}
