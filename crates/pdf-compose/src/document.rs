//! Authoring document model
//!
//! The model owns every page, every placed element and every decoded image
//! of an authoring session. Each mutation builds a fresh
//! [`DocumentSnapshot`] and swaps it in whole, so readers holding an older
//! `Arc<DocumentSnapshot>` (a preview render, an export) never observe a
//! half-applied change. Subscribers receive a [`DirtyNotice`] after every
//! committed mutation.

use crate::constants::{SCALE_RANGE, TONE_RANGE};
use crate::adjust::FilterSpec;
use crate::layout::Rect;
use crate::options::ComposeOptions;
use crate::types::*;
use image::DynamicImage;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

// =============================================================================
// Source Images
// =============================================================================

/// A decoded image together with the bytes it was decoded from
pub struct SourceImage {
    id: ImageId,
    name: String,
    bytes: Vec<u8>,
    decoded: DynamicImage,
}

impl SourceImage {
    /// Decode `bytes` synchronously.
    pub fn decode(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let decoded = image::load_from_memory(&bytes)?;
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(ComposeError::InvalidGeometry {
                width: decoded.width() as f32,
                height: decoded.height() as f32,
            });
        }

        Ok(Self {
            id: ImageId::next(),
            name: name.into(),
            bytes,
            decoded,
        })
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn decoded(&self) -> &DynamicImage {
        &self.decoded
    }

    /// Intrinsic width in pixels
    pub fn width(&self) -> u32 {
        self.decoded.width()
    }

    /// Intrinsic height in pixels
    pub fn height(&self) -> u32 {
        self.decoded.height()
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Decode image bytes off the async executor.
pub async fn decode_image(name: impl Into<String>, bytes: Vec<u8>) -> Result<SourceImage> {
    let name = name.into();
    tokio::task::spawn_blocking(move || SourceImage::decode(name, bytes)).await?
}

// =============================================================================
// Elements and Pages
// =============================================================================

/// An image placed on an authoring page
#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElementId,
    pub image: Arc<SourceImage>,
    /// Left offset in points from the page's top-left corner
    pub x: f32,
    /// Top offset in points from the page's top-left corner
    pub y: f32,
    /// Multiplier on the image's intrinsic pixel size
    pub scale: f32,
    pub brightness: f32,
    pub contrast: f32,
    pub grayscale: bool,
}

impl Element {
    pub fn image_ref(&self) -> ImageId {
        self.image.id()
    }

    /// Drawn size in points: intrinsic pixels times scale
    pub fn rendered_size(&self) -> (f32, f32) {
        (
            self.image.width() as f32 * self.scale,
            self.image.height() as f32 * self.scale,
        )
    }

    /// Bounds in the page's top-left-origin space
    pub fn bounds(&self) -> Rect {
        let (width, height) = self.rendered_size();
        Rect::new(self.x, self.y, width, height)
    }

    /// Edge-inclusive hit test in logical canvas coordinates
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let bounds = self.bounds();
        x >= bounds.x && x <= bounds.right() && y >= bounds.y && y <= bounds.top()
    }

    pub fn filter(&self) -> FilterSpec {
        FilterSpec {
            brightness: self.brightness,
            contrast: self.contrast,
            grayscale: self.grayscale,
        }
    }

    fn apply(&mut self, patch: &ElementPatch) {
        if let Some(x) = patch.x.filter(|v| v.is_finite()) {
            self.x = x;
        }
        if let Some(y) = patch.y.filter(|v| v.is_finite()) {
            self.y = y;
        }
        if let Some(scale) = patch.scale {
            self.scale = clamp_field(scale, SCALE_RANGE, self.scale);
        }
        if let Some(brightness) = patch.brightness {
            self.brightness = clamp_field(brightness, TONE_RANGE, self.brightness);
        }
        if let Some(contrast) = patch.contrast {
            self.contrast = clamp_field(contrast, TONE_RANGE, self.contrast);
        }
        if let Some(grayscale) = patch.grayscale {
            self.grayscale = grayscale;
        }
    }
}

/// NaN keeps the previous value; anything else is clamped into range.
fn clamp_field(value: f32, (min, max): (f32, f32), previous: f32) -> f32 {
    if value.is_nan() {
        previous
    } else {
        value.clamp(min, max)
    }
}

/// Partial update for an element. `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElementPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub scale: Option<f32>,
    pub brightness: Option<f32>,
    pub contrast: Option<f32>,
    pub grayscale: Option<bool>,
}

impl ElementPatch {
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }
}

/// Explicit position and scale for a newly added element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

/// One authoring page: elements in z-order, last drawn on top
#[derive(Debug, Clone)]
pub struct Page {
    pub id: PageId,
    pub elements: Vec<Element>,
}

impl Page {
    fn new() -> Self {
        Self {
            id: PageId::next(),
            elements: Vec::new(),
        }
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|element| element.id == id)
    }

    /// Topmost element containing the point
    pub fn hit_test(&self, x: f32, y: f32) -> Option<&Element> {
        self.elements.iter().rev().find(|element| element.contains(x, y))
    }
}

// =============================================================================
// Snapshots and Notifications
// =============================================================================

/// Immutable view of the document at one version
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub version: u64,
    pub orientation: Orientation,
    pub pages: Vec<Page>,
}

impl DocumentSnapshot {
    pub fn sheet(&self) -> SheetSize {
        SheetSize::for_orientation(self.orientation)
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn element_count(&self) -> usize {
        self.pages.iter().map(|page| page.elements.len()).sum()
    }

    fn references(&self, image: ImageId) -> bool {
        self.pages
            .iter()
            .flat_map(|page| page.elements.iter())
            .any(|element| element.image_ref() == image)
    }
}

/// Which part of the document a mutation touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtyScope {
    /// Everything needs redrawing (orientation change, discard)
    All,
    /// Only these page indices changed
    Pages(Vec<usize>),
}

/// Sent to subscribers after every committed mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyNotice {
    pub version: u64,
    pub scope: DirtyScope,
}

impl DirtyNotice {
    /// True if a preview of `page_index` must be redrawn
    pub fn affects(&self, page_index: usize) -> bool {
        match &self.scope {
            DirtyScope::All => true,
            DirtyScope::Pages(pages) => pages.contains(&page_index),
        }
    }
}

// =============================================================================
// Document Model
// =============================================================================

pub struct DocumentModel {
    snapshot: Arc<DocumentSnapshot>,
    images: HashMap<ImageId, Arc<SourceImage>>,
    fit_ratio: f32,
    dirty_tx: watch::Sender<DirtyNotice>,
}

impl DocumentModel {
    /// A document with one empty page
    pub fn new(orientation: Orientation, options: &ComposeOptions) -> Self {
        let (dirty_tx, _) = watch::channel(DirtyNotice {
            version: 0,
            scope: DirtyScope::All,
        });

        Self {
            snapshot: Arc::new(DocumentSnapshot {
                version: 0,
                orientation,
                pages: vec![Page::new()],
            }),
            images: HashMap::new(),
            fit_ratio: options.initial_fit_ratio,
            dirty_tx,
        }
    }

    /// The current snapshot. Cheap to clone and safe to hold across edits.
    pub fn snapshot(&self) -> Arc<DocumentSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Receive a notice after every committed mutation
    pub fn subscribe(&self) -> watch::Receiver<DirtyNotice> {
        self.dirty_tx.subscribe()
    }

    pub fn version(&self) -> u64 {
        self.snapshot.version
    }

    pub fn orientation(&self) -> Orientation {
        self.snapshot.orientation
    }

    pub fn sheet(&self) -> SheetSize {
        self.snapshot.sheet()
    }

    pub fn page_count(&self) -> usize {
        self.snapshot.pages.len()
    }

    pub fn element(&self, page_index: usize, id: ElementId) -> Option<&Element> {
        self.snapshot.pages.get(page_index)?.element(id)
    }

    /// Number of image resources still held by the model
    pub fn live_images(&self) -> usize {
        self.images.len()
    }

    pub fn is_live(&self, image: ImageId) -> bool {
        self.images.contains_key(&image)
    }

    // -- Mutations ------------------------------------------------------------

    /// Append an empty page and return its index
    pub fn add_page(&mut self) -> usize {
        let mut pages = self.snapshot.pages.clone();
        pages.push(Page::new());
        let index = pages.len() - 1;
        self.commit(self.orientation(), pages, DirtyScope::Pages(vec![index]));
        index
    }

    /// Remove a page and release its images. The document always keeps at
    /// least one page, so removing the only page leaves a fresh empty one.
    pub fn remove_page(&mut self, index: usize) -> Result<()> {
        let mut pages = self.snapshot.pages.clone();
        if index >= pages.len() {
            return Err(ComposeError::UnknownPage(index));
        }

        pages.remove(index);
        if pages.is_empty() {
            pages.push(Page::new());
        }
        self.commit(self.orientation(), pages, DirtyScope::All);
        self.release_unreferenced();
        Ok(())
    }

    /// Place an image on a page.
    ///
    /// Without an explicit placement the image is fitted to at most the
    /// configured fraction of the sheet (never upscaled) and centered. The
    /// scale is always clamped to the element invariants; a non-finite
    /// explicit position is rejected.
    pub fn add_element(
        &mut self,
        page_index: usize,
        image: impl Into<Arc<SourceImage>>,
        placement: Option<Placement>,
    ) -> Result<ElementId> {
        if let Some(p) = &placement {
            if !(p.x.is_finite() && p.y.is_finite()) {
                return Err(ComposeError::InvalidGeometry {
                    width: p.x,
                    height: p.y,
                });
            }
        }

        let image: Arc<SourceImage> = image.into();
        let mut pages = self.snapshot.pages.clone();
        let page = pages
            .get_mut(page_index)
            .ok_or(ComposeError::UnknownPage(page_index))?;

        let sheet = self.sheet();
        let (img_w, img_h) = (image.width() as f32, image.height() as f32);
        let placement = placement.unwrap_or_else(|| {
            let fit = (sheet.width_pt * self.fit_ratio / img_w)
                .min(sheet.height_pt * self.fit_ratio / img_h)
                .min(1.0);
            let scale = clamp_field(fit, SCALE_RANGE, 1.0);
            Placement {
                x: (sheet.width_pt - img_w * scale) / 2.0,
                y: (sheet.height_pt - img_h * scale) / 2.0,
                scale,
            }
        });

        let element = Element {
            id: ElementId::next(),
            image: Arc::clone(&image),
            x: placement.x,
            y: placement.y,
            scale: clamp_field(placement.scale, SCALE_RANGE, 1.0),
            brightness: 1.0,
            contrast: 1.0,
            grayscale: false,
        };
        let id = element.id;
        page.elements.push(element);

        self.images.insert(image.id(), image);
        self.commit(self.orientation(), pages, DirtyScope::Pages(vec![page_index]));
        log::debug!("Added element {} to page {}", id, page_index);
        Ok(id)
    }

    /// Apply a partial update, clamping scale, brightness and contrast to the
    /// element invariants.
    pub fn update_element(
        &mut self,
        page_index: usize,
        id: ElementId,
        patch: ElementPatch,
    ) -> Result<()> {
        let mut pages = self.snapshot.pages.clone();
        let element = pages
            .get_mut(page_index)
            .ok_or(ComposeError::UnknownPage(page_index))?
            .elements
            .iter_mut()
            .find(|element| element.id == id)
            .ok_or(ComposeError::UnknownElement(id))?;

        element.apply(&patch);
        self.commit(self.orientation(), pages, DirtyScope::Pages(vec![page_index]));
        Ok(())
    }

    /// Remove an element and release its image resource
    pub fn remove_element(&mut self, page_index: usize, id: ElementId) -> Result<Element> {
        let mut pages = self.snapshot.pages.clone();
        let elements = &mut pages
            .get_mut(page_index)
            .ok_or(ComposeError::UnknownPage(page_index))?
            .elements;
        let position = elements
            .iter()
            .position(|element| element.id == id)
            .ok_or(ComposeError::UnknownElement(id))?;
        let removed = elements.remove(position);

        self.commit(self.orientation(), pages, DirtyScope::Pages(vec![page_index]));
        self.release_unreferenced();
        Ok(removed)
    }

    /// Move an element to (`new_x`, `new_y`) on another page, appending it on
    /// top of that page's z-order. Moving within one page only repositions.
    pub fn move_element(
        &mut self,
        from: usize,
        to: usize,
        id: ElementId,
        new_x: f32,
        new_y: f32,
    ) -> Result<()> {
        if from == to {
            return self.update_element(from, id, ElementPatch::position(new_x, new_y));
        }

        let mut pages = self.snapshot.pages.clone();
        if to >= pages.len() {
            return Err(ComposeError::UnknownPage(to));
        }
        let source = &mut pages
            .get_mut(from)
            .ok_or(ComposeError::UnknownPage(from))?
            .elements;
        let position = source
            .iter()
            .position(|element| element.id == id)
            .ok_or(ComposeError::UnknownElement(id))?;

        let mut element = source.remove(position);
        element.apply(&ElementPatch::position(new_x, new_y));
        pages[to].elements.push(element);

        self.commit(self.orientation(), pages, DirtyScope::Pages(vec![from, to]));
        log::debug!("Moved element {} from page {} to page {}", id, from, to);
        Ok(())
    }

    /// Switch the sheet orientation. Element positions are kept as-is.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        if orientation != self.orientation() {
            let pages = self.snapshot.pages.clone();
            self.commit(orientation, pages, DirtyScope::All);
        }
    }

    /// End of session: drop every page and release every image. Returns the
    /// number of image resources released.
    pub fn discard(&mut self) -> usize {
        let released = self.images.len();
        self.images.clear();
        self.commit(self.orientation(), vec![Page::new()], DirtyScope::All);
        log::debug!("Discarded document, released {} images", released);
        released
    }

    fn commit(&mut self, orientation: Orientation, pages: Vec<Page>, scope: DirtyScope) {
        let version = self.snapshot.version + 1;
        self.snapshot = Arc::new(DocumentSnapshot {
            version,
            orientation,
            pages,
        });
        self.dirty_tx.send_replace(DirtyNotice { version, scope });
    }

    fn release_unreferenced(&mut self) {
        let snapshot = Arc::clone(&self.snapshot);
        self.images.retain(|id, _| snapshot.references(*id));
    }
}

impl fmt::Debug for DocumentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentModel")
            .field("version", &self.snapshot.version)
            .field("pages", &self.snapshot.pages.len())
            .field("live_images", &self.images.len())
            .finish()
    }
}
