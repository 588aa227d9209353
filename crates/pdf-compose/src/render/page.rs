//! Output document assembly
//!
//! [`OutputBuilder`] owns the document being written and its page tree;
//! [`SheetContent`] collects the drawing operations and XObject resources of
//! one output page.

use crate::constants::OUTPUT_PDF_VERSION;
use crate::layout::Rect;
use crate::types::{Result, SheetSize};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

// =============================================================================
// Sheet Content
// =============================================================================

/// Drawing operations and XObject resources for one output page
#[derive(Debug, Default)]
pub struct SheetContent {
    ops: Vec<String>,
    xobjects: Dictionary,
}

impl SheetContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a Form XObject scaled by `scale` with its BBox origin `origin`
    /// landing on the bottom-left corner of `rect`
    pub fn place_form(&mut self, xobject_id: ObjectId, rect: &Rect, scale: f32, origin: (f32, f32)) {
        let name = self.register(xobject_id);
        let tx = rect.x - origin.0 * scale;
        let ty = rect.y - origin.1 * scale;
        self.ops.push(placement_command(&name, scale, scale, tx, ty));
    }

    /// Draw an Image XObject stretched over `rect`
    pub fn place_image(&mut self, xobject_id: ObjectId, rect: &Rect) {
        let name = self.register(xobject_id);
        self.ops
            .push(placement_command(&name, rect.width, rect.height, rect.x, rect.y));
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn register(&mut self, xobject_id: ObjectId) -> String {
        let name = format!("X{}", self.ops.len());
        self.xobjects
            .set(name.as_bytes(), Object::Reference(xobject_id));
        name
    }
}

/// Content stream command that paints an XObject under a scale + translate
/// matrix
fn placement_command(name: &str, sx: f32, sy: f32, tx: f32, ty: f32) -> String {
    format!("q {} 0 0 {} {} {} cm /{} Do Q\n", sx, sy, tx, ty, name)
}

// =============================================================================
// Output Builder
// =============================================================================

/// A new PDF under construction
pub struct OutputBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for OutputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version(OUTPUT_PDF_VERSION);
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// The document objects are added to
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append a page of `sheet` size painted with `content`
    pub fn add_page(&mut self, sheet: SheetSize, content: SheetContent) -> Result<ObjectId> {
        let content_id = self.doc.add_object(Stream::new(
            Dictionary::new(),
            content.ops.concat().into_bytes(),
        ));

        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(content.xobjects));

        let page_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(sheet.width_pt),
                    Object::Real(sheet.height_pt),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]));
        self.kids.push(Object::Reference(page_id));
        Ok(page_id)
    }

    /// Write the page tree and catalog and hand over the document
    pub fn finish(mut self) -> Document {
        let count = self.kids.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(self.kids)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let catalog_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", catalog_id);

        self.doc
    }
}
