//! XObject creation
//!
//! Source PDF pages become Form XObjects that can be placed on output sheets
//! with a transformation. Raster images become DCT-encoded Image XObjects.

use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::layout::Rect;
use crate::types::Result;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

/// Inheritable page attributes are looked up at most this many levels up
const MAX_INHERIT_DEPTH: usize = 32;

// =============================================================================
// Page XObjects
// =============================================================================

/// Create a Form XObject from a source page.
///
/// The BBox is the page's MediaBox, inherited from the page tree when the
/// page itself has none. Resources are deep-copied through `cache`, so
/// objects shared between pages are copied only once.
pub fn create_page_xobject(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<ObjectId> {
    let page_dict = source.get_dictionary(page_id)?;
    let media_box = page_box(source, page_id);
    let content_data = get_page_content(source, page_dict)?;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set(
        "BBox",
        Object::Array(vec![
            Object::Real(media_box.x),
            Object::Real(media_box.y),
            Object::Real(media_box.right()),
            Object::Real(media_box.top()),
        ]),
    );
    xobject_dict.set("FormType", Object::Integer(1));

    if let Some(resources) = inherited(source, page_id, b"Resources") {
        xobject_dict.set("Resources", import_object(output, source, resources, cache)?);
    }

    Ok(output.add_object(Stream::new(xobject_dict, content_data)))
}

// =============================================================================
// Image XObjects
// =============================================================================

/// Embed JPEG bytes as an RGB Image XObject.
///
/// The bytes are stored verbatim under DCTDecode; the stream is never
/// re-compressed.
pub fn embed_jpeg(output: &mut Document, jpeg: Vec<u8>, width_px: u32, height_px: u32) -> ObjectId {
    let dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(i64::from(width_px))),
        ("Height", Object::Integer(i64::from(height_px))),
        ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
        ("Filter", Object::Name(b"DCTDecode".to_vec())),
    ]);
    output.add_object(Stream::new(dict, jpeg).with_compression(false))
}

// =============================================================================
// Page Content Extraction
// =============================================================================

fn get_page_content(doc: &Document, page_dict: &Dictionary) -> Result<Vec<u8>> {
    let contents = match page_dict.get(b"Contents") {
        Ok(c) => c,
        Err(_) => return Ok(Vec::new()), // No content = blank page
    };

    match contents {
        Object::Reference(id) => get_single_content_stream(doc, *id),
        Object::Array(arr) => get_concatenated_content_streams(doc, arr),
        _ => Ok(Vec::new()),
    }
}

fn get_single_content_stream(doc: &Document, id: ObjectId) -> Result<Vec<u8>> {
    match doc.get_object(id)? {
        Object::Stream(stream) => Ok(stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone())),
        // An array of streams behind one reference
        Object::Array(arr) => get_concatenated_content_streams(doc, arr),
        _ => Ok(Vec::new()),
    }
}

fn get_concatenated_content_streams(doc: &Document, refs: &[Object]) -> Result<Vec<u8>> {
    let mut result = Vec::new();

    for obj in refs {
        if let Object::Reference(id) = obj {
            if let Ok(stream) = doc.get_object(*id)?.as_stream() {
                let content = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                result.extend_from_slice(&content);
                result.push(b'\n');
            }
        }
    }

    Ok(result)
}

// =============================================================================
// Deep Copy
// =============================================================================

/// Deep copy an object from `source` into `output`, following references.
///
/// `cache` maps source object ids to their copies. An id is registered before
/// its target is copied, so reference cycles terminate.
pub fn import_object(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            let new_id = output.new_object_id();
            cache.insert(*id, new_id);
            let referenced = source.get_object(*id)?;
            let copied = import_object(output, source, referenced, cache)?;
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                new_dict.set(key.clone(), import_object(output, source, value, cache)?);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>> = arr
                .iter()
                .map(|item| import_object(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                new_dict.set(key.clone(), import_object(output, source, value, cache)?);
            }
            let mut copied = Stream::new(new_dict, stream.content.clone());
            copied.allows_compression = stream.allows_compression;
            Ok(Object::Stream(copied))
        }
        _ => Ok(obj.clone()),
    }
}

// =============================================================================
// Page Geometry
// =============================================================================

/// The page's MediaBox as a rectangle, origin included.
///
/// Falls back to [`DEFAULT_PAGE_DIMENSIONS`] at the origin when no usable box
/// is found on the page or any ancestor.
pub fn page_box(doc: &Document, page_id: ObjectId) -> Rect {
    let default = Rect::new(0.0, 0.0, DEFAULT_PAGE_DIMENSIONS.0, DEFAULT_PAGE_DIMENSIONS.1);

    let Some(values) = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| resolve(doc, obj).as_array().ok())
        .filter(|arr| arr.len() == 4)
        .map(|arr| arr.iter().map(|v| extract_number(resolve(doc, v))).collect::<Vec<_>>())
    else {
        return default;
    };

    match values.as_slice() {
        [Some(x0), Some(y0), Some(x1), Some(y1)] => {
            let rect = Rect::new(x0.min(*x1), y0.min(*y1), (x1 - x0).abs(), (y1 - y0).abs());
            if rect.width > 0.0 && rect.height > 0.0 {
                rect
            } else {
                default
            }
        }
        _ => default,
    }
}

/// Source page dimensions (width, height) in points
pub fn get_page_dimensions(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let rect = page_box(doc, page_id);
    (rect.width, rect.height)
}

/// Look up an inheritable page attribute, walking up the Parent chain
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        let parent = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(value: &str) -> Object {
        Object::Name(value.as_bytes().to_vec())
    }

    fn doc_with_inherited_box() -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", name("Page")),
            ("Parent", Object::Reference(pages_id)),
        ]));
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", name("Pages")),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(10),
                    Object::Integer(20),
                    Object::Integer(310),
                    Object::Integer(420),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
        (doc, page_id)
    }

    #[test]
    fn test_media_box_is_inherited_with_origin() {
        let (doc, page_id) = doc_with_inherited_box();
        assert_eq!(page_box(&doc, page_id), Rect::new(10.0, 20.0, 300.0, 400.0));
        assert_eq!(get_page_dimensions(&doc, page_id), (300.0, 400.0));
    }

    #[test]
    fn test_missing_box_uses_default() {
        let mut doc = Document::with_version("1.7");
        let page_id = doc.add_object(Dictionary::from_iter(vec![("Type", name("Page"))]));
        assert_eq!(get_page_dimensions(&doc, page_id), DEFAULT_PAGE_DIMENSIONS);
    }

    #[test]
    fn test_xobject_carries_bbox_and_resources() {
        let (source, page_id) = doc_with_inherited_box();
        let mut output = Document::with_version("1.7");
        let mut cache = HashMap::new();

        let id = create_page_xobject(&mut output, &source, page_id, &mut cache).unwrap();
        let stream = output.get_object(id).unwrap().as_stream().unwrap();
        let bbox = stream.dict.get(b"BBox").unwrap().as_array().unwrap();

        assert_eq!(bbox[2], Object::Real(310.0));
        assert!(stream.dict.get(b"Resources").is_ok());
        assert!(stream.content.is_empty());
    }

    #[test]
    fn test_import_handles_cycles() {
        let mut source = Document::with_version("1.7");
        let a = source.new_object_id();
        let b = source.add_object(Dictionary::from_iter(vec![("Next", Object::Reference(a))]));
        source.objects.insert(
            a,
            Object::Dictionary(Dictionary::from_iter(vec![("Next", Object::Reference(b))])),
        );

        let mut output = Document::with_version("1.7");
        let mut cache = HashMap::new();
        let copied = import_object(&mut output, &source, &Object::Reference(a), &mut cache).unwrap();

        assert!(matches!(copied, Object::Reference(_)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_jpeg_stream_is_stored_verbatim() {
        let mut output = Document::with_version("1.7");
        let id = embed_jpeg(&mut output, vec![0xFF, 0xD8, 0xFF, 0xD9], 3, 2);
        let stream = output.get_object(id).unwrap().as_stream().unwrap();

        assert_eq!(stream.content, vec![0xFF, 0xD8, 0xFF, 0xD9]);
        assert!(!stream.allows_compression);
        assert_eq!(stream.dict.get(b"Width").unwrap(), &Object::Integer(3));
    }
}
