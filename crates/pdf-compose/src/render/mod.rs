//! PDF and raster rendering
//!
//! - Form XObjects from source pages and Image XObjects from JPEG data
//! - Output document assembly (page tree, catalog, content streams)
//! - Filtered rasterisation of authoring elements

mod page;
mod raster;
mod xobject;

pub use page::*;
pub use raster::*;
pub use xobject::{create_page_xobject, embed_jpeg, get_page_dimensions, import_object, page_box};
