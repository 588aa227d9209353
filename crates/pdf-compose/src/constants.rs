//! Shared constants for composition and imposition
//!
//! This module centralizes magic numbers used by both the authoring canvas
//! and the N-up imposition path. The sheet dimensions are the only values
//! that must agree across every path; everything tunable also appears as a
//! default in [`crate::ComposeOptions`].

// =============================================================================
// Sheet Geometry
// =============================================================================

/// Short edge of the output sheet in points (A4)
pub const A4_SHORT_EDGE_PT: f32 = 595.28;

/// Long edge of the output sheet in points (A4)
pub const A4_LONG_EDGE_PT: f32 = 841.89;

/// Page size assumed when a source page has no readable MediaBox (US Letter)
pub const DEFAULT_PAGE_DIMENSIONS: (f32, f32) = (612.0, 792.0);

/// Pages-per-sheet values offered to the user
pub const SUPPORTED_PAGES_PER_SHEET: [usize; 6] = [1, 2, 4, 6, 9, 16];

// =============================================================================
// Element Invariants
// =============================================================================

/// Allowed range for an element's scale multiplier
pub const SCALE_RANGE: (f32, f32) = (0.1, 2.0);

/// Allowed range for brightness and contrast
pub const TONE_RANGE: (f32, f32) = (0.4, 1.6);

/// Step used by the scale +/- controls
pub const SCALE_STEP: f32 = 0.05;

/// Step used by the brightness/contrast +/- controls
pub const TONE_STEP: f32 = 0.1;

/// Largest fraction of the sheet a newly added image may cover
pub const INITIAL_FIT_RATIO: f32 = 0.7;

// =============================================================================
// Interaction
// =============================================================================

/// Distance from a canvas edge (points) that triggers a page teleport
pub const EDGE_THRESHOLD_PT: f32 = 60.0;

/// Horizontal inset (points) of an element after it teleports onto a page
pub const TELEPORT_INSET_PT: f32 = 20.0;

// =============================================================================
// Rendering
// =============================================================================

/// Cell fill factor for on-screen imposition previews
pub const PREVIEW_MARGIN_FACTOR: f32 = 0.9;

/// Cell fill factor for the final imposed document
pub const EXPORT_MARGIN_FACTOR: f32 = 0.95;

/// JPEG quality used when re-encoding filtered images
pub const JPEG_QUALITY: u8 = 95;

/// Longest raster edge (pixels) the engine will allocate
pub const MAX_SURFACE_EDGE_PX: f32 = 16_384.0;

/// PDF version written to every output document
pub const OUTPUT_PDF_VERSION: &str = "1.7";

/// Media type declared on every output file
pub const PDF_MEDIA_TYPE: &str = "application/pdf";
