//! Element adjustments and the shared filter transform
//!
//! Numeric controls (scale, brightness, contrast) move in fixed steps and are
//! always clamped, never rejected. [`FilterSpec`] is the single description
//! of an element's colour filter: the preview rasteriser and the export
//! backend both apply it through [`FilterSpec::apply`], so the two cannot
//! drift apart.

use crate::constants::{SCALE_RANGE, SCALE_STEP, TONE_RANGE, TONE_STEP};
use crate::document::{DocumentModel, ElementPatch};
use crate::types::*;
use image::{Rgba, RgbaImage};

// =============================================================================
// Numeric Adjustments
// =============================================================================

/// A numeric element property driven by +/- controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustField {
    Scale,
    Brightness,
    Contrast,
}

impl AdjustField {
    /// Allowed (min, max) for this field
    pub fn range(self) -> (f32, f32) {
        match self {
            AdjustField::Scale => SCALE_RANGE,
            AdjustField::Brightness | AdjustField::Contrast => TONE_RANGE,
        }
    }

    /// Size of one +/- step
    pub fn step(self) -> f32 {
        match self {
            AdjustField::Scale => SCALE_STEP,
            AdjustField::Brightness | AdjustField::Contrast => TONE_STEP,
        }
    }

    fn patch(self, value: f32) -> ElementPatch {
        match self {
            AdjustField::Scale => ElementPatch {
                scale: Some(value),
                ..Default::default()
            },
            AdjustField::Brightness => ElementPatch {
                brightness: Some(value),
                ..Default::default()
            },
            AdjustField::Contrast => ElementPatch {
                contrast: Some(value),
                ..Default::default()
            },
        }
    }
}

/// Step a value: add `delta`, round to two decimals, clamp to `[min, max]`.
///
/// An inverted range collapses to `min`.
pub fn stepped_value(current: f32, delta: f32, min: f32, max: f32) -> f32 {
    let rounded = ((current + delta) * 100.0).round() / 100.0;
    rounded.max(min).min(max.max(min))
}

/// Add `delta` to one field of an element, clamped to `[min, max]` and then
/// to the element invariants. Returns the value written back.
pub fn adjust_value(
    model: &mut DocumentModel,
    page_index: usize,
    id: ElementId,
    field: AdjustField,
    delta: f32,
    min: f32,
    max: f32,
) -> Result<f32> {
    if page_index >= model.page_count() {
        return Err(ComposeError::UnknownPage(page_index));
    }
    let element = model
        .element(page_index, id)
        .ok_or(ComposeError::UnknownElement(id))?;
    let current = match field {
        AdjustField::Scale => element.scale,
        AdjustField::Brightness => element.brightness,
        AdjustField::Contrast => element.contrast,
    };

    let (lo, hi) = field.range();
    let value = stepped_value(current, delta, min, max).clamp(lo, hi);
    model.update_element(page_index, id, field.patch(value))?;
    Ok(value)
}

/// Move a field by `steps` standard increments (negative steps go down)
pub fn nudge(
    model: &mut DocumentModel,
    page_index: usize,
    id: ElementId,
    field: AdjustField,
    steps: i32,
) -> Result<f32> {
    let (min, max) = field.range();
    adjust_value(model, page_index, id, field, field.step() * steps as f32, min, max)
}

/// Restore neutral brightness, contrast and colour. Scale and position are
/// left alone.
pub fn reset_element(model: &mut DocumentModel, page_index: usize, id: ElementId) -> Result<()> {
    model.update_element(
        page_index,
        id,
        ElementPatch {
            brightness: Some(1.0),
            contrast: Some(1.0),
            grayscale: Some(false),
            ..Default::default()
        },
    )
}

/// Flip the grayscale flag and return its new state
pub fn toggle_grayscale(model: &mut DocumentModel, page_index: usize, id: ElementId) -> Result<bool> {
    let grayscale = !model
        .element(page_index, id)
        .ok_or(ComposeError::UnknownElement(id))?
        .grayscale;
    model.update_element(
        page_index,
        id,
        ElementPatch {
            grayscale: Some(grayscale),
            ..Default::default()
        },
    )?;
    Ok(grayscale)
}

// =============================================================================
// Filter Transform
// =============================================================================

/// Colour filter applied to an element: brightness, then contrast, then
/// optional grayscale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub brightness: f32,
    pub contrast: f32,
    pub grayscale: bool,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl FilterSpec {
    pub const IDENTITY: FilterSpec = FilterSpec {
        brightness: 1.0,
        contrast: 1.0,
        grayscale: false,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// CSS filter syntax, e.g. `brightness(1.2) contrast(0.9) grayscale(1)`
    pub fn describe(&self) -> String {
        let mut text = format!("brightness({}) contrast({})", self.brightness, self.contrast);
        if self.grayscale {
            text.push_str(" grayscale(1)");
        }
        text
    }

    /// Brightness and contrast for one channel value in `[0, 1]`
    fn tone(&self, channel: f32) -> f32 {
        let bright = (channel * self.brightness).clamp(0.0, 1.0);
        ((bright - 0.5) * self.contrast + 0.5).clamp(0.0, 1.0)
    }

    pub fn apply_pixel(&self, pixel: Rgba<u8>) -> Rgba<u8> {
        let [r, g, b, a] = pixel.0;
        let toned = [r, g, b].map(|c| self.tone(f32::from(c) / 255.0));
        self.finish(toned, a)
    }

    /// Apply the filter in place
    pub fn apply(&self, image: &mut RgbaImage) {
        if self.is_identity() {
            return;
        }

        let lut: Vec<f32> = (0..=255u8).map(|c| self.tone(f32::from(c) / 255.0)).collect();
        for pixel in image.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            let toned = [r, g, b].map(|c| lut[usize::from(c)]);
            *pixel = self.finish(toned, a);
        }
    }

    fn finish(&self, [r, g, b]: [f32; 3], alpha: u8) -> Rgba<u8> {
        let channels = if self.grayscale {
            let luma = (0.2126 * r + 0.7152 * g + 0.0722 * b).clamp(0.0, 1.0);
            [luma; 3]
        } else {
            [r, g, b]
        };
        let [r, g, b] = channels.map(to_byte);
        Rgba([r, g, b, alpha])
    }
}

fn to_byte(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Placement, SourceImage};
    use crate::options::ComposeOptions;
    use image::ImageFormat;
    use std::io::Cursor;

    fn model_with_element() -> (DocumentModel, ElementId) {
        let img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        let source = SourceImage::decode("px.png", bytes).unwrap();

        let mut model = DocumentModel::new(Orientation::Portrait, &ComposeOptions::default());
        let placement = Placement {
            x: 0.0,
            y: 0.0,
            scale: 1.98,
        };
        let id = model.add_element(0, source, Some(placement)).unwrap();
        (model, id)
    }

    #[test]
    fn test_stepped_value_rounds_and_clamps() {
        assert_eq!(stepped_value(1.98, 0.05, 0.1, 2.0), 2.0);
        assert_eq!(stepped_value(0.1, -0.05, 0.1, 2.0), 0.1);
        assert_eq!(stepped_value(1.0, 0.1, 0.4, 1.6), 1.1);
        assert_eq!(stepped_value(1.0, 0.3333, 0.0, 5.0), 1.33);
    }

    #[test]
    fn test_adjust_scale_saturates() {
        let (mut model, id) = model_with_element();
        let value = adjust_value(&mut model, 0, id, AdjustField::Scale, 0.05, 0.1, 2.0).unwrap();

        assert_eq!(value, 2.0);
        assert_eq!(model.element(0, id).unwrap().scale, 2.0);
    }

    #[test]
    fn test_wide_caller_range_still_respects_invariant() {
        let (mut model, id) = model_with_element();
        let value =
            adjust_value(&mut model, 0, id, AdjustField::Brightness, 5.0, 0.0, 10.0).unwrap();
        assert_eq!(value, 1.6);
    }

    #[test]
    fn test_nudge_steps() {
        let (mut model, id) = model_with_element();
        nudge(&mut model, 0, id, AdjustField::Contrast, -3).unwrap();
        assert_eq!(model.element(0, id).unwrap().contrast, 0.7);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let (mut model, id) = model_with_element();
        nudge(&mut model, 0, id, AdjustField::Brightness, 2).unwrap();
        toggle_grayscale(&mut model, 0, id).unwrap();

        for _ in 0..2 {
            reset_element(&mut model, 0, id).unwrap();
            let filter = model.element(0, id).unwrap().filter();
            assert_eq!(filter, FilterSpec::IDENTITY);
        }
        assert_eq!(model.element(0, id).unwrap().scale, 1.98);
    }

    #[test]
    fn test_unknown_element_is_input_error() {
        let (mut model, _) = model_with_element();
        let err = nudge(&mut model, 0, ElementId(u64::MAX), AdjustField::Scale, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_missing_page_is_reported_as_page() {
        let (mut model, id) = model_with_element();
        let err = adjust_value(&mut model, 3, id, AdjustField::Scale, 0.05, 0.1, 2.0).unwrap_err();
        assert!(matches!(err, ComposeError::UnknownPage(3)));
        assert_eq!(model.element(0, id).unwrap().scale, 1.98);
    }

    #[test]
    fn test_identity_filter_leaves_pixels() {
        let pixel = Rgba([12, 200, 99, 7]);
        assert_eq!(FilterSpec::IDENTITY.apply_pixel(pixel), pixel);
    }

    #[test]
    fn test_filter_stage_order() {
        let filter = FilterSpec {
            brightness: 1.5,
            contrast: 1.0,
            grayscale: false,
        };
        // Brightness clamps before contrast sees the value
        assert_eq!(filter.apply_pixel(Rgba([200, 0, 0, 255])).0[0], 255);

        let filter = FilterSpec {
            brightness: 1.0,
            contrast: 0.4,
            grayscale: false,
        };
        // Low contrast pulls toward mid-grey
        let out = filter.apply_pixel(Rgba([0, 255, 128, 255]));
        assert!((76..=77).contains(&out.0[0]));
        assert!((178..=179).contains(&out.0[1]));
        assert_eq!(out.0[3], 255);
    }

    #[test]
    fn test_grayscale_uses_luma_and_keeps_alpha() {
        let filter = FilterSpec {
            grayscale: true,
            ..FilterSpec::IDENTITY
        };
        let out = filter.apply_pixel(Rgba([255, 0, 0, 40]));
        assert_eq!(out, Rgba([54, 54, 54, 40]));
    }

    #[test]
    fn test_bulk_apply_matches_pixel_apply() {
        let filter = FilterSpec {
            brightness: 1.2,
            contrast: 0.8,
            grayscale: true,
        };
        let mut img = RgbaImage::from_fn(8, 8, |x, y| Rgba([(x * 30) as u8, (y * 30) as u8, 77, 255]));
        let expected: Vec<_> = img.pixels().map(|p| filter.apply_pixel(*p)).collect();

        filter.apply(&mut img);
        assert_eq!(img.pixels().copied().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            FilterSpec::IDENTITY.describe(),
            "brightness(1) contrast(1)"
        );
        let filter = FilterSpec {
            brightness: 1.2,
            contrast: 0.8,
            grayscale: true,
        };
        assert_eq!(filter.describe(), "brightness(1.2) contrast(0.8) grayscale(1)");
    }
}
