use crate::constants::*;
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tunable engine configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ComposeOptions {
    // Interaction
    pub edge_threshold_pt: f32,
    pub teleport_inset_pt: f32,

    // Authoring
    pub initial_fit_ratio: f32,

    // Imposition
    pub preview_margin_factor: f32,
    pub export_margin_factor: f32,

    // Raster export
    pub jpeg_quality: u8,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            edge_threshold_pt: EDGE_THRESHOLD_PT,
            teleport_inset_pt: TELEPORT_INSET_PT,
            initial_fit_ratio: INITIAL_FIT_RATIO,
            preview_margin_factor: PREVIEW_MARGIN_FACTOR,
            export_margin_factor: EXPORT_MARGIN_FACTOR,
            jpeg_quality: JPEG_QUALITY,
        }
    }
}

impl ComposeOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options: Self = serde_json::from_slice(&bytes)
            .map_err(|e| ComposeError::Config(format!("Failed to parse config: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ComposeError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        let half_short_edge = A4_SHORT_EDGE_PT / 2.0;
        if !(self.edge_threshold_pt > 0.0 && self.edge_threshold_pt < half_short_edge) {
            return Err(ComposeError::Config(format!(
                "Edge threshold must be between 0 and {} points",
                half_short_edge
            )));
        }

        if !(self.teleport_inset_pt >= 0.0 && self.teleport_inset_pt < half_short_edge) {
            return Err(ComposeError::Config(
                "Teleport inset must be a non-negative distance inside the sheet".to_string(),
            ));
        }

        if !(self.initial_fit_ratio > 0.0 && self.initial_fit_ratio <= 1.0) {
            return Err(ComposeError::Config(
                "Initial fit ratio must be in (0, 1]".to_string(),
            ));
        }

        for (name, factor) in [
            ("Preview", self.preview_margin_factor),
            ("Export", self.export_margin_factor),
        ] {
            if !(factor > 0.0 && factor <= 1.0) {
                return Err(ComposeError::Config(format!(
                    "{} margin factor must be in (0, 1]",
                    name
                )));
            }
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ComposeError::Config(
                "JPEG quality must be between 1 and 100".to_string(),
            ));
        }

        Ok(())
    }
}

/// Print settings passed through to the print pipeline untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrintSettings {
    copies: u32,
    pub layout: Orientation,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            copies: 1,
            layout: Orientation::Portrait,
        }
    }
}

impl PrintSettings {
    pub fn new(copies: u32, layout: Orientation) -> Self {
        Self {
            copies: copies.max(1),
            layout,
        }
    }

    pub fn copies(&self) -> u32 {
        self.copies
    }

    pub fn set_copies(&mut self, copies: u32) {
        self.copies = copies.max(1);
    }

    pub fn increment_copies(&mut self) {
        self.copies = self.copies.saturating_add(1);
    }

    /// Never drops below one copy
    pub fn decrement_copies(&mut self) {
        self.copies = self.copies.saturating_sub(1).max(1);
    }
}
