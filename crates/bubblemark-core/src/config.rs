// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tunable detection and sheet-layout settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BubblemarkError, Result};
use crate::types::MAX_ALTERNATIVES;

/// Settings for the bubble detection pipeline.
///
/// Every threshold the pipeline applies lives here so that callers and tests
/// can move the boundaries explicitly. Missing fields in a JSON config fall
/// back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OmrConfig {
    /// Apply a 3x3 closing pass after thresholding.
    pub apply_closing: bool,
    /// Gaussian sigma used before thresholding (1.1 matches a 5x5 kernel).
    pub blur_sigma: f32,
    /// Regions with a boundary area at or below this (px²) are noise.
    pub min_blob_area: f64,
    /// Lower bound of the accepted width/height ratio.
    pub min_aspect_ratio: f64,
    /// Upper bound of the accepted width/height ratio.
    pub max_aspect_ratio: f64,
    /// Bubbles per question (A, B, C, ...).
    pub alternatives_per_question: usize,
    /// Fraction of the bounding box trimmed from each side before measuring
    /// fill, so the printed outline is not counted as ink.
    pub fill_padding: f64,
    /// Minimum foreground pixels inside the trimmed box to accept a mark.
    pub min_fill_pixels: u32,
    /// Minimum foreground ratio inside the trimmed box to accept a mark.
    pub min_fill_ratio: f64,
}

impl Default for OmrConfig {
    fn default() -> Self {
        Self {
            apply_closing: true,
            blur_sigma: 1.1,
            min_blob_area: 150.0,
            min_aspect_ratio: 0.8,
            max_aspect_ratio: 1.2,
            alternatives_per_question: 5,
            fill_padding: 0.2,
            min_fill_pixels: 100,
            min_fill_ratio: 0.5,
        }
    }
}

impl OmrConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.blur_sigma > 0.0) {
            return Err(BubblemarkError::invalid_input("blur_sigma must be positive"));
        }
        if !(self.min_blob_area >= 0.0) {
            return Err(BubblemarkError::invalid_input(
                "min_blob_area must not be negative",
            ));
        }
        if !(self.min_aspect_ratio > 0.0 && self.min_aspect_ratio <= self.max_aspect_ratio) {
            return Err(BubblemarkError::invalid_input(format!(
                "aspect band [{}, {}] is empty or non-positive",
                self.min_aspect_ratio, self.max_aspect_ratio
            )));
        }
        if !(2..=MAX_ALTERNATIVES).contains(&self.alternatives_per_question) {
            return Err(BubblemarkError::invalid_input(format!(
                "alternatives_per_question must be within 2..={MAX_ALTERNATIVES}"
            )));
        }
        if !(0.0..0.5).contains(&self.fill_padding) {
            return Err(BubblemarkError::invalid_input(
                "fill_padding must be within [0, 0.5)",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_fill_ratio) {
            return Err(BubblemarkError::invalid_input(
                "min_fill_ratio must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Layout of a generated answer sheet, in raster pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Largest question count a generated sheet may hold.
    pub max_questions: u32,
    /// Bubbles per question row.
    pub alternatives_per_question: usize,
    /// Outer radius of each bubble.
    pub bubble_radius: u32,
    /// Outline thickness of an empty bubble.
    pub stroke_width: u32,
    /// Horizontal distance between bubble centres.
    pub column_pitch: u32,
    /// Vertical distance between question rows.
    pub row_pitch: u32,
    /// Blank border around the bubble grid.
    pub margin: u32,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            max_questions: 30,
            alternatives_per_question: 5,
            bubble_radius: 22,
            stroke_width: 3,
            column_pitch: 66,
            row_pitch: 66,
            margin: 60,
        }
    }
}

impl TemplateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_questions == 0 {
            return Err(BubblemarkError::invalid_input("max_questions must be at least 1"));
        }
        if !(2..=MAX_ALTERNATIVES).contains(&self.alternatives_per_question) {
            return Err(BubblemarkError::invalid_input(format!(
                "alternatives_per_question must be within 2..={MAX_ALTERNATIVES}"
            )));
        }
        if self.stroke_width == 0 || self.stroke_width >= self.bubble_radius {
            return Err(BubblemarkError::invalid_input(
                "stroke_width must be between 1 and bubble_radius - 1",
            ));
        }
        // Neighbouring bubbles must not touch, or they merge into one region.
        let diameter = 2 * self.bubble_radius + 1;
        if self.column_pitch <= diameter || self.row_pitch <= diameter {
            return Err(BubblemarkError::invalid_input(
                "bubble pitch must exceed the bubble diameter",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        OmrConfig::default().validate().unwrap();
        TemplateConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = OmrConfig::from_json_str(r#"{"min_fill_ratio": 0.35}"#).unwrap();
        assert_eq!(config.min_fill_ratio, 0.35);
        assert_eq!(config.min_blob_area, 150.0);
        assert_eq!(config.alternatives_per_question, 5);
    }

    #[test]
    fn inverted_aspect_band_is_rejected() {
        let err = OmrConfig::from_json_str(r#"{"min_aspect_ratio": 1.3}"#).unwrap_err();
        assert!(matches!(err, BubblemarkError::InvalidInput(_)));
    }

    #[test]
    fn padding_of_half_is_rejected() {
        let config = OmrConfig {
            fill_padding: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn touching_bubbles_are_rejected() {
        let config = TemplateConfig {
            column_pitch: 40,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"apply_closing": false}}"#).unwrap();
        let config = OmrConfig::load(file.path()).unwrap();
        assert!(!config.apply_closing);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = OmrConfig::load("/nonexistent/bubblemark.json").unwrap_err();
        assert!(matches!(err, BubblemarkError::Io(_)));
    }
}
