// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binarization — grayscale, Gaussian blur, inverse Otsu threshold and an
// optional closing pass. Ink becomes foreground (255), paper background (0).

use bubblemark_core::OmrConfig;
use bubblemark_core::error::Result;
use image::{DynamicImage, GrayImage};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology;
use tracing::{debug, instrument};

use crate::image::decode::ensure_non_empty;

/// Foreground value in a [`BinaryMask`].
pub const FOREGROUND: u8 = 255;

/// Ink mask of a sheet, same dimensions as the source image.
#[derive(Debug, Clone)]
pub struct BinaryMask {
    mask: GrayImage,
    threshold: u8,
}

impl BinaryMask {
    /// Wrap an existing 0/255 mask. Any non-zero pixel counts as foreground.
    pub fn from_gray(mask: GrayImage, threshold: u8) -> Self {
        Self { mask, threshold }
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    /// Otsu level the mask was cut at.
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Borrow the underlying 0/255 image.
    pub fn as_gray(&self) -> &GrayImage {
        &self.mask
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.mask.get_pixel(x, y).0[0] != 0
    }

    /// Count foreground pixels in the half-open rectangle
    /// `[x0, x1) x [y0, y1)`, clamped to the mask.
    pub fn count_foreground(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> u32 {
        let x1 = x1.min(self.width());
        let y1 = y1.min(self.height());
        let mut count = 0;
        for y in y0..y1 {
            for x in x0..x1 {
                if self.is_foreground(x, y) {
                    count += 1;
                }
            }
        }
        count
    }
}

/// Turn a sheet photo into an ink mask.
///
/// 1. Luma conversion
/// 2. Gaussian blur (`config.blur_sigma`)
/// 3. Otsu level on the blurred histogram, inverse threshold
/// 4. Optional 3x3 closing to fill pinholes in pencil marks
///
/// The caller's image is never modified.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn binarize(image: &DynamicImage, config: &OmrConfig) -> Result<BinaryMask> {
    ensure_non_empty(image)?;

    let gray = image.to_luma8();
    let blurred = gaussian_blur_f32(&gray, config.blur_sigma);
    // Levels at or below the Otsu cut are ink. A uniform image cuts at 0.
    let level = otsu_level(&blurred);
    debug!(level, "Otsu threshold computed");

    let mut mask = threshold(&blurred, level, ThresholdType::BinaryInverted);
    if config.apply_closing {
        mask = morphology::close(&mask, Norm::LInf, 1);
        debug!("Applied 3x3 closing");
    }

    Ok(BinaryMask {
        mask,
        threshold: level,
    })
}
