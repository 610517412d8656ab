// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bubble candidate extraction — outer contours of the ink mask, filtered by
// area and bounding-box aspect ratio.

use bubblemark_core::OmrConfig;
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::point::Point;
use tracing::{debug, instrument};

use super::binarize::BinaryMask;

/// A connected ink region that may be a bubble.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobCandidate {
    /// Left edge of the bounding box.
    pub x: u32,
    /// Top edge of the bounding box.
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Area enclosed by the outer boundary (px²).
    pub area: f64,
    /// Outer boundary pixels in tracing order.
    pub outline: Vec<Point<u32>>,
}

impl BlobCandidate {
    /// Build a candidate from a traced boundary. `None` for an empty outline.
    pub fn from_outline(outline: Vec<Point<u32>>) -> Option<Self> {
        let min_x = outline.iter().map(|p| p.x).min()?;
        let max_x = outline.iter().map(|p| p.x).max()?;
        let min_y = outline.iter().map(|p| p.y).min()?;
        let max_y = outline.iter().map(|p| p.y).max()?;
        let area = shoelace_area(&outline);
        Some(Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
            area,
            outline,
        })
    }

    /// A candidate with a rectangular outline, for callers that already know
    /// where the bubbles are.
    pub fn from_rect(x: u32, y: u32, width: u32, height: u32) -> Self {
        let (x1, y1) = (x + width.max(1) - 1, y + height.max(1) - 1);
        let outline = vec![
            Point::new(x, y),
            Point::new(x1, y),
            Point::new(x1, y1),
            Point::new(x, y1),
        ];
        Self {
            x,
            y,
            width,
            height,
            area: shoelace_area(&outline),
            outline,
        }
    }

    /// Bounding-box width over height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Find bubble-shaped ink regions.
///
/// Only outermost boundaries are considered: holes and anything nested inside
/// a hole (a dot inside a ring, say) belong to their enclosing region. A
/// region survives when its boundary area exceeds `min_blob_area` and its
/// bounding box is roughly square. Order of the result is not meaningful.
#[instrument(skip_all, fields(width = mask.width(), height = mask.height()))]
pub fn extract_blobs(mask: &BinaryMask, config: &OmrConfig) -> Vec<BlobCandidate> {
    let contours: Vec<Contour<u32>> = find_contours(mask.as_gray());
    let traced = contours.len();

    let mut too_small = 0usize;
    let mut wrong_shape = 0usize;
    let mut blobs = Vec::new();

    for contour in contours {
        if contour.border_type != BorderType::Outer || contour.parent.is_some() {
            continue;
        }
        let Some(blob) = BlobCandidate::from_outline(contour.points) else {
            continue;
        };
        if blob.area <= config.min_blob_area {
            too_small += 1;
            continue;
        }
        let ratio = blob.aspect_ratio();
        if ratio < config.min_aspect_ratio || ratio > config.max_aspect_ratio {
            wrong_shape += 1;
            continue;
        }
        blobs.push(blob);
    }

    debug!(
        traced,
        kept = blobs.len(),
        too_small,
        wrong_shape,
        "Bubble candidates extracted"
    );
    blobs
}

/// Area of a closed polygon via the shoelace formula.
fn shoelace_area(points: &[Point<u32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += points[i].x as f64 * points[j].y as f64;
        twice_area -= points[j].x as f64 * points[i].y as f64;
    }
    twice_area.abs() / 2.0
}
