// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fill classification — decides which bubble of a question, if any, is marked.
//
// The fill metric is the foreground ratio inside each bubble's bounding box
// after trimming `fill_padding` from every side, which keeps the printed
// outline out of the count. The densest bubble wins, and is accepted only when
// it holds at least `min_fill_pixels` ink pixels and `min_fill_ratio` coverage.

use bubblemark_core::{Alternative, OmrConfig, QuestionNumber};
use serde::Serialize;
use tracing::{debug, trace};

use super::binarize::BinaryMask;
use super::blobs::BlobCandidate;
use super::grouping::Question;

/// Fill measurement of one bubble.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FillReading {
    pub alternative: Alternative,
    /// Foreground pixels inside the trimmed box.
    pub pixels: u32,
    /// Pixel count of the trimmed box (at least 1).
    pub area: u32,
    /// `pixels / area`.
    pub ratio: f64,
}

/// Readings for every bubble of a question and the accepted answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionReading {
    pub number: QuestionNumber,
    pub fills: Vec<FillReading>,
    pub selected: Option<Alternative>,
}

/// Measure the trimmed-interior fill of one bubble.
pub fn measure_fill(
    mask: &BinaryMask,
    blob: &BlobCandidate,
    alternative: Alternative,
    padding: f64,
) -> FillReading {
    let (x, y) = (blob.x as f64, blob.y as f64);
    let (w, h) = (blob.width as f64, blob.height as f64);

    let sx = (x + w * padding) as u32;
    let sy = (y + h * padding) as u32;
    let sw = (w * (1.0 - 2.0 * padding)) as u32;
    let sh = (h * (1.0 - 2.0 * padding)) as u32;
    let ex = (sx + sw).min(mask.width());
    let ey = (sy + sh).min(mask.height());

    let (pixels, area) = if sx >= ex || sy >= ey {
        (0, 1)
    } else {
        (
            mask.count_foreground(sx, sy, ex, ey),
            (ex - sx) * (ey - sy),
        )
    };

    FillReading {
        alternative,
        pixels,
        area,
        ratio: pixels as f64 / area as f64,
    }
}

/// Pick the densest reading; on an exact tie the earliest alternative wins.
pub fn densest(fills: &[FillReading]) -> Option<&FillReading> {
    fills.iter().fold(None, |best, fill| match best {
        Some(current) if fill.ratio <= current.ratio => Some(current),
        _ => Some(fill),
    })
}

/// Classify one question against the ink mask.
pub fn classify_question(
    mask: &BinaryMask,
    question: &Question,
    config: &OmrConfig,
) -> QuestionReading {
    let fills: Vec<FillReading> = question
        .alternatives
        .iter()
        .enumerate()
        .filter_map(|(index, blob)| {
            Alternative::from_index(index)
                .map(|alt| measure_fill(mask, blob, alt, config.fill_padding))
        })
        .collect();

    for fill in &fills {
        trace!(
            question = question.number,
            alternative = %fill.alternative,
            pixels = fill.pixels,
            area = fill.area,
            ratio = fill.ratio,
            "Bubble fill measured"
        );
    }

    let selected = densest(&fills).and_then(|best| {
        let accepted =
            best.pixels >= config.min_fill_pixels && best.ratio >= config.min_fill_ratio;
        debug!(
            question = question.number,
            best = %best.alternative,
            pixels = best.pixels,
            ratio = best.ratio,
            accepted,
            "Question classified"
        );
        accepted.then_some(best.alternative)
    });

    QuestionReading {
        number: question.number,
        fills,
        selected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    const SIZE: u32 = 40;
    const PITCH: u32 = 60;

    /// Five 40x40 bubbles in a row; `coverage[i]` of bubble `i`'s interior
    /// rows are filled, top down.
    fn question_mask(coverage: [f64; 5]) -> (BinaryMask, Question) {
        let mut gray = GrayImage::new(PITCH * 5 + 20, 80);
        let mut alternatives = Vec::new();
        for (i, &fraction) in coverage.iter().enumerate() {
            let x = 10 + i as u32 * PITCH;
            let y = 20;
            // Interior after 20% trim is [x+8, x+32) x [y+8, y+32).
            let rows = (24.0 * fraction).round() as u32;
            for yy in y + 8..y + 8 + rows {
                for xx in x + 8..x + 32 {
                    gray.put_pixel(xx, yy, Luma([255u8]));
                }
            }
            alternatives.push(BlobCandidate::from_rect(x, y, SIZE, SIZE));
        }
        (
            BinaryMask::from_gray(gray, 0),
            Question {
                number: 1,
                alternatives,
            },
        )
    }

    #[test]
    fn interior_excludes_outline() {
        let mut gray = GrayImage::new(60, 60);
        // Hollow square outline only.
        for i in 10..50 {
            for t in 0..3 {
                gray.put_pixel(i, 10 + t, Luma([255u8]));
                gray.put_pixel(i, 47 + t, Luma([255u8]));
                gray.put_pixel(10 + t, i, Luma([255u8]));
                gray.put_pixel(47 + t, i, Luma([255u8]));
            }
        }
        let mask = BinaryMask::from_gray(gray, 0);
        let blob = BlobCandidate::from_rect(10, 10, 40, 40);
        let reading = measure_fill(&mask, &blob, Alternative::A, 0.2);
        assert_eq!(reading.pixels, 0);
        assert_eq!(reading.area, 24 * 24);
    }

    #[test]
    fn selects_clearly_filled_bubble() {
        let (mask, question) = question_mask([0.0, 0.0, 1.0, 0.0, 0.0]);
        let reading = classify_question(&mask, &question, &OmrConfig::default());
        assert_eq!(reading.selected, Some(Alternative::C));
        assert_eq!(reading.fills.len(), 5);
        assert!((reading.fills[2].ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn faint_mark_below_ratio_is_unanswered() {
        let (mask, question) = question_mask([0.0, 0.25, 0.0, 0.0, 0.0]);
        let reading = classify_question(&mask, &question, &OmrConfig::default());
        assert_eq!(reading.selected, None);
    }

    #[test]
    fn ratio_threshold_is_inclusive() {
        let (mask, question) = question_mask([0.0, 0.0, 0.0, 0.5, 0.0]);
        let reading = classify_question(&mask, &question, &OmrConfig::default());
        assert_eq!(reading.fills[3].pixels, 288);
        assert_eq!(reading.selected, Some(Alternative::D));
    }

    #[test]
    fn small_bubble_needs_minimum_ink() {
        // 10x10 interior fully inked: ratio 1.0 but only 36 pixels.
        let mut gray = GrayImage::new(200, 40);
        let mut alternatives = Vec::new();
        for i in 0..5u32 {
            alternatives.push(BlobCandidate::from_rect(5 + i * 30, 5, 10, 10));
        }
        for y in 7..13 {
            for x in 7..13 {
                gray.put_pixel(x, y, Luma([255u8]));
            }
        }
        let mask = BinaryMask::from_gray(gray, 0);
        let question = Question {
            number: 4,
            alternatives,
        };
        let reading = classify_question(&mask, &question, &OmrConfig::default());
        assert_eq!(reading.fills[0].pixels, 36);
        assert_eq!(reading.selected, None);

        let lenient = OmrConfig {
            min_fill_pixels: 30,
            ..Default::default()
        };
        assert_eq!(
            classify_question(&mask, &question, &lenient).selected,
            Some(Alternative::A)
        );
    }

    #[test]
    fn exact_tie_prefers_earliest_letter() {
        let (mask, question) = question_mask([0.0, 1.0, 0.0, 1.0, 0.0]);
        let reading = classify_question(&mask, &question, &OmrConfig::default());
        assert_eq!(reading.selected, Some(Alternative::B));
    }

    #[test]
    fn densest_of_empty_is_none() {
        assert!(densest(&[]).is_none());
    }

    #[test]
    fn degenerate_box_counts_as_empty() {
        let gray = GrayImage::from_pixel(10, 10, Luma([255u8]));
        let mask = BinaryMask::from_gray(gray, 0);
        let blob = BlobCandidate::from_rect(2, 2, 1, 1);
        let reading = measure_fill(&mask, &blob, Alternative::A, 0.2);
        assert_eq!((reading.pixels, reading.area), (0, 1));
    }
}
