// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bubblemark-omr — Optical mark recognition for multiple-choice answer sheets.
//
// Provides sheet decoding (bytes, base64, files), the detection pipeline
// (binarization, bubble extraction, question grouping, fill classification),
// grading against an answer key, and generation of blank or pre-marked sheets
// as images or printable PDFs.

pub mod detector;
pub mod image;
pub mod pdf;
pub mod scan;
pub mod score;
pub mod template;

// Re-export the primary entry points so callers can use
// `bubblemark_omr::SheetDetector` etc.
pub use detector::{SheetDetector, SheetReport};
pub use pdf::writer::PdfWriter;
pub use score::score;
pub use template::render::{RenderedSheet, SheetTemplate};
