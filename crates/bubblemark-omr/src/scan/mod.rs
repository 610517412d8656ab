// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — binarization, bubble extraction, grouping of bubbles
// into questions, and fill classification.

pub mod binarize;
pub mod blobs;
pub mod classify;
pub mod grouping;

pub use binarize::{BinaryMask, binarize};
pub use blobs::{BlobCandidate, extract_blobs};
pub use classify::{FillReading, QuestionReading, classify_question};
pub use grouping::{GroupedQuestions, Question, group_questions};
