// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Template module — raster rendering of blank and pre-marked answer sheets.

pub mod render;

pub use render::{RenderedSheet, SheetLayout, SheetTemplate};
