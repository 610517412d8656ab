// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decoding encoded sheet images (raw bytes, base64, data URLs,
// files) into rasters the pipeline can read.

pub mod decode;

pub use decode::{base64_payload_bytes, decode_base64, decode_image, open_image};
