// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet image decoding. Accepts encoded bytes (PNG, JPEG, ...), base64 text
// with or without a `data:` URL prefix, and file paths.

use base64::prelude::*;
use bubblemark_core::error::{BubblemarkError, Result};
use image::DynamicImage;
use tracing::{debug, info, instrument};

/// Decode an encoded image held in memory.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(data).map_err(|err| {
        BubblemarkError::invalid_image(format!("failed to decode sheet image: {}", err))
    })?;
    ensure_non_empty(&image)?;
    debug!(
        width = image.width(),
        height = image.height(),
        "Sheet image decoded from bytes"
    );
    Ok(image)
}

/// Decode a base64 payload such as `data:image/png;base64,iVBOR...`.
///
/// Everything up to the last comma is treated as a data-URL header and
/// dropped; surrounding whitespace and embedded line breaks are ignored.
#[instrument(skip(payload), fields(payload_len = payload.len()))]
pub fn decode_base64(payload: &str) -> Result<DynamicImage> {
    let bytes = base64_payload_bytes(payload)?;
    decode_image(&bytes)
}

/// Strip an optional data-URL header and decode the base64 body to the
/// encoded image bytes, without decoding the image itself.
pub fn base64_payload_bytes(payload: &str) -> Result<Vec<u8>> {
    let body = payload.rsplit(',').next().unwrap_or(payload);
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(BubblemarkError::invalid_image("empty base64 payload"));
    }
    BASE64_STANDARD.decode(compact.as_bytes()).map_err(|err| {
        BubblemarkError::invalid_image(format!("invalid base64 image payload: {}", err))
    })
}

/// Load a sheet image from a file path.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open_image(path: impl AsRef<std::path::Path>) -> Result<DynamicImage> {
    let image = image::open(path.as_ref()).map_err(|err| {
        BubblemarkError::invalid_image(format!(
            "failed to open {}: {}",
            path.as_ref().display(),
            err
        ))
    })?;
    ensure_non_empty(&image)?;
    info!(
        width = image.width(),
        height = image.height(),
        "Sheet image loaded"
    );
    Ok(image)
}

/// Reject images with no pixels.
pub(crate) fn ensure_non_empty(image: &DynamicImage) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(BubblemarkError::invalid_image(format!(
            "image has zero area ({}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}
