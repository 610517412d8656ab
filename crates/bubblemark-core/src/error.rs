// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bubblemark.

use thiserror::Error;

/// Top-level error type for all Bubblemark operations.
///
/// A sheet with no legible marks is not an error: detection reports every
/// question as unanswered instead.
#[derive(Debug, Error)]
pub enum BubblemarkError {
    // -- Input errors --
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // -- Output errors --
    #[error("sheet rendering failed: {0}")]
    Render(String),

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BubblemarkError {
    /// Shorthand for [`BubblemarkError::InvalidInput`].
    pub fn invalid_input(detail: impl Into<String>) -> Self {
        Self::InvalidInput(detail.into())
    }

    /// Shorthand for [`BubblemarkError::InvalidImage`].
    pub fn invalid_image(detail: impl Into<String>) -> Self {
        Self::InvalidImage(detail.into())
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BubblemarkError>;
