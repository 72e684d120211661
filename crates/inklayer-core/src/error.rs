// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Inklayer.

use thiserror::Error;

/// Top-level error type for all Inklayer operations.
#[derive(Debug, Error)]
pub enum InklayerError {
    // -- Input / startup --
    #[error("unsupported input format: {0}")]
    UnsupportedInputFormat(String),

    #[error("failed to load settings: {0}")]
    ConfigLoad(String),

    // -- OCR collaborator --
    #[error("OCR service error: {0}")]
    OcrService(String),

    // -- Overlay composition --
    #[error("page count mismatch: {images} page image(s) but {ocr_pages} OCR page(s)")]
    PageCountMismatch { images: usize, ocr_pages: usize },

    #[error("degenerate geometry: {0}")]
    GeometryDegenerate(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, InklayerError>;
