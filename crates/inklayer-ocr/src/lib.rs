// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// inklayer-ocr: the OCR collaborator for Inklayer.
//
// Defines the `OcrService` seam the pipeline depends on, and implements it
// against the Azure Document Intelligence "prebuilt-read" REST API: submit the
// document, poll the long-running operation, and convert the result into
// ordered per-page word lists with oriented polygons.

pub mod azure;
pub mod models;
pub mod retry;
pub mod service;

pub use azure::DocumentIntelligenceClient;
pub use retry::RetryConfig;
pub use service::{OcrService, analyze_with_timeout};
