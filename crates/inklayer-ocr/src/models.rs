// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire models for the Document Intelligence analyze operation, and their
// conversion into the shared OCR types.

use inklayer_core::error::{InklayerError, Result};
use inklayer_core::{OcrDocument, OcrPage, Point, Word};
use serde::Deserialize;

/// Body of `GET {Operation-Location}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOperation {
    pub status: OperationStatus,
    #[serde(default)]
    pub analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl OperationStatus {
    /// Whether polling should stop.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub pages: Vec<AnalyzedPage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedPage {
    pub page_number: u32,
    pub width: f64,
    pub height: f64,
    /// `pixel` for images, `inch` for PDFs.
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub words: Vec<AnalyzedWord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzedWord {
    pub content: String,
    /// Flat `[x0, y0, x1, y1, x2, y2, x3, y3]`, clockwise from top-left.
    #[serde(default)]
    pub polygon: Vec<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Service error object, both in failed operations and in HTTP error bodies.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// `{"error": {...}}` envelope of a non-2xx response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ServiceError,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.code.is_empty(), self.message.is_empty()) {
            (false, false) => write!(f, "{}: {}", self.code, self.message),
            (false, true) => f.write_str(&self.code),
            _ => f.write_str(&self.message),
        }
    }
}

/// Human-readable summary of an HTTP error body, falling back to the raw text.
pub fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(envelope) => envelope.error.to_string(),
        Err(_) => body.trim().chars().take(200).collect(),
    }
}

impl TryFrom<AnalyzedWord> for Word {
    type Error = InklayerError;

    fn try_from(word: AnalyzedWord) -> Result<Self> {
        let coords: [f64; 8] = word.polygon.as_slice().try_into().map_err(|_| {
            InklayerError::OcrService(format!(
                "word '{}' has a polygon of {} coordinates, expected 8",
                word.content,
                word.polygon.len()
            ))
        })?;
        let [x0, y0, x1, y1, x2, y2, x3, y3] = coords;
        Ok(Word::new(
            word.content,
            [
                Point::new(x0, y0),
                Point::new(x1, y1),
                Point::new(x2, y2),
                Point::new(x3, y3),
            ],
        ))
    }
}

impl TryFrom<AnalyzeResult> for OcrDocument {
    type Error = InklayerError;

    /// Pages and words keep the service's order.
    fn try_from(result: AnalyzeResult) -> Result<Self> {
        let pages = result
            .pages
            .into_iter()
            .map(|page| {
                let words = page
                    .words
                    .into_iter()
                    .map(Word::try_from)
                    .collect::<Result<Vec<_>>>()?;
                Ok(OcrPage {
                    page_number: page.page_number,
                    width: page.width,
                    height: page.height,
                    words,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(OcrDocument {
            content: result.content,
            pages,
        })
    }
}
