// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Inklayer searchable-PDF pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{InklayerError, Result};

/// Supported input document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputFormat {
    Pdf,
    Jpeg,
    Png,
    Tiff,
    Bmp,
}

impl InputFormat {
    /// MIME type string, sent to the OCR service as the format hint.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
        }
    }

    /// Infer the input format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// Infer the input format from a path's final extension.
    ///
    /// Fails with [`InklayerError::UnsupportedInputFormat`] when the path has
    /// no extension or an unrecognised one.
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| InklayerError::UnsupportedInputFormat(path.display().to_string()))
    }
}

/// Standard reference page sizes, in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaperSize {
    A4,
    A3,
    A5,
    #[default]
    Letter,
    Legal,
    Tabloid,
    Custom { width_pt: f64, height_pt: f64 },
}

impl PaperSize {
    /// Dimensions in points (width, height), portrait orientation.
    pub fn dimensions_pt(&self) -> (f64, f64) {
        match self {
            Self::A4 => (595.276, 841.89),
            Self::A3 => (841.89, 1190.551),
            Self::A5 => (419.528, 595.276),
            Self::Letter => (612.0, 792.0),
            Self::Legal => (612.0, 1008.0),
            Self::Tabloid => (792.0, 1224.0),
            Self::Custom {
                width_pt,
                height_pt,
            } => (*width_pt, *height_pt),
        }
    }

    /// The longer of the two dimensions, in points.
    pub fn long_side_pt(&self) -> f64 {
        let (w, h) = self.dimensions_pt();
        w.max(h)
    }
}

/// Standard PDF font used for the invisible text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayFont {
    #[default]
    TimesRoman,
    Helvetica,
    Courier,
}

impl OverlayFont {
    /// PostScript base font name.
    pub fn base_name(&self) -> &'static str {
        match self {
            Self::TimesRoman => "Times-Roman",
            Self::Helvetica => "Helvetica",
            Self::Courier => "Courier",
        }
    }
}

/// A point in OCR device units (y increases downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A recognised word and its oriented bounding quadrilateral.
///
/// Corner order is significant: top-left, top-right, bottom-right,
/// bottom-left of the (possibly rotated) box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub content: String,
    pub polygon: [Point; 4],
}

impl Word {
    pub fn new(content: impl Into<String>, polygon: [Point; 4]) -> Self {
        Self {
            content: content.into(),
            polygon,
        }
    }

    /// Build a word from an axis-aligned box given by its top-left corner and size.
    pub fn axis_aligned(content: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(
            content,
            [
                Point::new(x, y),
                Point::new(x + width, y),
                Point::new(x + width, y + height),
                Point::new(x, y + height),
            ],
        )
    }
}

/// One page of OCR output, in the service's native coordinate units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    /// 1-based page number as reported by the service.
    pub page_number: u32,
    pub width: f64,
    pub height: f64,
    /// Words in OCR reading order.
    pub words: Vec<Word>,
}

/// The whole-document OCR result, pages in source order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OcrDocument {
    /// Concatenated recognised text, as returned by the service.
    pub content: String,
    pub pages: Vec<OcrPage>,
}

impl OcrDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn word_count(&self) -> usize {
        self.pages.iter().map(|page| page.words.len()).sum()
    }
}

/// Classification of errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Network blip, timeout or throttled service. Safe to retry automatically.
    Transient,
    /// Bad credentials or a rejected document. Retrying cannot help.
    Permanent,
}
