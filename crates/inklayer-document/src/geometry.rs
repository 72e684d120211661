// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page geometry: derives a page's physical size in points from its raster
// dimensions, and the factor that maps OCR device units onto that page.

use inklayer_core::error::{InklayerError, Result};
use inklayer_core::{OcrPage, PaperSize};
use tracing::debug;

/// Physical size of one output page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    /// Pixels per point: the image's selected dimension over the reference long side.
    pub image_scale: f64,
    /// Page width in points.
    pub width: f64,
    /// Page height in points.
    pub height: f64,
}

/// Everything the word placement math needs to know about a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub image_scale: f64,
    pub page_width: f64,
    pub page_height: f64,
    /// Converts OCR device units directly into page points.
    pub scale: f64,
}

/// Resolves page sizes against a fixed reference page.
///
/// Every page is normalised by the reference page's longer side, whatever the
/// page's own orientation.
#[derive(Debug, Clone, Copy)]
pub struct PageGeometryResolver {
    long_side: f64,
}

impl PageGeometryResolver {
    pub fn new(reference: PaperSize) -> Self {
        Self {
            long_side: reference.long_side_pt(),
        }
    }

    /// The normalisation length in points.
    pub fn long_side(&self) -> f64 {
        self.long_side
    }

    /// Target page size for an image of `width` x `height` pixels.
    pub fn page_size(&self, width: u32, height: u32) -> Result<PageSize> {
        if width == 0 || height == 0 {
            return Err(InklayerError::GeometryDegenerate(format!(
                "page image is {width}x{height} pixels"
            )));
        }
        if !(self.long_side.is_finite() && self.long_side > 0.0) {
            return Err(InklayerError::GeometryDegenerate(format!(
                "reference page long side is {}pt",
                self.long_side
            )));
        }

        let (w, h) = (f64::from(width), f64::from(height));
        let image_scale = if h > w {
            h.max(w) / self.long_side
        } else {
            w / self.long_side
        };

        Ok(PageSize {
            image_scale,
            width: w / image_scale,
            height: h / image_scale,
        })
    }

    /// Full page geometry for an image and the OCR page reported for it.
    pub fn resolve(&self, width: u32, height: u32, ocr_page: &OcrPage) -> Result<PageGeometry> {
        self.resolve_dimensions(width, height, ocr_page.width, ocr_page.height)
    }

    /// Like [`resolve`](Self::resolve), with the OCR page size given directly.
    pub fn resolve_dimensions(
        &self,
        width: u32,
        height: u32,
        ocr_width: f64,
        ocr_height: f64,
    ) -> Result<PageGeometry> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(ocr_width) || !valid(ocr_height) {
            return Err(InklayerError::GeometryDegenerate(format!(
                "OCR page reports size {ocr_width}x{ocr_height}"
            )));
        }

        let size = self.page_size(width, height)?;
        let scale = (size.width / ocr_width + size.height / ocr_height) / 2.0;

        debug!(
            image_scale = size.image_scale,
            page_width = size.width,
            page_height = size.height,
            scale,
            "Page geometry resolved"
        );

        Ok(PageGeometry {
            image_scale: size.image_scale,
            page_width: size.width,
            page_height: size.height,
            scale,
        })
    }
}

impl Default for PageGeometryResolver {
    fn default() -> Self {
        Self::new(PaperSize::Letter)
    }
}
