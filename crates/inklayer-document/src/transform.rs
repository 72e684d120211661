// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Word placement: for each recognised word, computes where the invisible
// text run goes, how large it is set, how it is rotated, and how much it is
// stretched horizontally so it covers exactly the visible ink.

use inklayer_core::Word;
use inklayer_core::error::{InklayerError, Result};

use crate::font::TextMeasure;
use crate::geometry::PageGeometry;

/// Placement of one invisible text run, in page-point space (y up).
#[derive(Debug, Clone, PartialEq)]
pub struct TransformDescriptor {
    /// Anchor x: the word box's bottom-left corner.
    pub x: f64,
    /// Anchor y: the word box's bottom-left corner.
    pub y: f64,
    /// Rotation in radians, measured in OCR space.
    pub rotation: f64,
    /// Font size in points; equals the box height on the page.
    pub font_size: f64,
    /// Horizontal scale in percent (100 = unscaled).
    pub horizontal_scale: f64,
    /// Target run width in points.
    pub desired_width: f64,
    pub content: String,
}

impl TransformDescriptor {
    /// Text matrix `[cos, -sin, sin, cos, x, y]` for this run.
    pub fn text_matrix(&self) -> [f64; 6] {
        let (sin, cos) = self.rotation.sin_cos();
        [cos, -sin, sin, cos, self.x, self.y]
    }
}

/// Computes [`TransformDescriptor`]s for the words of one page.
pub struct WordTransformCalculator<'a, M: TextMeasure + ?Sized> {
    geometry: PageGeometry,
    measure: &'a M,
}

impl<'a, M: TextMeasure + ?Sized> WordTransformCalculator<'a, M> {
    pub fn new(geometry: PageGeometry, measure: &'a M) -> Self {
        Self { geometry, measure }
    }

    /// Place one word.
    ///
    /// Fails with [`InklayerError::GeometryDegenerate`] for words that cannot
    /// be placed (non-finite or zero-area boxes, content with no measurable
    /// width); callers skip those words and keep the rest of the page.
    pub fn compute(&self, word: &Word) -> Result<TransformDescriptor> {
        let [p0, p1, p2, p3] = word.polygon;
        if word
            .polygon
            .iter()
            .any(|p| !(p.x.is_finite() && p.y.is_finite()))
        {
            return Err(InklayerError::GeometryDegenerate(format!(
                "word '{}' has a non-finite polygon",
                word.content
            )));
        }

        let scale = self.geometry.scale;
        let desired_width = p0.distance(&p1).max(p3.distance(&p2)) * scale;
        let desired_height = p1.distance(&p2).max(p0.distance(&p3)) * scale;
        if desired_width <= 0.0 || desired_height <= 0.0 {
            return Err(InklayerError::GeometryDegenerate(format!(
                "word '{}' has a zero-area box",
                word.content
            )));
        }

        let font_size = desired_height;
        let actual_width = self.measure.text_width(&word.content, font_size);
        if !(actual_width.is_finite() && actual_width > 0.0) {
            return Err(InklayerError::GeometryDegenerate(format!(
                "word '{}' measures {actual_width}pt wide",
                word.content
            )));
        }

        // Average of the top and bottom edge directions.
        let rotation = f64::atan2(
            ((p1.y - p0.y) + (p2.y - p3.y)) / 2.0,
            ((p1.x - p0.x) + (p2.x - p3.x)) / 2.0,
        );

        Ok(TransformDescriptor {
            x: p3.x * scale,
            y: self.geometry.page_height - p3.y * scale,
            rotation,
            font_size,
            horizontal_scale: desired_width / actual_width * 100.0,
            desired_width,
            content: word.content.clone(),
        })
    }
}
