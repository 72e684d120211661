// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// inklayer-document: the overlay compositor for Inklayer.
//
// Resolves each page's physical size and OCR scale, places every recognised
// word as an invisible, rotated and horizontally stretched text run over the
// scan, and assembles the pages into one searchable PDF. Also provides the page
// image source for raster, multi-page TIFF and scanner PDF inputs.

pub mod font;
pub mod geometry;
pub mod image;
pub mod pdf;
pub mod searchable;
pub mod transform;

// Re-export the primary types so callers can use `inklayer_document::SearchablePdfComposer` etc.
pub use font::TextMeasure;
pub use geometry::{PageGeometry, PageGeometryResolver, PageSize};
pub use image::source::{PageImage, load_page_images};
pub use pdf::assembler::{AssemblyReport, DocumentAssembler};
pub use pdf::reader::PdfReader;
pub use pdf::writer::{OverlayPageBuilder, PageFragment};
pub use searchable::SearchablePdfComposer;
pub use transform::{TransformDescriptor, WordTransformCalculator};
