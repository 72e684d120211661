// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Searchable PDF composition: pairs every page image with its OCR page, places
// each word, builds the overlay pages in parallel, and assembles them in order.

use std::path::Path;

use inklayer_core::config::OverlaySettings;
use inklayer_core::error::{InklayerError, Result};
use inklayer_core::{OcrDocument, OcrPage, OverlayFont};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::geometry::PageGeometryResolver;
use crate::image::source::PageImage;
use crate::pdf::assembler::{AssemblyReport, DocumentAssembler};
use crate::pdf::writer::{OverlayPageBuilder, PageFragment};
use crate::transform::{TransformDescriptor, WordTransformCalculator};

/// Turns page images plus OCR output into one searchable PDF.
pub struct SearchablePdfComposer {
    resolver: PageGeometryResolver,
    builder: OverlayPageBuilder,
}

impl SearchablePdfComposer {
    pub fn new(settings: &OverlaySettings) -> Self {
        Self {
            resolver: PageGeometryResolver::new(settings.reference_page),
            builder: OverlayPageBuilder::new(settings.font),
        }
    }

    /// Set the title embedded in each page's metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.builder.set_title(title);
        self
    }

    pub fn font(&self) -> OverlayFont {
        self.builder.font()
    }

    /// Compose one page. Words that cannot be placed are skipped and counted;
    /// a page whose own geometry is degenerate fails.
    #[instrument(skip(self, image, ocr_page), fields(words = ocr_page.words.len()))]
    pub fn compose_page(
        &self,
        index: usize,
        image: &PageImage,
        ocr_page: &OcrPage,
    ) -> Result<PageFragment> {
        let geometry = self.resolver.resolve(image.width(), image.height(), ocr_page)?;
        let font = self.builder.font();
        let calculator = WordTransformCalculator::new(geometry, &font);

        let mut runs: Vec<TransformDescriptor> = Vec::with_capacity(ocr_page.words.len());
        let mut skipped = 0;
        for word in &ocr_page.words {
            match calculator.compute(word) {
                Ok(run) => runs.push(run),
                Err(err) => {
                    warn!(page = index, word = %word.content, %err, "Skipping word");
                    skipped += 1;
                }
            }
        }

        let mut fragment = self.builder.build_page(index, image, &geometry, &runs)?;
        fragment.skipped_words = skipped;
        debug!(page = index, placed = runs.len(), skipped, "Page composed");
        Ok(fragment)
    }

    /// Compose every page and return the complete, not yet serialised document.
    #[instrument(skip_all, fields(images = images.len(), ocr_pages = ocr.pages.len()))]
    pub fn compose(&self, images: &[PageImage], ocr: &OcrDocument) -> Result<DocumentAssembler> {
        if images.len() != ocr.pages.len() {
            return Err(InklayerError::PageCountMismatch {
                images: images.len(),
                ocr_pages: ocr.pages.len(),
            });
        }
        if images.is_empty() {
            return Err(InklayerError::PdfError("input has no pages".into()));
        }

        info!(
            pages = images.len(),
            words = ocr.word_count(),
            font = self.font().base_name(),
            "Creating searchable PDF"
        );

        let fragments = images
            .par_iter()
            .zip(ocr.pages.par_iter())
            .enumerate()
            .map(|(index, (image, page))| self.compose_page(index, image, page))
            .collect::<Result<Vec<_>>>()?;

        let mut assembler = DocumentAssembler::new(images.len());
        for fragment in fragments {
            assembler.push(fragment)?;
        }
        Ok(assembler)
    }

    /// Compose and serialise to bytes.
    pub fn compose_to_bytes(
        &self,
        images: &[PageImage],
        ocr: &OcrDocument,
    ) -> Result<(Vec<u8>, AssemblyReport)> {
        self.compose(images, ocr)?.into_bytes()
    }

    /// Compose and write the document to `path`.
    pub fn write(
        &self,
        images: &[PageImage],
        ocr: &OcrDocument,
        path: impl AsRef<Path>,
    ) -> Result<AssemblyReport> {
        let report = self.compose(images, ocr)?.write_to_path(path)?;
        if report.skipped_words > 0 {
            warn!(skipped = report.skipped_words, "Some words could not be placed");
        }
        Ok(report)
    }
}

impl Default for SearchablePdfComposer {
    fn default() -> Self {
        Self::new(&OverlaySettings::default())
    }
}
