// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlay page writer: composes one searchable page. `printpdf` 0.8 embeds the
// scan at its full resolution and paints it full-bleed; `lopdf` then sets the
// exact page boxes and appends the text layer, every word an invisible,
// transformed run in a WinAnsi-encoded standard font. Each page is saved as
// its own one-page document and handed to the assembler.

use inklayer_core::OverlayFont;
use inklayer_core::error::{InklayerError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat, dictionary};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, instrument, warn};

use super::reader::{inherited_attribute, pdf_err};
use crate::font::encode_win_ansi;
use crate::geometry::PageGeometry;
use crate::image::source::PageImage;
use crate::transform::TransformDescriptor;

/// Millimetres per PDF point.
const MM_PER_PT: f64 = 25.4 / 72.0;

/// Resource name of the overlay font.
const FONT_RESOURCE: &[u8] = b"FOcr";

/// Text render mode 3: neither fill nor stroke.
const RENDER_INVISIBLE: i64 = 3;

/// Page boxes pinned to the exact page size.
const PAGE_BOXES: [&str; 3] = ["MediaBox", "CropBox", "TrimBox"];

/// A finished single-page PDF, ready for assembly.
#[derive(Debug, Clone)]
pub struct PageFragment {
    /// 0-based source page index.
    pub index: usize,
    /// Serialised single-page PDF.
    pub bytes: Vec<u8>,
    /// Invisible text runs emitted on the page.
    pub text_runs: usize,
    /// Words that could not be placed and were left out.
    pub skipped_words: usize,
}

/// Builds overlay pages.
pub struct OverlayPageBuilder {
    /// Font used for every text run.
    font: OverlayFont,
    /// Title metadata embedded in each fragment.
    title: String,
}

impl OverlayPageBuilder {
    pub fn new(font: OverlayFont) -> Self {
        Self {
            font,
            title: "Inklayer Searchable Page".into(),
        }
    }

    /// Set a title for the PDF metadata.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn font(&self) -> OverlayFont {
        self.font
    }

    /// Compose one page: the scan under an invisible text layer.
    ///
    /// `runs` are emitted in order, each followed by a single space so text
    /// extraction keeps word boundaries.
    #[instrument(skip(self, image, geometry, runs), fields(runs = runs.len()))]
    pub fn build_page(
        &self,
        index: usize,
        image: &PageImage,
        geometry: &PageGeometry,
        runs: &[TransformDescriptor],
    ) -> Result<PageFragment> {
        let scan = self.scan_page(index, image, geometry);
        let bytes = self.overlay_text(&scan, geometry, runs)?;

        debug!(
            index,
            page_width = geometry.page_width,
            page_height = geometry.page_height,
            bytes = bytes.len(),
            "Overlay page composed"
        );

        Ok(PageFragment {
            index,
            bytes,
            text_runs: runs.len(),
            skipped_words: 0,
        })
    }

    /// A one-page PDF holding only the scan, stretched over the page.
    fn scan_page(&self, index: usize, image: &PageImage, geometry: &PageGeometry) -> Vec<u8> {
        let raw = RawImage {
            pixels: RawImageData::U8(image.as_rgb().as_raw().clone()),
            width: image.width() as usize,
            height: image.height() as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new(&self.title);
        let xobject_id = doc.add_image(&raw);

        // At 72 dpi one pixel is one point, so scaling by the page/pixel
        // ratio stretches the scan over the whole page.
        let paint = Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                scale_x: Some((geometry.page_width / f64::from(image.width())) as f32),
                scale_y: Some((geometry.page_height / f64::from(image.height())) as f32),
                dpi: Some(72.0),
                rotate: None,
            },
        };
        let page = PdfPage::new(
            Mm((geometry.page_width * MM_PER_PT) as f32),
            Mm((geometry.page_height * MM_PER_PT) as f32),
            vec![paint],
        );
        doc.with_pages(vec![page]);

        // The scan is embedded as decoded, never resampled or re-encoded.
        let options = PdfSaveOptions {
            image_optimization: None,
            ..PdfSaveOptions::default()
        };
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = doc.save(&options, &mut warnings);
        if !warnings.is_empty() {
            warn!(index, warnings = warnings.len(), "PDF writer reported warnings");
        }
        bytes
    }

    /// Pin the page boxes to the exact page size and append the text layer.
    fn overlay_text(
        &self,
        scan: &[u8],
        geometry: &PageGeometry,
        runs: &[TransformDescriptor],
    ) -> Result<Vec<u8>> {
        let mut document = Document::load_mem(scan).map_err(pdf_err)?;
        let page_id = document
            .get_pages()
            .into_values()
            .next()
            .ok_or_else(|| InklayerError::PdfError("scan page was not written".into()))?;

        let mut resources = match inherited_attribute(&document, page_id, b"Resources") {
            Some(object) => document
                .dereference(object)
                .and_then(|(_, resolved)| resolved.as_dict())
                .map_err(pdf_err)?
                .clone(),
            None => Dictionary::new(),
        };
        let mut fonts = match resources.get(b"Font") {
            Ok(object) => document
                .dereference(object)
                .and_then(|(_, resolved)| resolved.as_dict())
                .map_err(pdf_err)?
                .clone(),
            Err(_) => Dictionary::new(),
        };
        let mut contents = match document.get_dictionary(page_id).map_err(pdf_err)?.get(b"Contents") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(other) => vec![other.clone()],
            Err(_) => Vec::new(),
        };

        let font_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => self.font.base_name(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(FONT_RESOURCE, Object::Reference(font_id));
        resources.set("Font", fonts);

        let text = Content {
            operations: text_operations(runs),
        }
        .encode()
        .map_err(pdf_err)?;
        contents.push(Object::Reference(
            document.add_object(Stream::new(Dictionary::new(), text)),
        ));

        let page_box = Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(geometry.page_width as f32),
            Object::Real(geometry.page_height as f32),
        ]);
        let page = document
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(pdf_err)?;
        page.set("Contents", contents);
        page.set("Resources", resources);
        for key in PAGE_BOXES {
            page.set(key, page_box.clone());
        }

        let mut bytes = Vec::new();
        document
            .save_to(&mut bytes)
            .map_err(|err| InklayerError::PdfError(format!("failed to serialise page: {err}")))?;
        Ok(bytes)
    }
}

impl Default for OverlayPageBuilder {
    fn default() -> Self {
        Self::new(OverlayFont::default())
    }
}

/// `BT`, invisible mode, then `Tf Tm Tz Tj` per run, then `ET`.
fn text_operations(runs: &[TransformDescriptor]) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(runs.len() * 4 + 3);
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tr", vec![Object::Integer(RENDER_INVISIBLE)]));

    for run in runs {
        ops.push(Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_RESOURCE.to_vec()),
                Object::Real(run.font_size as f32),
            ],
        ));
        ops.push(Operation::new(
            "Tm",
            run.text_matrix()
                .iter()
                .map(|value| Object::Real(*value as f32))
                .collect(),
        ));
        ops.push(Operation::new(
            "Tz",
            vec![Object::Real(run.horizontal_scale as f32)],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(
                encode_win_ansi(&format!("{} ", run.content)),
                StringFormat::Hexadecimal,
            )],
        ));
    }

    ops.push(Operation::new("ET", vec![]));
    ops
}
