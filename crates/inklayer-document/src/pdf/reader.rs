// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open existing PDFs with `lopdf`, pull the embedded scan out of
// each page, and inspect page boxes and content streams.

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use inklayer_core::error::{InklayerError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument};

use crate::image::source::PageImage;

/// Inherited page attributes are looked up at most this many levels up the page tree.
const MAX_TREE_DEPTH: usize = 32;

/// Reads existing PDF files.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            InklayerError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            InklayerError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// Width and height in points of a page's MediaBox (1-indexed page).
    pub fn media_box(&self, page_number: u32) -> Result<(f64, f64)> {
        let page_id = self.page_id(page_number)?;
        let media_box = inherited_attribute(&self.document, page_id, b"MediaBox")
            .ok_or_else(|| {
                InklayerError::PdfError(format!("page {page_number} has no MediaBox"))
            })?;
        let (_, media_box) = self.document.dereference(media_box).map_err(pdf_err)?;
        let coords = media_box
            .as_array()
            .map_err(pdf_err)?
            .iter()
            .map(|value| value.as_float().map(f64::from))
            .collect::<std::result::Result<Vec<f64>, _>>()
            .map_err(pdf_err)?;

        match coords.as_slice() {
            [x0, y0, x1, y1] => Ok((x1 - x0, y1 - y0)),
            _ => Err(InklayerError::PdfError(format!(
                "page {page_number} MediaBox has {} entries",
                coords.len()
            ))),
        }
    }

    /// Decoded content-stream operations of a page (1-indexed page).
    pub fn page_operations(&self, page_number: u32) -> Result<Vec<Operation>> {
        let page_id = self.page_id(page_number)?;
        let bytes = self.document.get_page_content(page_id).map_err(pdf_err)?;
        let content = Content::decode(&bytes).map_err(pdf_err)?;
        Ok(content.operations)
    }

    // -- Extraction -----------------------------------------------------------

    /// The largest embedded raster image of every page, in page order.
    ///
    /// This covers PDFs produced by scanners, where each page is one image.
    /// Pages with no embedded raster are an error; vector content is not
    /// rasterised.
    #[instrument(skip(self))]
    pub fn page_images(&self) -> Result<Vec<PageImage>> {
        let pages = self.document.get_pages();
        let mut images = Vec::with_capacity(pages.len());

        for (page_number, page_id) in pages {
            let stream = self.largest_image_stream(page_id)?.ok_or_else(|| {
                InklayerError::ImageError(format!(
                    "page {page_number} has no embedded raster image; \
                     rasterising vector PDF content is not supported"
                ))
            })?;
            let image = decode_image_stream(&self.document, stream).map_err(|err| match err {
                InklayerError::ImageError(detail) => {
                    InklayerError::ImageError(format!("page {page_number}: {detail}"))
                }
                other => other,
            })?;
            debug!(page_number, width = image.width(), height = image.height(), "Embedded scan extracted");
            images.push(image);
        }

        Ok(images)
    }

    // -- Helpers --------------------------------------------------------------

    fn page_id(&self, page_number: u32) -> Result<ObjectId> {
        let pages = self.document.get_pages();
        pages.get(&page_number).copied().ok_or_else(|| {
            InklayerError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })
    }

    fn resolve_dict<'a>(&'a self, object: &'a Object) -> Result<&'a Dictionary> {
        let (_, resolved) = self.document.dereference(object).map_err(pdf_err)?;
        resolved.as_dict().map_err(pdf_err)
    }

    fn largest_image_stream(&self, page_id: ObjectId) -> Result<Option<&Stream>> {
        let Some(resources) = inherited_attribute(&self.document, page_id, b"Resources") else {
            return Ok(None);
        };
        let resources = self.resolve_dict(resources)?;
        let Ok(xobjects) = resources.get(b"XObject") else {
            return Ok(None);
        };
        let xobjects = self.resolve_dict(xobjects)?;

        let mut best: Option<(i64, &Stream)> = None;
        for (_name, value) in xobjects.iter() {
            let Ok((_, Object::Stream(stream))) = self.document.dereference(value) else {
                continue;
            };
            let is_image = stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .map(|name| name == b"Image")
                .unwrap_or(false);
            if !is_image {
                continue;
            }
            let side = |key: &[u8]| dict_integer(&stream.dict, key).filter(|v| *v > 0);
            let area = match (side(b"Width"), side(b"Height")) {
                (Some(width), Some(height)) => width.saturating_mul(height),
                _ => 0,
            };
            if best.is_none_or(|(best_area, _)| area > best_area) {
                best = Some((area, stream));
            }
        }

        Ok(best.map(|(_, stream)| stream))
    }
}

pub(crate) fn pdf_err(err: lopdf::Error) -> InklayerError {
    InklayerError::PdfError(err.to_string())
}

/// A page attribute, taken from the nearest ancestor when the page itself
/// does not set it.
pub(crate) fn inherited_attribute<'a>(
    document: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = document.get_dictionary(parent).ok()?;
    }
    None
}

fn dict_integer(dict: &Dictionary, key: &[u8]) -> Option<i64> {
    dict.get(key).and_then(Object::as_i64).ok()
}

/// Filter names of a stream, in application order.
fn stream_filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Number of colour components of an image XObject's colour space.
fn color_components(document: &Document, dict: &Dictionary) -> Result<u32> {
    let space = dict
        .get(b"ColorSpace")
        .map_err(|_| InklayerError::ImageError("image has no ColorSpace".into()))?;
    let (_, space) = document.dereference(space).map_err(pdf_err)?;

    match space {
        Object::Name(name) if name == b"DeviceGray" => Ok(1),
        Object::Name(name) if name == b"DeviceRGB" => Ok(3),
        Object::Array(items) if items.first().and_then(|n| n.as_name().ok()) == Some(b"ICCBased".as_slice()) => {
            let profile = items
                .get(1)
                .ok_or_else(|| InklayerError::ImageError("ICCBased colour space without profile".into()))?;
            let (_, profile) = document.dereference(profile).map_err(pdf_err)?;
            let components = profile
                .as_stream()
                .ok()
                .and_then(|stream| dict_integer(&stream.dict, b"N"))
                .unwrap_or(0);
            match components {
                1 => Ok(1),
                3 => Ok(3),
                n => Err(InklayerError::ImageError(format!(
                    "unsupported ICC colour space with {n} components"
                ))),
            }
        }
        other => Err(InklayerError::ImageError(format!(
            "unsupported colour space {other:?}"
        ))),
    }
}

fn decode_image_stream(document: &Document, stream: &Stream) -> Result<PageImage> {
    let filters = stream_filters(&stream.dict);
    let width = dict_integer(&stream.dict, b"Width").unwrap_or(0);
    let height = dict_integer(&stream.dict, b"Height").unwrap_or(0);
    let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(InklayerError::ImageError(format!(
            "invalid image size {width}x{height}"
        )));
    };

    let filter_names: Vec<&[u8]> = filters.iter().map(Vec::as_slice).collect();
    match filter_names.as_slice() {
        [b"DCTDecode"] => {
            let image = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
                .map_err(|err| InklayerError::ImageError(format!("embedded JPEG: {err}")))?;
            Ok(PageImage::from_dynamic(image))
        }
        [] | [b"FlateDecode"] => {
            let bits = dict_integer(&stream.dict, b"BitsPerComponent").unwrap_or(8);
            if bits != 8 {
                return Err(InklayerError::ImageError(format!(
                    "unsupported {bits}-bit embedded image"
                )));
            }
            let raw = if filters.is_empty() {
                stream.content.clone()
            } else {
                stream.decompressed_content().map_err(pdf_err)?
            };
            let mismatch = || {
                InklayerError::ImageError(format!(
                    "embedded image data does not match {width}x{height}"
                ))
            };
            let image = match color_components(document, &stream.dict)? {
                1 => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, raw).ok_or_else(mismatch)?),
                _ => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, raw).ok_or_else(mismatch)?),
            };
            Ok(PageImage::from_dynamic(image))
        }
        other => Err(InklayerError::ImageError(format!(
            "unsupported image filter chain {:?}",
            other
                .iter()
                .map(|name| String::from_utf8_lossy(name).into_owned())
                .collect::<Vec<_>>()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use lopdf::dictionary;
    use std::io::Cursor;

    fn rect(width: i64, height: i64) -> Object {
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width),
            Object::Integer(height),
        ])
    }

    /// A two-page scanner-style PDF: page 1 holds a JPEG scan, page 2 a raw
    /// grayscale scan plus a small thumbnail that must be ignored.
    fn scanner_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut jpeg = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 9, Rgb([250, 250, 250])))
            .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();
        let jpeg_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 12_i64,
                "Height" => 9_i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "DCTDecode",
            },
            jpeg,
        ));

        let gray_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 6_i64,
                "Height" => 4_i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8_i64,
            },
            vec![128u8; 6 * 4],
        ));
        let thumb_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2_i64,
                "Height" => 2_i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8_i64,
            },
            vec![0u8; 4],
        ));

        let first = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => jpeg_id },
            },
        });
        let second = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => rect(300, 200),
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Thumb" => thumb_id, "Scan" => gray_id },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(first), Object::Reference(second)],
                "Count" => 2_i64,
                "MediaBox" => rect(612, 792),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn extracts_one_scan_per_page() {
        let reader = PdfReader::from_bytes(&scanner_pdf()).unwrap();
        assert_eq!(reader.page_count(), 2);

        let images = reader.page_images().unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!((images[0].width(), images[0].height()), (12, 9));
        assert_eq!((images[1].width(), images[1].height()), (6, 4));
        assert_eq!(images[1].as_rgb().get_pixel(0, 0).0, [128, 128, 128]);
    }

    #[test]
    fn media_box_is_inherited_or_own() {
        let reader = PdfReader::from_bytes(&scanner_pdf()).unwrap();
        assert_eq!(reader.media_box(1).unwrap(), (612.0, 792.0));
        assert_eq!(reader.media_box(2).unwrap(), (300.0, 200.0));
        assert!(reader.media_box(3).is_err());
    }

    #[test]
    fn page_without_image_is_an_error() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => rect(612, 792),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page)],
                "Count" => 1_i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let reader = PdfReader::from_bytes(&bytes).unwrap();
        assert!(matches!(
            reader.page_images(),
            Err(InklayerError::ImageError(_))
        ));
    }

    fn gray_image(width: i64, height: i64, data: Vec<u8>) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8_i64,
            },
            data,
        )
    }

    /// One page whose resources hold `images`, in order.
    fn single_page_pdf(images: Vec<(&str, Stream)>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut xobjects = Dictionary::new();
        for (name, image) in images {
            let id = doc.add_object(image);
            xobjects.set(name, id);
        }
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => rect(612, 792),
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page)],
                "Count" => 1_i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn non_positive_sizes_never_win_the_largest_image() {
        let bytes = single_page_pdf(vec![
            ("Negative", gray_image(-5, -5, Vec::new())),
            ("Scan", gray_image(6, 4, vec![77u8; 24])),
            ("Mixed", gray_image(-1_000_000, 3, Vec::new())),
        ]);
        let images = PdfReader::from_bytes(&bytes).unwrap().page_images().unwrap();
        assert_eq!((images[0].width(), images[0].height()), (6, 4));
    }

    #[test]
    fn huge_declared_sizes_fail_cleanly() {
        let bytes = single_page_pdf(vec![
            ("Scan", gray_image(6, 4, vec![77u8; 24])),
            ("Huge", gray_image(i64::MAX, i64::MAX, vec![0u8; 4])),
        ]);
        assert!(matches!(
            PdfReader::from_bytes(&bytes).unwrap().page_images(),
            Err(InklayerError::ImageError(_))
        ));
    }

    #[test]
    fn garbage_bytes_are_pdf_error() {
        assert!(matches!(
            PdfReader::from_bytes(b"%PDF-nope"),
            Err(InklayerError::PdfError(_))
        ));
    }
}
