// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page image source: turns any supported input file into an ordered, finite
// sequence of page rasters. Single-frame formats yield one page, multi-page
// TIFFs yield every page, and scanner PDFs yield each page's embedded scan.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage, RgbaImage};
use inklayer_core::InputFormat;
use inklayer_core::error::{InklayerError, Result};
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tracing::{debug, info, instrument};

use crate::pdf::reader::PdfReader;

/// One decoded page raster, normalised to 8-bit RGB.
#[derive(Debug, Clone)]
pub struct PageImage {
    pixels: RgbImage,
}

impl PageImage {
    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            pixels: image.to_rgb8(),
        }
    }

    /// Pixel width.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Pixel height.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Borrow the RGB raster.
    pub fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Load every page image of `path`, in source page order.
#[instrument(skip_all, fields(path = %path.as_ref().display(), format = ?format))]
pub fn load_page_images(path: impl AsRef<Path>, format: InputFormat) -> Result<Vec<PageImage>> {
    let path = path.as_ref();
    let pages = match format {
        InputFormat::Pdf => PdfReader::open(path)?.page_images()?,
        InputFormat::Tiff => {
            let file = File::open(path)?;
            decode_tiff_pages(BufReader::new(file))?
        }
        InputFormat::Jpeg | InputFormat::Png | InputFormat::Bmp => {
            let image = image::open(path).map_err(|err| {
                InklayerError::ImageError(format!("failed to open {}: {}", path.display(), err))
            })?;
            vec![PageImage::from_dynamic(image)]
        }
    };

    info!(pages = pages.len(), "Page images loaded");
    Ok(pages)
}

/// Decode every page (IFD) of a TIFF stream.
pub fn decode_tiff_pages<R: Read + Seek>(reader: R) -> Result<Vec<PageImage>> {
    let tiff_err = |err: tiff::TiffError| InklayerError::ImageError(format!("TIFF decode failed: {err}"));

    let mut decoder = Decoder::new(reader).map_err(tiff_err)?;
    let mut pages = Vec::new();
    loop {
        let (width, height) = decoder.dimensions().map_err(tiff_err)?;
        let color = decoder.colortype().map_err(tiff_err)?;
        let data = decoder.read_image().map_err(tiff_err)?;
        debug!(page = pages.len(), width, height, ?color, "TIFF page decoded");
        pages.push(tiff_frame_to_page(width, height, color, data, pages.len())?);

        if !decoder.more_images() {
            break;
        }
        decoder.next_image().map_err(tiff_err)?;
    }
    Ok(pages)
}

fn tiff_frame_to_page(
    width: u32,
    height: u32,
    color: ColorType,
    data: DecodingResult,
    index: usize,
) -> Result<PageImage> {
    let short_buffer = || {
        InklayerError::ImageError(format!(
            "TIFF page {index}: pixel buffer does not match {width}x{height} {color:?}"
        ))
    };

    let image = match (color, data) {
        (ColorType::Gray(8), DecodingResult::U8(buf)) => {
            DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, buf).ok_or_else(short_buffer)?)
        }
        (ColorType::RGB(8), DecodingResult::U8(buf)) => {
            DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, buf).ok_or_else(short_buffer)?)
        }
        (ColorType::RGBA(8), DecodingResult::U8(buf)) => {
            DynamicImage::ImageRgba8(RgbaImage::from_raw(width, height, buf).ok_or_else(short_buffer)?)
        }
        (ColorType::Gray(16), DecodingResult::U16(buf)) => DynamicImage::ImageLuma16(
            ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, buf)
                .ok_or_else(short_buffer)?,
        ),
        (ColorType::RGB(16), DecodingResult::U16(buf)) => DynamicImage::ImageRgb16(
            ImageBuffer::<Rgb<u16>, Vec<u16>>::from_raw(width, height, buf)
                .ok_or_else(short_buffer)?,
        ),
        (other, _) => {
            return Err(InklayerError::ImageError(format!(
                "TIFF page {index}: unsupported colour type {other:?}"
            )));
        }
    };

    Ok(PageImage::from_dynamic(image))
}
