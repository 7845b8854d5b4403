//! Image uploads, one image per page
//!
//! Baseline JPEGs are embedded untouched (`DCTDecode`); everything else is
//! decoded and stored as deflated RGB with an optional soft mask.

use super::PdfBuilder;
use crate::error::PdfToolError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, DynamicImage, GenericImageView, ImageDecoder, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream};
use std::io::{Cursor, Write};

/// Largest page side a PDF viewer is required to accept, in points
const MAX_PAGE_SIDE: f32 = 14_400.0;

const IMAGE_NAME: &str = "Im0";

pub(super) fn jpeg_to_pdf(bytes: &[u8]) -> Result<Vec<u8>, PdfToolError> {
    let decoder = JpegDecoder::new(Cursor::new(bytes)).map_err(invalid_image)?;
    let (width, height) = decoder.dimensions();

    // CMYK and other exotic layouts need a decode to look right
    let color_space = match (decoder.color_type(), jpeg_component_count(bytes)) {
        (ColorType::L8, Some(1)) => "DeviceGray",
        (ColorType::Rgb8, Some(3)) => "DeviceRGB",
        _ => return raster_to_pdf(bytes, ImageFormat::Jpeg),
    };

    let mut builder = PdfBuilder::new();
    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        bytes.to_vec(),
    );
    let image_id = builder.add_object(image);
    place_full_page(&mut builder, image_id, width, height)?;
    builder.finish()
}

pub(super) fn raster_to_pdf(bytes: &[u8], format: ImageFormat) -> Result<Vec<u8>, PdfToolError> {
    // GIF decoding yields the first frame
    let img = image::load_from_memory_with_format(bytes, format).map_err(invalid_image)?;
    embed_decoded(&img)
}

fn embed_decoded(img: &DynamicImage) -> Result<Vec<u8>, PdfToolError> {
    let (width, height) = img.dimensions();

    let (rgb, alpha) = if img.color().has_alpha() {
        let rgba = img.to_rgba8().into_raw();
        let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
        let mut alpha = Vec::with_capacity(rgba.len() / 4);
        for px in rgba.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
            alpha.push(px[3]);
        }
        (rgb, Some(alpha))
    } else {
        (img.to_rgb8().into_raw(), None)
    };

    let mut builder = PdfBuilder::new();
    let mut image_dict = image_dictionary(width, height, "DeviceRGB");

    if let Some(alpha) = alpha {
        let mask = Stream::new(
            image_dictionary(width, height, "DeviceGray"),
            deflate(&alpha)?,
        );
        let mask_id = builder.add_object(mask);
        image_dict.set("SMask", mask_id);
    }

    let image_id = builder.add_object(Stream::new(image_dict, deflate(&rgb)?));
    place_full_page(&mut builder, image_id, width, height)?;
    builder.finish()
}

fn image_dictionary(width: u32, height: u32, color_space: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    }
}

/// Add a page the size of the image (1 px = 1 pt) with the image filling it
fn place_full_page(
    builder: &mut PdfBuilder,
    image_id: ObjectId,
    width: u32,
    height: u32,
) -> Result<(), PdfToolError> {
    let (page_width, page_height) = page_size(width, height);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    page_width.into(),
                    0.into(),
                    0.into(),
                    page_height.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content = content
        .encode()
        .map_err(|e| PdfToolError::OperationError(format!("Content encoding failed: {}", e)))?;

    let resources = dictionary! {
        "XObject" => dictionary! { IMAGE_NAME => image_id },
    };
    builder.append_page(page_width, page_height, resources, content);
    Ok(())
}

/// Page size in points, scaled down uniformly when a side exceeds the PDF limit
fn page_size(width: u32, height: u32) -> (f32, f32) {
    let (w, h) = (width as f32, height as f32);
    let longest = w.max(h);
    if longest <= MAX_PAGE_SIDE {
        (w, h)
    } else {
        let scale = MAX_PAGE_SIDE / longest;
        (w * scale, h * scale)
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, PdfToolError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(deflate_failed)?;
    encoder.finish().map_err(deflate_failed)
}

fn deflate_failed(e: std::io::Error) -> PdfToolError {
    PdfToolError::OperationError(format!("Deflate failed: {}", e))
}

/// Number of colour components declared by the first SOF marker
fn jpeg_component_count(bytes: &[u8]) -> Option<u8> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        let length = usize::from(u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]));

        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            return bytes.get(pos + 9).copied();
        }
        pos += 2 + length;
    }

    None
}

fn invalid_image(e: image::ImageError) -> PdfToolError {
    PdfToolError::UnsupportedFormat(format!("unreadable image: {}", e))
}
