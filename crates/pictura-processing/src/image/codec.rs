use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, ImageResult};
use std::io::Cursor;

/// Format detection, decoding and JPEG encoding
pub struct ImageCodec;

impl ImageCodec {
    /// Detect the raster format from the leading bytes, ignoring any declared type.
    pub fn sniff(data: &[u8]) -> Option<ImageFormat> {
        image::guess_format(data).ok()
    }

    pub fn mime_type(format: ImageFormat) -> &'static str {
        format.to_mime_type()
    }

    /// Read width and height from the header without decoding pixel data.
    pub fn header_dimensions(data: &[u8], format: ImageFormat) -> ImageResult<(u32, u32)> {
        ImageReader::with_format(Cursor::new(data), format).into_dimensions()
    }

    pub fn decode(data: &[u8], format: ImageFormat) -> ImageResult<DynamicImage> {
        image::load_from_memory_with_format(data, format)
    }

    /// Encode as baseline JPEG. Alpha is dropped since JPEG has no alpha channel.
    pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        rgb.write_with_encoder(encoder)?;
        Ok(buf)
    }
}
