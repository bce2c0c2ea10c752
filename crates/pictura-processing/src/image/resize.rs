use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Image resize helpers
pub struct ImageResize;

impl ImageResize {
    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> FilterType {
        let width_ratio = orig_width as f32 / new_width.max(1) as f32;
        let height_ratio = orig_height as f32 / new_height.max(1) as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Crop the centered square, then scale it to `size`x`size`.
    ///
    /// Cropping first keeps the working buffer at most `max(side, size)`
    /// squared, whatever the aspect ratio of the source.
    pub fn cover_square(img: &DynamicImage, size: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let side = orig_width.min(orig_height);
        let x = (orig_width - side) / 2;
        let y = (orig_height - side) / 2;
        let square = img.crop_imm(x, y, side, side);

        let filter = Self::select_filter(side, side, size, size);
        square.resize_exact(size, size, filter)
    }
}
