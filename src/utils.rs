use eframe::egui;
use image::DynamicImage;
use std::path::Path;

use crate::error::{AnnotatorError, Result};

/// Opens an image for display, shrunk to fit within `limit` if it is larger.
///
/// Only the texture is downscaled; box coordinates are always computed
/// against the file's original dimensions.
pub fn load_display_image(path: &Path, limit: [u32; 2]) -> Result<egui::ColorImage> {
    let img = image::open(path).map_err(|source| AnnotatorError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let img = shrink_to_limit(img, limit[0], limit[1]);
    let rgb = img.to_rgb8();
    Ok(egui::ColorImage::from_rgb(
        [rgb.width() as _, rgb.height() as _],
        rgb.as_raw(),
    ))
}

fn shrink_to_limit(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if width <= max_width && height <= max_height {
        return img;
    }
    let ratio = (max_width as f32 / width as f32).min(max_height as f32 / height as f32);
    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);
    img.resize(new_width, new_height, image::imageops::FilterType::Triangle)
}
