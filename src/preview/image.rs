use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::path::Path;

/// Crop to the bounding box of pixels that are not fully transparent.
/// Images without alpha, or with no visible pixel at all, are returned unchanged.
pub fn crop_to_visible(img: &DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return img.clone();
    }

    let (width, height) = img.dimensions();
    let mut min_x = width;
    let mut min_y = height;
    let mut max_x = 0u32;
    let mut max_y = 0u32;

    for (x, y, pixel) in img.pixels() {
        if pixel.0[3] != 0 {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if max_x < min_x || max_y < min_y {
        return img.clone();
    }

    img.crop_imm(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}

/// Downsample so neither side exceeds `max_dimension`, preserving aspect ratio
pub fn fit_within(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    if img.width() <= max_dimension && img.height() <= max_dimension {
        return img;
    }
    img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

/// Decode by content; host previews keep a `.png` name whatever their format
fn open_preview(path: &Path) -> Result<ImageReader<std::io::BufReader<std::fs::File>>> {
    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .with_context(|| format!("Failed to open preview {}", path.display()))
}

/// Size of an already normalized preview
pub fn preview_dimensions(path: &Path) -> Result<(u32, u32)> {
    open_preview(path)?
        .into_dimensions()
        .with_context(|| format!("Failed to read preview size {}", path.display()))
}

/// Crop and resize the preview at `path` in place, returning its final size
pub fn normalize_preview(path: &Path, max_dimension: u32) -> Result<(u32, u32)> {
    let img = open_preview(path)?
        .decode()
        .with_context(|| format!("Failed to decode preview {}", path.display()))?;
    let img = fit_within(crop_to_visible(&img), max_dimension);
    img.save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to save preview {}", path.display()))?;
    Ok(img.dimensions())
}
