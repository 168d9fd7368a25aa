use image::{ExtendedColorType, GrayImage, ImageEncoder, ImageError, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Writes an RGB image as PNG, creating parent directories as needed.
pub fn save_png(path: impl AsRef<Path>, image: &RgbImage) -> Result<(), ImageError> {
    write_png(path.as_ref(), image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)
}

/// Writes a luma frame as PNG, useful for dumping raw camera input.
pub fn save_luma_png(path: impl AsRef<Path>, image: &GrayImage) -> Result<(), ImageError> {
    write_png(path.as_ref(), image.as_raw(), image.width(), image.height(), ExtendedColorType::L8)
}

fn write_png(
    path: &Path,
    buffer: &[u8],
    width: u32,
    height: u32,
    color: ExtendedColorType,
) -> Result<(), ImageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let output = BufWriter::new(File::create(path)?);
    let encoder = image::codecs::png::PngEncoder::new(output);
    encoder.write_image(buffer, width, height, color)?;
    Ok(())
}
