//! Thumbnail generation
//!
//! Downsizes the longer image dimension to a fixed maximum while preserving
//! aspect ratio. Unsupported content types yield `None` - thumbnails are a
//! best-effort artifact and every caller must tolerate their absence.

use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageOutputFormat};
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;

/// Longest-dimension cap for generated previews
pub const MAX_DIMENSION: u32 = 300;

#[derive(Error, Debug)]
pub enum ThumbnailError {
	#[error("Image decode failed: {0}")]
	Decode(#[from] image::ImageError),

	#[error("Thumbnail encode failed: {0}")]
	Encode(String),
}

/// A generated thumbnail, PNG-encoded.
pub struct Thumbnail {
	pub bytes: Vec<u8>,
	pub width: u32,
	pub height: u32,
}

/// Generate a thumbnail for the given file bytes.
///
/// Returns `Ok(None)` for content types without thumbnail support (video
/// frame capture requires ffmpeg and is not built here).
pub fn generate(bytes: &[u8], mime_type: &str) -> Result<Option<Thumbnail>, ThumbnailError> {
	if !is_supported(mime_type) {
		debug!("Thumbnail generation not supported for MIME type: {}", mime_type);
		return Ok(None);
	}

	let image = image::load_from_memory(bytes)?;
	let resized = resize_to_fit(&image, MAX_DIMENSION);
	let (width, height) = resized.dimensions();

	let mut out = Cursor::new(Vec::new());
	resized
		.write_to(&mut out, ImageOutputFormat::Png)
		.map_err(|e| ThumbnailError::Encode(e.to_string()))?;

	Ok(Some(Thumbnail {
		bytes: out.into_inner(),
		width,
		height,
	}))
}

/// Scale the longer dimension down to `max`, preserving aspect ratio.
/// Images already within bounds are returned unscaled.
pub fn resize_to_fit(image: &DynamicImage, max: u32) -> DynamicImage {
	let (width, height) = image.dimensions();
	if width <= max && height <= max {
		return image.clone();
	}

	let scale = max as f64 / width.max(height) as f64;
	let new_width = ((width as f64 * scale) as u32).max(1);
	let new_height = ((height as f64 * scale) as u32).max(1);

	image.resize_exact(new_width, new_height, FilterType::Lanczos3)
}

fn is_supported(mime_type: &str) -> bool {
	matches!(
		mime_type,
		"image/png" | "image/jpeg" | "image/gif" | "image/webp" | "image/bmp" | "image/tiff"
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::RgbaImage;
	use pretty_assertions::assert_eq;

	fn png_bytes(width: u32, height: u32) -> Vec<u8> {
		let img = DynamicImage::ImageRgba8(RgbaImage::new(width, height));
		let mut out = Cursor::new(Vec::new());
		img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
		out.into_inner()
	}

	#[test]
	fn landscape_scales_longer_dimension() {
		let thumb = generate(&png_bytes(600, 300), "image/png").unwrap().unwrap();
		assert_eq!(thumb.width, 300);
		assert_eq!(thumb.height, 150);
	}

	#[test]
	fn portrait_scales_longer_dimension() {
		let thumb = generate(&png_bytes(200, 900), "image/png").unwrap().unwrap();
		assert_eq!(thumb.height, 300);
		assert!(thumb.width < 100);
	}

	#[test]
	fn small_images_are_not_upscaled() {
		let thumb = generate(&png_bytes(100, 80), "image/png").unwrap().unwrap();
		assert_eq!((thumb.width, thumb.height), (100, 80));
	}

	#[test]
	fn unsupported_types_yield_none() {
		assert!(generate(b"not an image", "video/mp4").unwrap().is_none());
		assert!(generate(b"plain text", "text/plain").unwrap().is_none());
	}

	#[test]
	fn corrupt_image_is_an_error_not_a_panic() {
		assert!(generate(b"definitely not a png", "image/png").is_err());
	}
}
