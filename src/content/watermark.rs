//! Least-significant-bit watermarking
//!
//! Each bit of the watermark id's bytes is written into the LSB of the red
//! channel of successive pixels in raster order, one bit per pixel. The
//! round trip only survives lossless encodings; lossy recompression can
//! flip LSBs, which the upload pipeline treats as an accepted degradation.

use image::{DynamicImage, GenericImageView};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatermarkError {
	#[error("Watermark of {required} bits does not fit in {available} pixels")]
	DoesNotFit { required: usize, available: usize },

	#[error("Image decode failed: {0}")]
	Decode(#[from] image::ImageError),
}

/// Embed `watermark_id` into the image's red-channel LSBs.
pub fn embed(image: &DynamicImage, watermark_id: &str) -> Result<DynamicImage, WatermarkError> {
	let (width, height) = image.dimensions();
	let available = (width as usize) * (height as usize);
	let bits = watermark_id.len() * 8;

	if bits > available {
		return Err(WatermarkError::DoesNotFit {
			required: bits,
			available,
		});
	}

	let mut rgba = image.to_rgba8();
	for (i, bit) in id_bits(watermark_id).enumerate() {
		let x = (i as u32) % width;
		let y = (i as u32) / width;
		let pixel = rgba.get_pixel_mut(x, y);
		pixel.0[0] = (pixel.0[0] & 0xFE) | bit;
	}

	Ok(DynamicImage::ImageRgba8(rgba))
}

/// Read back `expected_len` bytes from the red-channel LSBs, stripping
/// trailing NUL bytes.
pub fn extract(image: &DynamicImage, expected_len: usize) -> String {
	let (width, height) = image.dimensions();
	let available = (width as usize) * (height as usize);
	let rgba = image.to_rgba8();

	let mut bytes = Vec::with_capacity(expected_len);
	'outer: for byte_idx in 0..expected_len {
		let mut byte = 0u8;
		for bit_idx in 0..8 {
			let i = byte_idx * 8 + bit_idx;
			if i >= available {
				break 'outer;
			}
			let x = (i as u32) % width;
			let y = (i as u32) / width;
			let bit = rgba.get_pixel(x, y).0[0] & 1;
			byte = (byte << 1) | bit;
		}
		bytes.push(byte);
	}

	while bytes.last() == Some(&0) {
		bytes.pop();
	}

	String::from_utf8_lossy(&bytes).into_owned()
}

fn id_bits(id: &str) -> impl Iterator<Item = u8> + '_ {
	id.bytes()
		.flat_map(|byte| (0..8).map(move |shift| (byte >> (7 - shift)) & 1))
}
