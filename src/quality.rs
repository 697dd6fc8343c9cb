//! Distortion metrics between a cover image and its stego counterpart.

use crate::error::{Result, SteganographyError};
use image::RgbImage;

const PEAK_SIGNAL_VALUE: f64 = 255.0;

fn ensure_same_dimensions(cover_image: &RgbImage, stego_image: &RgbImage) -> Result<()> {
    if cover_image.dimensions() != stego_image.dimensions() {
        return Err(SteganographyError::InvalidParameter(format!(
            "image dimensions differ: {}x{} vs {}x{}",
            cover_image.width(),
            cover_image.height(),
            stego_image.width(),
            stego_image.height()
        )));
    }
    Ok(())
}

/// Mean squared difference over every pixel and channel
pub fn mse(cover_image: &RgbImage, stego_image: &RgbImage) -> Result<f64> {
    ensure_same_dimensions(cover_image, stego_image)?;

    let channel_count = cover_image.as_raw().len();
    if channel_count == 0 {
        return Ok(0.0);
    }

    let squared_error_sum: f64 = cover_image
        .iter()
        .zip(stego_image.iter())
        .map(|(&cover_value, &stego_value)| {
            let difference = cover_value as f64 - stego_value as f64;
            difference * difference
        })
        .sum();

    Ok(squared_error_sum / channel_count as f64)
}

/// Peak signal-to-noise ratio in decibels, `f64::INFINITY` for identical images
pub fn psnr(cover_image: &RgbImage, stego_image: &RgbImage) -> Result<f64> {
    let mean_squared_error = mse(cover_image, stego_image)?;
    if mean_squared_error == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(10.0 * (PEAK_SIGNAL_VALUE * PEAK_SIGNAL_VALUE / mean_squared_error).log10())
}
