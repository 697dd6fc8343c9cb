//! Carrier corruption used to exercise checksum and ECC paths.

use crate::error::{Result, SteganographyError};
use image::RgbImage;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

/// Flips the least significant bit of `flip_count` distinct channel values
/// chosen by a generator seeded with `seed`.
pub fn flip_random_lsbs(image: &RgbImage, flip_count: usize, seed: u64) -> Result<RgbImage> {
    let channel_count = image.as_raw().len();
    if flip_count > channel_count {
        return Err(SteganographyError::InvalidParameter(format!(
            "cannot flip {} bits in an image with {} channel values",
            flip_count, channel_count
        )));
    }

    let mut random_generator = StdRng::seed_from_u64(seed);
    let channel_indices = sample(&mut random_generator, channel_count, flip_count).into_vec();
    flip_lsbs_at(image, &channel_indices)
}

/// Flips the least significant bit of the channel values at `channel_indices`
/// (row-major pixels, R, G, B within a pixel).
pub fn flip_lsbs_at(image: &RgbImage, channel_indices: &[usize]) -> Result<RgbImage> {
    let mut corrupted_image = image.clone();
    let channel_values: &mut [u8] = &mut corrupted_image;
    for &channel_index in channel_indices {
        let channel_value = channel_values.get_mut(channel_index).ok_or_else(|| {
            SteganographyError::InvalidParameter(format!(
                "channel index {} outside the image",
                channel_index
            ))
        })?;
        *channel_value ^= 1;
    }

    tracing::debug!(flipped = channel_indices.len(), "corrupted carrier");
    Ok(corrupted_image)
}
