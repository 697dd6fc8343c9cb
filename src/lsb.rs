use crate::codec::{ensure_capacity, EmbeddingCodec};
use crate::error::{Result, SteganographyError};
use image::RgbImage;

/// Spatial-domain codec replacing the low bits of every channel value.
///
/// Units run through pixels in row-major order, channels R, G, B within a
/// pixel, and bit positions from least significant upwards within a channel.
#[derive(Debug, Clone)]
pub struct LsbCodec {
    bits_per_channel: u8,
}

impl LsbCodec {
    pub fn new(bits_per_channel: u8) -> Result<Self> {
        if !(1..=8).contains(&bits_per_channel) {
            return Err(SteganographyError::InvalidParameter(format!(
                "lsb_bits_per_channel must be between 1 and 8, got {}",
                bits_per_channel
            )));
        }
        Ok(Self { bits_per_channel })
    }

    fn channel_mask(&self) -> u8 {
        (((1u16 << self.bits_per_channel) - 1) & 0xFF) as u8
    }
}

impl EmbeddingCodec for LsbCodec {
    fn capacity_bits(&self, image: &RgbImage) -> usize {
        image.width() as usize * image.height() as usize * 3 * self.bits_per_channel as usize
    }

    fn check_carrier(&self, image: &RgbImage) -> Result<()> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SteganographyError::InvalidParameter(
                "carrier image has no pixels".to_string(),
            ));
        }
        Ok(())
    }

    fn embed(&self, image: &RgbImage, bits: &[u8]) -> Result<RgbImage> {
        self.check_carrier(image)?;
        ensure_capacity(bits.len(), self.capacity_bits(image))?;

        let channel_mask = self.channel_mask();
        let mut steganographic_image = image.clone();

        for (channel_value, channel_bits) in steganographic_image
            .iter_mut()
            .zip(bits.chunks(self.bits_per_channel as usize))
        {
            let mut replaced_mask = 0u8;
            let mut replacement = 0u8;
            for (bit_position, &bit) in channel_bits.iter().enumerate() {
                replaced_mask |= 1u8 << bit_position;
                replacement |= (bit & 1) << bit_position;
            }
            // A trailing partial chunk only replaces the bits it carries
            debug_assert_eq!(replaced_mask & !channel_mask, 0);
            *channel_value = (*channel_value & !replaced_mask) | replacement;
        }

        tracing::debug!(
            embedded_bits = bits.len(),
            bits_per_channel = self.bits_per_channel,
            "LSB embedding complete"
        );
        Ok(steganographic_image)
    }

    fn extract(&self, image: &RgbImage, bit_count: usize) -> Result<Vec<u8>> {
        self.check_carrier(image)?;
        ensure_capacity(bit_count, self.capacity_bits(image))?;

        let extracted_bits = image
            .iter()
            .flat_map(|&channel_value| {
                (0..self.bits_per_channel).map(move |bit_position| (channel_value >> bit_position) & 1)
            })
            .take(bit_count)
            .collect();

        Ok(extracted_bits)
    }
}
