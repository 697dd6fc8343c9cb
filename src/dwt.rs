use crate::codec::{ensure_capacity, EmbeddingCodec};
use crate::color::{luminance_at, write_luminance, LuminancePlane};
use crate::config::{SubBand, CURRENT_TABLE_VERSION};
use crate::error::{Result, SteganographyError};
use crate::quantization::{embed_with_read_back, extract_parity};
use image::RgbImage;

/// Quantization step for detail coefficient parity
const QUANTIZATION_STEP: f64 = 8.0;

/// One level of 2-D Haar decomposition, each band `ceil(w/2) x ceil(h/2)`
#[derive(Debug, Clone, PartialEq)]
pub struct HaarSubBands {
    width: usize,
    height: usize,
    pub approximation: Vec<f64>,
    pub horizontal: Vec<f64>,
    pub vertical: Vec<f64>,
    pub diagonal: Vec<f64>,
}

impl HaarSubBands {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn band(&self, sub_band: SubBand) -> &[f64] {
        match sub_band {
            SubBand::Horizontal => &self.horizontal,
            SubBand::Vertical => &self.vertical,
            SubBand::Diagonal => &self.diagonal,
        }
    }

    fn coefficients(&self, index: usize) -> [f64; 4] {
        [
            self.approximation[index],
            self.horizontal[index],
            self.vertical[index],
            self.diagonal[index],
        ]
    }
}

/// Orthonormal single-level Haar wavelet transform.
///
/// For a 2x2 block `[a b; c d]` the row-then-column passes reduce to
/// `LL = (a+b+c+d)/2`, `H = (a+b-c-d)/2`, `V = (a-b+c-d)/2` and
/// `D = (a-b-c+d)/2`. Odd dimensions replicate the last row or column.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaarProcessor;

impl HaarProcessor {
    pub fn new() -> Self {
        Self
    }

    fn forward_block(pixels: [f64; 4]) -> [f64; 4] {
        let [a, b, c, d] = pixels;
        [
            (a + b + c + d) / 2.0,
            (a + b - c - d) / 2.0,
            (a - b + c - d) / 2.0,
            (a - b - c + d) / 2.0,
        ]
    }

    /// Inverse of the 2x2 block transform, returning `[a, b, c, d]`
    pub fn inverse_block(coefficients: [f64; 4]) -> [f64; 4] {
        let [approximation, horizontal, vertical, diagonal] = coefficients;
        [
            (approximation + horizontal + vertical + diagonal) / 2.0,
            (approximation + horizontal - vertical - diagonal) / 2.0,
            (approximation - horizontal + vertical - diagonal) / 2.0,
            (approximation - horizontal - vertical + diagonal) / 2.0,
        ]
    }

    pub fn decompose(&self, plane: &LuminancePlane) -> HaarSubBands {
        let band_width = plane.width().div_ceil(2);
        let band_height = plane.height().div_ceil(2);
        let band_len = band_width * band_height;
        let mut sub_bands = HaarSubBands {
            width: band_width,
            height: band_height,
            approximation: Vec::with_capacity(band_len),
            horizontal: Vec::with_capacity(band_len),
            vertical: Vec::with_capacity(band_len),
            diagonal: Vec::with_capacity(band_len),
        };

        let last_x = plane.width().saturating_sub(1);
        let last_y = plane.height().saturating_sub(1);
        for band_y in 0..band_height {
            for band_x in 0..band_width {
                let left = 2 * band_x;
                let top = 2 * band_y;
                let right = (left + 1).min(last_x);
                let bottom = (top + 1).min(last_y);
                let [approximation, horizontal, vertical, diagonal] = Self::forward_block([
                    plane.get(left, top),
                    plane.get(right, top),
                    plane.get(left, bottom),
                    plane.get(right, bottom),
                ]);
                sub_bands.approximation.push(approximation);
                sub_bands.horizontal.push(horizontal);
                sub_bands.vertical.push(vertical);
                sub_bands.diagonal.push(diagonal);
            }
        }

        sub_bands
    }
}

/// Haar-DWT codec on one detail sub-band of the luminance plane.
///
/// Units are sub-band coefficients in row-major order over the
/// `floor(w/2) x floor(h/2)` grid of complete 2x2 blocks. The padded column
/// or row of an odd-sized image has identically zero detail and carries nothing.
#[derive(Debug, Clone)]
pub struct DwtCodec {
    sub_band: SubBand,
    quantization_step: f64,
    haar_processor: HaarProcessor,
}

impl DwtCodec {
    pub fn new(table_version: u8, sub_band: SubBand) -> Result<Self> {
        if table_version != CURRENT_TABLE_VERSION {
            return Err(SteganographyError::InvalidParameter(format!(
                "unsupported DWT table version {}",
                table_version
            )));
        }
        Ok(Self {
            sub_band,
            quantization_step: QUANTIZATION_STEP,
            haar_processor: HaarProcessor::new(),
        })
    }

    /// Slot of the carrying sub-band in a `[LL, H, V, D]` block
    fn coefficient_slot(&self) -> usize {
        match self.sub_band {
            SubBand::Horizontal => 1,
            SubBand::Vertical => 2,
            SubBand::Diagonal => 3,
        }
    }

    /// Sub-band index of embedding unit `unit_index`
    fn band_index(unit_index: usize, usable_width: usize, band_width: usize) -> usize {
        (unit_index / usable_width) * band_width + unit_index % usable_width
    }
}

impl EmbeddingCodec for DwtCodec {
    fn capacity_bits(&self, image: &RgbImage) -> usize {
        (image.width() as usize / 2) * (image.height() as usize / 2)
    }

    fn check_carrier(&self, image: &RgbImage) -> Result<()> {
        if image.width() < 2 || image.height() < 2 {
            return Err(SteganographyError::InvalidParameter(format!(
                "DWT needs at least a 2x2 image, image is {}x{}",
                image.width(),
                image.height()
            )));
        }
        Ok(())
    }

    fn embed(&self, image: &RgbImage, bits: &[u8]) -> Result<RgbImage> {
        self.check_carrier(image)?;
        ensure_capacity(bits.len(), self.capacity_bits(image))?;

        let usable_width = image.width() as usize / 2;
        let luminance_plane = LuminancePlane::from_rgb(image);
        let sub_bands = self.haar_processor.decompose(&luminance_plane);
        let band_width = sub_bands.width();
        let coefficient_slot = self.coefficient_slot();
        let mut steganographic_image = image.clone();

        for (unit_index, &bit) in bits.iter().enumerate() {
            let band_index = Self::band_index(unit_index, usable_width, band_width);
            let block_coefficients = sub_bands.coefficients(band_index);
            // Units sit on complete 2x2 blocks, so every pixel is in range
            let left = 2 * (unit_index % usable_width) as u32;
            let top = 2 * (unit_index / usable_width) as u32;
            let block_pixel = |offset: usize| (left + (offset % 2) as u32, top + (offset / 2) as u32);

            // LL is twice the block mean
            let mean_luminance = block_coefficients[0] / 2.0;
            let embedded = embed_with_read_back(
                &[block_coefficients[coefficient_slot]],
                &[bit],
                self.quantization_step,
                mean_luminance,
                |carrying_values, mean_shift| {
                    let mut candidate_coefficients = block_coefficients;
                    candidate_coefficients[coefficient_slot] = carrying_values[0];
                    let pixels = HaarProcessor::inverse_block(candidate_coefficients);
                    for (offset, &luminance) in pixels.iter().enumerate() {
                        let (x, y) = block_pixel(offset);
                        write_luminance(&mut steganographic_image, image, x, y, luminance + mean_shift);
                    }

                    let read_back = HaarProcessor::forward_block(std::array::from_fn(|offset| {
                        let (x, y) = block_pixel(offset);
                        luminance_at(&steganographic_image, x, y)
                    }));
                    vec![read_back[coefficient_slot]]
                },
            );
            if !embedded {
                return Err(SteganographyError::SaturatedCarrier { unit: unit_index });
            }
        }

        tracing::debug!(
            embedded_bits = bits.len(),
            sub_band = ?self.sub_band,
            "DWT embedding complete"
        );
        Ok(steganographic_image)
    }

    fn extract(&self, image: &RgbImage, bit_count: usize) -> Result<Vec<u8>> {
        self.check_carrier(image)?;
        ensure_capacity(bit_count, self.capacity_bits(image))?;

        let usable_width = image.width() as usize / 2;
        let sub_bands = self
            .haar_processor
            .decompose(&LuminancePlane::from_rgb(image));
        let band = sub_bands.band(self.sub_band);

        Ok((0..bit_count)
            .map(|unit_index| {
                let band_index = Self::band_index(unit_index, usable_width, sub_bands.width());
                extract_parity(band[band_index], self.quantization_step)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn gradient_plane(width: usize, height: usize) -> LuminancePlane {
        let values = (0..width * height)
            .map(|index| ((index * 37) % 251) as f64)
            .collect();
        LuminancePlane::new(width, height, values)
    }

    /// Rebuilds a `width x height` plane, dropping replicated padding
    fn reconstruct(sub_bands: &HaarSubBands, width: usize, height: usize) -> LuminancePlane {
        let mut values = vec![0.0; width * height];
        for band_y in 0..sub_bands.height() {
            for band_x in 0..sub_bands.width() {
                let pixels = HaarProcessor::inverse_block(
                    sub_bands.coefficients(band_y * sub_bands.width() + band_x),
                );
                for (offset, &value) in pixels.iter().enumerate() {
                    let x = 2 * band_x + offset % 2;
                    let y = 2 * band_y + offset / 2;
                    if x < width && y < height {
                        values[y * width + x] = value;
                    }
                }
            }
        }
        LuminancePlane::new(width, height, values)
    }

    #[test]
    fn test_haar_roundtrip_even_and_odd_sizes() {
        let haar_processor = HaarProcessor::new();
        for (width, height) in [(8, 6), (7, 5), (1, 3)] {
            let plane = gradient_plane(width, height);
            let sub_bands = haar_processor.decompose(&plane);
            assert_eq!(sub_bands.width(), width.div_ceil(2));
            assert_eq!(sub_bands.height(), height.div_ceil(2));

            let rebuilt = reconstruct(&sub_bands, width, height);
            for y in 0..height {
                for x in 0..width {
                    assert!((rebuilt.get(x, y) - plane.get(x, y)).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_known_block_coefficients() {
        let plane = LuminancePlane::new(2, 2, vec![10.0, 20.0, 30.0, 40.0]);
        let sub_bands = HaarProcessor::new().decompose(&plane);
        assert_eq!(sub_bands.approximation, vec![50.0]);
        assert_eq!(sub_bands.horizontal, vec![-20.0]);
        assert_eq!(sub_bands.vertical, vec![-10.0]);
        assert_eq!(sub_bands.diagonal, vec![0.0]);
    }

    #[test]
    fn test_padded_edge_has_no_detail() {
        let sub_bands = HaarProcessor::new().decompose(&gradient_plane(5, 4));
        // Column 2 of the bands covers only image column 4, replicated
        for band_y in 0..sub_bands.height() {
            let index = band_y * sub_bands.width() + 2;
            assert_eq!(sub_bands.vertical[index], 0.0);
            assert_eq!(sub_bands.diagonal[index], 0.0);
        }
    }

    #[test]
    fn test_capacity_calculation() {
        let codec = DwtCodec::new(1, SubBand::Diagonal).unwrap();
        assert_eq!(codec.capacity_bits(&RgbImage::new(64, 64)), 1024);
        assert_eq!(codec.capacity_bits(&RgbImage::new(9, 5)), 8);
    }

    #[test]
    fn test_embed_extract_every_sub_band() {
        let cover_image: RgbImage = ImageBuffer::from_fn(21, 15, |x, y| {
            Rgb([(70 + x * 5) as u8, (100 + y * 3) as u8, (90 + x + y) as u8])
        });
        for sub_band in [SubBand::Horizontal, SubBand::Vertical, SubBand::Diagonal] {
            let codec = DwtCodec::new(1, sub_band).unwrap();
            let bits: Vec<u8> = (0..codec.capacity_bits(&cover_image))
                .map(|index| ((index / 2 + index / 7) % 2) as u8)
                .collect();
            let stego_image = codec.embed(&cover_image, &bits).unwrap();
            assert_eq!(codec.extract(&stego_image, bits.len()).unwrap(), bits, "{:?}", sub_band);
        }
    }

    #[test]
    fn test_saturated_units_read_back() {
        for color in [[255, 255, 255], [0, 0, 0], [255, 0, 0], [0, 0, 255]] {
            let cover_image = RgbImage::from_pixel(32, 32, Rgb(color));
            for sub_band in [SubBand::Horizontal, SubBand::Diagonal] {
                let codec = DwtCodec::new(1, sub_band).unwrap();
                let bits: Vec<u8> = (0..codec.capacity_bits(&cover_image))
                    .map(|index| ((index / 2 + index / 5) % 2) as u8)
                    .collect();
                let stego_image = codec.embed(&cover_image, &bits).unwrap();
                assert_eq!(
                    codec.extract(&stego_image, bits.len()).unwrap(),
                    bits,
                    "{:?} {:?}",
                    color,
                    sub_band
                );
            }
        }
    }

    #[test]
    fn test_shifted_diagonal_coefficient_flips_one_bit() {
        let codec = DwtCodec::new(1, SubBand::Diagonal).unwrap();
        let cover_image = RgbImage::from_pixel(16, 16, Rgb([128, 128, 128]));
        let bits: Vec<u8> = (0..64).map(|index| (index % 3 == 0) as u8).collect();
        let mut stego_image = codec.embed(&cover_image, &bits).unwrap();

        // Unit 10 is the 2x2 block at band (2, 1), i.e. pixels (4..6, 2..4)
        for (offset, delta) in [4i16, -4, -4, 4].into_iter().enumerate() {
            let pixel = stego_image.get_pixel_mut(4 + (offset % 2) as u32, 2 + (offset / 2) as u32);
            for channel in pixel.0.iter_mut() {
                *channel = (*channel as i16 + delta) as u8;
            }
        }

        let extracted_bits = codec.extract(&stego_image, bits.len()).unwrap();
        for (unit_index, (&extracted, &original)) in extracted_bits.iter().zip(&bits).enumerate() {
            assert_eq!(extracted != original, unit_index == 10, "unit {}", unit_index);
        }
    }

    #[test]
    fn test_rejects_degenerate_carrier() {
        let codec = DwtCodec::new(1, SubBand::Diagonal).unwrap();
        assert!(matches!(
            codec.embed(&RgbImage::new(1, 10), &[]),
            Err(SteganographyError::InvalidParameter(_))
        ));
        assert!(DwtCodec::new(2, SubBand::Diagonal).is_err());
    }
}
