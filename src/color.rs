//! RGB <-> YCbCr (ITU-R BT.601, full-range JFIF) conversion and the
//! luminance plane the transform codecs operate on.

use image::{Rgb, RgbImage};

/// Converts one RGB pixel to floating-point Y, Cb, Cr
pub fn rgb_to_ycbcr(rgb_pixel: &Rgb<u8>) -> [f64; 3] {
    let red = rgb_pixel[0] as f64;
    let green = rgb_pixel[1] as f64;
    let blue = rgb_pixel[2] as f64;

    let luminance = 0.299 * red + 0.587 * green + 0.114 * blue;
    let blue_difference = -0.168_736 * red - 0.331_264 * green + 0.5 * blue + 128.0;
    let red_difference = 0.5 * red - 0.418_688 * green - 0.081_312 * blue + 128.0;

    [luminance, blue_difference, red_difference]
}

/// Converts Y, Cb, Cr back to an RGB pixel, rounding and clamping each channel
pub fn ycbcr_to_rgb(ycbcr: [f64; 3]) -> Rgb<u8> {
    let [luminance, blue_difference, red_difference] = ycbcr;
    let blue_offset = blue_difference - 128.0;
    let red_offset = red_difference - 128.0;

    let red = luminance + 1.402 * red_offset;
    let green = luminance - 0.344_136 * blue_offset - 0.714_136 * red_offset;
    let blue = luminance + 1.772 * blue_offset;

    Rgb([round_to_u8(red), round_to_u8(green), round_to_u8(blue)])
}

/// Rounds to the nearest integer and clamps into the 8-bit range
pub fn round_to_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Replaces the luminance of pixel (x, y) in `stego_image` while keeping
/// the chroma of the same pixel in `cover_image`.
///
/// The new luminance is rounded and clamped to [0, 255] before conversion.
pub fn write_luminance(
    stego_image: &mut RgbImage,
    cover_image: &RgbImage,
    x: u32,
    y: u32,
    luminance: f64,
) {
    let mut ycbcr = rgb_to_ycbcr(cover_image.get_pixel(x, y));
    ycbcr[0] = round_to_u8(luminance) as f64;
    stego_image.put_pixel(x, y, ycbcr_to_rgb(ycbcr));
}

/// Luminance of pixel (x, y) as the extractors see it
pub fn luminance_at(rgb_image: &RgbImage, x: u32, y: u32) -> f64 {
    rgb_to_ycbcr(rgb_image.get_pixel(x, y))[0]
}

/// Row-major plane of floating-point luminance values
#[derive(Debug, Clone, PartialEq)]
pub struct LuminancePlane {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl LuminancePlane {
    pub fn new(width: usize, height: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), width * height);
        Self {
            width,
            height,
            values,
        }
    }

    /// Luminance of every pixel of `rgb_image`
    pub fn from_rgb(rgb_image: &RgbImage) -> Self {
        let values = rgb_image
            .pixels()
            .map(|rgb_pixel| rgb_to_ycbcr(rgb_pixel)[0])
            .collect();
        Self::new(rgb_image.width() as usize, rgb_image.height() as usize, values)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.values[y * self.width + x]
    }

    /// Copies the 8x8 block whose top-left corner is (block_x, block_y)
    pub fn block(&self, block_x: usize, block_y: usize) -> [[f64; 8]; 8] {
        let mut luminance_block = [[0f64; 8]; 8];
        for (row_offset, block_row) in luminance_block.iter_mut().enumerate() {
            for (column_offset, value) in block_row.iter_mut().enumerate() {
                *value = self.get(block_x + column_offset, block_y + row_offset);
            }
        }
        luminance_block
    }
}
