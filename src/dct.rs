use crate::codec::{ensure_capacity, EmbeddingCodec};
use crate::color::{luminance_at, write_luminance, LuminancePlane};
use crate::config::CURRENT_TABLE_VERSION;
use crate::error::{Result, SteganographyError};
use crate::quantization::{embed_with_read_back, extract_parity};
use image::RgbImage;
use std::sync::OnceLock;

/// Side length of a transform block
pub const BLOCK_SIZE: usize = 8;

/// Mid-frequency (row, column) positions carrying one bit each, table v1.
/// Both avoid the DC term and the visually fragile high frequencies.
const EMBEDDING_POSITIONS_V1: [(usize, usize); 2] = [(4, 1), (1, 4)];

/// Quantization step for coefficient parity
const QUANTIZATION_STEP: f64 = 16.0;

/// Cosine basis `cos((2x + 1) * u * pi / 16)` indexed `[u][x]`
fn cosine_lookup_table() -> &'static [[f64; BLOCK_SIZE]; BLOCK_SIZE] {
    static TABLE: OnceLock<[[f64; BLOCK_SIZE]; BLOCK_SIZE]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut cosine_lookup_table = [[0f64; BLOCK_SIZE]; BLOCK_SIZE];
        for (frequency_index, table_row) in cosine_lookup_table.iter_mut().enumerate() {
            for (spatial_index, value) in table_row.iter_mut().enumerate() {
                *value = ((2 * spatial_index + 1) as f64
                    * frequency_index as f64
                    * std::f64::consts::PI
                    / 16.0)
                    .cos();
            }
        }
        cosine_lookup_table
    })
}

/// Orthonormal 8x8 DCT-II and its inverse
#[derive(Debug, Clone, Copy, Default)]
pub struct DctProcessor;

impl DctProcessor {
    pub fn new() -> Self {
        Self
    }

    fn normalization_factor(frequency_index: usize) -> f64 {
        if frequency_index == 0 {
            std::f64::consts::FRAC_1_SQRT_2
        } else {
            1.0
        }
    }

    /// Applies 1D DCT transformation to a single row or column
    fn apply_dct_1d(&self, input_values: &[f64; BLOCK_SIZE]) -> [f64; BLOCK_SIZE] {
        let cosine_lookup_table = cosine_lookup_table();
        let mut output_coefficients = [0f64; BLOCK_SIZE];

        for (frequency_index, coefficient) in output_coefficients.iter_mut().enumerate() {
            let coefficient_sum: f64 = input_values
                .iter()
                .zip(cosine_lookup_table[frequency_index].iter())
                .map(|(value, cosine)| value * cosine)
                .sum();
            *coefficient = 0.5 * Self::normalization_factor(frequency_index) * coefficient_sum;
        }

        output_coefficients
    }

    /// Applies 1D inverse DCT transformation to convert back to spatial domain
    fn apply_inverse_dct_1d(&self, input_coefficients: &[f64; BLOCK_SIZE]) -> [f64; BLOCK_SIZE] {
        let cosine_lookup_table = cosine_lookup_table();
        let mut output_values = [0f64; BLOCK_SIZE];

        for (spatial_index, value) in output_values.iter_mut().enumerate() {
            let pixel_sum: f64 = input_coefficients
                .iter()
                .enumerate()
                .map(|(frequency_index, coefficient)| {
                    Self::normalization_factor(frequency_index)
                        * coefficient
                        * cosine_lookup_table[frequency_index][spatial_index]
                })
                .sum();
            *value = 0.5 * pixel_sum;
        }

        output_values
    }

    fn transform_columns(
        block: &mut [[f64; BLOCK_SIZE]; BLOCK_SIZE],
        transform: impl Fn(&[f64; BLOCK_SIZE]) -> [f64; BLOCK_SIZE],
    ) {
        for column_index in 0..BLOCK_SIZE {
            let column_values: [f64; BLOCK_SIZE] =
                std::array::from_fn(|row_index| block[row_index][column_index]);
            let transformed_column = transform(&column_values);
            for (row_index, block_row) in block.iter_mut().enumerate() {
                block_row[column_index] = transformed_column[row_index];
            }
        }
    }

    /// Applies 2D DCT to an 8x8 block, rows first
    pub fn apply_forward_dct(&self, image_block: &mut [[f64; BLOCK_SIZE]; BLOCK_SIZE]) {
        for row in image_block.iter_mut() {
            *row = self.apply_dct_1d(row);
        }
        Self::transform_columns(image_block, |column| self.apply_dct_1d(column));
    }

    /// Applies 2D inverse DCT, columns first
    pub fn apply_inverse_dct(&self, dct_block: &mut [[f64; BLOCK_SIZE]; BLOCK_SIZE]) {
        Self::transform_columns(dct_block, |column| self.apply_inverse_dct_1d(column));
        for row in dct_block.iter_mut() {
            *row = self.apply_inverse_dct_1d(row);
        }
    }
}

/// Block-DCT codec on the luminance plane.
///
/// Only full 8x8 blocks are used, in row-major block order; within a block
/// the units follow the coefficient table order. Chroma is carried through
/// unchanged and blocks past the last embedded bit are not touched.
#[derive(Debug, Clone)]
pub struct DctCodec {
    embedding_positions: &'static [(usize, usize)],
    quantization_step: f64,
    dct_processor: DctProcessor,
}

impl DctCodec {
    pub fn new(table_version: u8) -> Result<Self> {
        let embedding_positions: &'static [(usize, usize)] = match table_version {
            CURRENT_TABLE_VERSION => &EMBEDDING_POSITIONS_V1,
            unsupported => {
                return Err(SteganographyError::InvalidParameter(format!(
                    "unsupported DCT coefficient table version {}",
                    unsupported
                )))
            }
        };
        Ok(Self {
            embedding_positions,
            quantization_step: QUANTIZATION_STEP,
            dct_processor: DctProcessor::new(),
        })
    }

    pub fn coefficients_per_block(&self) -> usize {
        self.embedding_positions.len()
    }

    /// Full blocks across and down
    fn block_grid(image: &RgbImage) -> (usize, usize) {
        (
            image.width() as usize / BLOCK_SIZE,
            image.height() as usize / BLOCK_SIZE,
        )
    }

    fn block_origin(block_index: usize, horizontal_blocks: usize) -> (usize, usize) {
        (
            (block_index % horizontal_blocks) * BLOCK_SIZE,
            (block_index / horizontal_blocks) * BLOCK_SIZE,
        )
    }

    /// Writes spatial luminance for one block, shifted by `mean_shift`,
    /// keeping the cover's chroma
    fn write_block(
        steganographic_image: &mut RgbImage,
        cover_image: &RgbImage,
        (block_x, block_y): (usize, usize),
        luminance_block: &[[f64; BLOCK_SIZE]; BLOCK_SIZE],
        mean_shift: f64,
    ) {
        for (row_offset, block_row) in luminance_block.iter().enumerate() {
            for (column_offset, &luminance) in block_row.iter().enumerate() {
                write_luminance(
                    steganographic_image,
                    cover_image,
                    (block_x + column_offset) as u32,
                    (block_y + row_offset) as u32,
                    luminance + mean_shift,
                );
            }
        }
    }

    /// Luminance of one block as stored in `image`
    fn read_block(image: &RgbImage, (block_x, block_y): (usize, usize)) -> [[f64; BLOCK_SIZE]; BLOCK_SIZE] {
        std::array::from_fn(|row_offset| {
            std::array::from_fn(|column_offset| {
                luminance_at(image, (block_x + column_offset) as u32, (block_y + row_offset) as u32)
            })
        })
    }
}

impl EmbeddingCodec for DctCodec {
    fn capacity_bits(&self, image: &RgbImage) -> usize {
        let (horizontal_blocks, vertical_blocks) = Self::block_grid(image);
        horizontal_blocks * vertical_blocks * self.coefficients_per_block()
    }

    fn check_carrier(&self, image: &RgbImage) -> Result<()> {
        if (image.width() as usize) < BLOCK_SIZE || (image.height() as usize) < BLOCK_SIZE {
            return Err(SteganographyError::InvalidParameter(format!(
                "DCT needs at least one {}x{} block, image is {}x{}",
                BLOCK_SIZE,
                BLOCK_SIZE,
                image.width(),
                image.height()
            )));
        }
        Ok(())
    }

    fn embed(&self, image: &RgbImage, bits: &[u8]) -> Result<RgbImage> {
        self.check_carrier(image)?;
        ensure_capacity(bits.len(), self.capacity_bits(image))?;

        let (horizontal_blocks, _) = Self::block_grid(image);
        let luminance_plane = LuminancePlane::from_rgb(image);
        let mut steganographic_image = image.clone();

        for (block_index, block_bits) in bits.chunks(self.coefficients_per_block()).enumerate() {
            let (block_x, block_y) = Self::block_origin(block_index, horizontal_blocks);
            let mut coefficient_block = luminance_plane.block(block_x, block_y);
            self.dct_processor.apply_forward_dct(&mut coefficient_block);

            let carrying_positions = &self.embedding_positions[..block_bits.len()];
            let original_coefficients: Vec<f64> = carrying_positions
                .iter()
                .map(|&(coefficient_y, coefficient_x)| coefficient_block[coefficient_y][coefficient_x])
                .collect();
            // Orthonormal DC is eight times the block mean
            let mean_luminance = coefficient_block[0][0] / BLOCK_SIZE as f64;

            let embedded = embed_with_read_back(
                &original_coefficients,
                block_bits,
                self.quantization_step,
                mean_luminance,
                |carrying_values, mean_shift| {
                    let mut luminance_block = coefficient_block;
                    for (&(coefficient_y, coefficient_x), &value) in
                        carrying_positions.iter().zip(carrying_values)
                    {
                        luminance_block[coefficient_y][coefficient_x] = value;
                    }
                    self.dct_processor.apply_inverse_dct(&mut luminance_block);
                    Self::write_block(
                        &mut steganographic_image,
                        image,
                        (block_x, block_y),
                        &luminance_block,
                        mean_shift,
                    );

                    let mut read_back_block = Self::read_block(&steganographic_image, (block_x, block_y));
                    self.dct_processor.apply_forward_dct(&mut read_back_block);
                    carrying_positions
                        .iter()
                        .map(|&(coefficient_y, coefficient_x)| read_back_block[coefficient_y][coefficient_x])
                        .collect()
                },
            );
            if !embedded {
                return Err(SteganographyError::SaturatedCarrier {
                    unit: block_index * self.coefficients_per_block(),
                });
            }
        }

        tracing::debug!(
            embedded_bits = bits.len(),
            blocks_touched = bits.len().div_ceil(self.coefficients_per_block()),
            "DCT embedding complete"
        );
        Ok(steganographic_image)
    }

    fn extract(&self, image: &RgbImage, bit_count: usize) -> Result<Vec<u8>> {
        self.check_carrier(image)?;
        ensure_capacity(bit_count, self.capacity_bits(image))?;

        let (horizontal_blocks, _) = Self::block_grid(image);
        let luminance_plane = LuminancePlane::from_rgb(image);
        let block_count = bit_count.div_ceil(self.coefficients_per_block());
        let mut extracted_bits = Vec::with_capacity(bit_count);

        for block_index in 0..block_count {
            let (block_x, block_y) = Self::block_origin(block_index, horizontal_blocks);
            let mut luminance_block = luminance_plane.block(block_x, block_y);
            self.dct_processor.apply_forward_dct(&mut luminance_block);

            for &(coefficient_y, coefficient_x) in self.embedding_positions {
                extracted_bits.push(extract_parity(
                    luminance_block[coefficient_y][coefficient_x],
                    self.quantization_step,
                ));
            }
        }

        extracted_bits.truncate(bit_count);
        Ok(extracted_bits)
    }
}
