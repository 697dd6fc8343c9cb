//! Multi-domain image steganography.
//!
//! A payload is optionally encrypted, framed with a length/flags/checksum
//! header and optional Reed-Solomon parity, then written into a carrier
//! image through one of three codecs: spatial LSB, 8x8 block DCT or
//! single-level Haar DWT.

pub mod capacity;
pub mod checksum;
pub mod cli;
pub mod codec;
pub mod color;
pub mod config;
pub mod corruption;
pub mod crypto;
pub mod dct;
pub mod dwt;
pub mod ecc;
pub mod error;
pub mod filter;
pub mod frame;
pub mod lsb;
pub mod quality;
pub mod quantization;
pub mod steganography;

use image::RgbImage;
use std::collections::BTreeMap;

pub use capacity::{frame_bits, max_payload_bytes, validate_fits};
pub use codec::{Codec, EmbeddingCodec};
pub use config::{EmbeddingParameters, Method, SubBand};
pub use error::{Result, SteganographyError};
pub use quality::{mse, psnr};
pub use steganography::{MethodComparison, SteganographyEngine};

/// Embedding units `method` offers in `image`
pub fn capacity_bits(image: &RgbImage, method: Method, parameters: &EmbeddingParameters) -> Result<usize> {
    capacity::capacity_bits(image, method, parameters)
}

/// Hides `payload` in a copy of `image`
pub fn encode(
    image: &RgbImage,
    payload: &[u8],
    method: Method,
    parameters: &EmbeddingParameters,
    passphrase: Option<&str>,
    use_ecc: bool,
) -> Result<RgbImage> {
    SteganographyEngine::with_parameters(parameters.clone()).encode(
        image, payload, method, passphrase, use_ecc,
    )
}

/// Recovers the payload hidden by [`encode`] with the same settings
pub fn decode(
    image: &RgbImage,
    method: Method,
    parameters: &EmbeddingParameters,
    passphrase: Option<&str>,
    use_ecc: bool,
) -> Result<Vec<u8>> {
    SteganographyEngine::with_parameters(parameters.clone()).decode(image, method, passphrase, use_ecc)
}

/// Embeds `payload` with every method in `methods` using default parameters
/// and reports the distortion of each
pub fn compare(
    image: &RgbImage,
    payload: &[u8],
    methods: &[Method],
    passphrase: Option<&str>,
) -> BTreeMap<Method, Result<MethodComparison>> {
    SteganographyEngine::new().compare(image, payload, methods, passphrase)
}
