use crate::codec::{Codec, EmbeddingCodec};
use crate::config::{EmbeddingParameters, Method};
use crate::crypto::CipherKey;
use crate::ecc::ShardCodec;
use crate::error::Result;
use crate::frame::FrameCodec;
use image::RgbImage;

/// Number of embedding units `method` offers in `image`
pub fn capacity_bits(image: &RgbImage, method: Method, parameters: &EmbeddingParameters) -> Result<usize> {
    parameters.validate(method, false)?;
    Ok(Codec::for_method(method, parameters)?.capacity_bits(image))
}

/// Whether a frame of `frame_bits` bits fits in `capacity`
pub fn validate_fits(frame_bits: usize, capacity: usize) -> bool {
    frame_bits <= capacity
}

/// Frame codec for the given key and ECC choice
pub(crate) fn frame_codec(
    parameters: &EmbeddingParameters,
    cipher_key: Option<&CipherKey>,
    use_ecc: bool,
) -> Result<FrameCodec> {
    let error_correction = if use_ecc {
        Some(ShardCodec::new(
            parameters.ecc_shard_size,
            parameters.ecc_redundancy_symbols,
        )?)
    } else {
        None
    };
    Ok(FrameCodec::new(cipher_key, error_correction))
}

/// Exact frame size in bits for a payload of `payload_len` bytes
pub fn frame_bits(payload_len: usize, parameters: &EmbeddingParameters, use_ecc: bool) -> Result<usize> {
    // Encryption changes the checksum, never the frame size
    Ok(frame_codec(parameters, None, use_ecc)?.frame_bits(payload_len))
}

/// Largest payload in bytes whose frame fits in `capacity` bits
pub fn max_payload_bytes(capacity: usize, parameters: &EmbeddingParameters, use_ecc: bool) -> Result<usize> {
    Ok(frame_codec(parameters, None, use_ecc)?.max_payload_len(capacity))
}
