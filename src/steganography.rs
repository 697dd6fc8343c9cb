use crate::capacity::{capacity_bits, frame_codec, validate_fits};
use crate::codec::{Codec, EmbeddingCodec};
use crate::config::{EmbeddingParameters, Method};
use crate::crypto::{derive_key, transform};
use crate::error::{Result, SteganographyError};
use crate::frame::{FrameHeader, HEADER_BITS};
use crate::quality::{mse, psnr};
use image::RgbImage;
use std::collections::BTreeMap;

/// Outcome of embedding one payload with one method
#[derive(Debug, Clone)]
pub struct MethodComparison {
    pub stego_image: RgbImage,
    pub psnr: f64,
    pub mse: f64,
}

/// Main steganography engine for hiding and extracting framed payloads.
///
/// Holds only the embedding parameters; every call is independent.
#[derive(Debug, Clone, Default)]
pub struct SteganographyEngine {
    parameters: EmbeddingParameters,
}

impl SteganographyEngine {
    /// Creates an engine with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with custom parameters
    pub fn with_parameters(parameters: EmbeddingParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &EmbeddingParameters {
        &self.parameters
    }

    fn prepared_codec(&self, image: &RgbImage, method: Method, use_ecc: bool) -> Result<Codec> {
        self.parameters.validate(method, use_ecc)?;
        let codec = Codec::for_method(method, &self.parameters)?;
        codec.check_carrier(image)?;
        Ok(codec)
    }

    /// Embedding units `method` offers in `image`
    pub fn capacity_bits(&self, image: &RgbImage, method: Method) -> Result<usize> {
        capacity_bits(image, method, &self.parameters)
    }

    /// Frames `payload` (encrypting it first when a passphrase is given) and
    /// embeds it, returning a new image. Nothing is written when the frame
    /// does not fit.
    pub fn encode(
        &self,
        image: &RgbImage,
        payload: &[u8],
        method: Method,
        passphrase: Option<&str>,
        use_ecc: bool,
    ) -> Result<RgbImage> {
        let codec = self.prepared_codec(image, method, use_ecc)?;
        let cipher_key = passphrase.map(derive_key);
        let frame_codec = frame_codec(&self.parameters, cipher_key.as_ref(), use_ecc)?;

        let available_capacity = codec.capacity_bits(image);
        let required_bits = frame_codec.frame_bits(payload.len());
        if !validate_fits(required_bits, available_capacity) {
            return Err(SteganographyError::CapacityExceeded {
                required: required_bits,
                available: available_capacity,
            });
        }

        let protected_payload = match &cipher_key {
            Some(cipher_key) => transform(payload, cipher_key),
            None => payload.to_vec(),
        };
        let frame = frame_codec.build_frame(&protected_payload)?;
        let steganographic_image = codec.embed(image, &frame.to_bits())?;

        tracing::info!(
            %method,
            payload_bytes = payload.len(),
            frame_bits = required_bits,
            capacity_bits = available_capacity,
            encrypted = cipher_key.is_some(),
            use_ecc,
            "payload embedded"
        );
        Ok(steganographic_image)
    }

    /// Extracts, verifies and (when a passphrase is given) decrypts a payload.
    ///
    /// The header is read first; only the bits it announces are extracted
    /// afterwards.
    pub fn decode(
        &self,
        image: &RgbImage,
        method: Method,
        passphrase: Option<&str>,
        use_ecc: bool,
    ) -> Result<Vec<u8>> {
        let codec = self.prepared_codec(image, method, use_ecc)?;
        let cipher_key = passphrase.map(derive_key);
        let frame_codec = frame_codec(&self.parameters, cipher_key.as_ref(), use_ecc)?;

        let available_capacity = codec.capacity_bits(image);
        if available_capacity < HEADER_BITS {
            return Err(SteganographyError::MalformedHeader(format!(
                "carrier holds {} bits, fewer than the {}-bit header",
                available_capacity, HEADER_BITS
            )));
        }

        let header = FrameHeader::parse(&codec.extract(image, HEADER_BITS)?)?;
        let frame_bits = frame_codec.required_bits(&header, available_capacity)?;
        tracing::debug!(
            %method,
            announced_length = header.length,
            flags = header.flags,
            frame_bits,
            "frame header read"
        );

        let frame_bit_stream = codec.extract(image, frame_bits)?;
        let frame = frame_codec.parse_frame(&frame_bit_stream, available_capacity)?;

        let payload = match &cipher_key {
            Some(cipher_key) => transform(&frame.payload, cipher_key),
            None => frame.payload,
        };

        tracing::info!(%method, payload_bytes = payload.len(), "payload extracted");
        Ok(payload)
    }

    /// Embeds `payload` with each method in turn, without ECC, and measures
    /// the distortion each one causes.
    pub fn compare(
        &self,
        image: &RgbImage,
        payload: &[u8],
        methods: &[Method],
        passphrase: Option<&str>,
    ) -> BTreeMap<Method, Result<MethodComparison>> {
        methods
            .iter()
            .map(|&method| {
                let comparison = self
                    .encode(image, payload, method, passphrase, false)
                    .and_then(|stego_image| {
                        Ok(MethodComparison {
                            mse: mse(image, &stego_image)?,
                            psnr: psnr(image, &stego_image)?,
                            stego_image,
                        })
                    });
                (method, comparison)
            })
            .collect()
    }
}
