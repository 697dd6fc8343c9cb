use crate::config::{EmbeddingParameters, Method};
use crate::dct::DctCodec;
use crate::dwt::DwtCodec;
use crate::error::{Result, SteganographyError};
use crate::lsb::LsbCodec;
use image::RgbImage;

/// Capability set shared by the embedding domains.
///
/// Bits are `u8` values of 0 or 1, written to and read from embedding units
/// in the codec's fixed enumeration order.
pub trait EmbeddingCodec {
    /// Number of embedding units the carrier offers
    fn capacity_bits(&self, image: &RgbImage) -> usize;

    /// Rejects carriers the codec cannot work with at all
    fn check_carrier(&self, image: &RgbImage) -> Result<()>;

    /// Returns a new image carrying `bits` in its first `bits.len()` units
    fn embed(&self, image: &RgbImage, bits: &[u8]) -> Result<RgbImage>;

    /// Reads the first `bit_count` units
    fn extract(&self, image: &RgbImage, bit_count: usize) -> Result<Vec<u8>>;
}

/// Fails with `CapacityExceeded` when `required` units are not available
pub(crate) fn ensure_capacity(required: usize, available: usize) -> Result<()> {
    if required > available {
        return Err(SteganographyError::CapacityExceeded {
            required,
            available,
        });
    }
    Ok(())
}

/// Codec selected by [`Method`]
#[derive(Debug, Clone)]
pub enum Codec {
    Lsb(LsbCodec),
    Dct(DctCodec),
    Dwt(DwtCodec),
}

impl Codec {
    pub fn for_method(method: Method, parameters: &EmbeddingParameters) -> Result<Self> {
        Ok(match method {
            Method::Lsb => Codec::Lsb(LsbCodec::new(parameters.lsb_bits_per_channel)?),
            Method::Dct => Codec::Dct(DctCodec::new(parameters.table_version)?),
            Method::Dwt => {
                Codec::Dwt(DwtCodec::new(parameters.table_version, parameters.dwt_subband)?)
            }
        })
    }

    fn inner(&self) -> &dyn EmbeddingCodec {
        match self {
            Codec::Lsb(codec) => codec,
            Codec::Dct(codec) => codec,
            Codec::Dwt(codec) => codec,
        }
    }
}

impl EmbeddingCodec for Codec {
    fn capacity_bits(&self, image: &RgbImage) -> usize {
        self.inner().capacity_bits(image)
    }

    fn check_carrier(&self, image: &RgbImage) -> Result<()> {
        self.inner().check_carrier(image)
    }

    fn embed(&self, image: &RgbImage, bits: &[u8]) -> Result<RgbImage> {
        self.inner().embed(image, bits)
    }

    fn extract(&self, image: &RgbImage, bit_count: usize) -> Result<Vec<u8>> {
        self.inner().extract(image, bit_count)
    }
}
