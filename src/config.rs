use crate::error::{Result, SteganographyError};
use std::fmt;
use std::str::FromStr;

/// Coefficient-table format version understood by this build
pub const CURRENT_TABLE_VERSION: u8 = 1;

/// Largest Reed-Solomon codeword (data + parity) over GF(2^8)
pub const MAX_CODEWORD_LENGTH: usize = 255;

/// Embedding domain used to carry the payload bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    /// Least-significant bits of the RGB channel values
    Lsb,
    /// Mid-frequency coefficients of 8x8 luminance DCT blocks
    Dct,
    /// Detail sub-band of a single-level Haar decomposition
    Dwt,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Lsb, Method::Dct, Method::Dwt];

    pub fn name(&self) -> &'static str {
        match self {
            Method::Lsb => "lsb",
            Method::Dct => "dct",
            Method::Dwt => "dwt",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.pad(self.name())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "lsb" => Ok(Method::Lsb),
            "dct" => Ok(Method::Dct),
            "dwt" => Ok(Method::Dwt),
            other => Err(format!("unknown method '{}' (expected lsb, dct or dwt)", other)),
        }
    }
}

/// Detail sub-band of the Haar decomposition used by the DWT codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubBand {
    Horizontal,
    Vertical,
    Diagonal,
}

impl FromStr for SubBand {
    type Err = String;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "horizontal" | "lh" => Ok(SubBand::Horizontal),
            "vertical" | "hl" => Ok(SubBand::Vertical),
            "diagonal" | "hh" => Ok(SubBand::Diagonal),
            other => Err(format!("unknown sub-band '{}'", other)),
        }
    }
}

/// Parameters shared by encode and decode.
///
/// Encoder and decoder must agree on every field; none of them is stored in
/// the carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingParameters {
    /// Low bits replaced per channel by the LSB codec (1..=8)
    pub lsb_bits_per_channel: u8,
    /// Payload bytes per Reed-Solomon shard
    pub ecc_shard_size: usize,
    /// Parity symbols appended per shard
    pub ecc_redundancy_symbols: usize,
    /// Coefficient-table format version for the DCT/DWT codecs
    pub table_version: u8,
    /// Detail sub-band targeted by the DWT codec
    pub dwt_subband: SubBand,
}

impl Default for EmbeddingParameters {
    fn default() -> Self {
        Self {
            lsb_bits_per_channel: 1,
            ecc_shard_size: 32,
            ecc_redundancy_symbols: 8,
            table_version: CURRENT_TABLE_VERSION,
            dwt_subband: SubBand::Diagonal,
        }
    }
}

impl EmbeddingParameters {
    /// Checks the fields that matter for `method`, plus the ECC layout when
    /// error correction is requested.
    pub fn validate(&self, method: Method, use_ecc: bool) -> Result<()> {
        if method == Method::Lsb && !(1..=8).contains(&self.lsb_bits_per_channel) {
            return Err(SteganographyError::InvalidParameter(format!(
                "lsb_bits_per_channel must be between 1 and 8, got {}",
                self.lsb_bits_per_channel
            )));
        }

        if method != Method::Lsb && self.table_version != CURRENT_TABLE_VERSION {
            return Err(SteganographyError::InvalidParameter(format!(
                "unsupported coefficient table version {}",
                self.table_version
            )));
        }

        if use_ecc {
            self.validate_ecc_layout()?;
        }

        Ok(())
    }

    fn validate_ecc_layout(&self) -> Result<()> {
        if self.ecc_shard_size == 0 {
            return Err(SteganographyError::InvalidParameter(
                "ecc_shard_size must be at least 1".to_string(),
            ));
        }
        if self.ecc_redundancy_symbols == 0 {
            return Err(SteganographyError::InvalidParameter(
                "ecc_redundancy_symbols must be at least 1".to_string(),
            ));
        }
        if self.ecc_shard_size + self.ecc_redundancy_symbols > MAX_CODEWORD_LENGTH {
            return Err(SteganographyError::InvalidParameter(format!(
                "ecc_shard_size + ecc_redundancy_symbols must not exceed {}, got {}",
                MAX_CODEWORD_LENGTH,
                self.ecc_shard_size + self.ecc_redundancy_symbols
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters_are_valid_for_every_method() {
        let parameters = EmbeddingParameters::default();
        for method in Method::ALL {
            assert!(parameters.validate(method, true).is_ok());
        }
    }

    #[test]
    fn test_lsb_bit_depth_bounds() {
        let mut parameters = EmbeddingParameters::default();
        parameters.lsb_bits_per_channel = 0;
        assert!(matches!(
            parameters.validate(Method::Lsb, false),
            Err(SteganographyError::InvalidParameter(_))
        ));
        parameters.lsb_bits_per_channel = 9;
        assert!(parameters.validate(Method::Lsb, false).is_err());
        // Only the LSB codec reads this field
        assert!(parameters.validate(Method::Dct, false).is_ok());
    }

    #[test]
    fn test_ecc_layout_checked_only_when_requested() {
        let parameters = EmbeddingParameters {
            ecc_shard_size: 250,
            ecc_redundancy_symbols: 10,
            ..EmbeddingParameters::default()
        };
        assert!(parameters.validate(Method::Dwt, false).is_ok());
        assert!(parameters.validate(Method::Dwt, true).is_err());
    }

    #[test]
    fn test_unknown_table_version_rejected() {
        let parameters = EmbeddingParameters {
            table_version: 2,
            ..EmbeddingParameters::default()
        };
        assert!(parameters.validate(Method::Dct, false).is_err());
        assert!(parameters.validate(Method::Lsb, false).is_ok());
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("DCT".parse::<Method>().unwrap(), Method::Dct);
        assert_eq!(Method::Dwt.to_string(), "dwt");
        assert!("fft".parse::<Method>().is_err());
        assert_eq!("hh".parse::<SubBand>().unwrap(), SubBand::Diagonal);
    }
}
