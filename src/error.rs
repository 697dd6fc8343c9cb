use thiserror::Error;

/// Errors returned by the embedding codecs and the payload framer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SteganographyError {
    /// Framed payload does not fit in the carrier for the chosen method
    #[error("Insufficient capacity: need {required} bits, only {available} available")]
    CapacityExceeded { required: usize, available: usize },

    /// Extracted header implies a frame that cannot exist in this carrier
    #[error("Malformed frame header: {0}")]
    MalformedHeader(String),

    /// Recomputed checksum disagrees with the stored one.
    ///
    /// Deliberately carries no detail: wrong method, wrong passphrase and a
    /// corrupted carrier all look the same to the caller.
    #[error("Checksum mismatch")]
    ChecksumMismatch,

    /// Reed-Solomon decoding could not repair a shard
    #[error("Uncorrectable error-correction shard {index}")]
    UncorrectableShard { index: usize },

    /// Clipping at 0 or 255 leaves no nearby level that reads back the bit
    #[error("Saturated carrier: embedding unit {unit} cannot hold its bit")]
    SaturatedCarrier { unit: usize },

    /// Invalid parameters or an unusable carrier image
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for steganography operations
pub type Result<T> = std::result::Result<T, SteganographyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_mismatch_message_has_no_detail() {
        assert_eq!(SteganographyError::ChecksumMismatch.to_string(), "Checksum mismatch");
    }

    #[test]
    fn test_capacity_message_reports_both_counts() {
        let error = SteganographyError::CapacityExceeded {
            required: 176,
            available: 128,
        };
        assert_eq!(
            error.to_string(),
            "Insufficient capacity: need 176 bits, only 128 available"
        );
    }

    #[test]
    fn test_saturated_carrier_names_the_unit() {
        assert_eq!(
            SteganographyError::SaturatedCarrier { unit: 42 }.to_string(),
            "Saturated carrier: embedding unit 42 cannot hold its bit"
        );
    }
}
