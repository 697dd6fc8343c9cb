//! Payload frame construction and parsing.
//!
//! Every codec carries the same self-describing bit sequence, MSB first:
//!
//! ```text
//! [32 bits] payload length in bytes, before any ECC (big-endian)
//! [ 8 bits] flags: bit0 = encrypted, bit1 = ECC redundancy present
//! [16 bits] CRC-16 of the (possibly encrypted) payload bytes
//! [L bytes] payload
//! [R bytes] Reed-Solomon parity, shard by shard (only with ECC)
//! ```
//!
//! The header has a fixed size so a decoder can read it before knowing how
//! much more to extract.

use crate::checksum::Crc16;
use crate::crypto::{CipherKey, ENCRYPTION_KEY_SIZE};
use crate::ecc::ShardCodec;
use crate::error::{Result, SteganographyError};

/// Header size: length(32) + flags(8) + checksum(16)
pub const HEADER_BITS: usize = 56;

pub const FLAG_ENCRYPTED: u8 = 0b0000_0001;
pub const FLAG_ERROR_CORRECTION: u8 = 0b0000_0010;
const KNOWN_FLAGS: u8 = FLAG_ENCRYPTED | FLAG_ERROR_CORRECTION;

/// Fixed-size frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u32,
    pub flags: u8,
    pub checksum: u16,
}

impl FrameHeader {
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    pub fn has_error_correction(&self) -> bool {
        self.flags & FLAG_ERROR_CORRECTION != 0
    }

    /// Reads the header from the first [`HEADER_BITS`] bits
    pub fn parse(bits: &[u8]) -> Result<Self> {
        if bits.len() < HEADER_BITS {
            return Err(SteganographyError::MalformedHeader(format!(
                "need {} header bits, got {}",
                HEADER_BITS,
                bits.len()
            )));
        }

        let length = read_bits_msb_first(&bits[0..32]) as u32;
        let flags = read_bits_msb_first(&bits[32..40]) as u8;
        let checksum = read_bits_msb_first(&bits[40..56]) as u16;

        if flags & !KNOWN_FLAGS != 0 {
            return Err(SteganographyError::MalformedHeader(format!(
                "unknown flag bits {:#010b}",
                flags
            )));
        }

        Ok(Self {
            length,
            flags,
            checksum,
        })
    }

    fn to_bits(self) -> Vec<u8> {
        let mut bit_stream = Vec::with_capacity(HEADER_BITS);
        push_bits_msb_first(&mut bit_stream, self.length as u64, 32);
        push_bits_msb_first(&mut bit_stream, self.flags as u64, 8);
        push_bits_msb_first(&mut bit_stream, self.checksum as u64, 16);
        bit_stream
    }
}

/// A complete frame: header fields, payload and optional redundancy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub length: u32,
    pub flags: u8,
    pub checksum: u16,
    pub redundancy: Vec<u8>,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            length: self.length,
            flags: self.flags,
            checksum: self.checksum,
        }
    }

    /// Serializes header, payload and redundancy into one bit per `u8`
    pub fn to_bits(&self) -> Vec<u8> {
        let mut bit_stream = self.header().to_bits();
        bit_stream.extend(bytes_to_bits(&self.payload));
        bit_stream.extend(bytes_to_bits(&self.redundancy));
        bit_stream
    }

    pub fn bit_len(&self) -> usize {
        HEADER_BITS + (self.payload.len() + self.redundancy.len()) * 8
    }
}

/// Builds and parses frames for one (key, ECC layout) combination.
///
/// The ECC layer wraps the plain framing: without a [`ShardCodec`] frames
/// carry no redundancy and the parse path skips correction entirely.
#[derive(Debug, Clone, Default)]
pub struct FrameCodec {
    error_correction: Option<ShardCodec>,
    checksum_tag: Option<[u8; ENCRYPTION_KEY_SIZE]>,
}

impl FrameCodec {
    /// `key` marks frames as encrypted and keys their checksum; the payload
    /// handed to [`build_frame`](Self::build_frame) must already be encrypted.
    pub fn new(key: Option<&CipherKey>, error_correction: Option<ShardCodec>) -> Self {
        Self {
            error_correction,
            checksum_tag: key.map(CipherKey::checksum_tag),
        }
    }

    fn flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.checksum_tag.is_some() {
            flags |= FLAG_ENCRYPTED;
        }
        if self.error_correction.is_some() {
            flags |= FLAG_ERROR_CORRECTION;
        }
        flags
    }

    fn redundancy_len(&self, payload_len: usize) -> usize {
        self.error_correction
            .as_ref()
            .map_or(0, |shard_codec| shard_codec.redundancy_len(payload_len))
    }

    /// Exact frame size in bits for a payload of `payload_len` bytes
    pub fn frame_bits(&self, payload_len: usize) -> usize {
        HEADER_BITS + (payload_len + self.redundancy_len(payload_len)) * 8
    }

    /// Largest payload whose frame fits in `capacity` bits
    pub fn max_payload_len(&self, capacity: usize) -> usize {
        if capacity < HEADER_BITS {
            return 0;
        }
        let body_bytes = (capacity - HEADER_BITS) / 8;
        let mut payload_len = match &self.error_correction {
            Some(shard_codec) => {
                let codeword_len = shard_codec.shard_size() + shard_codec.parity_len();
                body_bytes * shard_codec.shard_size() / codeword_len
            }
            None => body_bytes,
        };
        // The estimate can be one short when the last shard is partial
        while self.frame_bits(payload_len + 1) <= capacity {
            payload_len += 1;
        }
        while payload_len > 0 && self.frame_bits(payload_len) > capacity {
            payload_len -= 1;
        }
        payload_len
    }

    fn checksum(&self, payload: &[u8]) -> u16 {
        let mut digest = Crc16::new();
        if let Some(checksum_tag) = &self.checksum_tag {
            digest.update(checksum_tag);
        }
        digest.update(payload);
        digest.finalize()
    }

    /// Frames `payload`, appending shard parity when ECC is configured
    pub fn build_frame(&self, payload: &[u8]) -> Result<Frame> {
        let length = u32::try_from(payload.len()).map_err(|_| {
            SteganographyError::InvalidParameter(format!(
                "payload of {} bytes exceeds the 32-bit length field",
                payload.len()
            ))
        })?;

        let redundancy = self
            .error_correction
            .as_ref()
            .map(|shard_codec| shard_codec.encode_parity(payload))
            .unwrap_or_default();

        Ok(Frame {
            length,
            flags: self.flags(),
            checksum: self.checksum(payload),
            redundancy,
            payload: payload.to_vec(),
        })
    }

    /// Bits needed to read the whole frame announced by `header`.
    ///
    /// Fails with `MalformedHeader` when that exceeds `capacity`, and with
    /// `ChecksumMismatch` when the header's ECC flag disagrees with this codec.
    pub fn required_bits(&self, header: &FrameHeader, capacity: usize) -> Result<usize> {
        if header.has_error_correction() != self.error_correction.is_some() {
            return Err(SteganographyError::ChecksumMismatch);
        }

        let payload_len = header.length as u64;
        let redundancy_len = self
            .error_correction
            .as_ref()
            .map_or(0, |shard_codec| {
                payload_len.div_ceil(shard_codec.shard_size() as u64) * shard_codec.parity_len() as u64
            });
        let total_bits = HEADER_BITS as u64 + (payload_len + redundancy_len) * 8;

        if total_bits > capacity as u64 {
            return Err(SteganographyError::MalformedHeader(format!(
                "header announces {} bits but the carrier holds {}",
                total_bits, capacity
            )));
        }
        Ok(total_bits as usize)
    }

    /// Parses and verifies a frame.
    ///
    /// `bits` must hold at least the bits reported by
    /// [`required_bits`](Self::required_bits); anything after the frame is
    /// ignored. ECC shards are repaired before the checksum is checked.
    pub fn parse_frame(&self, bits: &[u8], capacity: usize) -> Result<Frame> {
        let header = FrameHeader::parse(bits)?;
        let total_bits = self.required_bits(&header, capacity)?;
        if bits.len() < total_bits {
            return Err(SteganographyError::MalformedHeader(format!(
                "frame needs {} bits, only {} extracted",
                total_bits,
                bits.len()
            )));
        }

        let payload_len = header.length as usize;
        let payload_end = HEADER_BITS + payload_len * 8;
        let mut payload = bits_to_bytes(&bits[HEADER_BITS..payload_end]);
        let redundancy = bits_to_bytes(&bits[payload_end..total_bits]);

        if let Some(shard_codec) = &self.error_correction {
            payload = shard_codec.correct(&payload, &redundancy)?;
        }

        if header.is_encrypted() != self.checksum_tag.is_some()
            || self.checksum(&payload) != header.checksum
        {
            return Err(SteganographyError::ChecksumMismatch);
        }

        Ok(Frame {
            length: header.length,
            flags: header.flags,
            checksum: header.checksum,
            redundancy,
            payload,
        })
    }
}

fn push_bits_msb_first(bit_stream: &mut Vec<u8>, value: u64, bit_count: usize) {
    for bit_position in (0..bit_count).rev() {
        bit_stream.push(((value >> bit_position) & 1) as u8);
    }
}

fn read_bits_msb_first(bits: &[u8]) -> u64 {
    bits.iter()
        .fold(0u64, |value, &bit| (value << 1) | (bit & 1) as u64)
}

/// Converts bytes to one bit per `u8`, MSB first within each byte
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bit_stream = Vec::with_capacity(bytes.len() * 8);
    for &data_byte in bytes {
        for bit_position in (0..8).rev() {
            bit_stream.push((data_byte >> bit_position) & 1);
        }
    }
    bit_stream
}

/// Packs MSB-first bits back into bytes, zero-padding a trailing partial byte
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|bit_chunk| {
            bit_chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte_value, (index, &bit)| byte_value | ((bit & 1) << (7 - index)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::derive_key;

    const LARGE_CAPACITY: usize = 1 << 20;

    #[test]
    fn test_header_layout_is_msb_first() {
        let frame = FrameCodec::default().build_frame(b"HI").unwrap();
        let bits = frame.to_bits();

        assert_eq!(bits.len(), HEADER_BITS + 16);
        assert_eq!(bits_to_bytes(&bits[0..32]), vec![0, 0, 0, 2]);
        assert_eq!(bits_to_bytes(&bits[32..40]), vec![0]);
        assert_eq!(
            bits_to_bytes(&bits[40..56]),
            Crc16::checksum(b"HI").to_be_bytes().to_vec()
        );
        assert_eq!(bits_to_bytes(&bits[56..]), b"HI".to_vec());
    }

    #[test]
    fn test_frame_roundtrip_is_bit_exact() {
        let key = derive_key("pass");
        let frame_codec = FrameCodec::new(Some(&key), Some(ShardCodec::new(4, 2).unwrap()));
        let frame = frame_codec.build_frame(b"framed payload").unwrap();
        let parsed = frame_codec
            .parse_frame(&frame.to_bits(), LARGE_CAPACITY)
            .unwrap();

        assert_eq!(parsed, frame);
        assert_eq!(parsed.to_bits(), frame.to_bits());
        assert_eq!(parsed.flags, FLAG_ENCRYPTED | FLAG_ERROR_CORRECTION);
        assert_eq!(parsed.redundancy.len(), 4 * 2);
    }

    #[test]
    fn test_empty_payload_frames_to_header_only() {
        let frame_codec = FrameCodec::new(None, Some(ShardCodec::new(8, 4).unwrap()));
        let frame = frame_codec.build_frame(&[]).unwrap();
        assert_eq!(frame.bit_len(), HEADER_BITS);
        assert_eq!(frame_codec.frame_bits(0), HEADER_BITS);
        let parsed = frame_codec.parse_frame(&frame.to_bits(), HEADER_BITS).unwrap();
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn test_payload_bit_flip_is_checksum_mismatch() {
        let frame_codec = FrameCodec::default();
        let mut bits = frame_codec.build_frame(b"tamper").unwrap().to_bits();
        bits[HEADER_BITS + 3] ^= 1;
        assert_eq!(
            frame_codec.parse_frame(&bits, LARGE_CAPACITY),
            Err(SteganographyError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_payload_bit_flip_repaired_with_ecc() {
        let frame_codec = FrameCodec::new(None, Some(ShardCodec::new(4, 2).unwrap()));
        let frame = frame_codec.build_frame(b"tamper").unwrap();
        let mut bits = frame.to_bits();
        bits[HEADER_BITS + 3] ^= 1;
        let parsed = frame_codec.parse_frame(&bits, LARGE_CAPACITY).unwrap();
        assert_eq!(parsed.payload, b"tamper".to_vec());
    }

    #[test]
    fn test_oversized_length_is_malformed() {
        let frame_codec = FrameCodec::default();
        let mut bits = frame_codec.build_frame(b"abc").unwrap().to_bits();
        bits[0] = 1;
        assert!(matches!(
            frame_codec.parse_frame(&bits, 4096),
            Err(SteganographyError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_unknown_flags_are_malformed() {
        let mut bits = FrameCodec::default().build_frame(b"abc").unwrap().to_bits();
        bits[32] = 1;
        assert!(matches!(
            FrameHeader::parse(&bits),
            Err(SteganographyError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_wrong_or_missing_key_is_checksum_mismatch() {
        let right_key = derive_key("right");
        let wrong_key = derive_key("wrong");
        let encrypted_codec = FrameCodec::new(Some(&right_key), None);
        let bits = encrypted_codec.build_frame(b"ciphertext").unwrap().to_bits();

        for decoder in [FrameCodec::new(Some(&wrong_key), None), FrameCodec::default()] {
            assert_eq!(
                decoder.parse_frame(&bits, LARGE_CAPACITY),
                Err(SteganographyError::ChecksumMismatch)
            );
        }

        let plain_bits = FrameCodec::default().build_frame(b"plain").unwrap().to_bits();
        assert_eq!(
            encrypted_codec.parse_frame(&plain_bits, LARGE_CAPACITY),
            Err(SteganographyError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_ecc_flag_disagreement_is_checksum_mismatch() {
        let with_ecc = FrameCodec::new(None, Some(ShardCodec::new(8, 2).unwrap()));
        let bits = with_ecc.build_frame(b"shards").unwrap().to_bits();
        assert_eq!(
            FrameCodec::default().parse_frame(&bits, LARGE_CAPACITY),
            Err(SteganographyError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_frame_bits_and_max_payload_agree() {
        let plain = FrameCodec::default();
        assert_eq!(plain.frame_bits(9), 128);
        assert_eq!(plain.max_payload_len(128), 9);
        assert_eq!(plain.max_payload_len(127), 8);
        assert_eq!(plain.max_payload_len(40), 0);

        let protected = FrameCodec::new(None, Some(ShardCodec::new(16, 4).unwrap()));
        for capacity in [56usize, 100, 216, 217, 1024, 5000] {
            let payload_len = protected.max_payload_len(capacity);
            assert!(protected.frame_bits(payload_len) <= capacity);
            assert!(protected.frame_bits(payload_len + 1) > capacity);
        }
    }

    #[test]
    fn test_bits_to_bytes_partial_byte() {
        // 10110 padded to 10110000
        assert_eq!(bits_to_bytes(&[1, 0, 1, 1, 0]), vec![0xB0]);
        assert_eq!(bits_to_bytes(&bytes_to_bits(&[0xDE, 0xAD])), vec![0xDE, 0xAD]);
    }
}
