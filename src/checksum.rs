//! CRC-16/CCITT-FALSE (polynomial 0x1021, initial value 0xFFFF, no
//! reflection, no final XOR) used as the frame checksum.

use std::sync::OnceLock;

const POLYNOMIAL: u16 = 0x1021;
const INITIAL_VALUE: u16 = 0xFFFF;

fn crc_table() -> &'static [u16; 256] {
    static TABLE: OnceLock<[u16; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u16; 256];
        for (byte_value, entry) in table.iter_mut().enumerate() {
            let mut register = (byte_value as u16) << 8;
            for _ in 0..8 {
                register = if register & 0x8000 != 0 {
                    (register << 1) ^ POLYNOMIAL
                } else {
                    register << 1
                };
            }
            *entry = register;
        }
        table
    })
}

/// Incremental CRC-16 digest
#[derive(Debug, Clone)]
pub struct Crc16 {
    register: u16,
}

impl Crc16 {
    pub fn new() -> Self {
        Self {
            register: INITIAL_VALUE,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        let table = crc_table();
        for &data_byte in data {
            let table_index = ((self.register >> 8) as u8 ^ data_byte) as usize;
            self.register = (self.register << 8) ^ table[table_index];
        }
    }

    pub fn finalize(&self) -> u16 {
        self.register
    }

    /// One-shot checksum of `data`
    pub fn checksum(data: &[u8]) -> u16 {
        let mut digest = Self::new();
        digest.update(data);
        digest.finalize()
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_check_value() {
        assert_eq!(Crc16::checksum(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty_input_is_initial_value() {
        assert_eq!(Crc16::checksum(&[]), 0xFFFF);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut digest = Crc16::new();
        digest.update(b"1234");
        digest.update(b"56789");
        assert_eq!(digest.finalize(), Crc16::checksum(b"123456789"));
    }

    #[test]
    fn test_every_single_bit_flip_detected() {
        let data = b"HI there";
        let reference = Crc16::checksum(data);
        for bit_index in 0..data.len() * 8 {
            let mut corrupted = data.to_vec();
            corrupted[bit_index / 8] ^= 0x80 >> (bit_index % 8);
            assert_ne!(Crc16::checksum(&corrupted), reference, "bit {}", bit_index);
        }
    }
}
