//! Systematic Reed-Solomon shards over GF(2^8).
//!
//! Payload bytes are cut into `shard_size`-byte shards (the last one may be
//! shorter) and each shard gets `parity_len` parity symbols computed with the
//! generator `g(x) = prod_{i=0}^{parity_len-1} (x - alpha^i)` over the
//! primitive polynomial 0x11D. A shard is a shortened codeword: data symbols
//! first (highest degree), parity last. Decoding uses Berlekamp-Massey,
//! Chien search and Forney, and repairs up to `parity_len / 2` wrong symbols
//! per shard.

use crate::config::MAX_CODEWORD_LENGTH;
use crate::error::{Result, SteganographyError};
use std::sync::OnceLock;

/// x^8 + x^4 + x^3 + x^2 + 1
const PRIMITIVE_POLYNOMIAL: u16 = 0x11D;

struct GaloisTables {
    exp: [u8; 512],
    log: [u8; 256],
}

fn galois_tables() -> &'static GaloisTables {
    static TABLES: OnceLock<GaloisTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut exp = [0u8; 512];
        let mut log = [0u8; 256];
        let mut element: u16 = 1;
        for power in 0..255usize {
            exp[power] = element as u8;
            exp[power + 255] = element as u8;
            log[element as usize] = power as u8;
            element <<= 1;
            if element & 0x100 != 0 {
                element ^= PRIMITIVE_POLYNOMIAL;
            }
        }
        exp[510] = exp[0];
        exp[511] = exp[1];
        GaloisTables { exp, log }
    })
}

fn gf_mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let tables = galois_tables();
    tables.exp[tables.log[a as usize] as usize + tables.log[b as usize] as usize]
}

/// Multiplicative inverse; callers never pass zero.
fn gf_inv(a: u8) -> u8 {
    debug_assert_ne!(a, 0, "zero has no inverse in GF(2^8)");
    let tables = galois_tables();
    tables.exp[255 - tables.log[a as usize] as usize]
}

/// alpha^power for any non-negative power
fn gf_alpha_pow(power: usize) -> u8 {
    galois_tables().exp[power % 255]
}

/// alpha^-power
fn gf_alpha_inv_pow(power: usize) -> u8 {
    galois_tables().exp[(255 - power % 255) % 255]
}

/// Horner evaluation, `polynomial[0]` is the highest-degree coefficient
fn evaluate_descending(polynomial: &[u8], x: u8) -> u8 {
    polynomial
        .iter()
        .fold(0u8, |accumulator, &coefficient| gf_mul(accumulator, x) ^ coefficient)
}

/// `polynomial[0]` is the constant term
fn evaluate_ascending(polynomial: &[u8], x: u8) -> u8 {
    let mut result = 0u8;
    let mut x_power = 1u8;
    for &coefficient in polynomial {
        result ^= gf_mul(coefficient, x_power);
        x_power = gf_mul(x_power, x);
    }
    result
}

fn multiply_descending(left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut product = vec![0u8; left.len() + right.len() - 1];
    for (left_index, &left_coefficient) in left.iter().enumerate() {
        for (right_index, &right_coefficient) in right.iter().enumerate() {
            product[left_index + right_index] ^= gf_mul(left_coefficient, right_coefficient);
        }
    }
    product
}

/// Reed-Solomon codec for fixed-size payload shards
#[derive(Debug, Clone)]
pub struct ShardCodec {
    shard_size: usize,
    parity_len: usize,
    /// Generator polynomial, highest degree first, monic
    generator: Vec<u8>,
}

impl ShardCodec {
    pub fn new(shard_size: usize, parity_len: usize) -> Result<Self> {
        if shard_size == 0 || parity_len == 0 || shard_size + parity_len > MAX_CODEWORD_LENGTH {
            return Err(SteganographyError::InvalidParameter(format!(
                "invalid Reed-Solomon layout: {} data + {} parity symbols",
                shard_size, parity_len
            )));
        }

        let mut generator = vec![1u8];
        for root_power in 0..parity_len {
            generator = multiply_descending(&generator, &[1, gf_alpha_pow(root_power)]);
        }

        Ok(Self {
            shard_size,
            parity_len,
            generator,
        })
    }

    pub fn shard_size(&self) -> usize {
        self.shard_size
    }

    pub fn parity_len(&self) -> usize {
        self.parity_len
    }

    /// Wrong symbols each shard can absorb
    pub fn correctable_symbols(&self) -> usize {
        self.parity_len / 2
    }

    pub fn shard_count(&self, payload_len: usize) -> usize {
        payload_len.div_ceil(self.shard_size)
    }

    /// Total parity bytes appended for a payload of `payload_len` bytes
    pub fn redundancy_len(&self, payload_len: usize) -> usize {
        self.shard_count(payload_len) * self.parity_len
    }

    /// Parity symbols of every shard, concatenated in shard order
    pub fn encode_parity(&self, payload: &[u8]) -> Vec<u8> {
        let mut redundancy = Vec::with_capacity(self.redundancy_len(payload.len()));
        for shard in payload.chunks(self.shard_size) {
            redundancy.extend_from_slice(&self.shard_parity(shard));
        }
        redundancy
    }

    /// Systematic encoding: remainder of `shard * x^parity_len` divided by
    /// the generator, computed with a shift register.
    fn shard_parity(&self, shard: &[u8]) -> Vec<u8> {
        let mut shift_register = vec![0u8; self.parity_len];
        for &data_byte in shard {
            let feedback = data_byte ^ shift_register[0];
            for register_index in 0..self.parity_len - 1 {
                shift_register[register_index] = shift_register[register_index + 1]
                    ^ gf_mul(feedback, self.generator[register_index + 1]);
            }
            shift_register[self.parity_len - 1] = gf_mul(feedback, self.generator[self.parity_len]);
        }
        shift_register
    }

    /// Repairs `payload` using `redundancy` produced by [`encode_parity`].
    ///
    /// Fails with `UncorrectableShard` naming the first shard that could not
    /// be repaired; nothing is returned for the other shards in that case.
    ///
    /// [`encode_parity`]: ShardCodec::encode_parity
    pub fn correct(&self, payload: &[u8], redundancy: &[u8]) -> Result<Vec<u8>> {
        let expected_redundancy = self.redundancy_len(payload.len());
        if redundancy.len() != expected_redundancy {
            return Err(SteganographyError::MalformedHeader(format!(
                "expected {} redundancy bytes, got {}",
                expected_redundancy,
                redundancy.len()
            )));
        }

        let mut corrected_payload = Vec::with_capacity(payload.len());
        for (shard_index, (shard, parity)) in payload
            .chunks(self.shard_size)
            .zip(redundancy.chunks(self.parity_len))
            .enumerate()
        {
            let mut codeword = Vec::with_capacity(shard.len() + self.parity_len);
            codeword.extend_from_slice(shard);
            codeword.extend_from_slice(parity);

            let corrected_errors = self.correct_codeword(&mut codeword).ok_or(
                SteganographyError::UncorrectableShard { index: shard_index },
            )?;
            if corrected_errors > 0 {
                tracing::debug!(shard_index, corrected_errors, "repaired ECC shard");
            }

            corrected_payload.extend_from_slice(&codeword[..shard.len()]);
        }

        Ok(corrected_payload)
    }

    /// Corrects `codeword` in place, returning the number of repaired symbols
    fn correct_codeword(&self, codeword: &mut [u8]) -> Option<usize> {
        let syndromes = self.syndromes(codeword);
        if syndromes.iter().all(|&syndrome| syndrome == 0) {
            return Some(0);
        }

        let (error_locator, error_count) = berlekamp_massey(&syndromes);
        if error_count == 0 || error_count > self.correctable_symbols() {
            return None;
        }

        let codeword_len = codeword.len();
        let error_powers: Vec<usize> = (0..codeword_len)
            .filter(|&power| evaluate_ascending(&error_locator, gf_alpha_inv_pow(power)) == 0)
            .collect();
        // Roots outside the shortened codeword mean more errors than we can see
        if error_powers.len() != error_count {
            return None;
        }

        let magnitudes = forney_magnitudes(&error_locator, &syndromes, &error_powers)?;
        for (&power, &magnitude) in error_powers.iter().zip(&magnitudes) {
            codeword[codeword_len - 1 - power] ^= magnitude;
        }

        if self.syndromes(codeword).iter().any(|&syndrome| syndrome != 0) {
            return None;
        }
        Some(error_count)
    }

    /// S_i = r(alpha^i) for i in 0..parity_len
    fn syndromes(&self, codeword: &[u8]) -> Vec<u8> {
        (0..self.parity_len)
            .map(|power| evaluate_descending(codeword, gf_alpha_pow(power)))
            .collect()
    }
}

/// Error locator polynomial (ascending powers, constant term 1) and its
/// linear complexity.
fn berlekamp_massey(syndromes: &[u8]) -> (Vec<u8>, usize) {
    let syndrome_count = syndromes.len();
    let mut locator = vec![0u8; syndrome_count + 1];
    locator[0] = 1;
    let mut previous = vec![0u8; syndrome_count + 1];
    previous[0] = 1;

    let mut complexity = 0usize;
    let mut shift = 1usize;
    let mut previous_discrepancy = 1u8;

    for step in 0..syndrome_count {
        let mut discrepancy = syndromes[step];
        for term in 1..=complexity.min(step) {
            discrepancy ^= gf_mul(locator[term], syndromes[step - term]);
        }

        if discrepancy == 0 {
            shift += 1;
            continue;
        }

        let scale = gf_mul(discrepancy, gf_inv(previous_discrepancy));
        let snapshot = locator.clone();
        for (index, &previous_coefficient) in previous.iter().enumerate() {
            if index + shift > syndrome_count {
                break;
            }
            locator[index + shift] ^= gf_mul(scale, previous_coefficient);
        }

        if 2 * complexity <= step {
            complexity = step + 1 - complexity;
            previous = snapshot;
            previous_discrepancy = discrepancy;
            shift = 1;
        } else {
            shift += 1;
        }
    }

    locator.truncate(complexity + 1);
    (locator, complexity)
}

/// Error magnitudes with first consecutive root 0:
/// `e = X * Omega(X^-1) / Lambda'(X^-1)`.
fn forney_magnitudes(
    error_locator: &[u8],
    syndromes: &[u8],
    error_powers: &[usize],
) -> Option<Vec<u8>> {
    let syndrome_count = syndromes.len();

    // Omega(x) = S(x) * Lambda(x) mod x^(2t)
    let mut evaluator = vec![0u8; syndrome_count];
    for (locator_index, &locator_coefficient) in error_locator.iter().enumerate() {
        for (syndrome_index, &syndrome) in syndromes.iter().enumerate() {
            if locator_index + syndrome_index < syndrome_count {
                evaluator[locator_index + syndrome_index] ^= gf_mul(locator_coefficient, syndrome);
            }
        }
    }

    // Formal derivative: only odd powers survive in characteristic 2
    let mut derivative = vec![0u8; error_locator.len().saturating_sub(1)];
    for odd_power in (1..error_locator.len()).step_by(2) {
        derivative[odd_power - 1] = error_locator[odd_power];
    }

    error_powers
        .iter()
        .map(|&power| {
            let location = gf_alpha_pow(power);
            let location_inverse = gf_alpha_inv_pow(power);
            let denominator = evaluate_ascending(&derivative, location_inverse);
            if denominator == 0 {
                return None;
            }
            let numerator = evaluate_ascending(&evaluator, location_inverse);
            Some(gf_mul(location, gf_mul(numerator, gf_inv(denominator))))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload(length: usize) -> Vec<u8> {
        (0..length).map(|index| (index * 31 + 7) as u8).collect()
    }

    #[test]
    fn test_galois_inverse() {
        for value in 1..=255u8 {
            assert_eq!(gf_mul(value, gf_inv(value)), 1);
        }
    }

    #[test]
    fn test_clean_codeword_has_zero_syndromes() {
        let codec = ShardCodec::new(16, 6).unwrap();
        let payload = sample_payload(16);
        let mut codeword = payload.clone();
        codeword.extend(codec.encode_parity(&payload));
        assert!(codec.syndromes(&codeword).iter().all(|&syndrome| syndrome == 0));
    }

    #[test]
    fn test_redundancy_layout() {
        let codec = ShardCodec::new(10, 4).unwrap();
        assert_eq!(codec.shard_count(0), 0);
        assert_eq!(codec.shard_count(10), 1);
        assert_eq!(codec.shard_count(21), 3);
        assert_eq!(codec.redundancy_len(21), 12);
        assert_eq!(codec.encode_parity(&sample_payload(21)).len(), 12);
        assert!(codec.encode_parity(&[]).is_empty());
    }

    #[test]
    fn test_corrects_up_to_half_the_parity() {
        let codec = ShardCodec::new(32, 8).unwrap();
        let payload = sample_payload(70);
        let redundancy = codec.encode_parity(&payload);

        let mut corrupted = payload.clone();
        // Four errors in shard 0, four in shard 1, one in the short last shard
        for position in [0usize, 5, 17, 31, 32, 40, 50, 63, 69] {
            corrupted[position] ^= 0xA5;
        }

        assert_eq!(codec.correct(&corrupted, &redundancy).unwrap(), payload);
    }

    #[test]
    fn test_corrects_errors_in_parity_symbols() {
        let codec = ShardCodec::new(8, 4).unwrap();
        let payload = sample_payload(8);
        let mut redundancy = codec.encode_parity(&payload);
        redundancy[0] ^= 0x01;
        redundancy[3] ^= 0xFF;
        assert_eq!(codec.correct(&payload, &redundancy).unwrap(), payload);
    }

    #[test]
    fn test_single_symbol_with_two_parity_bytes() {
        let codec = ShardCodec::new(16, 2).unwrap();
        let payload = sample_payload(40);
        let redundancy = codec.encode_parity(&payload);
        for position in 0..payload.len() {
            let mut corrupted = payload.clone();
            corrupted[position] ^= 0x10;
            assert_eq!(
                codec.correct(&corrupted, &redundancy).unwrap(),
                payload,
                "position {}",
                position
            );
        }
    }

    #[test]
    fn test_too_many_errors_never_return_original_silently() {
        let codec = ShardCodec::new(16, 4).unwrap();
        let payload = sample_payload(32);
        let redundancy = codec.encode_parity(&payload);
        let mut corrupted = payload.clone();
        for position in [16usize, 18, 20, 22, 24] {
            corrupted[position] ^= 0x3C;
        }
        match codec.correct(&corrupted, &redundancy) {
            Err(SteganographyError::UncorrectableShard { index }) => assert_eq!(index, 1),
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(recovered) => assert_ne!(recovered, payload),
        }
    }

    #[test]
    fn test_rejects_oversized_layout() {
        assert!(ShardCodec::new(250, 6).is_err());
        assert!(ShardCodec::new(0, 6).is_err());
        assert!(ShardCodec::new(16, 0).is_err());
        assert!(ShardCodec::new(223, 32).is_ok());
    }

    #[test]
    fn test_redundancy_length_mismatch_is_malformed() {
        let codec = ShardCodec::new(8, 2).unwrap();
        assert!(matches!(
            codec.correct(&sample_payload(8), &[0u8; 3]),
            Err(SteganographyError::MalformedHeader(_))
        ));
    }
}
