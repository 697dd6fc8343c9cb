//! Parity quantization shared by the DCT and DWT codecs.
//!
//! A coefficient carries one bit in the parity of its quantization level
//! `round(coefficient / step)`. Extraction tolerates any disturbance smaller
//! than half a step. Near saturated luminance the rounded and clamped
//! pixels can lose part of a coefficient move, so the codecs write through
//! [`embed_with_read_back`], which keeps trying nearby levels and a shifted
//! mean until the written pixels read back the intended bits.

/// Level magnitude used instead of zero when a zero bit lands on a
/// near-zero coefficient
const FLOOR_LEVEL: i64 = 2;

fn quantization_level(coefficient: f64, step: f64) -> i64 {
    (coefficient / step).round() as i64
}

/// Moves `coefficient` onto the nearest quantization level whose parity
/// equals `bit`, never onto level zero.
pub fn embed_parity(coefficient: f64, bit: u8, step: f64) -> f64 {
    let target_parity = (bit & 1) as i64;
    let level = quantization_level(coefficient, step);

    let mut chosen_level = if level.rem_euclid(2) == target_parity {
        level
    } else {
        let lower_level = level - 1;
        let upper_level = level + 1;
        if coefficient - lower_level as f64 * step < upper_level as f64 * step - coefficient {
            lower_level
        } else {
            upper_level
        }
    };

    if chosen_level == 0 {
        chosen_level = if coefficient < 0.0 {
            -FLOOR_LEVEL
        } else {
            FLOOR_LEVEL
        };
    }

    chosen_level as f64 * step
}

/// Reads the bit carried by `coefficient`
pub fn extract_parity(coefficient: f64, step: f64) -> u8 {
    quantization_level(coefficient, step).rem_euclid(2) as u8
}

/// Levels either side of the starting level tried when a write does not
/// read back
const SEARCH_RADIUS: i64 = 4;

/// Luminance added per retry round, toward mid-gray
const MEAN_SHIFT_STEP: f64 = 8.0;

/// Retry rounds after the unshifted one
const MEAN_SHIFT_ROUNDS: usize = 6;

/// Values tried for one carrying coefficient: the nearest level with the
/// right parity first, then every level within [`SEARCH_RADIUS`] by distance.
///
/// Levels of the wrong parity are included; clipping can shrink a move
/// onto the right level on read-back.
fn candidate_values(coefficient: f64, bit: u8, step: f64) -> Vec<f64> {
    let preferred_value = embed_parity(coefficient, bit, step);
    let level = quantization_level(coefficient, step);
    let mut nearby_values: Vec<f64> = (level - SEARCH_RADIUS..=level + SEARCH_RADIUS)
        .map(|candidate_level| candidate_level as f64 * step)
        .filter(|&value| value != preferred_value)
        .collect();
    nearby_values.sort_by(|left, right| {
        (left - coefficient)
            .abs()
            .total_cmp(&(right - coefficient).abs())
    });

    std::iter::once(preferred_value).chain(nearby_values).collect()
}

/// Every rank tuple over `candidate_counts`, lowest rank sum first
fn rank_combinations(candidate_counts: &[usize]) -> Vec<Vec<usize>> {
    let mut combinations: Vec<Vec<usize>> = vec![Vec::new()];
    for &candidate_count in candidate_counts {
        combinations = combinations
            .into_iter()
            .flat_map(|prefix| {
                (0..candidate_count).map(move |rank| {
                    let mut combination = prefix.clone();
                    combination.push(rank);
                    combination
                })
            })
            .collect();
    }
    combinations.sort_by_key(|ranks| ranks.iter().sum::<usize>());
    combinations
}

/// Embeds `bits` into the carrying `coefficients` of one block, checking
/// each attempt against what the written pixels actually read back.
///
/// `write_and_read_back(values, mean_shift)` must write the block with the
/// carrying coefficients set to `values` and `mean_shift` added to every
/// pixel's luminance, then return the carrying coefficients recomputed from
/// the stored pixels. The first attempt is the plain [`embed_parity`] write.
/// Returns `false` once the bounded search is exhausted; the block then
/// holds the last attempt and must not be handed out.
pub fn embed_with_read_back(
    coefficients: &[f64],
    bits: &[u8],
    step: f64,
    mean_luminance: f64,
    mut write_and_read_back: impl FnMut(&[f64], f64) -> Vec<f64>,
) -> bool {
    let candidates: Vec<Vec<f64>> = coefficients
        .iter()
        .zip(bits)
        .map(|(&coefficient, &bit)| candidate_values(coefficient, bit, step))
        .collect();
    let candidate_counts: Vec<usize> = candidates.iter().map(Vec::len).collect();
    let combinations = rank_combinations(&candidate_counts);
    let shift_direction = if mean_luminance > 127.5 { -1.0 } else { 1.0 };
    let mut values = vec![0f64; candidates.len()];

    for shift_round in 0..=MEAN_SHIFT_ROUNDS {
        let mean_shift = shift_direction * MEAN_SHIFT_STEP * shift_round as f64;
        for ranks in &combinations {
            for ((value, candidate_list), &rank) in values.iter_mut().zip(&candidates).zip(ranks) {
                *value = candidate_list[rank];
            }
            let read_back = write_and_read_back(&values, mean_shift);
            if read_back
                .iter()
                .zip(bits)
                .all(|(&coefficient, &bit)| extract_parity(coefficient, step) == bit & 1)
            {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f64 = 16.0;

    #[test]
    fn test_embedded_bit_reads_back() {
        for coefficient in [-200.0, -37.5, -8.0, -0.1, 0.0, 0.1, 7.9, 8.1, 23.0, 250.0] {
            for bit in [0u8, 1] {
                let embedded = embed_parity(coefficient, bit, STEP);
                assert_eq!(extract_parity(embedded, STEP), bit, "{} <- {}", coefficient, bit);
            }
        }
    }

    #[test]
    fn test_never_collapses_to_zero() {
        assert_eq!(embed_parity(0.0, 0, STEP), 2.0 * STEP);
        assert_eq!(embed_parity(-3.0, 0, STEP), -2.0 * STEP);
        assert_eq!(embed_parity(0.0, 1, STEP), STEP);
        assert!(embed_parity(-1.0, 1, STEP) != 0.0);
    }

    #[test]
    fn test_survives_disturbance_below_half_step() {
        for coefficient in [-90.0, -3.0, 0.0, 14.0, 61.0] {
            for bit in [0u8, 1] {
                let embedded = embed_parity(coefficient, bit, STEP);
                for disturbance in [-7.9, -4.0, 0.0, 4.0, 7.9] {
                    assert_eq!(extract_parity(embedded + disturbance, STEP), bit);
                }
            }
        }
    }

    #[test]
    fn test_moves_to_nearest_matching_level() {
        // Level 2 (32.0) is even; a 1 bit goes to 3*16 = 48 since 37 is closer to 48 than to 16
        assert_eq!(embed_parity(37.0, 1, STEP), 48.0);
        assert_eq!(embed_parity(27.0, 1, STEP), 16.0);
        assert_eq!(embed_parity(32.0, 0, STEP), 32.0);
    }

    #[test]
    fn test_candidates_start_with_preferred_level() {
        let candidates = candidate_values(37.0, 1, STEP);
        assert_eq!(candidates[0], 48.0);
        assert_eq!(candidates[1], 32.0);
        assert_eq!(candidates.len(), 2 * SEARCH_RADIUS as usize + 1);
    }

    #[test]
    fn test_rank_combinations_lowest_sum_first() {
        let combinations = rank_combinations(&[3, 3]);
        assert_eq!(combinations.len(), 9);
        assert_eq!(combinations[0], vec![0, 0]);
        assert_eq!(combinations[1..3], [vec![0, 1], vec![1, 0]]);
        assert_eq!(combinations[8], vec![2, 2]);
    }

    #[test]
    fn test_read_back_search_stops_at_first_success() {
        let mut attempts = 0;
        let embedded = embed_with_read_back(&[5.0], &[1], STEP, 100.0, |values, mean_shift| {
            attempts += 1;
            assert_eq!(mean_shift, 0.0);
            values.to_vec()
        });
        assert!(embedded);
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_read_back_search_shifts_mean_toward_mid_gray() {
        // Only a block pulled at least 16 below white reads back the bit
        let mut shifts = Vec::new();
        let embedded = embed_with_read_back(&[0.0], &[1], STEP, 255.0, |values, mean_shift| {
            shifts.push(mean_shift);
            if mean_shift <= -16.0 {
                values.to_vec()
            } else {
                vec![0.0]
            }
        });
        assert!(embedded);
        assert_eq!(*shifts.last().unwrap(), -16.0);
        assert!(shifts.iter().all(|&shift| shift <= 0.0));
    }

    #[test]
    fn test_read_back_search_is_bounded() {
        let mut attempts = 0usize;
        let embedded = embed_with_read_back(&[0.0, 0.0], &[1, 1], STEP, 0.0, |values, _| {
            attempts += 1;
            vec![0.0; values.len()]
        });
        assert!(!embedded);
        let combinations = (2 * SEARCH_RADIUS as usize + 1).pow(2);
        assert_eq!(attempts, combinations * (MEAN_SHIFT_ROUNDS + 1));
    }
}
