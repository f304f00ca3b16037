//! MinHash signatures and a banded LSH index over them.

use std::collections::HashMap;

use crate::error::DetectionError;

const MERSENNE_PRIME: u64 = (1 << 61) - 1;
const MAX_HASH: u64 = (1 << 32) - 1;
const PERMUTATION_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Universal-hash permutation parameters `(a, b)`, generated from a fixed seed
/// so signatures are stable across processes.
#[derive(Debug, Clone)]
pub struct Permutations {
    params: Vec<(u64, u64)>,
}

impl Permutations {
    pub fn new(num_permutations: usize) -> Result<Self, DetectionError> {
        if num_permutations < 2 {
            return Err(DetectionError::InvalidConfig(format!(
                "num_permutations must be at least 2, got {}",
                num_permutations
            )));
        }

        let mut state = PERMUTATION_SEED;
        let params = (0..num_permutations)
            .map(|_| {
                let a = 1 + splitmix64(&mut state) % (MERSENNE_PRIME - 1);
                let b = splitmix64(&mut state) % MERSENNE_PRIME;
                (a, b)
            })
            .collect();
        Ok(Self { params })
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Signature of a shingle set. Duplicates and order do not matter.
    pub fn signature<S: AsRef<str>>(&self, shingles: &[S]) -> Signature {
        let mut values = vec![MAX_HASH; self.params.len()];
        for shingle in shingles {
            let h = shingle_hash(shingle.as_ref()) as u128;
            for (slot, (a, b)) in values.iter_mut().zip(&self.params) {
                let permuted =
                    ((*a as u128 * h + *b as u128) % MERSENNE_PRIME as u128) as u64 & MAX_HASH;
                if permuted < *slot {
                    *slot = permuted;
                }
            }
        }
        Signature { values }
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn shingle_hash(shingle: &str) -> u64 {
    let digest = blake3::hash(shingle.as_bytes());
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&digest.as_bytes()[..4]);
    u32::from_le_bytes(bytes) as u64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    values: Vec<u64>,
}

impl Signature {
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// Estimated Jaccard similarity: the fraction of agreeing slots.
    pub fn jaccard(&self, other: &Signature) -> f64 {
        if self.values.is_empty() || self.values.len() != other.values.len() {
            return 0.0;
        }
        let agree = self
            .values
            .iter()
            .zip(&other.values)
            .filter(|(a, b)| a == b)
            .count();
        agree as f64 / self.values.len() as f64
    }
}

/// Band/row split of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandParams {
    pub bands: usize,
    pub rows: usize,
}

const INTEGRATION_STEPS: usize = 200;

fn integrate(f: impl Fn(f64) -> f64, from: f64, to: f64) -> f64 {
    if to <= from {
        return 0.0;
    }
    let step = (to - from) / INTEGRATION_STEPS as f64;
    (0..INTEGRATION_STEPS)
        .map(|i| f(from + (i as f64 + 0.5) * step) * step)
        .sum()
}

fn collision_probability(s: f64, params: BandParams) -> f64 {
    1.0 - (1.0 - s.powi(params.rows as i32)).powi(params.bands as i32)
}

impl BandParams {
    /// Picks bands and rows minimising the equally weighted false positive and
    /// false negative areas around `threshold`.
    pub fn optimal(threshold: f64, num_permutations: usize) -> Self {
        let mut best = BandParams {
            bands: 1,
            rows: num_permutations.max(1),
        };
        let mut best_error = f64::INFINITY;

        for bands in 1..=num_permutations {
            for rows in 1..=(num_permutations / bands) {
                let params = BandParams { bands, rows };
                let false_positive =
                    integrate(|s| collision_probability(s, params), 0.0, threshold);
                let false_negative =
                    integrate(|s| 1.0 - collision_probability(s, params), threshold, 1.0);
                let error = 0.5 * false_positive + 0.5 * false_negative;
                if error < best_error {
                    best_error = error;
                    best = params;
                }
            }
        }
        best
    }
}

/// LSH index for one detection run. Candidates found through band collisions
/// are verified against the threshold before being returned.
#[derive(Debug)]
pub struct LshIndex {
    threshold: f64,
    params: BandParams,
    buckets: Vec<HashMap<Vec<u64>, Vec<usize>>>,
    entries: Vec<(String, Signature)>,
}

impl LshIndex {
    pub fn new(threshold: f64, params: BandParams) -> Self {
        Self {
            threshold,
            params,
            buckets: vec![HashMap::new(); params.bands],
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, signature: Signature) {
        let index = self.entries.len();
        for (band, bucket) in self.buckets.iter_mut().enumerate() {
            bucket
                .entry(band_key(&signature, band, self.params.rows))
                .or_default()
                .push(index);
        }
        self.entries.push((key.into(), signature));
    }

    /// Keys of inserted entries with estimated Jaccard >= threshold, in
    /// insertion order.
    pub fn query(&self, signature: &Signature) -> Vec<String> {
        let mut candidates: Vec<usize> = self
            .buckets
            .iter()
            .enumerate()
            .filter_map(|(band, bucket)| bucket.get(&band_key(signature, band, self.params.rows)))
            .flatten()
            .copied()
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        candidates
            .into_iter()
            .filter_map(|i| {
                let (key, stored) = &self.entries[i];
                (stored.jaccard(signature) >= self.threshold).then(|| key.clone())
            })
            .collect()
    }
}

fn band_key(signature: &Signature, band: usize, rows: usize) -> Vec<u64> {
    let start = band * rows;
    signature.values[start..start + rows].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(perms: &Permutations, shingles: &[&str]) -> Signature {
        perms.signature(shingles)
    }

    #[test]
    fn test_signature_is_order_independent_and_deterministic() {
        let perms = Permutations::new(64).unwrap();
        let a = sig(&perms, &["a b", "b c", "c d"]);
        let b = sig(&perms, &["c d", "a b", "b c", "a b"]);
        assert_eq!(a, b);
        assert_eq!(a, sig(&Permutations::new(64).unwrap(), &["a b", "b c", "c d"]));
        assert_eq!(a.values().len(), 64);
    }

    #[test]
    fn test_jaccard_estimate() {
        let perms = Permutations::new(128).unwrap();
        let a = sig(&perms, &["x y", "y z"]);
        let b = sig(&perms, &["p q", "q r"]);
        assert_eq!(a.jaccard(&a), 1.0);
        assert!(a.jaccard(&b) < 0.2);
    }

    #[test]
    fn test_too_few_permutations() {
        assert!(Permutations::new(1).is_err());
    }

    #[test]
    fn test_optimal_params_fit_signature() {
        for threshold in [0.1, 0.5, 0.9] {
            let params = BandParams::optimal(threshold, 128);
            assert!(params.bands * params.rows <= 128);
            assert!(params.bands >= 1 && params.rows >= 1);
        }
        let loose = BandParams::optimal(0.2, 128);
        let strict = BandParams::optimal(0.9, 128);
        assert!(loose.rows <= strict.rows);
    }

    #[test]
    fn test_index_returns_only_verified_matches() {
        let perms = Permutations::new(128).unwrap();
        let mut index = LshIndex::new(0.5, BandParams::optimal(0.5, 128));
        let base = sig(&perms, &["a b", "b c", "c d", "d e"]);
        index.insert("s1", base.clone());
        index.insert("s2", sig(&perms, &["m n", "n o"]));

        assert_eq!(index.query(&base), vec!["s1".to_string()]);
        assert_eq!(index.len(), 2);
    }
}
