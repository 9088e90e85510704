//! Weighted n-gram shingle → MinHash fingerprint builder.
//!
//! Shaped like a `MinHashSignature` newtype over a fixed-width `Vec<u64>`,
//! built with seeded `xxhash-rust` hashing, but with a discrete
//! rare/common instruction weighting scheme in place of continuous TF-IDF
//! weighting.

mod instructions;

pub use instructions::{is_common, is_rare, COMMON_INSTRUCTIONS, RARE_INSTRUCTIONS};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::asm;

/// Width of every MinHash signature produced by this crate.
pub const NUM_PERMUTATIONS: usize = 128;

/// Default shingle (k-gram) size.
pub const DEFAULT_NGRAM_SIZE: usize = 3;

/// A fixed-width MinHash signature over weighted shingles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinHash {
    /// One minimum hash value per permutation.
    signature: Vec<u64>,
}

impl MinHash {
    fn with_width(num_permutations: usize) -> Self {
        Self {
            signature: vec![u64::MAX; num_permutations],
        }
    }

    /// Insert a single element into the signature, updating every
    /// permutation's running minimum.
    fn update(&mut self, element: &[u8]) {
        for (i, slot) in self.signature.iter_mut().enumerate() {
            let h = xxh3_64_with_seed(element, i as u64);
            if h < *slot {
                *slot = h;
            }
        }
    }

    /// The raw signature values, in permutation order.
    pub fn values(&self) -> &[u64] {
        &self.signature
    }

    /// Number of permutations in this signature.
    pub fn len(&self) -> usize {
        self.signature.len()
    }

    /// True when this signature has zero permutations (never constructed
    /// by this crate, but kept for `len`/`is_empty` symmetry).
    pub fn is_empty(&self) -> bool {
        self.signature.is_empty()
    }
}

/// Compute the discrete shingle weight `w ∈ {1, 2, 3}` for a single
/// space-joined shingle string.
///
/// - `3` if any token in the shingle is in [`RARE_INSTRUCTIONS`].
/// - `1` if every token is in [`COMMON_INSTRUCTIONS`] (vacuously true for
///   an empty shingle).
/// - `2` otherwise.
pub fn shingle_weight(shingle: &str) -> u8 {
    let tokens: Vec<&str> = shingle.split_whitespace().collect();
    if tokens.iter().any(|t| is_rare(t)) {
        return 3;
    }
    if tokens.iter().all(|t| is_common(t)) {
        return 1;
    }
    2
}

/// Build the set of weighted k-gram shingles for a normalized token
/// stream, collapsing duplicates.
fn shingles(tokens: &[String], k: usize) -> Vec<String> {
    if tokens.len() < k {
        return vec![tokens.join(" ")];
    }
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for window in tokens.windows(k) {
        let shingle = window.join(" ");
        if seen.insert(shingle.clone()) {
            out.push(shingle);
        }
    }
    out
}

/// Build a [`MinHash`] fingerprint for `code`.
///
/// `ngram_size` is the shingle width `k` (default [`DEFAULT_NGRAM_SIZE`]);
/// `num_permutations` is the signature width (default
/// [`NUM_PERMUTATIONS`]); `normalize` is forwarded to [`asm::tokenize`] —
/// `false` fingerprints the raw (uppercased-only) token stream instead of
/// the register/immediate/label/size-prefix-collapsed one.
pub fn build_minhash(code: &str, ngram_size: usize, num_permutations: usize, normalize: bool) -> MinHash {
    let tokens = asm::tokenize(code, normalize);
    let mut mh = MinHash::with_width(num_permutations);

    if tokens.is_empty() {
        return mh;
    }

    for shingle in shingles(&tokens, ngram_size.max(1)) {
        let weight = shingle_weight(&shingle);
        let bytes = shingle.as_bytes();
        for _ in 0..weight {
            mh.update(bytes);
        }
    }
    mh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rare_and_common_sets_are_disjoint() {
        assert!(RARE_INSTRUCTIONS.is_disjoint(&COMMON_INSTRUCTIONS));
    }

    #[test]
    fn shingle_weight_maps_into_closed_set() {
        for w in [
            shingle_weight("MOV REG CPUID"),
            shingle_weight("MOV REG IMM"),
            shingle_weight("MOV STOSB REG"),
            shingle_weight(""),
        ] {
            assert!((1..=3).contains(&w));
        }
    }

    #[test]
    fn shingle_weight_rare_dominates() {
        assert_eq!(shingle_weight("MOV REG CPUID"), 3);
        assert_eq!(shingle_weight("RDTSC REG IMM"), 3);
        assert_eq!(shingle_weight("INT IMM RET"), 3);
    }

    #[test]
    fn shingle_weight_all_common_is_one() {
        assert_eq!(shingle_weight("MOV REG IMM"), 1);
        assert_eq!(shingle_weight("PUSH POP NOP"), 1);
        assert_eq!(shingle_weight("ADD SUB XOR"), 1);
    }

    #[test]
    fn shingle_weight_mixed_is_two() {
        assert_eq!(shingle_weight("MOV STOSB REG"), 2);
        assert_eq!(shingle_weight("REP STOSD NOP"), 2);
    }

    #[test]
    fn shingle_weight_empty_is_one() {
        assert_eq!(shingle_weight(""), 1);
    }

    #[test]
    fn shingle_weight_single_token() {
        assert_eq!(shingle_weight("CPUID"), 3);
        assert_eq!(shingle_weight("MOV"), 1);
    }

    #[test]
    fn short_snippet_falls_back_to_whole_concatenation() {
        let mh = build_minhash("mov eax", 3, 16, true);
        assert_eq!(mh.len(), 16);
        // Only one element was ever inserted; every permutation's minimum
        // equals the hash of that single element, so the signature is
        // still well-formed (no longer all-MAX).
        assert!(mh.values().iter().all(|&v| v != u64::MAX));
    }

    #[test]
    fn empty_code_yields_all_max_signature() {
        let mh = build_minhash("", 3, 8, true);
        assert!(mh.values().iter().all(|&v| v == u64::MAX));
    }

    #[test]
    fn build_is_deterministic() {
        let code = "mov eax, ebx\nadd eax, 1\nret";
        assert_eq!(
            build_minhash(code, 3, 32, true).values(),
            build_minhash(code, 3, 32, true).values()
        );
    }

    #[test]
    fn normalize_false_fingerprints_the_raw_token_stream() {
        // Register-renamed variants collapse to the same shingles when
        // normalized, but stay distinguishable when they don't.
        let a = build_minhash("mov eax, ebx", 3, 32, true);
        let b = build_minhash("mov ecx, edx", 3, 32, true);
        assert_eq!(a.values(), b.values());

        let raw_a = build_minhash("mov eax, ebx", 3, 32, false);
        let raw_b = build_minhash("mov ecx, edx", 3, 32, false);
        assert_ne!(raw_a.values(), raw_b.values());
    }
}
