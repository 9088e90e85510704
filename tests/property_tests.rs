//! Property tests for tokenizer/checksum determinism and the bounded-output
//! invariants of the similarity kernels.

use proptest::prelude::*;
use resembl_core::fingerprint::{build_minhash, NUM_PERMUTATIONS};
use resembl_core::similarity;
use resembl_core::store::compute_checksum;
use resembl_core::{asm, cfg};

proptest! {
    /// Normalizing the same code twice always produces the same checksum.
    #[test]
    fn prop_checksum_is_deterministic(code in "[A-Za-z0-9 ,:\n]{0,200}") {
        let first = compute_checksum(&code);
        let second = compute_checksum(&code);
        prop_assert_eq!(first, second);
    }

    /// Tokenizing the same code twice always yields the same token stream,
    /// for both the normalized and raw variants.
    #[test]
    fn prop_tokenize_is_deterministic(code in "[A-Za-z0-9 ,:\n]{0,200}") {
        prop_assert_eq!(asm::tokenize(&code, true), asm::tokenize(&code, true));
        prop_assert_eq!(asm::tokenize(&code, false), asm::tokenize(&code, false));
    }

    /// Building a MinHash twice from the same code and n-gram size always
    /// produces byte-identical signatures.
    #[test]
    fn prop_minhash_is_deterministic(code in "[A-Za-z0-9 ,:\n]{0,200}", ngram_size in 1usize..6) {
        let first = build_minhash(&code, ngram_size, NUM_PERMUTATIONS, true);
        let second = build_minhash(&code, ngram_size, NUM_PERMUTATIONS, true);
        prop_assert_eq!(first, second);
    }

    /// Jaccard is always in `[0, 1]` and symmetric.
    #[test]
    fn prop_jaccard_is_bounded_and_symmetric(
        a in "[A-Za-z0-9 ,:\n]{0,200}",
        b in "[A-Za-z0-9 ,:\n]{0,200}",
        ngram_size in 1usize..6,
    ) {
        let mh_a = build_minhash(&a, ngram_size, NUM_PERMUTATIONS, true);
        let mh_b = build_minhash(&b, ngram_size, NUM_PERMUTATIONS, true);
        let forward = similarity::jaccard(&mh_a, &mh_b);
        let backward = similarity::jaccard(&mh_b, &mh_a);
        prop_assert!((0.0..=1.0).contains(&forward));
        prop_assert!((forward - backward).abs() < 1e-9);
    }

    /// Levenshtein ratio is always in `[0, 100]`.
    #[test]
    fn prop_levenshtein_ratio_is_bounded(a in ".{0,200}", b in ".{0,200}") {
        let ratio = similarity::levenshtein_ratio(&a, &b);
        prop_assert!((0.0..=100.0).contains(&ratio));
    }

    /// Hybrid score is always in `[0, 100]` for any weight in `[0, 1]` and
    /// any Jaccard/Levenshtein inputs drawn from their own valid ranges.
    #[test]
    fn prop_hybrid_score_is_bounded(
        jaccard_value in 0.0f64..=1.0,
        levenshtein_value in 0.0f64..=100.0,
        weight in 0.0f64..=1.0,
    ) {
        let score = similarity::hybrid(jaccard_value, levenshtein_value, weight);
        prop_assert!((0.0..=100.0).contains(&score));
    }

    /// CFG similarity is always in `[0, 1]` and symmetric, for any two
    /// pieces of (possibly malformed) assembly text.
    #[test]
    fn prop_cfg_similarity_is_bounded_and_symmetric(a in ".{0,200}", b in ".{0,200}") {
        let cfg_a = cfg::extract(&a);
        let cfg_b = cfg::extract(&b);
        let forward = similarity::cfg_similarity(&cfg_a, &cfg_b);
        let backward = similarity::cfg_similarity(&cfg_b, &cfg_a);
        prop_assert!((0.0..=1.0).contains(&forward));
        prop_assert!((forward - backward).abs() < 1e-9);
    }
}
