//! Similarity kernels: MinHash Jaccard, Levenshtein ratio, CFG-structural
//! similarity, and the hybrid blend.
//!
//! None of these ever fail on content — degenerate inputs (two empty CFGs,
//! zero-length strings) produce well-defined outputs rather than errors,
//! matching the propagation policy in the core error design.

use crate::cfg::ControlFlowGraph;
use crate::fingerprint::MinHash;

/// Default weight given to the Jaccard component of [`hybrid`].
pub const DEFAULT_JACCARD_WEIGHT: f64 = 0.4;

/// Estimate the Jaccard index of the weighted shingle multisets behind two
/// [`MinHash`] signatures by counting matching permutation slots.
///
/// Equal-width signatures are compared slot-by-slot; mismatched widths are
/// not comparable and yield `0.0` rather than panicking.
pub fn jaccard(a: &MinHash, b: &MinHash) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let matching = a
        .values()
        .iter()
        .zip(b.values().iter())
        .filter(|(x, y)| x == y)
        .count();
    matching as f64 / a.len() as f64
}

/// Percentage similarity (`[0, 100]`) between two strings derived from
/// Levenshtein edit distance over the **original**, non-normalized text.
pub fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let total = len_a + len_b;
    if total == 0 {
        return 100.0;
    }
    let distance = edit_distance::edit_distance(a, b);
    (((total as f64) - distance as f64) / total as f64 * 100.0).clamp(0.0, 100.0)
}

fn ratio(min: usize, max: usize) -> f64 {
    if max == 0 {
        1.0
    } else {
        min as f64 / max as f64
    }
}

/// Cosine similarity of two block-size histograms, binned by exact block
/// size over `[0, max_size]`.
fn block_size_histogram_cosine(a: &[usize], b: &[usize]) -> f64 {
    let max_size = a.iter().chain(b.iter()).copied().max().unwrap_or(0);
    let mut hist_a = vec![0u32; max_size + 1];
    let mut hist_b = vec![0u32; max_size + 1];
    for &s in a {
        hist_a[s] += 1;
    }
    for &s in b {
        hist_b[s] += 1;
    }

    let dot: f64 = hist_a
        .iter()
        .zip(hist_b.iter())
        .map(|(&x, &y)| (x as f64) * (y as f64))
        .sum();
    let norm_a: f64 = hist_a.iter().map(|&x| (x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = hist_b.iter().map(|&x| (x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return if norm_a == 0.0 && norm_b == 0.0 { 1.0 } else { 0.0 };
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Structural similarity (`[0, 1]`) between two coarse control-flow graphs:
/// the equal-weighted average of block-count ratio, edge-count ratio, and
/// block-size histogram cosine similarity.
///
/// Two empty graphs are identical by convention (`1.0`); exactly one empty
/// graph is maximally dissimilar (`0.0`).
pub fn cfg_similarity(a: &ControlFlowGraph, b: &ControlFlowGraph) -> f64 {
    if a.num_blocks == 0 && b.num_blocks == 0 {
        return 1.0;
    }
    if a.num_blocks == 0 || b.num_blocks == 0 {
        return 0.0;
    }

    let block_ratio = ratio(
        a.num_blocks.min(b.num_blocks),
        a.num_blocks.max(b.num_blocks),
    );

    let edge_ratio = if a.num_edges == 0 && b.num_edges == 0 {
        1.0
    } else if a.num_edges == 0 || b.num_edges == 0 {
        0.0
    } else {
        ratio(a.num_edges.min(b.num_edges), a.num_edges.max(b.num_edges))
    };

    let histogram_similarity = block_size_histogram_cosine(&a.block_sizes, &b.block_sizes);

    (block_ratio + edge_ratio + histogram_similarity) / 3.0
}

/// Convex combination of Jaccard (scaled to `0-100`) and the Levenshtein
/// ratio, with `jaccard_weight` controlling the blend. Output is clamped to
/// `[0, 100]`.
pub fn hybrid(jaccard_value: f64, levenshtein_value: f64, jaccard_weight: f64) -> f64 {
    let blended = jaccard_weight * (jaccard_value * 100.0) + (1.0 - jaccard_weight) * levenshtein_value;
    blended.clamp(0.0, 100.0)
}
