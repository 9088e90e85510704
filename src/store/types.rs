//! Entity types owned by the Snippet Store.

use serde::{Deserialize, Serialize};

use crate::fingerprint::MinHash;

/// A stored assembly snippet: its checksum, alias names, original code,
/// fingerprint, tags, and optional collection membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    /// SHA-256 hex digest of the normalized token stream; primary key.
    pub checksum: String,
    /// Alias names, in the order they were added. Never empty for a
    /// snippet that exists in the store.
    pub names: Vec<String>,
    /// Original, non-normalized source code.
    pub code: String,
    /// MinHash fingerprint of the current code.
    pub minhash: MinHash,
    /// Free-form tags, unordered and unique.
    pub tags: Vec<String>,
    /// Name of the collection this snippet belongs to, if any.
    pub collection: Option<String>,
}

/// A named group of snippets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Primary key.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// A historical snapshot of a snippet's code, retained across reindexing
/// or edits so the original can be recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetVersion {
    /// Monotonically increasing id, scoped to the store instance.
    pub id: u64,
    /// Checksum of the snippet this version belongs to.
    pub snippet_checksum: String,
    /// The code as it existed at this version.
    pub code: String,
    /// The MinHash fingerprint as it existed at this version.
    pub minhash: MinHash,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// Result of comparing two snippets directly (not via the LSH pipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Jaccard similarity estimate (`[0, 1]`) from the MinHash signatures.
    pub jaccard_similarity: f64,
    /// Levenshtein-ratio similarity (`[0, 100]`) over the raw code.
    pub levenshtein_score: f64,
    /// Hybrid blend (`[0, 100]`) of the two above.
    pub hybrid_score: f64,
    /// Structural similarity (`[0, 1]`) of the two snippets' control-flow
    /// graphs.
    pub cfg_similarity: f64,
    /// Count of distinct normalized tokens shared by both snippets.
    pub shared_normalized_tokens: usize,
}

/// Result of [`crate::store::SnippetStore::reindex`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReindexStats {
    /// Number of snippets whose MinHash was recomputed.
    pub num_reindexed: usize,
    /// Wall-clock time taken, in seconds.
    pub time_elapsed: f64,
    /// Mean time per snippet, in seconds (`0.0` when nothing was reindexed).
    pub avg_time_per_snippet: f64,
}

/// Aggregate statistics over the whole store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total number of stored snippets.
    pub num_snippets: usize,
    /// Mean length (in bytes) of stored code.
    pub avg_snippet_size: f64,
    /// Count of distinct normalized token types across the whole store.
    pub vocabulary_size: usize,
    /// Estimated mean pairwise Jaccard similarity over a random sample.
    pub avg_jaccard_similarity: f64,
}

/// Result of [`crate::store::SnippetStore::export`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportStats {
    /// Number of snippets successfully written.
    pub num_exported: usize,
    /// Wall-clock time taken, in seconds.
    pub time_elapsed: f64,
    /// Mean time per snippet, in seconds (`0.0` when nothing was exported).
    pub avg_time_per_snippet: f64,
}

/// Result of [`crate::store::SnippetStore::export_yara`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YaraExportStats {
    /// Number of rules written.
    pub num_exported: usize,
    /// Wall-clock time taken, in seconds.
    pub time_elapsed: f64,
    /// Mean time per rule, in seconds (`0.0` when nothing was exported).
    pub avg_time_per_snippet: f64,
}

/// Result of [`crate::store::SnippetStore::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Snippets inserted because no matching checksum existed.
    pub added: usize,
    /// Existing snippets whose names, tags, or collection changed.
    pub updated: usize,
    /// Existing snippets that matched the source exactly; left untouched.
    pub skipped: usize,
    /// Total snippet count in the source store.
    pub total_source: usize,
    /// Wall-clock time taken, in seconds.
    pub elapsed: f64,
}

/// A `(name, snippet_count)` pair as returned by
/// [`crate::store::SnippetStore::collection_list`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    /// Collection name.
    pub name: String,
    /// Description, as stored.
    pub description: String,
    /// Creation timestamp, as stored.
    pub created_at: String,
    /// Number of snippets currently assigned to this collection.
    pub snippet_count: usize,
}
