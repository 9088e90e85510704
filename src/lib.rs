//! # resembl: content-addressed assembly snippet search
//!
//! A similarity search engine for assembly-language snippets: snippets are
//! deduplicated by a checksum of their normalized token stream, fingerprinted
//! with a weighted-shingle MinHash, and indexed for approximate nearest
//! neighbor search with a banded LSH index. A lightweight control-flow graph
//! extractor and an exact Levenshtein ratio round out a hybrid similarity
//! score used to rank candidates.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        Snippet Store                         │
//! │   (checksum-keyed: names, tags, collections, versions)       │
//! ├───────────────┬───────────────┬───────────────┬──────────────┤
//! │  asm          │  fingerprint  │  cfg          │  similarity  │
//! │  tokenizer/   │  MinHash      │  control-flow │  Jaccard,    │
//! │  normalizer   │  builder      │  extraction   │  Levenshtein,│
//! │               │               │               │  hybrid      │
//! ├───────────────┴───────────────┴───────────────┴──────────────┤
//! │  lsh: banded candidate index + persistent cache               │
//! ├────────────────────────────────────────────────────────────────┤
//! │  pipeline: find_matches orchestration                         │
//! │  merge: cross-store merge engine                               │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```
//! use resembl_core::store::{InMemorySession, SnippetStore};
//!
//! let mut store = SnippetStore::new(InMemorySession::new());
//! let snippet = store.add("memcpy", "REP MOVSB", 3).unwrap();
//! assert_eq!(snippet.names, vec!["memcpy".to_string()]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_arguments)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

// Memory allocator selection.
#[cfg(feature = "mimalloc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Assembly tokenization and normalization.
pub mod asm;

/// Control-flow graph extraction.
pub mod cfg;

/// Errors and configuration shared by the rest of the crate.
pub mod core;

/// Weighted-shingle MinHash fingerprint builder.
pub mod fingerprint;

/// Banded LSH candidate index and its persistent cache.
pub mod lsh;

/// Cross-store merge engine.
pub mod merge;

/// The `find_matches` query pipeline.
pub mod pipeline;

/// Similarity kernels: Jaccard, Levenshtein ratio, CFG structural
/// similarity, and the hybrid blend.
pub mod similarity;

/// The Snippet Store: checksum-keyed persistence for snippets,
/// collections, tags, names, and version history.
pub mod store;

pub use core::config::ResemblConfig;
pub use core::errors::{ResemblError, Result};

/// Library version, taken from the crate's own manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
