//! The Snippet Store: checksum-keyed persistence for snippets,
//! collections, tags, names, and version history.
//!
//! This module owns all domain rules (deduplication, name/tag semantics,
//! cache invalidation) on top of the narrow [`SnippetStoreSession`]
//! table contract, the same way a detector sits on top of a plain
//! graph/index primitive rather than owning storage itself.

mod session;
mod types;

pub use session::{InMemorySession, SnippetStoreSession};
pub use types::{
    Collection, CollectionSummary, Comparison, ExportStats, MergeStats, ReindexStats, Snippet,
    SnippetVersion, StoreStats, YaraExportStats,
};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::warn;
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::asm;
use crate::core::errors::{ResemblError, Result};
use crate::fingerprint::{self, build_minhash};
use crate::similarity;

const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Checksum of the normalized token stream of `code`.
pub fn compute_checksum(code: &str) -> String {
    let normalized = asm::normalize(code);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// The Snippet Store, generic over the storage-engine session that backs
/// it.
pub struct SnippetStore<S: SnippetStoreSession> {
    session: S,
    cache_dir: PathBuf,
}

impl<S: SnippetStoreSession> SnippetStore<S> {
    /// Build a store over `session`, using the default LSH cache
    /// directory (see [`crate::lsh::cache_dir`]).
    pub fn new(session: S) -> Self {
        Self::with_cache_dir(session, crate::lsh::cache_dir())
    }

    /// Build a store over `session` with an explicit cache directory
    /// (mainly for tests).
    pub fn with_cache_dir(session: S, cache_dir: PathBuf) -> Self {
        Self { session, cache_dir }
    }

    /// Borrow the underlying session.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// The directory this store's LSH cache lives in.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Mutably borrow the underlying session. Exposed so neighboring
    /// components (the merge engine, bulk import) can perform row-level
    /// operations the named API above doesn't cover, without duplicating
    /// the `SnippetStoreSession` contract.
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Consume the store, returning the underlying session.
    pub fn into_session(self) -> S {
        self.session
    }

    /// Delete every file in the LSH cache directory. Best-effort: a
    /// missing cache directory is not an error, but a filesystem failure
    /// is logged and swallowed, since cache invalidation is a performance
    /// concern, not a correctness one (a stale cache is still digest
    /// checked on load).
    pub fn invalidate_cache(&self) {
        if let Err(err) = crate::lsh::invalidate(&self.cache_dir) {
            warn!("failed to invalidate LSH cache at {:?}: {err}", self.cache_dir);
        }
    }

    /// The corpus digest used to validate the LSH cache: `"empty"` when
    /// the store has no snippets, otherwise `"<count>-<max checksum>"`.
    pub fn corpus_digest(&self) -> String {
        let snippets = self.session.all_snippets();
        if snippets.is_empty() {
            return "empty".to_string();
        }
        let max_checksum = snippets
            .iter()
            .map(|s| s.checksum.as_str())
            .max()
            .unwrap_or("");
        format!("{}-{}", snippets.len(), max_checksum)
    }

    /// Add a new snippet, or alias `name` onto an existing one with the
    /// same checksum. Returns `None` for blank code.
    pub fn add(&mut self, name: &str, code: &str, ngram_size: usize) -> Option<Snippet> {
        if code.trim().is_empty() {
            return None;
        }
        let checksum = compute_checksum(code);

        if let Some(mut existing) = self.session.get_snippet(&checksum) {
            if !name.is_empty() && !existing.names.contains(&name.to_string()) {
                existing.names.push(name.to_string());
                self.session.put_snippet(existing.clone());
            }
            return Some(existing);
        }

        let minhash = build_minhash(code, ngram_size, fingerprint::NUM_PERMUTATIONS, true);
        Some(self.insert_new(checksum, name, code, minhash))
    }

    /// Build, store, version-snapshot, and invalidate-cache for a brand
    /// new snippet. Shared by [`Self::add`] and [`Self::add_prehashed`] —
    /// both refuse blank code and alias onto an existing checksum before
    /// reaching this point.
    fn insert_new(&mut self, checksum: String, name: &str, code: &str, minhash: fingerprint::MinHash) -> Snippet {
        let snippet = Snippet {
            checksum,
            names: vec![name.to_string()],
            code: code.to_string(),
            minhash,
            tags: Vec::new(),
            collection: None,
        };
        self.session.put_snippet(snippet.clone());
        self.snapshot_version(&snippet.checksum);
        self.invalidate_cache();
        snippet
    }

    /// Same dedup/alias semantics as [`Self::add`], but takes a
    /// precomputed MinHash instead of building one. Lets bulk importers
    /// fingerprint many snippets on a thread pool and then insert them
    /// one at a time without redoing that work.
    pub fn add_prehashed(&mut self, name: &str, code: &str, minhash: fingerprint::MinHash) -> Option<Snippet> {
        if code.trim().is_empty() {
            return None;
        }
        let checksum = compute_checksum(code);

        if let Some(mut existing) = self.session.get_snippet(&checksum) {
            if !name.is_empty() && !existing.names.contains(&name.to_string()) {
                existing.names.push(name.to_string());
                self.session.put_snippet(existing.clone());
            }
            return Some(existing);
        }

        Some(self.insert_new(checksum, name, code, minhash))
    }

    /// Exact-match lookup.
    pub fn get(&self, checksum: &str) -> Option<Snippet> {
        self.session.get_snippet(checksum)
    }

    /// Resolve a checksum prefix to the single snippet checksum it
    /// matches. `NotFound` if nothing matches, `Ambiguous` if more than
    /// one does.
    pub fn resolve_prefix(&self, prefix: &str) -> Result<String> {
        if let Some(snippet) = self.session.get_snippet(prefix) {
            return Ok(snippet.checksum);
        }
        let matches: Vec<String> = self
            .session
            .all_snippets()
            .into_iter()
            .filter(|s| s.checksum.starts_with(prefix))
            .map(|s| s.checksum)
            .collect();
        match matches.len() {
            0 => Err(ResemblError::not_found(format!(
                "no snippet matches checksum prefix '{prefix}'"
            ))),
            1 => Ok(matches.into_iter().next().unwrap()),
            count => Err(ResemblError::ambiguous(prefix, count)),
        }
    }

    /// Remove a snippet entirely.
    pub fn delete(&mut self, checksum: &str) -> bool {
        let removed = self.session.remove_snippet(checksum).is_some();
        if removed {
            self.invalidate_cache();
        }
        removed
    }

    /// List snippets in storage order. `(0, 0)` means everything;
    /// otherwise the half-open range `[start, end)`.
    pub fn list(&self, start: usize, end: usize) -> Vec<Snippet> {
        let all = self.session.all_snippets();
        if end == 0 {
            return all;
        }
        let start = start.min(all.len());
        let end = end.min(all.len());
        if start >= end {
            return Vec::new();
        }
        all[start..end].to_vec()
    }

    /// Substring search over the serialized names list.
    pub fn search_by_name(&self, pattern: &str) -> Vec<Snippet> {
        self.session
            .all_snippets()
            .into_iter()
            .filter(|s| {
                let encoded = serde_json::to_string(&s.names).unwrap_or_default();
                encoded.contains(pattern)
            })
            .collect()
    }

    /// Append a name, refusing a duplicate.
    pub fn name_add(&mut self, checksum: &str, name: &str) -> Result<Snippet> {
        let mut snippet = self
            .session
            .get_snippet(checksum)
            .ok_or_else(|| ResemblError::not_found(format!("no snippet with checksum {checksum}")))?;
        if snippet.names.contains(&name.to_string()) {
            return Err(ResemblError::duplicate(format!(
                "name '{name}' already exists for this snippet"
            )));
        }
        snippet.names.push(name.to_string());
        self.session.put_snippet(snippet.clone());
        Ok(snippet)
    }

    /// Remove a name, refusing to drop the last one.
    pub fn name_remove(&mut self, checksum: &str, name: &str) -> Result<Snippet> {
        let mut snippet = self
            .session
            .get_snippet(checksum)
            .ok_or_else(|| ResemblError::not_found(format!("no snippet with checksum {checksum}")))?;
        if !snippet.names.contains(&name.to_string()) {
            return Err(ResemblError::not_found(format!(
                "name '{name}' not found for this snippet"
            )));
        }
        if snippet.names.len() == 1 {
            return Err(ResemblError::LastNameProtected {
                checksum: checksum.to_string(),
            });
        }
        snippet.names.retain(|n| n != name);
        self.session.put_snippet(snippet.clone());
        Ok(snippet)
    }

    /// Add a tag; idempotent.
    pub fn tag_add(&mut self, checksum: &str, tag: &str) -> Result<Snippet> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(ResemblError::blank_input("tag must not be blank"));
        }
        let mut snippet = self
            .session
            .get_snippet(checksum)
            .ok_or_else(|| ResemblError::not_found(format!("no snippet with checksum {checksum}")))?;
        if !snippet.tags.iter().any(|t| t == tag) {
            snippet.tags.push(tag.to_string());
            self.session.put_snippet(snippet.clone());
        }
        Ok(snippet)
    }

    /// Remove a tag; idempotent (removing an absent tag still succeeds).
    pub fn tag_remove(&mut self, checksum: &str, tag: &str) -> Result<Snippet> {
        let mut snippet = self
            .session
            .get_snippet(checksum)
            .ok_or_else(|| ResemblError::not_found(format!("no snippet with checksum {checksum}")))?;
        if snippet.tags.iter().any(|t| t == tag) {
            snippet.tags.retain(|t| t != tag);
            self.session.put_snippet(snippet.clone());
        }
        Ok(snippet)
    }

    /// Create a new collection.
    pub fn collection_create(&mut self, name: &str, description: &str) -> Collection {
        let collection = Collection {
            name: name.to_string(),
            description: description.to_string(),
            created_at: now(),
        };
        self.session.put_collection(collection.clone());
        collection
    }

    /// Delete a collection, unassigning any member snippets.
    pub fn collection_delete(&mut self, name: &str) -> bool {
        let removed = self.session.remove_collection(name).is_some();
        if removed {
            for mut snippet in self.session.all_snippets() {
                if snippet.collection.as_deref() == Some(name) {
                    snippet.collection = None;
                    self.session.put_snippet(snippet);
                }
            }
        }
        removed
    }

    /// List all collections with their current snippet counts.
    pub fn collection_list(&self) -> Vec<CollectionSummary> {
        let snippets = self.session.all_snippets();
        self.session
            .all_collections()
            .into_iter()
            .map(|c| {
                let snippet_count = snippets
                    .iter()
                    .filter(|s| s.collection.as_deref() == Some(c.name.as_str()))
                    .count();
                CollectionSummary {
                    name: c.name,
                    description: c.description,
                    created_at: c.created_at,
                    snippet_count,
                }
            })
            .collect()
    }

    /// Assign a snippet to a collection. `None` if either is missing.
    pub fn collection_add_snippet(&mut self, collection_name: &str, checksum: &str) -> Option<Snippet> {
        self.session.get_collection(collection_name)?;
        let mut snippet = self.session.get_snippet(checksum)?;
        snippet.collection = Some(collection_name.to_string());
        self.session.put_snippet(snippet.clone());
        Some(snippet)
    }

    /// Clear a snippet's collection assignment. `None` if the snippet is
    /// missing.
    pub fn collection_remove_snippet(&mut self, checksum: &str) -> Option<Snippet> {
        let mut snippet = self.session.get_snippet(checksum)?;
        snippet.collection = None;
        self.session.put_snippet(snippet.clone());
        Some(snippet)
    }

    /// Direct pairwise comparison of two stored snippets.
    pub fn compare(&self, checksum1: &str, checksum2: &str, jaccard_weight: f64) -> Option<Comparison> {
        let s1 = self.session.get_snippet(checksum1)?;
        let s2 = self.session.get_snippet(checksum2)?;

        let jaccard_similarity = similarity::jaccard(&s1.minhash, &s2.minhash);
        let levenshtein_score = similarity::levenshtein_ratio(&s1.code, &s2.code);
        let hybrid_score = similarity::hybrid(jaccard_similarity, levenshtein_score, jaccard_weight);

        let cfg1 = crate::cfg::extract(&s1.code);
        let cfg2 = crate::cfg::extract(&s2.code);
        let cfg_similarity = similarity::cfg_similarity(&cfg1, &cfg2);

        let tokens1: HashSet<String> = asm::tokenize(&s1.code, true).into_iter().collect();
        let tokens2: HashSet<String> = asm::tokenize(&s2.code, true).into_iter().collect();
        let shared_normalized_tokens = tokens1.intersection(&tokens2).count();

        Some(Comparison {
            jaccard_similarity,
            levenshtein_score,
            hybrid_score,
            cfg_similarity,
            shared_normalized_tokens,
        })
    }

    /// Recompute every snippet's MinHash with a (possibly new) n-gram
    /// size. Invalidates the cache unconditionally.
    pub fn reindex(&mut self, ngram_size: usize) -> ReindexStats {
        let start = Instant::now();
        let snippets = self.session.all_snippets();
        let num_reindexed = snippets.len();

        for mut snippet in snippets {
            let new_minhash = build_minhash(&snippet.code, ngram_size, fingerprint::NUM_PERMUTATIONS, true);
            let checksum = snippet.checksum.clone();
            let changed = new_minhash != snippet.minhash;
            snippet.minhash = new_minhash;
            self.session.put_snippet(snippet);
            if changed {
                self.snapshot_version(&checksum);
            }
        }
        self.invalidate_cache();

        let time_elapsed = start.elapsed().as_secs_f64();
        ReindexStats {
            num_reindexed,
            time_elapsed,
            avg_time_per_snippet: if num_reindexed > 0 {
                time_elapsed / num_reindexed as f64
            } else {
                0.0
            },
        }
    }

    /// Aggregate statistics, including an estimated mean pairwise Jaccard
    /// over a uniform sample of at most `sample_size` snippets (default
    /// [`DEFAULT_SAMPLE_SIZE`] when `0` is passed).
    pub fn stats(&self, sample_size: usize) -> StoreStats {
        let snippets = self.session.all_snippets();
        if snippets.is_empty() {
            return StoreStats {
                num_snippets: 0,
                avg_snippet_size: 0.0,
                vocabulary_size: 0,
                avg_jaccard_similarity: 0.0,
            };
        }

        let total_size: usize = snippets.iter().map(|s| s.code.len()).sum();
        let mut vocabulary: HashSet<String> = HashSet::new();
        for s in &snippets {
            vocabulary.extend(asm::tokenize(&s.code, true));
        }

        let sample_size = if sample_size == 0 { DEFAULT_SAMPLE_SIZE } else { sample_size };
        let avg_jaccard_similarity = average_pairwise_jaccard(&snippets, sample_size);

        StoreStats {
            num_snippets: snippets.len(),
            avg_snippet_size: total_size as f64 / snippets.len() as f64,
            vocabulary_size: vocabulary.len(),
            avg_jaccard_similarity,
        }
    }

    /// Write every snippet's code to `<safe_name>.asm` inside `directory`.
    pub fn export(&self, directory: &Path) -> Result<ExportStats> {
        let start = Instant::now();
        fs::create_dir_all(directory)?;
        let abs_dir = fs::canonicalize(directory)?;

        let mut num_exported = 0usize;
        for snippet in self.session.all_snippets() {
            let primary_name = snippet.names.first().map(String::as_str).unwrap_or("");
            let safe_name = sanitize_export_name(primary_name, &snippet.checksum);
            let file_path = abs_dir.join(format!("{safe_name}.asm"));

            let resolved_parent = file_path.parent().map(Path::to_path_buf).unwrap_or_else(|| abs_dir.clone());
            if resolved_parent != abs_dir {
                warn!(
                    "skipping snippet '{primary_name}': resolved path is outside export directory"
                );
                continue;
            }

            fs::write(&file_path, &snippet.code)?;
            num_exported += 1;
        }

        let time_elapsed = start.elapsed().as_secs_f64();
        Ok(ExportStats {
            num_exported,
            time_elapsed,
            avg_time_per_snippet: if num_exported > 0 {
                time_elapsed / num_exported as f64
            } else {
                0.0
            },
        })
    }

    /// Write one YARA rule per snippet to `path`.
    pub fn export_yara(&self, path: &Path) -> Result<YaraExportStats> {
        let start = Instant::now();
        let mut body = String::new();
        let mut num_exported = 0usize;

        for snippet in self.session.all_snippets() {
            let primary_name = snippet.names.first().map(String::as_str).unwrap_or("snippet");
            let rule_name = yara_rule_name(primary_name, &snippet.checksum);
            let escaped = yara_escape(&snippet.code);
            body.push_str(&format!(
                "rule {rule_name}\n{{\n    strings:\n        $asm = \"{escaped}\" nocase ascii wide\n    condition:\n        $asm\n}}\n\n"
            ));
            num_exported += 1;
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, body)?;

        let time_elapsed = start.elapsed().as_secs_f64();
        Ok(YaraExportStats {
            num_exported,
            time_elapsed,
            avg_time_per_snippet: if num_exported > 0 {
                time_elapsed / num_exported as f64
            } else {
                0.0
            },
        })
    }

    /// Invalidate the cache and ask the storage engine to reclaim space.
    /// The in-memory session has nothing to reclaim, so this is cache
    /// invalidation alone for that backend.
    pub fn clean(&mut self) -> Result<()> {
        self.invalidate_cache();
        Ok(())
    }

    /// Non-recursively import every `*.asm` file in `dir`, using the file
    /// stem as the snippet name. Returns the number of files processed.
    pub fn import_directory(&mut self, dir: &Path, ngram_size: usize) -> Result<usize> {
        let mut count = 0usize;
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("asm") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let code = fs::read_to_string(&path)?;
            self.add(stem, &code, ngram_size);
            count += 1;
        }
        Ok(count)
    }

    /// Version history for a snippet, newest first.
    pub fn snippet_version_list(&self, checksum: &str) -> Vec<SnippetVersion> {
        self.session.versions_for(checksum)
    }

    /// Record the current code as a version snapshot for `checksum`.
    pub fn snapshot_version(&mut self, checksum: &str) {
        if let Some(snippet) = self.session.get_snippet(checksum) {
            self.session.push_version(SnippetVersion {
                id: 0,
                snippet_checksum: snippet.checksum,
                code: snippet.code,
                minhash: snippet.minhash,
                created_at: now(),
            });
        }
    }
}

/// Strip `..` runs, take the basename, and fall back to a checksum
/// prefix when nothing usable remains.
fn sanitize_export_name(primary_name: &str, checksum: &str) -> String {
    let replaced = primary_name.replace("..", "_");
    let base = replaced
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .to_string();
    if base.is_empty() {
        checksum.chars().take(12).collect()
    } else {
        base
    }
}

/// Sanitize a snippet name into a YARA rule identifier fragment.
fn yara_rule_name(primary_name: &str, checksum: &str) -> String {
    let sanitized: String = primary_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let prefix = match sanitized.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => String::new(),
        _ => "r_".to_string(),
    };
    let checksum_prefix: String = checksum.chars().take(8).collect();
    format!("resembl_{prefix}{sanitized}_{checksum_prefix}")
}

/// C-style escape a string for embedding in a YARA `$asm = "..."` pattern.
fn yara_escape(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    for c in code.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Deterministic pseudo-random sample of at most `sample_size` snippets,
/// then the mean pairwise Jaccard similarity over that sample.
///
/// A true random sampler would need an RNG dependency this crate doesn't
/// otherwise carry; instead the sample is selected by the same seeded
/// `xxhash` hashing the fingerprint builder already uses, taking the
/// snippets whose checksum hashes smallest under a fixed seed. This
/// keeps runs reproducible without pulling in a stack the rest of the
/// crate has no other use for.
fn average_pairwise_jaccard(snippets: &[Snippet], sample_size: usize) -> f64 {
    if snippets.len() < 2 {
        return 1.0;
    }

    let sample: Vec<&Snippet> = if snippets.len() > sample_size {
        let mut ranked: Vec<&Snippet> = snippets.iter().collect();
        ranked.sort_by_key(|s| xxh3_64_with_seed(s.checksum.as_bytes(), 0));
        ranked.truncate(sample_size);
        ranked
    } else {
        snippets.iter().collect()
    };

    let mut total = 0.0;
    let mut comparisons = 0usize;
    for i in 0..sample.len() {
        for j in (i + 1)..sample.len() {
            total += similarity::jaccard(&sample[i].minhash, &sample[j].minhash);
            comparisons += 1;
        }
    }

    if comparisons > 0 {
        total / comparisons as f64
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> SnippetStore<InMemorySession> {
        let cache_dir = std::env::temp_dir().join("resembl-store-tests-cache");
        SnippetStore::with_cache_dir(InMemorySession::new(), cache_dir)
    }

    #[test]
    fn add_creates_a_new_snippet() {
        let mut s = store();
        let snippet = s.add("memcpy", "REP MOVSB", 3).unwrap();
        assert_eq!(snippet.names, vec!["memcpy".to_string()]);
    }

    #[test]
    fn add_blank_code_returns_none() {
        let mut s = store();
        assert!(s.add("x", "   ", 3).is_none());
    }

    #[test]
    fn add_prehashed_matches_add_for_fresh_code() {
        let mut s = store();
        let minhash = build_minhash("MOV EAX, 1", 3, fingerprint::NUM_PERMUTATIONS, true);
        let snippet = s.add_prehashed("f", "MOV EAX, 1", minhash).unwrap();
        assert_eq!(snippet.names, vec!["f".to_string()]);
        assert_eq!(s.list(0, 0).len(), 1);
    }

    #[test]
    fn add_prehashed_aliases_an_existing_checksum() {
        let mut s = store();
        s.add("memcpy", "REP MOVSB", 3);
        let minhash = build_minhash("REP MOVSB", 3, fingerprint::NUM_PERMUTATIONS, true);
        let snippet = s.add_prehashed("fast_copy", "REP MOVSB", minhash).unwrap();
        assert_eq!(snippet.names, vec!["memcpy".to_string(), "fast_copy".to_string()]);
        assert_eq!(s.list(0, 0).len(), 1);
    }

    #[test]
    fn add_same_code_twice_aliases_instead_of_duplicating() {
        let mut s = store();
        s.add("memcpy", "REP MOVSB", 3);
        let snippet = s.add("fast_copy", "REP MOVSB", 3).unwrap();
        assert_eq!(snippet.names, vec!["memcpy".to_string(), "fast_copy".to_string()]);
        assert_eq!(s.list(0, 0).len(), 1);
    }

    #[test]
    fn resolve_prefix_disambiguates() {
        let mut s = store();
        let snippet = s.add("a", "MOV EAX, 1", 3).unwrap();
        let prefix = &snippet.checksum[..8];
        assert_eq!(s.resolve_prefix(prefix).unwrap(), snippet.checksum);
    }

    #[test]
    fn resolve_prefix_not_found() {
        let s = store();
        assert!(matches!(
            s.resolve_prefix("deadbeef"),
            Err(ResemblError::NotFound { .. })
        ));
    }

    #[test]
    fn name_remove_protects_last_name() {
        let mut s = store();
        let snippet = s.add("only", "RET", 3).unwrap();
        let err = s.name_remove(&snippet.checksum, "only").unwrap_err();
        assert!(matches!(err, ResemblError::LastNameProtected { .. }));
    }

    #[test]
    fn name_add_rejects_duplicate() {
        let mut s = store();
        let snippet = s.add("a", "RET", 3).unwrap();
        s.name_add(&snippet.checksum, "b").unwrap();
        assert!(matches!(
            s.name_add(&snippet.checksum, "b"),
            Err(ResemblError::Duplicate { .. })
        ));
    }

    #[test]
    fn tag_add_is_idempotent() {
        let mut s = store();
        let snippet = s.add("a", "XOR EAX, EAX", 3).unwrap();
        s.tag_add(&snippet.checksum, "crypto").unwrap();
        let result = s.tag_add(&snippet.checksum, "crypto").unwrap();
        assert_eq!(result.tags.iter().filter(|t| *t == "crypto").count(), 1);
    }

    #[test]
    fn tag_remove_of_absent_tag_still_succeeds() {
        let mut s = store();
        let snippet = s.add("a", "XOR EAX, EAX", 3).unwrap();
        assert!(s.tag_remove(&snippet.checksum, "nosuch").is_ok());
    }

    #[test]
    fn collection_delete_unassigns_snippets() {
        let mut s = store();
        s.collection_create("libc", "");
        let snippet = s.add("memcpy", "REP MOVSB", 3).unwrap();
        s.collection_add_snippet("libc", &snippet.checksum);
        assert!(s.collection_delete("libc"));
        assert_eq!(s.get(&snippet.checksum).unwrap().collection, None);
    }

    #[test]
    fn collection_list_reports_counts() {
        let mut s = store();
        s.collection_create("group_a", "");
        let snippet = s.add("func1", "NOP", 3).unwrap();
        s.collection_add_snippet("group_a", &snippet.checksum);
        let cols = s.collection_list();
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].snippet_count, 1);
    }

    #[test]
    fn collection_add_snippet_missing_collection_returns_none() {
        let mut s = store();
        let snippet = s.add("a", "RET", 3).unwrap();
        assert!(s.collection_add_snippet("missing", &snippet.checksum).is_none());
    }

    #[test]
    fn search_by_name_finds_substring_matches() {
        let mut s = store();
        s.add("memcpy", "REP MOVSB", 3);
        s.add("memset", "REP STOSB", 3);
        s.add("strcmp", "CMPSB", 3);
        assert_eq!(s.search_by_name("mem").len(), 2);
    }

    #[test]
    fn compare_returns_all_metrics() {
        let mut s = store();
        let a = s.add("a", "MOV EAX, 1\nRET", 3).unwrap();
        let b = s.add("b", "MOV EBX, 2\nRET", 3).unwrap();
        let cmp = s.compare(&a.checksum, &b.checksum, 0.4).unwrap();
        assert!((0.0..=1.0).contains(&cmp.jaccard_similarity));
        assert!((0.0..=100.0).contains(&cmp.levenshtein_score));
        assert!((0.0..=100.0).contains(&cmp.hybrid_score));
        assert!((0.0..=1.0).contains(&cmp.cfg_similarity));
    }

    #[test]
    fn reindex_recomputes_every_minhash() {
        let mut s = store();
        s.add("a", "MOV EAX, 1", 3);
        s.add("b", "MOV EBX, 2", 3);
        let stats = s.reindex(4);
        assert_eq!(stats.num_reindexed, 2);
    }

    #[test]
    fn stats_on_empty_store() {
        let s = store();
        let stats = s.stats(100);
        assert_eq!(stats.num_snippets, 0);
        assert_eq!(stats.avg_jaccard_similarity, 0.0);
    }

    #[test]
    fn stats_single_snippet_avg_jaccard_is_one() {
        let mut s = store();
        s.add("a", "MOV EAX, 1", 3);
        let stats = s.stats(100);
        assert_eq!(stats.avg_jaccard_similarity, 1.0);
    }

    #[test]
    fn export_writes_one_file_per_snippet() {
        let mut s = store();
        s.add("alpha", "MOV EAX, 1", 3);
        s.add("beta", "MOV EBX, 2", 3);
        let out = tempdir().unwrap();
        let stats = s.export(out.path()).unwrap();
        assert_eq!(stats.num_exported, 2);
        assert!(out.path().join("alpha.asm").exists());
        assert!(out.path().join("beta.asm").exists());
    }

    #[test]
    fn export_sanitizes_traversal_attempts() {
        let mut s = store();
        s.add("../../etc/passwd", "RET", 3);
        let out = tempdir().unwrap();
        let stats = s.export(out.path()).unwrap();
        assert_eq!(stats.num_exported, 1);
        assert!(out.path().join("passwd.asm").exists());
    }

    #[test]
    fn export_yara_escapes_and_names_rules() {
        let mut s = store();
        s.add("test_func", "MOV EAX, 1\nRET", 3);
        let out = tempdir().unwrap();
        let rules_path = out.path().join("rules.yara");
        let stats = s.export_yara(&rules_path).unwrap();
        assert_eq!(stats.num_exported, 1);
        let content = fs::read_to_string(&rules_path).unwrap();
        assert!(content.contains("rule resembl_test_func_"));
        assert!(content.contains("$asm = \"MOV EAX, 1\\nRET\""));
        assert!(content.contains("nocase ascii wide"));
    }

    #[test]
    fn import_directory_round_trips_export() {
        let mut s = store();
        s.add("alpha", "MOV EAX, 1", 3);
        s.add("beta", "MOV EBX, 2", 3);
        let original_checksums: HashSet<String> =
            s.list(0, 0).into_iter().map(|sn| sn.checksum).collect();

        let out = tempdir().unwrap();
        s.export(out.path()).unwrap();

        let mut s2 = store();
        s2.import_directory(out.path(), 3).unwrap();
        let reimported_checksums: HashSet<String> =
            s2.list(0, 0).into_iter().map(|sn| sn.checksum).collect();
        assert_eq!(original_checksums, reimported_checksums);
    }

    #[test]
    fn corpus_digest_changes_on_mutation() {
        let mut s = store();
        assert_eq!(s.corpus_digest(), "empty");
        s.add("a", "RET", 3);
        let digest_after_add = s.corpus_digest();
        assert_ne!(digest_after_add, "empty");
        s.add("b", "NOP", 3);
        assert_ne!(s.corpus_digest(), digest_after_add);
    }

    #[test]
    fn add_snapshots_an_initial_version() {
        let mut s = store();
        let snippet = s.add("a", "RET", 3).unwrap();
        assert_eq!(s.snippet_version_list(&snippet.checksum).len(), 1);
    }

    #[test]
    fn snapshot_version_then_list_returns_both() {
        let mut s = store();
        let snippet = s.add("a", "RET", 3).unwrap();
        s.snapshot_version(&snippet.checksum);
        assert_eq!(s.snippet_version_list(&snippet.checksum).len(), 2);
    }

    #[test]
    fn reindex_snapshots_a_version_only_when_minhash_changes() {
        let mut s = store();
        let snippet = s.add("a", "MOV EAX, 1", 3).unwrap();
        assert_eq!(s.snippet_version_list(&snippet.checksum).len(), 1);

        s.reindex(3);
        assert_eq!(
            s.snippet_version_list(&snippet.checksum).len(),
            1,
            "same n-gram size reproduces the same MinHash, no new version"
        );

        s.reindex(4);
        assert_eq!(s.snippet_version_list(&snippet.checksum).len(), 2);
    }
}
