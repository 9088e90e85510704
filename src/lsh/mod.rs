//! The banded LSH candidate index and its persistent on-disk cache.
//!
//! Same per-band `HashMap<band_hash, Vec<id>>` layout and `ahash`-hashed
//! band keys as a typical banded LSH index, but with the band count
//! *derived* from `(threshold, num_permutations)` instead of fixed at
//! construction, since a single deployment needs one index per configured
//! threshold rather than a single hardcoded banding.

use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use ahash::AHasher;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::errors::{ResemblError, Result};
use crate::fingerprint::MinHash;

const CACHE_DIR_ENV: &str = "RESEMBL_CACHE_DIR";
const DEFAULT_CACHE_DIR: &str = ".cache/resembl";
const DIGEST_FILE_NAME: &str = "db_checksum.txt";

/// Return the LSH cache directory, respecting `RESEMBL_CACHE_DIR`.
pub fn cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_CACHE_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR))
}

fn lsh_cache_path(cache_dir: &Path, threshold: f64) -> PathBuf {
    cache_dir.join(format!("lsh_{threshold:.2}.bin"))
}

fn digest_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(DIGEST_FILE_NAME)
}

/// Derive a `(num_bands, rows_per_band)` split of a `num_permutations`-wide
/// signature whose implied threshold `(1/b)^(1/r)` is closest to the
/// requested one, among splits where `b * r == num_permutations`.
///
/// This stands in for `datasketch.MinHashLSH`'s false-positive/negative
/// weighted optimizer (unavailable without an equivalent crate): it picks
/// the same kind of band/row trade-off by nearest-threshold match rather
/// than by integrating the two error probabilities, which is close enough
/// for a candidate-generation index that is only ever a prefilter ahead
/// of the exact Jaccard/Levenshtein scoring in `similarity`.
fn derive_bands(num_permutations: usize, threshold: f64) -> Result<(usize, usize)> {
    if num_permutations == 0 {
        return Err(ResemblError::invalid_parameter(
            "num_permutations",
            "must be at least 1",
        ));
    }
    if !(0.0..0.99).contains(&threshold) {
        return Err(ResemblError::invalid_parameter(
            "threshold",
            format!("must be in [0.0, 0.99), got {threshold}"),
        ));
    }

    let mut best: Option<(usize, usize, f64)> = None;
    for b in 1..=num_permutations {
        if num_permutations % b != 0 {
            continue;
        }
        let r = num_permutations / b;
        let implied = (1.0 / b as f64).powf(1.0 / r as f64);
        let diff = (implied - threshold).abs();
        if best.map(|(_, _, best_diff)| diff < best_diff).unwrap_or(true) {
            best = Some((b, r, diff));
        }
    }

    best.map(|(b, r, _)| (b, r)).ok_or_else(|| {
        ResemblError::invalid_parameter(
            "threshold",
            format!("no band/row split of {num_permutations} permutations fits threshold {threshold}"),
        )
    })
}

/// A banded LSH candidate index over MinHash signatures.
#[derive(Debug, Serialize, Deserialize)]
pub struct LshIndex {
    threshold: f64,
    num_permutations: usize,
    num_bands: usize,
    rows_per_band: usize,
    bands: Vec<HashMap<u64, Vec<String>>>,
    signatures: HashMap<String, MinHash>,
}

impl LshIndex {
    /// Build an empty index for `(threshold, num_permutations)`.
    pub fn new(threshold: f64, num_permutations: usize) -> Result<Self> {
        let (num_bands, rows_per_band) = derive_bands(num_permutations, threshold)?;
        Ok(Self {
            threshold,
            num_permutations,
            num_bands,
            rows_per_band,
            bands: vec![HashMap::new(); num_bands],
            signatures: HashMap::new(),
        })
    }

    /// The threshold this index was built for.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Number of entries currently indexed.
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// True when the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    fn band_hash(band_signature: &[u64]) -> u64 {
        let mut hasher = AHasher::default();
        band_signature.hash(&mut hasher);
        hasher.finish()
    }

    fn band_slices(&self, signature: &[u64]) -> impl Iterator<Item = (usize, &[u64])> {
        (0..self.num_bands).filter_map(move |band_idx| {
            let start = band_idx * self.rows_per_band;
            let end = (start + self.rows_per_band).min(signature.len());
            if start < signature.len() {
                Some((band_idx, &signature[start..end]))
            } else {
                None
            }
        })
    }

    /// Insert `(checksum, minhash)`. Idempotent: inserting an
    /// already-present checksum is a silent no-op.
    pub fn insert(&mut self, checksum: String, minhash: MinHash) {
        if self.signatures.contains_key(&checksum) {
            return;
        }
        for (band_idx, band_signature) in self.band_slices(minhash.values()) {
            let hash = Self::band_hash(band_signature);
            self.bands[band_idx].entry(hash).or_default().push(checksum.clone());
        }
        self.signatures.insert(checksum, minhash);
    }

    /// Insert every `(checksum, minhash)` pair, returning the count of
    /// entries that were newly inserted (duplicates are skipped).
    pub fn insert_batch(&mut self, entries: impl IntoIterator<Item = (String, MinHash)>) -> usize {
        let mut inserted = 0usize;
        for (checksum, minhash) in entries {
            if self.signatures.contains_key(&checksum) {
                continue;
            }
            self.insert(checksum, minhash);
            inserted += 1;
        }
        inserted
    }

    /// Build a fresh index from an iterator of `(checksum, minhash)`
    /// pairs.
    pub fn build(
        threshold: f64,
        num_permutations: usize,
        entries: impl IntoIterator<Item = (String, MinHash)>,
    ) -> Result<Self> {
        let mut index = Self::new(threshold, num_permutations)?;
        index.insert_batch(entries);
        Ok(index)
    }

    /// Return every checksum sharing at least one band with `minhash`.
    pub fn query(&self, minhash: &MinHash) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for (band_idx, band_signature) in self.band_slices(minhash.values()) {
            let hash = Self::band_hash(band_signature);
            if let Some(ids) = self.bands[band_idx].get(&hash) {
                for id in ids {
                    if seen.insert(id.clone()) {
                        candidates.push(id.clone());
                    }
                }
            }
        }
        candidates
    }
}

/// Write `index` and `corpus_digest` to `cache_dir` atomically (temp file
/// plus rename, matching the convention in [`crate::core::config`]).
pub fn save(cache_dir: &Path, index: &LshIndex, corpus_digest: &str) -> Result<()> {
    fs::create_dir_all(cache_dir)?;

    let index_path = lsh_cache_path(cache_dir, index.threshold());
    let index_tmp = index_path.with_extension("bin.tmp");
    fs::write(&index_tmp, bincode::serialize(index)?)?;
    fs::rename(&index_tmp, &index_path).map_err(|e| {
        ResemblError::io(format!("failed to install LSH cache at {index_path:?}"), e)
    })?;

    let digest_file = digest_path(cache_dir);
    let digest_tmp = digest_file.with_extension("txt.tmp");
    fs::write(&digest_tmp, corpus_digest)?;
    fs::rename(&digest_tmp, &digest_file).map_err(|e| {
        ResemblError::io(format!("failed to install corpus digest at {digest_file:?}"), e)
    })?;

    Ok(())
}

/// Load the cached index for `threshold`, if present and still valid
/// against `corpus_digest`.
pub fn load(cache_dir: &Path, threshold: f64, corpus_digest: &str) -> Result<Option<LshIndex>> {
    let index_path = lsh_cache_path(cache_dir, threshold);
    let digest_file = digest_path(cache_dir);

    if !index_path.exists() || !digest_file.exists() {
        return Ok(None);
    }

    let cached_digest = fs::read_to_string(&digest_file)?;
    if cached_digest != corpus_digest {
        return Ok(None);
    }

    let raw = fs::read(&index_path)?;
    match bincode::deserialize(&raw) {
        Ok(index) => Ok(Some(index)),
        Err(err) => Err(ResemblError::corrupt_cache(index_path.display().to_string(), err.to_string())),
    }
}

/// Delete every file directly inside `cache_dir`. A missing directory is
/// not an error.
pub fn invalidate(cache_dir: &Path) -> Result<()> {
    let entries = match fs::read_dir(cache_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            if let Err(err) = fs::remove_file(&path) {
                warn!("failed to remove cache file {path:?}: {err}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::build_minhash;
    use tempfile::tempdir;

    #[test]
    fn derive_bands_divides_permutations_exactly() {
        let (b, r) = derive_bands(128, 0.5).unwrap();
        assert_eq!(b * r, 128);
    }

    #[test]
    fn derive_bands_rejects_threshold_out_of_range() {
        assert!(derive_bands(128, 1.0).is_err());
        assert!(derive_bands(128, -0.1).is_err());
    }

    #[test]
    fn derive_bands_rejects_threshold_of_exactly_0_99() {
        assert!(derive_bands(128, 0.99).is_err());
    }

    #[test]
    fn derive_bands_accepts_0_0_and_0_98() {
        assert!(derive_bands(128, 0.0).is_ok());
        assert!(derive_bands(128, 0.98).is_ok());
    }

    #[test]
    fn derive_bands_rejects_zero_permutations() {
        assert!(derive_bands(0, 0.5).is_err());
    }

    #[test]
    fn insert_is_idempotent() {
        let mut index = LshIndex::new(0.5, 16).unwrap();
        let mh = build_minhash("mov eax, ebx", 3, 16, true);
        index.insert("abc".to_string(), mh.clone());
        index.insert("abc".to_string(), mh);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn query_finds_identical_signature() {
        let mut index = LshIndex::new(0.5, 16).unwrap();
        let mh = build_minhash("mov eax, ebx\nret", 3, 16, true);
        index.insert("self".to_string(), mh.clone());
        let candidates = index.query(&mh);
        assert!(candidates.contains(&"self".to_string()));
    }

    #[test]
    fn query_returns_empty_for_unrelated_signature() {
        let mut index = LshIndex::new(0.9, 32).unwrap();
        index.insert("a".to_string(), build_minhash("mov eax, ebx", 3, 32, true));
        let unrelated = build_minhash("completely different structure here now", 3, 32, true);
        let candidates = index.query(&unrelated);
        assert!(!candidates.contains(&"a".to_string()));
    }

    #[test]
    fn insert_batch_counts_only_new_entries() {
        let mut index = LshIndex::new(0.5, 16).unwrap();
        let mh = build_minhash("ret", 3, 16, true);
        index.insert("a".to_string(), mh.clone());
        let inserted = index.insert_batch(vec![
            ("a".to_string(), mh.clone()),
            ("b".to_string(), mh),
        ]);
        assert_eq!(inserted, 1);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let mut index = LshIndex::new(0.5, 16).unwrap();
        index.insert("abc".to_string(), build_minhash("ret", 3, 16, true));
        save(dir.path(), &index, "1-abc").unwrap();

        let loaded = load(dir.path(), 0.5, "1-abc").unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn load_returns_none_on_digest_mismatch() {
        let dir = tempdir().unwrap();
        let index = LshIndex::new(0.5, 16).unwrap();
        save(dir.path(), &index, "1-abc").unwrap();
        let loaded = load(dir.path(), 0.5, "2-def").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_returns_none_when_missing() {
        let dir = tempdir().unwrap();
        assert!(load(dir.path(), 0.5, "empty").unwrap().is_none());
    }

    #[test]
    fn invalidate_removes_cache_files() {
        let dir = tempdir().unwrap();
        let index = LshIndex::new(0.5, 16).unwrap();
        save(dir.path(), &index, "empty").unwrap();
        assert!(dir.path().read_dir().unwrap().next().is_some());
        invalidate(dir.path()).unwrap();
        assert!(dir.path().read_dir().unwrap().next().is_none());
    }

    #[test]
    fn invalidate_on_missing_directory_is_not_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(invalidate(&missing).is_ok());
    }
}
