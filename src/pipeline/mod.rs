//! Query pipeline: turn a freeform query string into ranked snippet
//! matches by combining the LSH candidate index with the exact
//! similarity kernels.

use tracing::{debug, info};

use crate::core::errors::Result;
use crate::fingerprint::build_minhash;
use crate::lsh::{self, LshIndex};
use crate::similarity;
use crate::store::{Snippet, SnippetStore, SnippetStoreSession};

/// Find and rank matches for `query_string` against everything in
/// `store`.
///
/// 1. Load the cached LSH index for `threshold`; on a cache miss, build
///    one from the store and save it back.
/// 2. Build the query's MinHash and fetch LSH candidates.
/// 3. Score every surviving candidate with [`similarity::hybrid`] and
///    return the top `top_n`, along with the total candidate count.
pub fn find_matches<S: SnippetStoreSession>(
    store: &SnippetStore<S>,
    query_string: &str,
    top_n: usize,
    threshold: f64,
    normalize: bool,
    ngram_size: usize,
    jaccard_weight: f64,
) -> Result<(usize, Vec<(Snippet, f64)>)> {
    let corpus_digest = store.corpus_digest();
    let num_permutations = crate::fingerprint::NUM_PERMUTATIONS;

    let cached = lsh::load(store.cache_dir(), threshold, &corpus_digest)?;
    let index = match cached {
        Some(index) => index,
        None => {
            info!(threshold, num_permutations, "rebuilding LSH index, cache miss");
            let entries = store
                .list(0, 0)
                .into_iter()
                .map(|s| (s.checksum, s.minhash));
            let index = match LshIndex::build(threshold, num_permutations, entries) {
                Ok(index) => index,
                Err(_) => return Ok((0, Vec::new())),
            };
            lsh::save(store.cache_dir(), &index, &corpus_digest)?;
            index
        }
    };

    let query_minhash = build_minhash(query_string, ngram_size, num_permutations, normalize);
    let candidates = index.query(&query_minhash);
    if candidates.is_empty() {
        return Ok((0, Vec::new()));
    }
    debug!(count = candidates.len(), "scoring LSH candidate batch");

    let mut scored: Vec<(Snippet, f64)> = candidates
        .iter()
        .filter_map(|checksum| store.get(checksum))
        .map(|snippet| {
            let jaccard = similarity::jaccard(&snippet.minhash, &query_minhash);
            let levenshtein = similarity::levenshtein_ratio(&snippet.code, query_string);
            let hybrid = similarity::hybrid(jaccard, levenshtein, jaccard_weight);
            (snippet, hybrid)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_n);

    Ok((candidates.len(), scored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySession;
    use tempfile::{tempdir, TempDir};

    fn store() -> (TempDir, SnippetStore<InMemorySession>) {
        let dir = tempdir().unwrap();
        let store = SnippetStore::with_cache_dir(InMemorySession::new(), dir.path().to_path_buf());
        (dir, store)
    }

    #[test]
    fn finds_an_identical_snippet() {
        let (_dir, mut s) = store();
        s.add("func", "MOV EAX, 1\nRET", 3);
        let (count, matches) = find_matches(&s, "MOV EAX, 1\nRET", 5, 0.3, true, 3, 0.4).unwrap();
        assert!(count >= 1);
        assert!(!matches.is_empty());
        assert!(matches[0].1 > 50.0);
    }

    #[test]
    fn finds_a_label_renamed_match_above_ninety() {
        let (_dir, mut s) = store();
        let inserted = s
            .add("copy_loop", "lodsb\nstosb\ntest al, al\njnz copy_loop", 3)
            .unwrap();
        let (count, matches) =
            find_matches(&s, "lodsb\nstosb\ntest al, al\njnz done", 1, 0.5, true, 3, 0.4).unwrap();
        assert_eq!(count, 1);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].0.checksum, inserted.checksum);
        assert!(matches[0].1 >= 90.0);
    }

    #[test]
    fn normalize_flag_is_threaded_into_the_query_minhash() {
        // Stored snippets are always fingerprinted with normalize=true.
        // Querying the identical text with normalize=false builds a
        // fingerprint over the raw (un-collapsed) token stream instead, so
        // it should no longer land in the same LSH bands as the
        // normalized entry — if `normalize` were silently ignored, both
        // queries would return the same candidate.
        let (_dir, mut s) = store();
        s.add("func", "MOV EAX, 1\nRET", 3);

        let (normalized_count, _) =
            find_matches(&s, "MOV EAX, 1\nRET", 5, 0.5, true, 3, 0.4).unwrap();
        assert!(normalized_count >= 1);

        let (raw_count, _) = find_matches(&s, "MOV EAX, 1\nRET", 5, 0.5, false, 3, 0.4).unwrap();
        assert_ne!(raw_count, normalized_count);
    }

    #[test]
    fn empty_store_yields_no_matches() {
        let (_dir, s) = store();
        let (count, matches) = find_matches(&s, "MOV EAX, 1", 5, 0.3, true, 3, 0.4).unwrap();
        assert_eq!(count, 0);
        assert!(matches.is_empty());
    }

    #[test]
    fn results_are_sorted_descending_by_hybrid_score() {
        let (_dir, mut s) = store();
        s.add("a", "MOV EAX, 1\nRET", 3);
        s.add("b", "MOV EAX, 1\nNOP\nRET", 3);
        s.add("c", "PUSH EBX\nPOP EBX\nCALL foo", 3);
        let (_, matches) = find_matches(&s, "MOV EAX, 1\nRET", 10, 0.1, true, 3, 0.4).unwrap();
        for pair in matches.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn respects_top_n() {
        let (_dir, mut s) = store();
        for i in 0..5 {
            s.add(&format!("f{i}"), &format!("MOV EAX, {i}\nRET"), 3);
        }
        let (_, matches) = find_matches(&s, "MOV EAX, 0\nRET", 2, 0.1, true, 3, 0.4).unwrap();
        assert!(matches.len() <= 2);
    }
}
