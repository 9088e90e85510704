//! Cross-store merge: fold every snippet and collection from a source
//! store into a destination store, deduplicating by checksum.
//!
//! Opening the source store itself (a file path, a remote handle, …) is
//! the concern of whichever [`crate::store::SnippetStoreSession`]
//! implementation is wired in — by the time `merge` runs, both stores are
//! already live sessions.

use std::time::Instant;

use tracing::info;

use crate::store::{MergeStats, SnippetStore, SnippetStoreSession};

/// Merge every collection and snippet from `source` into `destination`.
///
/// - Collections present in `source` but not `destination` are created
///   (description and timestamp copied verbatim).
/// - Snippets with a checksum `destination` doesn't have yet are inserted
///   wholesale (**added**).
/// - Snippets `destination` already has are updated in place: names and
///   tags are merged as independent set unions (either may grow without
///   the other), and a destination snippet with no collection inherits
///   the source's if the source has one. Any such change counts as
///   **updated**; an exact match counts as **skipped**.
/// - The destination's LSH cache is invalidated once, after the merge.
pub fn merge<D, Src>(destination: &mut SnippetStore<D>, source: &SnippetStore<Src>) -> MergeStats
where
    D: SnippetStoreSession,
    Src: SnippetStoreSession,
{
    let start = Instant::now();

    for collection in source.session().all_collections() {
        if destination.session().get_collection(&collection.name).is_none() {
            destination.session_mut().put_collection(collection);
        }
    }

    let source_snippets = source.list(0, 0);
    let total_source = source_snippets.len();
    let mut added = 0usize;
    let mut updated = 0usize;
    let mut skipped = 0usize;

    for source_snippet in source_snippets {
        match destination.get(&source_snippet.checksum) {
            None => {
                destination.session_mut().put_snippet(source_snippet);
                added += 1;
            }
            Some(mut existing) => {
                let mut changed = false;

                let mut merged_names = existing.names.clone();
                for name in &source_snippet.names {
                    if !merged_names.contains(name) {
                        merged_names.push(name.clone());
                    }
                }
                if merged_names.len() != existing.names.len() {
                    merged_names.sort();
                    existing.names = merged_names;
                    changed = true;
                }

                let mut merged_tags = existing.tags.clone();
                for tag in &source_snippet.tags {
                    if !merged_tags.contains(tag) {
                        merged_tags.push(tag.clone());
                    }
                }
                if merged_tags.len() != existing.tags.len() {
                    merged_tags.sort();
                    existing.tags = merged_tags;
                    changed = true;
                }

                if existing.collection.is_none() && source_snippet.collection.is_some() {
                    existing.collection = source_snippet.collection.clone();
                    changed = true;
                }

                if changed {
                    destination.session_mut().put_snippet(existing);
                    updated += 1;
                } else {
                    skipped += 1;
                }
            }
        }
    }

    destination.invalidate_cache();

    let elapsed = start.elapsed().as_secs_f64();
    info!(added, updated, skipped, total_source, elapsed, "merge complete");

    MergeStats {
        added,
        updated,
        skipped,
        total_source,
        elapsed,
    }
}
