//! The `SnippetStoreSession` trait: the narrow row-level contract the
//! Snippet Store needs from an external storage engine, plus an in-memory
//! reference implementation used by this crate's own tests and by callers
//! with no durable-storage requirement.

use std::collections::HashMap;

use super::types::{Collection, Snippet, SnippetVersion};

/// Row-level operations a storage engine must provide for the Snippet
/// Store to be built on top of it.
///
/// This trait intentionally knows nothing about checksums, names, or
/// fingerprints as *semantics* — it is a plain keyed table interface. All
/// domain rules (duplicate detection, cache invalidation, merge semantics)
/// live in [`crate::store::SnippetStore`], one layer up.
pub trait SnippetStoreSession {
    /// Fetch a snippet by its exact checksum.
    fn get_snippet(&self, checksum: &str) -> Option<Snippet>;

    /// Insert or overwrite a snippet by its checksum.
    fn put_snippet(&mut self, snippet: Snippet);

    /// Remove a snippet, returning it if it existed.
    fn remove_snippet(&mut self, checksum: &str) -> Option<Snippet>;

    /// All snippets, in storage (insertion) order.
    fn all_snippets(&self) -> Vec<Snippet>;

    /// Fetch a collection by name.
    fn get_collection(&self, name: &str) -> Option<Collection>;

    /// Insert or overwrite a collection.
    fn put_collection(&mut self, collection: Collection);

    /// Remove a collection, returning it if it existed.
    fn remove_collection(&mut self, name: &str) -> Option<Collection>;

    /// All collections, in storage order.
    fn all_collections(&self) -> Vec<Collection>;

    /// Append a version record.
    fn push_version(&mut self, version: SnippetVersion);

    /// All versions recorded for a checksum, newest first.
    fn versions_for(&self, checksum: &str) -> Vec<SnippetVersion>;
}

/// A `HashMap`-backed [`SnippetStoreSession`] with no external
/// dependencies. Suitable for embedding the core directly, or as the
/// fixture used by this crate's own unit tests.
#[derive(Debug, Default)]
pub struct InMemorySession {
    order: Vec<String>,
    snippets: HashMap<String, Snippet>,
    collections: HashMap<String, Collection>,
    versions: HashMap<String, Vec<SnippetVersion>>,
    next_version_id: u64,
}

impl InMemorySession {
    /// An empty session.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnippetStoreSession for InMemorySession {
    fn get_snippet(&self, checksum: &str) -> Option<Snippet> {
        self.snippets.get(checksum).cloned()
    }

    fn put_snippet(&mut self, snippet: Snippet) {
        if !self.snippets.contains_key(&snippet.checksum) {
            self.order.push(snippet.checksum.clone());
        }
        self.snippets.insert(snippet.checksum.clone(), snippet);
    }

    fn remove_snippet(&mut self, checksum: &str) -> Option<Snippet> {
        let removed = self.snippets.remove(checksum);
        if removed.is_some() {
            self.order.retain(|c| c != checksum);
            self.versions.remove(checksum);
        }
        removed
    }

    fn all_snippets(&self) -> Vec<Snippet> {
        self.order
            .iter()
            .filter_map(|c| self.snippets.get(c).cloned())
            .collect()
    }

    fn get_collection(&self, name: &str) -> Option<Collection> {
        self.collections.get(name).cloned()
    }

    fn put_collection(&mut self, collection: Collection) {
        self.collections.insert(collection.name.clone(), collection);
    }

    fn remove_collection(&mut self, name: &str) -> Option<Collection> {
        self.collections.remove(name)
    }

    fn all_collections(&self) -> Vec<Collection> {
        let mut cols: Vec<Collection> = self.collections.values().cloned().collect();
        cols.sort_by(|a, b| a.name.cmp(&b.name));
        cols
    }

    fn push_version(&mut self, mut version: SnippetVersion) {
        self.next_version_id += 1;
        version.id = self.next_version_id;
        self.versions
            .entry(version.snippet_checksum.clone())
            .or_default()
            .push(version);
    }

    fn versions_for(&self, checksum: &str) -> Vec<SnippetVersion> {
        let mut versions = self.versions.get(checksum).cloned().unwrap_or_default();
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        versions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::build_minhash;

    fn snippet(checksum: &str) -> Snippet {
        Snippet {
            checksum: checksum.to_string(),
            names: vec!["n".to_string()],
            code: "RET".to_string(),
            minhash: build_minhash("RET", 3, 8, true),
            tags: Vec::new(),
            collection: None,
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut session = InMemorySession::new();
        session.put_snippet(snippet("abc"));
        assert_eq!(session.get_snippet("abc").unwrap().checksum, "abc");
    }

    #[test]
    fn remove_clears_versions_too() {
        let mut session = InMemorySession::new();
        session.put_snippet(snippet("abc"));
        session.push_version(SnippetVersion {
            id: 0,
            snippet_checksum: "abc".to_string(),
            code: "old".to_string(),
            minhash: build_minhash("old", 3, 8, true),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        });
        assert_eq!(session.remove_snippet("abc").unwrap().checksum, "abc");
        assert!(session.versions_for("abc").is_empty());
    }

    #[test]
    fn all_snippets_preserves_insertion_order() {
        let mut session = InMemorySession::new();
        session.put_snippet(snippet("b"));
        session.put_snippet(snippet("a"));
        let all = session.all_snippets();
        assert_eq!(all[0].checksum, "b");
        assert_eq!(all[1].checksum, "a");
    }

    #[test]
    fn versions_for_returns_newest_first() {
        let mut session = InMemorySession::new();
        session.push_version(SnippetVersion {
            id: 0,
            snippet_checksum: "abc".to_string(),
            code: "v1".to_string(),
            minhash: build_minhash("v1", 3, 8, true),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        });
        session.push_version(SnippetVersion {
            id: 0,
            snippet_checksum: "abc".to_string(),
            code: "v2".to_string(),
            minhash: build_minhash("v2", 3, 8, true),
            created_at: "2025-01-01T00:00:00Z".to_string(),
        });
        let versions = session.versions_for("abc");
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].code, "v2");
    }
}
