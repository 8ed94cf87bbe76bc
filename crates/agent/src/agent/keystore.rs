//! In-memory key store.
//!
//! The [`KeyStore`] holds every key the agent has loaded, in a total order
//! that is externally observable: entries sort by `(version, public_blob)`
//! with the blob compared lexicographically as raw bytes. List replies
//! follow this order, which makes them deterministic, and uniqueness of
//! `(version, public_blob)` falls out of the map structure rather than
//! needing a separate check.
//!
//! Entries are never mutated in place; replacement is delete-then-add.
//! Secret material inside an entry is zeroized when the entry is dropped
//! (see [`crate::agent::key`]).

use std::collections::BTreeMap;

use tracing::debug;

use crate::agent::codec::MessageWriter;
use crate::agent::crypto;
use crate::agent::key::{Rsa1Key, UserKey};

/// Protocol version of a stored key: the primary sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyVersion {
    /// SSH-1 RSA key.
    V1 = 1,
    /// SSH-2 key.
    V2 = 2,
}

/// Sort key for stored entries: version first, then raw blob bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct StoreId {
    version: KeyVersion,
    blob: Vec<u8>,
}

/// A key held by the store, with its comment.
pub enum AgentKey {
    /// SSH-1 RSA key.
    Rsa1 {
        /// The key itself.
        key: Rsa1Key,
        /// Free-form comment submitted with the key.
        comment: String,
    },
    /// SSH-2 key of any supported algorithm.
    User {
        /// The key itself.
        key: Box<dyn UserKey>,
        /// Free-form comment submitted with the key.
        comment: String,
    },
}

impl AgentKey {
    /// The key's protocol version.
    pub fn version(&self) -> KeyVersion {
        match self {
            AgentKey::Rsa1 { .. } => KeyVersion::V1,
            AgentKey::User { .. } => KeyVersion::V2,
        }
    }

    /// The key's canonical public blob.
    pub fn public_blob(&self) -> Vec<u8> {
        match self {
            AgentKey::Rsa1 { key, .. } => key.public_blob(),
            AgentKey::User { key, .. } => key.public_blob(),
        }
    }

    /// The comment submitted with the key.
    pub fn comment(&self) -> &str {
        match self {
            AgentKey::Rsa1 { comment, .. } | AgentKey::User { comment, .. } => comment,
        }
    }

    /// The key's log fingerprint.
    pub fn fingerprint(&self) -> String {
        match self {
            AgentKey::Rsa1 { key, .. } => key.fingerprint(),
            AgentKey::User { key, .. } => crypto::sha256_fingerprint(&key.public_blob()),
        }
    }
}

impl std::fmt::Debug for AgentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentKey")
            .field("version", &(self.version() as u8))
            .field("fingerprint", &self.fingerprint())
            .field("comment", &self.comment())
            .finish_non_exhaustive()
    }
}

/// Sorted collection of loaded keys.
#[derive(Debug, Default)]
pub struct KeyStore {
    entries: BTreeMap<StoreId, AgentKey>,
}

impl KeyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a key.
    ///
    /// Returns `false` without touching the store if an entry with the
    /// same `(version, public_blob)` already exists; the caller still owns
    /// the rejected key and dropping it zeroizes its secret material.
    pub fn add(&mut self, key: AgentKey) -> bool {
        let id = StoreId {
            version: key.version(),
            blob: key.public_blob(),
        };
        if self.entries.contains_key(&id) {
            return false;
        }
        debug!("keystore: adding key {}", key.fingerprint());
        self.entries.insert(id, key);
        true
    }

    /// Looks up a key by version and public blob.
    pub fn find(&self, version: KeyVersion, blob: &[u8]) -> Option<&AgentKey> {
        self.entries.get(&StoreId {
            version,
            blob: blob.to_vec(),
        })
    }

    /// Removes and returns a key, if present.
    pub fn remove(&mut self, version: KeyVersion, blob: &[u8]) -> Option<AgentKey> {
        self.entries.remove(&StoreId {
            version,
            blob: blob.to_vec(),
        })
    }

    /// Removes every key of the given version, returning how many were
    /// dropped.
    pub fn remove_all(&mut self, version: KeyVersion) -> usize {
        let ids: Vec<StoreId> = self
            .entries
            .range(version_start(version)..)
            .take_while(|(id, _)| id.version == version)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            self.entries.remove(id);
        }
        debug!("keystore: removed {} version-{} keys", ids.len(), version as u8);
        ids.len()
    }

    /// Number of keys of the given version.
    pub fn count(&self, version: KeyVersion) -> usize {
        self.iter_version(version).count()
    }

    /// Total number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `i`th key of the given version, in sort order.
    pub fn nth(&self, version: KeyVersion, i: usize) -> Option<&AgentKey> {
        self.iter_version(version).nth(i)
    }

    /// Iterates the keys of one version in sort order. The run is
    /// contiguous within the store's total order.
    pub fn iter_version(&self, version: KeyVersion) -> impl Iterator<Item = &AgentKey> {
        self.entries
            .range(version_start(version)..)
            .take_while(move |(id, _)| id.version == version)
            .map(|(_, key)| key)
    }

    /// Writes the list-reply body for one version:
    /// `uint32 n` followed by `n` entries, each the key's public blob
    /// (raw for SSH-1, string-framed for SSH-2) and its comment.
    pub fn list_serialized(&self, version: KeyVersion, w: &mut MessageWriter) {
        w.put_uint32(self.count(version) as u32);
        for (id, key) in self
            .entries
            .range(version_start(version)..)
            .take_while(|(id, _)| id.version == version)
        {
            match version {
                KeyVersion::V1 => w.put_data(&id.blob),
                KeyVersion::V2 => w.put_string(&id.blob),
            }
            w.put_string(key.comment().as_bytes());
        }
    }
}

/// The smallest possible sort key for a version: an empty blob sorts
/// before every real one.
fn version_start(version: KeyVersion) -> StoreId {
    StoreId {
        version,
        blob: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::codec::MessageReader;
    use crate::agent::key::Ed25519UserKey;

    fn ed25519_entry(seed: u8, comment: &str) -> AgentKey {
        AgentKey::User {
            key: Box::new(Ed25519UserKey::from_seed(&[seed; 32])),
            comment: comment.to_string(),
        }
    }

    #[test]
    fn test_add_then_find() {
        let mut store = KeyStore::new();
        let key = ed25519_entry(1, "test key");
        let blob = key.public_blob();

        assert!(store.add(key));
        let found = store.find(KeyVersion::V2, &blob).unwrap();
        assert_eq!(found.comment(), "test key");
        assert!(store.find(KeyVersion::V1, &blob).is_none());
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let mut store = KeyStore::new();
        assert!(store.add(ed25519_entry(1, "first")));
        // Same seed, same blob: the second add must not replace the first.
        assert!(!store.add(ed25519_entry(1, "second")));

        assert_eq!(store.count(KeyVersion::V2), 1);
        let blob = ed25519_entry(1, "").public_blob();
        assert_eq!(store.find(KeyVersion::V2, &blob).unwrap().comment(), "first");
    }

    #[test]
    fn test_remove() {
        let mut store = KeyStore::new();
        let blob = ed25519_entry(1, "").public_blob();
        store.add(ed25519_entry(1, "doomed"));

        let removed = store.remove(KeyVersion::V2, &blob).unwrap();
        assert_eq!(removed.comment(), "doomed");
        assert!(store.find(KeyVersion::V2, &blob).is_none());
        assert!(store.remove(KeyVersion::V2, &blob).is_none());
    }

    #[test]
    fn test_remove_all_leaves_other_version() {
        let mut store = KeyStore::new();
        store.add(ed25519_entry(1, "a"));
        store.add(ed25519_entry(2, "b"));
        assert_eq!(store.count(KeyVersion::V2), 2);

        assert_eq!(store.remove_all(KeyVersion::V1), 0);
        assert_eq!(store.count(KeyVersion::V2), 2);

        assert_eq!(store.remove_all(KeyVersion::V2), 2);
        assert_eq!(store.count(KeyVersion::V2), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_enumeration_is_sorted_by_blob() {
        let mut store = KeyStore::new();
        for seed in [9u8, 3, 7, 1] {
            store.add(ed25519_entry(seed, "k"));
        }

        let blobs: Vec<Vec<u8>> = store
            .iter_version(KeyVersion::V2)
            .map(|k| k.public_blob())
            .collect();
        let mut sorted = blobs.clone();
        sorted.sort();
        assert_eq!(blobs, sorted);

        // nth() agrees with iteration order.
        for (i, blob) in blobs.iter().enumerate() {
            assert_eq!(&store.nth(KeyVersion::V2, i).unwrap().public_blob(), blob);
        }
        assert!(store.nth(KeyVersion::V2, blobs.len()).is_none());
    }

    #[test]
    fn test_list_serialized_v2() {
        let mut store = KeyStore::new();
        store.add(ed25519_entry(1, "alpha"));
        store.add(ed25519_entry(2, "beta"));

        let mut w = MessageWriter::new();
        store.list_serialized(KeyVersion::V2, &mut w);
        let body = w.into_vec();

        let mut r = MessageReader::new(&body);
        assert_eq!(r.get_uint32(), 2);
        let mut seen = Vec::new();
        for _ in 0..2 {
            let blob = r.get_string().to_vec();
            let comment = r.get_string().to_vec();
            seen.push((blob, comment));
        }
        assert!(!r.has_err());
        assert_eq!(r.remaining(), 0);

        // Entries appear in blob order with their own comments.
        assert!(seen[0].0 < seen[1].0);
        let comments: Vec<&[u8]> = seen.iter().map(|(_, c)| c.as_slice()).collect();
        assert!(comments.contains(&b"alpha".as_slice()));
        assert!(comments.contains(&b"beta".as_slice()));
    }

    #[test]
    fn test_list_serialized_empty() {
        let store = KeyStore::new();
        let mut w = MessageWriter::new();
        store.list_serialized(KeyVersion::V1, &mut w);
        assert_eq!(w.as_slice(), &[0, 0, 0, 0]);
    }
}
