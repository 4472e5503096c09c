//! Key/value cache contract and in-memory implementation
//!
//! Caches are shared resources components look up by name through the
//! stream manager. Values are opaque bytes.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

/// Cache operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// `get` or `delete` targeted a key that does not exist.
    #[error("key does not exist")]
    NotFound,

    /// `add` targeted a key that already exists.
    #[error("key already exists")]
    AlreadyExists,
}

/// A key/value store shareable across components.
pub trait Cache: Send + Sync {
    /// Return the value for `key`, or [`CacheError::NotFound`].
    fn get(&self, key: &str) -> Result<Vec<u8>, CacheError>;

    /// Set the value of `key`, inserting or overwriting.
    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// Set the value of `key` only if absent, otherwise
    /// [`CacheError::AlreadyExists`].
    fn add(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// Remove `key`, or [`CacheError::NotFound`] if absent.
    fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Process-local cache backed by a map.
#[derive(Debug, Default)]
pub struct MemoryCache {
    items: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        self.items.read().get(key).cloned().ok_or(CacheError::NotFound)
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        self.items.write().insert(key.to_owned(), value);
        Ok(())
    }

    fn add(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let mut items = self.items.write();
        if items.contains_key(key) {
            return Err(CacheError::AlreadyExists);
        }
        items.insert(key.to_owned(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.items
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or(CacheError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("absent"), Err(CacheError::NotFound));
    }

    #[test]
    fn test_set_overwrites() {
        let cache = MemoryCache::new();
        cache.set("k", b"one".to_vec()).unwrap();
        cache.set("k", b"two".to_vec()).unwrap();
        assert_eq!(cache.get("k").unwrap(), b"two");
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let cache = MemoryCache::new();
        cache.add("k", b"one".to_vec()).unwrap();
        assert_eq!(cache.add("k", b"two".to_vec()), Err(CacheError::AlreadyExists));
        assert_eq!(cache.get("k").unwrap(), b"one");
    }

    #[test]
    fn test_delete() {
        let cache = MemoryCache::new();
        cache.set("k", vec![1]).unwrap();
        cache.delete("k").unwrap();
        assert_eq!(cache.delete("k"), Err(CacheError::NotFound));
    }
}
