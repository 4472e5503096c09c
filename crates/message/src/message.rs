//! Message and part types
//!
//! A message is an ordered sequence of parts. Each part carries an opaque
//! byte payload and a string metadata map. Parts clone cheaply: the payload
//! is a `Bytes` handle and the metadata map is shared behind an `Arc` until
//! first mutation.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

/// A single message part: opaque bytes plus metadata.
///
/// Cloning a part shares the payload buffer and the metadata map. Mutating
/// metadata through [`Part::set_metadata`] clones the map first if it is
/// shared, so sibling copies never observe the write.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    data: Bytes,
    metadata: Arc<HashMap<String, String>>,
}

impl Part {
    /// Create a part from a byte payload with empty metadata.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            metadata: Arc::new(HashMap::new()),
        }
    }

    /// The byte payload.
    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Replace the byte payload.
    pub fn set_data(&mut self, data: impl Into<Bytes>) {
        self.data = data.into();
    }

    /// Look up a metadata value.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Iterate over all metadata entries.
    pub fn metadata_iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metadata.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Set a metadata value, copy-on-write if the map is shared.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        Arc::make_mut(&mut self.metadata).insert(key.into(), value.into());
    }
}

impl From<Bytes> for Part {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl From<Vec<u8>> for Part {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&str> for Part {
    fn from(data: &str) -> Self {
        Self::new(Bytes::copy_from_slice(data.as_bytes()))
    }
}

/// An ordered sequence of parts passed between dataflow stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    parts: Vec<Part>,
}

impl Message {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a message from pre-built parts.
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    /// Create a message with one part per byte payload.
    pub fn from_payloads<I, B>(payloads: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            parts: payloads.into_iter().map(|b| Part::new(b)).collect(),
        }
    }

    /// Number of parts.
    #[inline]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True when the message has no parts.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// All parts in order.
    #[inline]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Mutable access to the parts.
    #[inline]
    pub fn parts_mut(&mut self) -> &mut Vec<Part> {
        &mut self.parts
    }

    /// Resolve a possibly-negative part index; -1 addresses the last part.
    ///
    /// Returns `None` when the index falls outside the message.
    pub fn resolve_index(&self, index: isize) -> Option<usize> {
        let len = self.parts.len() as isize;
        let resolved = if index < 0 { len + index } else { index };
        (0..len).contains(&resolved).then_some(resolved as usize)
    }

    /// Get a part by possibly-negative index.
    pub fn part(&self, index: isize) -> Option<&Part> {
        self.resolve_index(index).map(|i| &self.parts[i])
    }

    /// Append a part.
    pub fn push(&mut self, part: impl Into<Part>) {
        self.parts.push(part.into());
    }

    /// Sum of part payload lengths in bytes.
    pub fn total_bytes(&self) -> usize {
        self.parts.iter().map(|p| p.data.len()).sum()
    }

    /// Take a shallow copy: the parts vector is duplicated, the byte
    /// buffers and metadata maps stay shared until mutated.
    pub fn shallow_copy(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_payloads_preserves_order() {
        let msg = Message::from_payloads(["a", "b", "c"].map(Bytes::from));
        assert_eq!(msg.len(), 3);
        assert_eq!(msg.parts()[0].data().as_ref(), b"a");
        assert_eq!(msg.parts()[2].data().as_ref(), b"c");
        assert_eq!(msg.total_bytes(), 3);
    }

    #[test]
    fn test_shallow_copy_shares_buffers() {
        let msg = Message::from_payloads([Bytes::from_static(b"shared payload")]);
        let copy = msg.shallow_copy();

        // Same backing buffer, not a byte copy.
        assert_eq!(
            msg.parts()[0].data().as_ptr(),
            copy.parts()[0].data().as_ptr()
        );
    }

    #[test]
    fn test_metadata_copy_on_write() {
        let mut part = Part::from("payload");
        part.set_metadata("origin", "tcp");

        let mut copy = part.clone();
        copy.set_metadata("origin", "file");
        copy.set_metadata("extra", "1");

        // The original never observes the copy's writes.
        assert_eq!(part.metadata("origin"), Some("tcp"));
        assert_eq!(part.metadata("extra"), None);
        assert_eq!(copy.metadata("origin"), Some("file"));
        assert_eq!(copy.metadata("extra"), Some("1"));
    }

    #[test]
    fn test_resolve_index_negative() {
        let msg = Message::from_payloads(["0", "1", "2", "3", "4"].map(Bytes::from));
        assert_eq!(msg.resolve_index(-1), Some(4));
        assert_eq!(msg.resolve_index(-5), Some(0));
        assert_eq!(msg.resolve_index(-6), None);
        assert_eq!(msg.resolve_index(0), Some(0));
        assert_eq!(msg.resolve_index(4), Some(4));
        assert_eq!(msg.resolve_index(5), None);
    }

    #[test]
    fn test_empty_message() {
        let msg = Message::new();
        assert!(msg.is_empty());
        assert_eq!(msg.resolve_index(0), None);
        assert_eq!(msg.resolve_index(-1), None);
    }
}
