//! Hashing utilities: no-op hashed maps for integer keys and
//! replay content hashing

use hashbrown::HashMap;
use ring::digest::{digest, SHA256};
use std::hash::{BuildHasherDefault, Hasher};

/// Hasher implementation that directly uses an integer value
/// instead of hashing, used for maps keyed by integer IDs where
/// hashing would be wasted work
#[derive(Default)]
pub struct IntHasher(u64);

/// [BuildHasherDefault] type for [IntHasher]
pub type IntBuildHasher = BuildHasherDefault<IntHasher>;

/// [HashMap] variant using [IntHasher]
pub type IntHashMap<K, V> = HashMap<K, V, IntBuildHasher>;

const INVALID_USAGE: &str = "IntHasher only supports integer keys";

impl Hasher for IntHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, _: &[u8]) {
        unreachable!("{}", INVALID_USAGE)
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        self.0 = i as u64;
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }

    #[inline]
    fn write_i32(&mut self, i: i32) {
        self.0 = i as u64;
    }

    #[inline]
    fn write_i64(&mut self, i: i64) {
        self.0 = i as u64;
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        self.0 = i as u64;
    }
}

/// Computes the SHA-256 content hash of a replay blob returning
/// it encoded as lowercase hex
pub fn content_hash(bytes: &[u8]) -> String {
    let hash = digest(&SHA256, bytes);
    let mut out = String::with_capacity(64);
    for byte in hash.as_ref() {
        use std::fmt::Write;
        // Writing to a String cannot fail
        _ = write!(&mut out, "{:02x}", byte);
    }
    out
}

#[cfg(test)]
mod test {
    use super::content_hash;

    /// Hashing must be stable for identical content
    #[test]
    fn test_content_hash_stable() {
        let a = content_hash(b"replay-bytes");
        let b = content_hash(b"replay-bytes");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    /// Different content must produce different hashes
    #[test]
    fn test_content_hash_differs() {
        let a = content_hash(b"replay-one");
        let b = content_hash(b"replay-two");
        assert_ne!(a, b);
    }

    /// Known SHA-256 vector (empty input)
    #[test]
    fn test_content_hash_empty_vector() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
