//! Cache key derivation.
//!
//! A cache key is the lowercase hex MD5 digest of the request's identifying
//! inputs. It doubles as the artifact's file stem in the store, so keys that
//! arrive from the outside (HTTP path parameters) go through
//! [`CacheKey::parse`] before they touch the filesystem.

use std::fmt;

/// Length of a key in hex characters.
pub const KEY_LENGTH: usize = 32;

/// Stable identifier for a cached artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Parses an externally supplied key.
    ///
    /// Returns `None` unless the input is exactly 32 hex digits. Uppercase
    /// digits are normalized to lowercase.
    ///
    /// # Example
    ///
    /// ```
    /// use artcache::key::CacheKey;
    ///
    /// assert!(CacheKey::parse("d41d8cd98f00b204e9800998ecf8427e").is_some());
    /// assert!(CacheKey::parse("../../etc/passwd").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() == KEY_LENGTH && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives the key for a single identifier (usually a URL).
///
/// # Example
///
/// ```
/// use artcache::key::derive_key;
///
/// assert_eq!(derive_key("").as_str(), "d41d8cd98f00b204e9800998ecf8427e");
/// ```
pub fn derive_key(identifier: &str) -> CacheKey {
    CacheKey(format!("{:x}", md5::compute(identifier.as_bytes())))
}

/// Derives the key for a set of identifiers.
///
/// The identifiers are sorted lexicographically and concatenated without a
/// separator before hashing, so any permutation of the same set yields the
/// same key.
pub fn derive_composite_key<S: AsRef<str>>(identifiers: &[S]) -> CacheKey {
    let mut sorted: Vec<&str> = identifiers.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    derive_key(&sorted.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "https://is1-ssl.mzstatic.com/image/thumb/a.jpg";
    const B: &str = "https://is2-ssl.mzstatic.com/image/thumb/b.png";
    const C: &str = "https://is3-ssl.mzstatic.com/image/thumb/c.webp";

    #[test]
    fn test_derive_key_is_deterministic() {
        assert_eq!(derive_key(A), derive_key(A));
    }

    #[test]
    fn test_derive_key_known_digest() {
        assert_eq!(
            derive_key("hello").as_str(),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }

    #[test]
    fn test_distinct_inputs_give_distinct_keys() {
        assert_ne!(derive_key(A), derive_key(B));
        assert_ne!(derive_key(A), derive_key(&format!("{} ", A)));
    }

    #[test]
    fn test_key_shape() {
        let key = derive_key(A);
        assert_eq!(key.as_str().len(), KEY_LENGTH);
        assert!(key
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn test_composite_key_is_order_independent() {
        let expected = derive_composite_key(&[A, B, C]);
        let permutations = [
            [A, C, B],
            [B, A, C],
            [B, C, A],
            [C, A, B],
            [C, B, A],
        ];
        for p in permutations {
            assert_eq!(derive_composite_key(&p), expected, "permutation {:?}", p);
        }
    }

    #[test]
    fn test_composite_key_concatenates_sorted_without_separator() {
        let mut sorted = vec![C, A, B];
        sorted.sort();
        assert_eq!(
            derive_composite_key(&[C, A, B]),
            derive_key(&sorted.concat())
        );
    }

    #[test]
    fn test_composite_key_differs_for_different_sets() {
        assert_ne!(derive_composite_key(&[A, B]), derive_composite_key(&[A, C]));
    }

    #[test]
    fn test_composite_key_accepts_owned_strings() {
        let owned = vec![B.to_string(), A.to_string()];
        assert_eq!(derive_composite_key(&owned), derive_composite_key(&[A, B]));
    }

    #[test]
    fn test_parse_rejects_non_hex_and_wrong_length() {
        assert!(CacheKey::parse("").is_none());
        assert!(CacheKey::parse("abc").is_none());
        assert!(CacheKey::parse("zz1d8cd98f00b204e9800998ecf8427e").is_none());
        assert!(CacheKey::parse("d41d8cd98f00b204e9800998ecf8427e0").is_none());
    }

    #[test]
    fn test_parse_normalizes_case() {
        let key = CacheKey::parse("D41D8CD98F00B204E9800998ECF8427E").unwrap();
        assert_eq!(key, derive_key(""));
    }
}
