//! Key Derivation Module
//!
//! Turns a logical key plus call arguments into one canonical physical key,
//! so independent call sites hit the same cache slot without coordination.

use sha2::{Digest, Sha256};

// == Derive Key ==
/// Derives a deterministic physical key from a logical base key, positional
/// arguments (in order) and named arguments (sorted by name).
///
/// The canonical form is `base|arg..|name=value..` hashed with SHA-256 and
/// hex-encoded, so identical inputs always collide on the same slot and
/// distinct inputs collide with negligible probability. The result is a
/// fixed-width lowercase hex string, safe to use as a file name.
pub fn derive_key(base_key: &str, args: &[&str], kwargs: &[(&str, &str)]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(1 + args.len() + kwargs.len());
    parts.push(base_key.to_string());
    parts.extend(args.iter().map(|arg| arg.to_string()));

    let mut named: Vec<&(&str, &str)> = kwargs.iter().collect();
    named.sort_by_key(|(name, _)| *name);
    parts.extend(named.iter().map(|(name, value)| format!("{name}={value}")));

    let mut hasher = Sha256::new();
    hasher.update(parts.join("|").as_bytes());
    hex::encode(hasher.finalize())
}

/// Shorthand for the common case of a bare logical key.
pub fn derive_simple_key(base_key: &str) -> String {
    derive_key(base_key, &[], &[])
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_deterministic() {
        let a = derive_key("analysis", &["000001", "38"], &[("market", "cn")]);
        let b = derive_key("analysis", &["000001", "38"], &[("market", "cn")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_key_kwarg_order_insensitive() {
        let a = derive_key("k", &[], &[("b", "2"), ("a", "1")]);
        let b = derive_key("k", &[], &[("a", "1"), ("b", "2")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_key_positional_order_sensitive() {
        let a = derive_key("k", &["x", "y"], &[]);
        let b = derive_key("k", &["y", "x"], &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_derive_key_distinct_inputs() {
        let a = derive_key("k", &["1"], &[]);
        let b = derive_key("k", &["2"], &[]);
        let c = derive_key("other", &["1"], &[]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_derive_key_is_hex() {
        let key = derive_simple_key("stock:000001:rtsi");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_simple_key_matches_empty_args() {
        assert_eq!(derive_simple_key("k"), derive_key("k", &[], &[]));
    }
}
