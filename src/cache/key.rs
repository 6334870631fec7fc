//! Content-addressed cache keys (blake3).

use std::fmt;

use crate::filter::{FilterChain, FilterMode};

/// Bumped whenever the key derivation changes, so old entries stop matching.
const KEY_FORMAT: &[u8] = b"assetkit:cache-key:v2";

/// A 256-bit key derived from input content and filter-chain identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive the key for `parts` run through `chain`.
    ///
    /// Every field is length-prefixed so `["ab", "c"]` and `["a", "bc"]`
    /// never collide.
    pub fn derive(parts: &[Vec<u8>], chain: &FilterChain) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(KEY_FORMAT);

        hasher.update(&(parts.len() as u64).to_le_bytes());
        for part in parts {
            hash_field(&mut hasher, part);
        }

        hasher.update(&(chain.len() as u64).to_le_bytes());
        for (name, mode, options) in chain.identity() {
            hash_field(&mut hasher, name.as_bytes());
            hasher.update(&[mode_tag(mode)]);
            hash_field(&mut hasher, options.as_bytes());
        }

        Self(*hasher.finalize().as_bytes())
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Short form used for `*` in output templates.
    pub fn fingerprint(self) -> String {
        self.to_hex()[..8].to_string()
    }
}

fn mode_tag(mode: FilterMode) -> u8 {
    match mode {
        FilterMode::PerInput => 1,
        FilterMode::Combined => 2,
    }
}

fn hash_field(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 16 hex chars for brevity
        write!(f, "{}", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterRegistry, FnFilter};

    fn registry() -> FilterRegistry {
        let registry = FilterRegistry::new();
        registry.register("a", FnFilter::new(|i: &[u8]| Ok(i.to_vec())));
        registry.register("b", FnFilter::new(|i: &[u8]| Ok(i.to_vec())));
        registry
    }

    #[test]
    fn test_same_inputs_same_key() {
        let registry = registry();
        let chain = registry.resolve(&["a", "b"]).unwrap();
        let parts = vec![b"one".to_vec(), b"two".to_vec()];
        assert_eq!(
            CacheKey::derive(&parts, &chain),
            CacheKey::derive(&parts.clone(), &registry.resolve(&["a", "b"]).unwrap())
        );
    }

    #[test]
    fn test_filter_order_changes_key() {
        let registry = registry();
        let parts = vec![b"x".to_vec()];
        let ab = CacheKey::derive(&parts, &registry.resolve(&["a", "b"]).unwrap());
        let ba = CacheKey::derive(&parts, &registry.resolve(&["b", "a"]).unwrap());
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_part_boundaries_change_key() {
        let chain = FilterChain::default();
        let k1 = CacheKey::derive(&[b"ab".to_vec(), b"c".to_vec()], &chain);
        let k2 = CacheKey::derive(&[b"a".to_vec(), b"bc".to_vec()], &chain);
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_filter_options_change_key() {
        let r1 = FilterRegistry::new();
        r1.register("banner", FnFilter::new(|i: &[u8]| Ok(i.to_vec())).with_options("v1"));
        let r2 = FilterRegistry::new();
        r2.register("banner", FnFilter::new(|i: &[u8]| Ok(i.to_vec())).with_options("v2"));

        let parts = vec![b"x".to_vec()];
        assert_ne!(
            CacheKey::derive(&parts, &r1.resolve(&["banner"]).unwrap()),
            CacheKey::derive(&parts, &r2.resolve(&["banner"]).unwrap())
        );
    }

    #[test]
    fn test_filter_mode_changes_key() {
        let combined = FilterRegistry::new();
        combined.register("semi", FnFilter::new(|i: &[u8]| Ok(i.to_vec())));
        let per_input = FilterRegistry::new();
        per_input.register(
            "semi",
            FnFilter::new(|i: &[u8]| Ok(i.to_vec())).with_mode(FilterMode::PerInput),
        );

        let parts = vec![b"a".to_vec(), b"b".to_vec()];
        assert_ne!(
            CacheKey::derive(&parts, &combined.resolve(&["semi"]).unwrap()),
            CacheKey::derive(&parts, &per_input.resolve(&["semi"]).unwrap())
        );
    }

    #[test]
    fn test_hex_roundtrip_and_fingerprint() {
        let key = CacheKey::new([0xab; 32]);
        assert_eq!(CacheKey::from_hex(&key.to_hex()), Some(key));
        assert_eq!(key.fingerprint(), "abababab");
        assert_eq!(format!("{key}"), "abababababababab");
        assert_eq!(CacheKey::from_hex("zz"), None);
    }
}
