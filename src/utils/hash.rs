//! Short non-cryptographic fingerprints (FxHash).
//!
//! Used for generated names such as `stylesheets_1a2b3c4d`. Cache keys use
//! blake3 instead (see `cache::CacheKey`).

use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Compute a 64-bit hash of byte data.
#[inline]
pub fn compute<T: AsRef<[u8]> + ?Sized>(data: &T) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data.as_ref());
    hasher.finish()
}

/// 8-char hex fingerprint.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(value: &T) -> String {
    format!("{:016x}", compute(value))[..8].to_string()
}
