//! Content fingerprints.
//!
//! Documents remember a fingerprint of the text they were last loaded with so
//! that reopening a file with identical content can skip a reload.

/// FNV-1a 64-bit hash of text content.
///
/// Fast and non-cryptographic. Good enough to detect "same text as before",
/// not suitable where collisions could be chosen by an adversary.
///
/// ```
/// use project_service::text::fnv1a_hash;
///
/// assert_eq!(fnv1a_hash("abc"), fnv1a_hash("abc"));
/// assert_ne!(fnv1a_hash("abc"), fnv1a_hash("abd"));
/// ```
#[inline]
pub fn fnv1a_hash(text: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    text.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
    })
}
