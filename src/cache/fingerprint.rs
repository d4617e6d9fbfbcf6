//! Canonical query fingerprinting for L1/L3 keys.

use sha2::{Digest, Sha256};

/// Fingerprint the raw query text. No normalisation beyond what is
/// explicitly configured — case, whitespace, and punctuation changes all
/// produce a different fingerprint, and so MUST miss against a prior entry
/// (§4.4).
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
