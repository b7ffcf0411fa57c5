// crates/stackcheck-core/src/hashing.rs
// ============================================================================
// Module: Stackcheck Canonical Hashing
// Description: Order-independent structural keys and RFC 8785 content digests.
// Purpose: Decide when two operands are the same value regardless of map key order.
// Dependencies: serde, serde_jcs, serde_json, sha2
// ============================================================================

//! ## Overview
//! Two hashing surfaces live here:
//! - [`CanonicalKey`] is a structural SHA-256 key used only for equality and
//!   hashing of condition operands. It cannot fail: every JSON value maps to a
//!   key, and map entries are folded in sorted key order.
//! - [`HashDigest`] is a hex digest of RFC 8785 (JCS) canonical JSON, used to
//!   fingerprint whole document sections in audit events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported hash algorithms for document fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 hashing.
    Sha256,
}

/// Default hash algorithm for fingerprints.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// Deterministic content hash representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Hash algorithm identifier.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

impl HashDigest {
    /// Creates a new digest from raw bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            value: hex_encode(bytes),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical digests.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Digest Helpers
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes canonical JSON using the provided algorithm.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Hashes raw bytes using the provided algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let digest = Sha256::digest(bytes);
            HashDigest::new(HashAlgorithm::Sha256, &digest)
        }
    }
}

// ============================================================================
// SECTION: Canonical Key
// ============================================================================

/// Type tags mixed into every structural hash so `"1"`, `1` and `[1]` differ.
mod tag {
    /// JSON null.
    pub const NULL: u8 = 0x00;
    /// JSON boolean.
    pub const BOOL: u8 = 0x01;
    /// JSON number.
    pub const NUMBER: u8 = 0x02;
    /// JSON string.
    pub const STRING: u8 = 0x03;
    /// JSON array.
    pub const ARRAY: u8 = 0x04;
    /// JSON object.
    pub const OBJECT: u8 = 0x05;
    /// Unordered pair of keys.
    pub const PAIR: u8 = 0x06;
}

/// Pending step of the structural key worklist.
enum Visit<'v> {
    /// Node whose children have not been scheduled yet.
    Enter(&'v Value),
    /// Container whose children (count given) are already folded.
    Exit(&'v Value, usize),
}

/// Order-independent structural key for a JSON value.
///
/// # Invariants
/// - Values that are equal up to map key order produce the same key.
/// - Keys are only compared; they carry no displayable meaning.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalKey([u8; 32]);

impl CanonicalKey {
    /// Computes the structural key of a value.
    ///
    /// Containers are folded from an explicit worklist, so nesting depth is
    /// bounded by heap rather than stack.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        let mut pending = vec![Visit::Enter(value)];
        let mut finished: Vec<Self> = Vec::new();
        while let Some(visit) = pending.pop() {
            match visit {
                Visit::Enter(node) => match node {
                    Value::Array(items) => {
                        pending.push(Visit::Exit(node, items.len()));
                        pending.extend(items.iter().rev().map(Visit::Enter));
                    }
                    Value::Object(map) => {
                        pending.push(Visit::Exit(node, map.len()));
                        pending.extend(map.values().rev().map(Visit::Enter));
                    }
                    scalar => finished.push(Self::combine(scalar, &[])),
                },
                Visit::Exit(node, count) => {
                    let children = finished.split_off(finished.len().saturating_sub(count));
                    finished.push(Self::combine(node, &children));
                }
            }
        }
        finished.pop().unwrap_or_else(|| Self::combine(&Value::Null, &[]))
    }

    /// Hashes one node given the keys of its children in document order.
    fn combine(node: &Value, children: &[Self]) -> Self {
        let mut hasher = Sha256::new();
        match node {
            Value::Null => hasher.update([tag::NULL]),
            Value::Bool(flag) => {
                hasher.update([tag::BOOL, u8::from(*flag)]);
            }
            Value::Number(number) => {
                hasher.update([tag::NUMBER]);
                hasher.update(number.to_string().as_bytes());
            }
            Value::String(text) => {
                hasher.update([tag::STRING]);
                hasher.update(text.as_bytes());
            }
            Value::Array(_) => {
                hasher.update([tag::ARRAY]);
                hasher.update((children.len() as u64).to_be_bytes());
                for child in children {
                    hasher.update(child.0);
                }
            }
            Value::Object(map) => {
                let mut entries: Vec<(&String, &Self)> = map.keys().zip(children).collect();
                entries.sort_by(|left, right| left.0.cmp(right.0));
                hasher.update([tag::OBJECT]);
                hasher.update((entries.len() as u64).to_be_bytes());
                for (key, child) in entries {
                    hasher.update((key.len() as u64).to_be_bytes());
                    hasher.update(key.as_bytes());
                    hasher.update(child.0);
                }
            }
        }
        Self::finish(hasher)
    }

    /// Combines two keys without regard to their order.
    #[must_use]
    pub fn unordered_pair(left: Self, right: Self) -> Self {
        let (low, high) = if left <= right { (left, right) } else { (right, left) };
        let mut hasher = Sha256::new();
        hasher.update([tag::PAIR]);
        hasher.update(low.0);
        hasher.update(high.0);
        Self::finish(hasher)
    }

    /// Consumes a hasher into a key.
    fn finish(hasher: Sha256) -> Self {
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = hex_encode(&self.0[.. 6]);
        write!(f, "CanonicalKey({short})")
    }
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
