//! Hash functions and byte conversions.
//!
//! The random oracle of this crate is built on top of a [`HashFunction`]. We
//! provide SHA-256 from SHA-2 (through `bitcoin_hashes`) as the default, and
//! SHA3-256 as an alternative. Both parties of a channel have to use the same
//! hash function.

use bitcoin_hashes::{sha256, Hash};
use k256::elliptic_curve::group::GroupEncoding;
use k256::AffinePoint;
use sha3::{Digest, Sha3_256};

/// A hash function treated as a random oracle.
pub trait HashFunction: Send + Sync {
    fn compute_hash(&self, data: &[u8]) -> Vec<u8>;

    /// Number of bytes returned by [`compute_hash`](HashFunction::compute_hash).
    fn output_len(&self) -> usize;
}

/// SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hash;

impl HashFunction for Sha256Hash {
    fn compute_hash(&self, data: &[u8]) -> Vec<u8> {
        sha256::Hash::hash(data).to_byte_array().to_vec()
    }

    fn output_len(&self) -> usize {
        32
    }
}

/// SHA3-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha3Hash;

impl HashFunction for Sha3Hash {
    fn compute_hash(&self, data: &[u8]) -> Vec<u8> {
        Sha3_256::digest(data).to_vec()
    }

    fn output_len(&self) -> usize {
        32
    }
}

/// Converts a point on the elliptic curve secp256k1 to bytes.
///
/// Apart from the point at infinity, it computes the compressed
/// representation of `point`.
#[must_use]
pub fn point_to_bytes(point: &AffinePoint) -> Vec<u8> {
    point.to_bytes().as_slice().to_vec()
}

/// Parses the compressed representation of a point.
///
/// Returns `None` if `bytes` does not encode a point of the curve.
#[must_use]
pub fn point_from_bytes(bytes: &[u8]) -> Option<AffinePoint> {
    if bytes.len() != 33 {
        return None;
    }
    let repr = k256::CompressedPoint::clone_from_slice(bytes);
    Option::from(AffinePoint::from_bytes(&repr))
}
