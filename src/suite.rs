//! Group operations for the edwards25519 suite.
//!
//! Everything the protocol needs from the curve beyond plain arithmetic
//! lives here: a deterministic hash-to-point with unknown discrete log,
//! kyber-style data embedding into point encodings, and scalar derivation
//! from digests. There is no global suite object; callers pass points and
//! scalars explicitly.

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::traits::IsIdentity;
use curve25519_dalek::{EdwardsPoint, Scalar};
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::errors::OcsError;

/// The edwards25519 base point `g`.
pub const BASE: EdwardsPoint = ED25519_BASEPOINT_POINT;

/// Maximum number of message bytes that fit into one embedded point.
///
/// One byte of the 32-byte encoding holds the length, and the top two bytes
/// stay random so decompression can succeed, leaving 29 usable bytes.
pub const EMBED_LEN: usize = 29;

/// Multiplies the base point by `s`.
pub fn mul_base(s: &Scalar) -> EdwardsPoint {
    EdwardsPoint::mul_base(s)
}

/// Derives a point of unknown discrete log from `label`.
///
/// Hashes `label` together with a counter until the digest decompresses to
/// a curve point, then clears the cofactor so the result lives in the
/// prime-order subgroup. The derivation is deterministic, so any verifier
/// can recompute the same point.
pub fn hash_to_point(label: &[u8]) -> EdwardsPoint {
    let mut counter = 0u32;
    loop {
        let mut hasher = Sha256::new();
        hasher.update(label);
        hasher.update(counter.to_le_bytes());
        let mut candidate: [u8; 32] = hasher.finalize().into();
        candidate[31] &= 0x7f;
        if let Some(point) = CompressedEdwardsY(candidate).decompress() {
            let point = point.mul_by_cofactor();
            if !point.is_identity() {
                return point;
            }
        }
        counter = counter.wrapping_add(1);
    }
}

/// The per-write binding point `h`, derived from the reader's public key.
pub fn point_h(reader_pk: &EdwardsPoint) -> EdwardsPoint {
    let digest = Sha256::digest(reader_pk.compress().as_bytes());
    hash_to_point(&digest)
}

/// Embeds up to [`EMBED_LEN`] bytes of `data` into a point encoding.
///
/// The 32-byte compressed encoding is laid out as `[len, data.., random
/// padding]` and re-sampled until it decompresses to a point whose
/// canonical encoding is byte-identical, so [`extract_data`] can recover
/// the payload exactly.
///
/// Returns the point and the number of bytes consumed from `data`.
pub fn embed_data<R: RngCore + CryptoRng>(data: &[u8], rng: &mut R) -> (EdwardsPoint, usize) {
    let take = data.len().min(EMBED_LEN);
    loop {
        let mut buf = [0u8; 32];
        rng.fill_bytes(&mut buf);
        buf[0] = take as u8;
        buf[1..1 + take].copy_from_slice(&data[..take]);
        if let Some(point) = CompressedEdwardsY(buf).decompress() {
            if point.compress().as_bytes() == &buf {
                return (point, take);
            }
        }
    }
}

/// Recovers the bytes embedded into `point` by [`embed_data`].
pub fn extract_data(point: &EdwardsPoint) -> Result<Vec<u8>, OcsError> {
    let bytes = point.compress().to_bytes();
    let len = bytes[0] as usize;
    if len > EMBED_LEN {
        return Err(OcsError::Parse(format!(
            "embedded length {len} exceeds point capacity {EMBED_LEN}"
        )));
    }
    Ok(bytes[1..1 + len].to_vec())
}

/// Interprets a 32-byte digest as a scalar.
pub fn scalar_from_digest(digest: [u8; 32]) -> Scalar {
    Scalar::from_bytes_mod_order(digest)
}

/// SHA-256 of a single byte string.
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn hash_to_point_is_deterministic() {
        let a = hash_to_point(b"reader");
        let b = hash_to_point(b"reader");
        assert_eq!(a, b);
        assert_ne!(a, hash_to_point(b"other"));
        assert!(!a.is_identity());
    }

    #[test]
    fn hash_to_point_lands_in_prime_subgroup() {
        let p = hash_to_point(b"subgroup-check");
        assert!(p.is_torsion_free());
    }

    #[test]
    fn embed_extract_roundtrip() {
        let mut rng = thread_rng();
        for len in [0usize, 1, 16, 29] {
            let data: Vec<u8> = (0..len as u8).collect();
            let (point, taken) = embed_data(&data, &mut rng);
            assert_eq!(taken, len);
            assert_eq!(extract_data(&point).unwrap(), data);
        }
    }

    #[test]
    fn embed_truncates_to_capacity() {
        let mut rng = thread_rng();
        let data = [7u8; 64];
        let (point, taken) = embed_data(&data, &mut rng);
        assert_eq!(taken, EMBED_LEN);
        assert_eq!(extract_data(&point).unwrap(), &data[..EMBED_LEN]);
    }
}
