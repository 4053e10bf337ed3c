//! Schnorr signatures over the edwards25519 suite.
//!
//! Writers, readers and the access-control committee all authenticate with
//! the same `(x, X = x·g)` key pairs the PVSS layer encrypts to, so the
//! signature scheme works on raw suite scalars rather than Ed25519's
//! clamped keys. A signature is the pair `(R, s)`, 64 bytes on the wire,
//! with a SHA-256 challenge.

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::{EdwardsPoint, Scalar};
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::errors::OcsError;
use crate::suite;

/// A Schnorr signature `(R, s)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchnorrSignature {
    pub r: EdwardsPoint,
    pub s: Scalar,
}

fn challenge(r: &EdwardsPoint, pk: &EdwardsPoint, msg: &[u8]) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(r.compress().as_bytes());
    hasher.update(pk.compress().as_bytes());
    hasher.update(msg);
    suite::scalar_from_digest(hasher.finalize().into())
}

/// Signs `msg` under the secret key `sk`.
pub fn sign<R: RngCore + CryptoRng>(sk: &Scalar, msg: &[u8], rng: &mut R) -> SchnorrSignature {
    let k = Scalar::random(rng);
    let r = suite::mul_base(&k);
    let c = challenge(&r, &suite::mul_base(sk), msg);
    SchnorrSignature { r, s: k + c * sk }
}

/// Verifies a signature over `msg` under the public key `pk`.
pub fn verify(pk: &EdwardsPoint, msg: &[u8], sig: &SchnorrSignature) -> Result<(), OcsError> {
    let c = challenge(&sig.r, pk, msg);
    if suite::mul_base(&sig.s) != sig.r + c * pk {
        return Err(OcsError::Protocol(
            "schnorr signature verification failed".into(),
        ));
    }
    Ok(())
}

/// Verifies a committee co-signature against the aggregate of `pks`.
///
/// Forward-link signatures are produced collectively by the access-control
/// committee; verification only ever needs the sum of its public keys.
pub fn verify_collective(
    pks: &[EdwardsPoint],
    msg: &[u8],
    sig: &SchnorrSignature,
) -> Result<(), OcsError> {
    if pks.is_empty() {
        return Err(OcsError::Parameter(
            "empty access-control key list".into(),
        ));
    }
    let agg: EdwardsPoint = pks.iter().sum();
    verify(&agg, msg, sig)
}

impl SchnorrSignature {
    /// Serializes as `R || s`, 64 bytes.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(self.r.compress().as_bytes());
        out[32..].copy_from_slice(self.s.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OcsError> {
        if bytes.len() != 64 {
            return Err(OcsError::Parse(format!(
                "signature must be 64 bytes, got {}",
                bytes.len()
            )));
        }
        let mut r_bytes = [0u8; 32];
        r_bytes.copy_from_slice(&bytes[..32]);
        let r = CompressedEdwardsY(r_bytes)
            .decompress()
            .ok_or_else(|| OcsError::Parse("invalid signature commitment point".into()))?;
        let mut s_bytes = [0u8; 32];
        s_bytes.copy_from_slice(&bytes[32..]);
        let s = Option::<Scalar>::from(Scalar::from_canonical_bytes(s_bytes))
            .ok_or_else(|| OcsError::Parse("non-canonical signature scalar".into()))?;
        Ok(SchnorrSignature { r, s })
    }
}
