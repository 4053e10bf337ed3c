//! Publicly verifiable secret sharing.
//!
//! The scheme follows Schoenmakers' construction. A dealer encrypts one
//! share per trustee public key and attaches a DLEQ consistency proof, so
//! any third party can check the sharing without learning anything. Each
//! trustee later decrypts its share and proves it did so correctly, and
//! once a threshold of valid decrypted shares is available anyone can
//! recover the secret commitment `p(0)·g` by Lagrange interpolation.

use curve25519_dalek::{EdwardsPoint, Scalar};
use rand_core::{CryptoRng, RngCore};
use std::fmt;

use crate::crypto::dleq::{DleqError, DleqProof};
use crate::crypto::poly::{self, PriPoly, PubPoly, PubShare};
use crate::suite;

/// Failure kinds of the PVSS layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PvssError {
    /// Verification of an encrypted share failed.
    EncVerification,
    /// Verification of a decrypted share failed.
    DecVerification,
    /// Not enough valid shares to recover the secret.
    TooFewShares { required: usize, provided: usize },
    /// Parallel inputs have different lengths.
    LengthMismatch,
    /// The same share index appeared twice during reconstruction.
    DuplicateIndex(usize),
}

impl fmt::Display for PvssError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PvssError::EncVerification => write!(f, "verification of encrypted share failed"),
            PvssError::DecVerification => write!(f, "verification of decrypted share failed"),
            PvssError::TooFewShares { required, provided } => {
                write!(f, "not enough shares to recover secret ({provided} of {required})")
            }
            PvssError::LengthMismatch => write!(f, "inputs of different lengths"),
            PvssError::DuplicateIndex(i) => write!(f, "duplicate share index {i}"),
        }
    }
}

impl std::error::Error for PvssError {}

impl From<DleqError> for PvssError {
    fn from(err: DleqError) -> Self {
        match err {
            DleqError::LengthMismatch => PvssError::LengthMismatch,
            DleqError::InvalidProof => PvssError::EncVerification,
        }
    }
}

/// A public verifiable share: the share point plus its consistency proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PubVerShare {
    /// Share.
    pub s: PubShare,
    /// Proof.
    pub p: DleqProof,
}

/// Creates encrypted publicly verifiable shares of `secret`.
///
/// Shares the secret with threshold `t` over the per-session base `h`,
/// encrypting the share for trustee `i` under its public key `pks[i]`.
/// Returns the encrypted shares and the public commitment polynomial over
/// base `h`, whose evaluations verifiers use to check the shares.
pub fn enc_shares<R: RngCore + CryptoRng>(
    h: &EdwardsPoint,
    pks: &[EdwardsPoint],
    secret: &Scalar,
    t: usize,
    rng: &mut R,
) -> Result<(Vec<PubVerShare>, PubPoly), PvssError> {
    let n = pks.len();
    let pri_poly = PriPoly::new(t, *secret, rng);
    let pri_shares = pri_poly.shares(n);
    let pub_poly = pri_poly.commit(h);

    let hs = vec![*h; n];
    let values: Vec<Scalar> = pri_shares.iter().map(|s| s.v).collect();
    let (proofs, _, sx) = DleqProof::new_batch(&hs, pks, &values, rng)?;

    let enc = pri_shares
        .iter()
        .zip(proofs.into_iter().zip(sx))
        .map(|(pri, (p, v))| PubVerShare {
            s: PubShare { i: pri.i, v },
            p,
        })
        .collect();

    Ok((enc, pub_poly))
}

/// Checks that `enc` satisfies `log_h(sH) == log_pk(sX)`.
///
/// `sh` is the public commitment `sH_i`, the commitment polynomial
/// evaluated at the share's index.
pub fn verify_enc_share(
    h: &EdwardsPoint,
    pk: &EdwardsPoint,
    sh: &EdwardsPoint,
    enc: &PubVerShare,
) -> Result<(), PvssError> {
    enc.p
        .verify(h, pk, sh, &enc.s.v)
        .map_err(|_| PvssError::EncVerification)
}

/// Batch variant of [`verify_enc_share`].
///
/// Returns the trustee keys and encrypted shares that verify, in input
/// order; shares that fail are dropped silently.
pub fn verify_enc_share_batch(
    h: &EdwardsPoint,
    pks: &[EdwardsPoint],
    shs: &[EdwardsPoint],
    encs: &[PubVerShare],
) -> Result<(Vec<EdwardsPoint>, Vec<PubVerShare>), PvssError> {
    if pks.len() != shs.len() || shs.len() != encs.len() {
        return Err(PvssError::LengthMismatch);
    }
    let mut good_keys = Vec::new();
    let mut good_shares = Vec::new();
    for i in 0..pks.len() {
        if verify_enc_share(h, &pks[i], &shs[i], &encs[i]).is_ok() {
            good_keys.push(pks[i]);
            good_shares.push(encs[i]);
        }
    }
    Ok((good_keys, good_shares))
}

/// Verifies and decrypts an encrypted share.
///
/// Checks the encryption consistency proof first, then unblinds
/// `V = x⁻¹·sX` and proves the decryption correct with a DLEQ proof over
/// the bases `g` and `V`, so a verifier can check
/// `log_g(pk) == log_V(sX)`.
pub fn dec_share<R: RngCore + CryptoRng>(
    h: &EdwardsPoint,
    pk: &EdwardsPoint,
    sh: &EdwardsPoint,
    sk: &Scalar,
    enc: &PubVerShare,
    rng: &mut R,
) -> Result<PubVerShare, PvssError> {
    verify_enc_share(h, pk, sh, enc)?;
    let v = sk.invert() * enc.s.v;
    let (p, _, _) = DleqProof::new(&suite::BASE, &v, sk, rng);
    Ok(PubVerShare {
        s: PubShare { i: enc.s.i, v },
        p,
    })
}

/// Checks that `dec` is the correct decryption of `enc`.
pub fn verify_dec_share(
    pk: &EdwardsPoint,
    enc: &PubVerShare,
    dec: &PubVerShare,
) -> Result<(), PvssError> {
    dec.p
        .verify(&suite::BASE, &dec.s.v, pk, &enc.s.v)
        .map_err(|_| PvssError::DecVerification)
}

/// Batch variant of [`verify_dec_share`]; returns the shares that verify.
pub fn verify_dec_share_batch(
    pks: &[EdwardsPoint],
    encs: &[PubVerShare],
    decs: &[PubVerShare],
) -> Result<Vec<PubVerShare>, PvssError> {
    if pks.len() != encs.len() || encs.len() != decs.len() {
        return Err(PvssError::LengthMismatch);
    }
    let mut good = Vec::new();
    for i in 0..pks.len() {
        if verify_dec_share(&pks[i], &encs[i], &decs[i]).is_ok() {
            good.push(decs[i]);
        }
    }
    Ok(good)
}

/// Verifies the decrypted shares and recovers the secret commitment.
///
/// Requires at least `t` of the `n` decrypted shares to verify; the result
/// is the writer's secret commitment `p(0)·g`, independent of which `t`
/// valid shares contribute.
pub fn recover_secret(
    pks: &[EdwardsPoint],
    encs: &[PubVerShare],
    decs: &[PubVerShare],
    t: usize,
    n: usize,
) -> Result<EdwardsPoint, PvssError> {
    let good = verify_dec_share_batch(pks, encs, decs)?;
    if good.len() < t {
        return Err(PvssError::TooFewShares {
            required: t,
            provided: good.len(),
        });
    }
    let shares: Vec<PubShare> = good.iter().map(|s| s.s).collect();
    poly::recover_commit(&shares, t, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    struct Setup {
        h: EdwardsPoint,
        sks: Vec<Scalar>,
        pks: Vec<EdwardsPoint>,
        shs: Vec<EdwardsPoint>,
        encs: Vec<PubVerShare>,
        secret: Scalar,
        t: usize,
        n: usize,
    }

    fn setup(n: usize, t: usize) -> Setup {
        let mut rng = thread_rng();
        let h = suite::hash_to_point(b"session");
        let sks: Vec<Scalar> = (0..n).map(|_| Scalar::random(&mut rng)).collect();
        let pks: Vec<EdwardsPoint> = sks.iter().map(suite::mul_base).collect();
        let secret = Scalar::random(&mut rng);
        let (encs, pub_poly) = enc_shares(&h, &pks, &secret, t, &mut rng).unwrap();
        let shs: Vec<EdwardsPoint> = (0..n).map(|i| pub_poly.eval(i).v).collect();
        Setup {
            h,
            sks,
            pks,
            shs,
            encs,
            secret,
            t,
            n,
        }
    }

    fn decrypt_all(s: &Setup) -> Vec<PubVerShare> {
        let mut rng = thread_rng();
        (0..s.n)
            .map(|i| {
                dec_share(&s.h, &s.pks[i], &s.shs[i], &s.sks[i], &s.encs[i], &mut rng).unwrap()
            })
            .collect()
    }

    #[test]
    fn full_cycle_recovers_secret_commitment() {
        let s = setup(5, 4);
        let decs = decrypt_all(&s);
        let recovered = recover_secret(&s.pks, &s.encs, &decs, s.t, s.n).unwrap();
        assert_eq!(recovered, suite::mul_base(&s.secret));
    }

    #[test]
    fn all_enc_shares_verify() {
        let s = setup(5, 4);
        let (keys, shares) = verify_enc_share_batch(&s.h, &s.pks, &s.shs, &s.encs).unwrap();
        assert_eq!(keys.len(), s.n);
        assert_eq!(shares.len(), s.n);
    }

    #[test]
    fn tampered_enc_share_is_rejected() {
        let s = setup(5, 4);
        let mut bad = s.encs[2];
        bad.s.v += suite::BASE;
        assert_eq!(
            verify_enc_share(&s.h, &s.pks[2], &s.shs[2], &bad),
            Err(PvssError::EncVerification)
        );
        let mut encs = s.encs.clone();
        encs[2] = bad;
        let (_, good) = verify_enc_share_batch(&s.h, &s.pks, &s.shs, &encs).unwrap();
        assert_eq!(good.len(), s.n - 1);
    }

    #[test]
    fn tampered_dec_share_is_rejected() {
        let s = setup(5, 4);
        let mut decs = decrypt_all(&s);
        decs[1].s.v += suite::BASE;
        assert_eq!(
            verify_dec_share(&s.pks[1], &s.encs[1], &decs[1]),
            Err(PvssError::DecVerification)
        );
        // Recovery still succeeds: 4 of 5 shares remain valid.
        let recovered = recover_secret(&s.pks, &s.encs, &decs, s.t, s.n).unwrap();
        assert_eq!(recovered, suite::mul_base(&s.secret));
    }

    #[test]
    fn below_threshold_fails() {
        let s = setup(5, 4);
        let decs = decrypt_all(&s);
        let result = recover_secret(&s.pks[..3], &s.encs[..3], &decs[..3], s.t, s.n);
        match result {
            Err(PvssError::TooFewShares { required, provided }) => {
                assert_eq!(required, 4);
                assert_eq!(provided, 3);
            }
            other => panic!("expected TooFewShares, got {other:?}"),
        }
    }

    #[test]
    fn recovery_is_subset_independent() {
        let s = setup(5, 4);
        let decs = decrypt_all(&s);
        let first = recover_secret(&s.pks[..4], &s.encs[..4], &decs[..4], s.t, s.n).unwrap();
        let last = recover_secret(&s.pks[1..], &s.encs[1..], &decs[1..], s.t, s.n).unwrap();
        assert_eq!(first, last);
    }

    #[test]
    fn wrong_key_cannot_decrypt() {
        let s = setup(5, 4);
        let mut rng = thread_rng();
        let wrong = Scalar::random(&mut rng);
        // The encryption proof check fails against a mismatched key.
        assert!(dec_share(&s.h, &s.pks[0], &s.shs[1], &wrong, &s.encs[1], &mut rng).is_err());
    }
}
