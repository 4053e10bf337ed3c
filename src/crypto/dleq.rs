//! Non-interactive discrete-logarithm-equality proofs.
//!
//! For two values `xG` and `xH` a [`DleqProof`] shows that
//! `log_G(xG) == log_H(xH)` without revealing the secret `x`. The batch
//! constructor derives one collective challenge over all instances, which
//! is what lets a PVSS dealer prove `n` encrypted shares in one shot.

use curve25519_dalek::{EdwardsPoint, Scalar};
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::suite;

/// Errors produced by proof creation and verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DleqError {
    /// Parallel input slices have different lengths.
    LengthMismatch,
    /// The verification equations do not hold.
    InvalidProof,
}

impl fmt::Display for DleqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DleqError::LengthMismatch => write!(f, "inputs of different lengths"),
            DleqError::InvalidProof => write!(f, "invalid dleq proof"),
        }
    }
}

impl std::error::Error for DleqError {}

/// A NIZK dlog-equality proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DleqProof {
    /// Challenge.
    pub c: Scalar,
    /// Response.
    pub r: Scalar,
    /// Commitment with respect to the first base.
    pub vg: EdwardsPoint,
    /// Commitment with respect to the second base.
    pub vh: EdwardsPoint,
}

/// Domain-separated challenge over the encrypted points and commitments.
///
/// Each list is prefixed with its length and every point is serialized in
/// its 32-byte canonical compressed encoding.
fn challenge(
    xg: &[EdwardsPoint],
    xh: &[EdwardsPoint],
    vg: &[EdwardsPoint],
    vh: &[EdwardsPoint],
) -> Scalar {
    let mut hasher = Sha256::new();
    for list in [xg, xh, vg, vh] {
        hasher.update((list.len() as u32).to_le_bytes());
        for point in list {
            hasher.update(point.compress().as_bytes());
        }
    }
    suite::scalar_from_digest(hasher.finalize().into())
}

impl DleqProof {
    /// Proves knowledge of `x` such that `xG = x·g` and `xH = x·h`.
    ///
    /// Picks a random commitment scalar `v`, derives the challenge
    /// `c = H(xG | xH | vG | vH)` and the response `r = v − c·x`. Returns
    /// the proof together with the encrypted base points `xG` and `xH`.
    pub fn new<R: RngCore + CryptoRng>(
        g: &EdwardsPoint,
        h: &EdwardsPoint,
        x: &Scalar,
        rng: &mut R,
    ) -> (DleqProof, EdwardsPoint, EdwardsPoint) {
        let xg = x * g;
        let xh = x * h;

        let v = Scalar::random(rng);
        let vg = v * g;
        let vh = v * h;

        let c = challenge(&[xg], &[xh], &[vg], &[vh]);
        let r = v - c * x;

        (DleqProof { c, r, vg, vh }, xg, xh)
    }

    /// Proves a list of instances under one collective challenge.
    ///
    /// All commitments are computed independently, the challenge is derived
    /// over every instance at once, and each returned proof carries that
    /// shared challenge.
    pub fn new_batch<R: RngCore + CryptoRng>(
        gs: &[EdwardsPoint],
        hs: &[EdwardsPoint],
        xs: &[Scalar],
        rng: &mut R,
    ) -> Result<(Vec<DleqProof>, Vec<EdwardsPoint>, Vec<EdwardsPoint>), DleqError> {
        if gs.len() != hs.len() || hs.len() != xs.len() {
            return Err(DleqError::LengthMismatch);
        }

        let n = xs.len();
        let mut vs = Vec::with_capacity(n);
        let mut xg = Vec::with_capacity(n);
        let mut xh = Vec::with_capacity(n);
        let mut vg = Vec::with_capacity(n);
        let mut vh = Vec::with_capacity(n);

        for i in 0..n {
            xg.push(xs[i] * gs[i]);
            xh.push(xs[i] * hs[i]);
            let v = Scalar::random(rng);
            vg.push(v * gs[i]);
            vh.push(v * hs[i]);
            vs.push(v);
        }

        let c = challenge(&xg, &xh, &vg, &vh);
        let proofs = (0..n)
            .map(|i| DleqProof {
                c,
                r: vs[i] - c * xs[i],
                vg: vg[i],
                vh: vh[i],
            })
            .collect();

        Ok((proofs, xg, xh))
    }

    /// Checks the two verification equations
    /// `vG == r·g + c·xG` and `vH == r·h + c·xH`.
    pub fn verify(
        &self,
        g: &EdwardsPoint,
        h: &EdwardsPoint,
        xg: &EdwardsPoint,
        xh: &EdwardsPoint,
    ) -> Result<(), DleqError> {
        let a = self.r * g + self.c * xg;
        let b = self.r * h + self.c * xh;
        if self.vg != a || self.vh != b {
            return Err(DleqError::InvalidProof);
        }
        Ok(())
    }
}
