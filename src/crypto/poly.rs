//! Secret-sharing polynomials and Lagrange reconstruction.
//!
//! A writer samples a [`PriPoly`] whose constant term is the shared secret,
//! hands out evaluations as shares, and publishes a [`PubPoly`] commitment
//! so anyone can check a share against the polynomial. Reconstruction
//! interpolates the constant term back out of any `t` distinct shares,
//! either in the scalar field or point-wise in the group.

use curve25519_dalek::traits::Identity;
use curve25519_dalek::{EdwardsPoint, Scalar};
use rand_core::{CryptoRng, RngCore};

use crate::crypto::pvss::PvssError;

/// A private share: the polynomial evaluated at index `i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriShare {
    /// Share index (0-based; the evaluation point is `i + 1`).
    pub i: usize,
    /// Evaluation `p(i + 1)`.
    pub v: Scalar,
}

/// A public share: a group commitment to the evaluation at index `i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PubShare {
    pub i: usize,
    pub v: EdwardsPoint,
}

/// A secret-sharing polynomial of degree `t - 1`.
#[derive(Clone, Debug)]
pub struct PriPoly {
    coeffs: Vec<Scalar>,
}

impl PriPoly {
    /// Samples a polynomial with constant term `secret` and `t - 1` random
    /// higher coefficients.
    pub fn new<R: RngCore + CryptoRng>(t: usize, secret: Scalar, rng: &mut R) -> Self {
        let mut coeffs = Vec::with_capacity(t);
        coeffs.push(secret);
        for _ in 1..t {
            coeffs.push(Scalar::random(rng));
        }
        PriPoly { coeffs }
    }

    /// The sharing threshold (number of coefficients).
    pub fn threshold(&self) -> usize {
        self.coeffs.len()
    }

    /// The shared secret `p(0)`.
    pub fn secret(&self) -> &Scalar {
        &self.coeffs[0]
    }

    /// Evaluates the polynomial at share index `i` (point `i + 1`).
    pub fn eval(&self, i: usize) -> PriShare {
        let x = Scalar::from((i + 1) as u64);
        let mut v = Scalar::ZERO;
        for coeff in self.coeffs.iter().rev() {
            v = v * x + coeff;
        }
        PriShare { i, v }
    }

    /// Evaluates the polynomial at indices `0..n`.
    pub fn shares(&self, n: usize) -> Vec<PriShare> {
        (0..n).map(|i| self.eval(i)).collect()
    }

    /// Commits the polynomial to the base point `b`.
    pub fn commit(&self, b: &EdwardsPoint) -> PubPoly {
        PubPoly {
            commits: self.coeffs.iter().map(|c| c * b).collect(),
        }
    }
}

/// Commitments `A_j = a_j · b` to a [`PriPoly`] over some base `b`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PubPoly {
    commits: Vec<EdwardsPoint>,
}

impl PubPoly {
    pub fn threshold(&self) -> usize {
        self.commits.len()
    }

    /// The commitment to the secret, `A_0 = p(0) · b`.
    pub fn commit(&self) -> &EdwardsPoint {
        &self.commits[0]
    }

    /// Evaluates the committed polynomial at share index `i`.
    pub fn eval(&self, i: usize) -> PubShare {
        let x = Scalar::from((i + 1) as u64);
        let mut v = EdwardsPoint::identity();
        for commit in self.commits.iter().rev() {
            v = v * x + commit;
        }
        PubShare { i, v }
    }
}

/// Selects up to `t` distinct shares together with their evaluation points.
///
/// Shares with an index outside `0..n` are skipped; a repeated index is an
/// error rather than a silent overwrite.
fn select<'a, T>(
    shares: impl Iterator<Item = (&'a T, usize)>,
    t: usize,
    n: usize,
) -> Result<Vec<(&'a T, Scalar)>, PvssError> {
    let mut sel: Vec<(&T, Scalar)> = Vec::with_capacity(t);
    let mut seen: Vec<usize> = Vec::with_capacity(t);
    for (share, i) in shares {
        if i >= n {
            continue;
        }
        if seen.contains(&i) {
            return Err(PvssError::DuplicateIndex(i));
        }
        seen.push(i);
        sel.push((share, Scalar::from((i + 1) as u64)));
        if sel.len() == t {
            break;
        }
    }
    if sel.len() < t {
        return Err(PvssError::TooFewShares {
            required: t,
            provided: sel.len(),
        });
    }
    Ok(sel)
}

/// Reconstructs the shared secret `p(0)` from `t` private shares.
pub fn recover_secret(shares: &[PriShare], t: usize, n: usize) -> Result<Scalar, PvssError> {
    let sel = select(shares.iter().map(|s| (s, s.i)), t, n)?;
    let mut acc = Scalar::ZERO;
    for (share, xi) in &sel {
        let mut num = share.v;
        let mut den = Scalar::ONE;
        for (_, xj) in &sel {
            if xj == xi {
                continue;
            }
            num *= xj;
            den *= xj - xi;
        }
        acc += num * den.invert();
    }
    Ok(acc)
}

/// Reconstructs the secret commitment `p(0) · b` from `t` public shares.
pub fn recover_commit(shares: &[PubShare], t: usize, n: usize) -> Result<EdwardsPoint, PvssError> {
    let sel = select(shares.iter().map(|s| (s, s.i)), t, n)?;
    let mut acc = EdwardsPoint::identity();
    for (share, xi) in &sel {
        let mut num = Scalar::ONE;
        let mut den = Scalar::ONE;
        for (_, xj) in &sel {
            if xj == xi {
                continue;
            }
            num *= xj;
            den *= xj - xi;
        }
        acc += share.v * (num * den.invert());
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite;
    use rand::thread_rng;

    #[test]
    fn eval_matches_commitment() {
        let mut rng = thread_rng();
        let poly = PriPoly::new(4, Scalar::random(&mut rng), &mut rng);
        let pub_poly = poly.commit(&suite::BASE);
        for i in 0..6 {
            let s = poly.eval(i);
            assert_eq!(pub_poly.eval(i).v, suite::mul_base(&s.v));
        }
    }

    #[test]
    fn recover_secret_from_any_t_shares() {
        let mut rng = thread_rng();
        let secret = Scalar::random(&mut rng);
        let poly = PriPoly::new(3, secret, &mut rng);
        let shares = poly.shares(5);

        let recovered = recover_secret(&shares[..3], 3, 5).unwrap();
        assert_eq!(recovered, secret);

        // A different subset recovers the same constant term.
        let subset = vec![shares[1].clone(), shares[3].clone(), shares[4].clone()];
        assert_eq!(recover_secret(&subset, 3, 5).unwrap(), secret);
    }

    #[test]
    fn recover_commit_matches_secret() {
        let mut rng = thread_rng();
        let secret = Scalar::random(&mut rng);
        let poly = PriPoly::new(3, secret, &mut rng);
        let pub_shares: Vec<PubShare> = poly
            .shares(5)
            .iter()
            .map(|s| PubShare {
                i: s.i,
                v: suite::mul_base(&s.v),
            })
            .collect();
        let recovered = recover_commit(&pub_shares[1..4], 3, 5).unwrap();
        assert_eq!(recovered, suite::mul_base(&secret));
    }

    #[test]
    fn too_few_shares_is_an_error() {
        let mut rng = thread_rng();
        let poly = PriPoly::new(4, Scalar::random(&mut rng), &mut rng);
        let shares = poly.shares(5);
        match recover_secret(&shares[..3], 4, 5) {
            Err(PvssError::TooFewShares { required, provided }) => {
                assert_eq!(required, 4);
                assert_eq!(provided, 3);
            }
            other => panic!("expected TooFewShares, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let mut rng = thread_rng();
        let poly = PriPoly::new(2, Scalar::random(&mut rng), &mut rng);
        let s = poly.eval(1);
        let shares = vec![s.clone(), s];
        match recover_secret(&shares, 2, 5) {
            Err(PvssError::DuplicateIndex(1)) => {}
            other => panic!("expected DuplicateIndex, got {other:?}"),
        }
    }
}
