//! Key material and committee bookkeeping.

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::{EdwardsPoint, Scalar};
use rand_core::{CryptoRng, RngCore};

use crate::errors::OcsError;
use crate::suite;

/// A suite keypair `(x, X = x·g)`.
///
/// The same shape serves writers, readers, trustees and the access-control
/// committee; trustee keypairs are process-lifetime.
#[derive(Clone, Debug)]
pub struct Keypair {
    pub sk: Scalar,
    pub pk: EdwardsPoint,
}

impl Keypair {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let sk = Scalar::random(rng);
        Keypair {
            sk,
            pk: suite::mul_base(&sk),
        }
    }

    pub fn from_secret(sk: Scalar) -> Self {
        Keypair {
            sk,
            pk: suite::mul_base(&sk),
        }
    }
}

/// Decodes a 32-byte compressed point.
pub fn point_from_bytes(bytes: &[u8]) -> Result<EdwardsPoint, OcsError> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| OcsError::Parse(format!("point must be 32 bytes, got {}", bytes.len())))?;
    CompressedEdwardsY(arr)
        .decompress()
        .ok_or_else(|| OcsError::Parse("invalid point encoding".into()))
}

/// Decodes a canonical 32-byte scalar.
pub fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar, OcsError> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| OcsError::Parse(format!("scalar must be 32 bytes, got {}", bytes.len())))?;
    Option::<Scalar>::from(Scalar::from_canonical_bytes(arr))
        .ok_or_else(|| OcsError::Parse("non-canonical scalar encoding".into()))
}

/// An ordered snapshot of the secret-sharing committee's public keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Committee {
    trustees: Vec<EdwardsPoint>,
}

impl Committee {
    pub fn new(trustees: Vec<EdwardsPoint>) -> Result<Self, OcsError> {
        if trustees.is_empty() {
            return Err(OcsError::Parameter("empty committee".into()));
        }
        Ok(Committee { trustees })
    }

    pub fn len(&self) -> usize {
        self.trustees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trustees.is_empty()
    }

    /// The recovery threshold `t = ⌊2n/3⌋ + 1`.
    pub fn threshold(&self) -> usize {
        2 * self.trustees.len() / 3 + 1
    }

    /// The aggregate committee key `Σ X_i`.
    pub fn aggregate(&self) -> EdwardsPoint {
        self.trustees.iter().sum()
    }

    pub fn keys(&self) -> &[EdwardsPoint] {
        &self.trustees
    }

    pub fn key(&self, i: usize) -> Option<&EdwardsPoint> {
        self.trustees.get(i)
    }

    /// The committee position of `pk`, if it is a member.
    pub fn position(&self, pk: &EdwardsPoint) -> Option<usize> {
        self.trustees.iter().position(|k| k == pk)
    }
}

/// The share permutation induced by putting trustee `root_index` on top.
///
/// Dispatching a decryption rotates the committee so the chosen root sits
/// at tree position 0, swapping positions `0` and `root_index`; every other
/// position is unchanged. Applied symmetrically on dispatch and reply
/// aggregation, each trustee ends up processing the share encrypted to its
/// own key.
pub fn share_index(tree_pos: usize, root_index: usize) -> usize {
    if tree_pos == root_index {
        0
    } else if tree_pos == 0 {
        root_index
    } else {
        tree_pos
    }
}
