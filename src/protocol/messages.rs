//! Wire messages of the committee re-encryption protocol.
//!
//! One round, star topology:
//!
//! ```text
//! Reader                Root trustee              Leaf trustees
//!   │                       │                          │
//!   ├──DecryptRequest─────→ │                          │
//!   │                       ├───────Announce─────────→ │
//!   │                       │ ←────────Reply───────────┤
//!   │ ←─re-encrypted shares─┤                          │
//! ```

use curve25519_dalek::EdwardsPoint;

use crate::crypto::elgamal::ReencryptedShare;
use crate::crypto::schnorr::SchnorrSignature;
use crate::ledger::{ForwardLink, SkipBlockFix};

/// A reader's request to re-encrypt the shares of one write block.
///
/// Carries everything a trustee needs to verify on its own: the two block
/// headers, the co-signed forward link from write to read, and the
/// access-control keys the link signature verifies against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptRequest {
    pub write_block: SkipBlockFix,
    pub read_block: SkipBlockFix,
    pub inclusion_proof: ForwardLink,
    pub ac_pub: Vec<EdwardsPoint>,
}

/// The root's fan-out message to every leaf trustee.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Announce {
    pub request: DecryptRequest,
    /// Reader's signature over `SHA256(marshal(request))`.
    pub signature: SchnorrSignature,
    /// Tree position the reader chose for the root trustee.
    pub root_index: u32,
}

/// A leaf's answer: the re-encrypted share, or nothing on failure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    pub share: Option<ReencryptedShare>,
}

impl Reply {
    /// The failure reply; a trustee that cannot verify sends this instead
    /// of crashing or withholding an answer.
    pub fn empty() -> Self {
        Reply { share: None }
    }
}
