//! The committee re-encryption protocol.
//!
//! A single scatter/gather round over a star: the reader hands its signed
//! [`DecryptRequest`] to a root trustee of its choosing, the root announces
//! it to every other committee member, and each member independently
//! verifies the request, decrypts its PVSS share, and returns it
//! ElGamal-encrypted under the reader's key. PVSS gives public
//! verifiability, so no inter-trustee coordination is needed and one round
//! suffices.
//!
//! Every verification failure at a trustee is fatal for that trustee's
//! share only: it logs the cause and replies empty. The root returns
//! whatever it gathered before the deadline; the reader tolerates up to
//! `n − t` missing shares.

pub mod messages;

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{instrument, warn};

use crate::crypto::elgamal::{self, ReencryptedShare};
use crate::crypto::{pvss, schnorr};
use crate::errors::OcsError;
use crate::keys::{self, Keypair};
use crate::suite;
use crate::transactions::{BlockData, ReadTxn, WriteTxn};
use crate::wire::Wire;

pub use messages::{Announce, DecryptRequest, Reply};

/// How long the root waits for leaf replies.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One committee member running the re-encryption protocol.
///
/// Holds the process-lifetime keypair and the member's position in the
/// committee snapshot. Announce processing is stateless and idempotent, so
/// a trustee can serve any number of concurrent requests.
#[derive(Clone, Debug)]
pub struct Trustee {
    position: usize,
    keypair: Keypair,
}

impl Trustee {
    pub fn new(position: usize, keypair: Keypair) -> Self {
        Trustee { position, keypair }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn public_key(&self) -> &curve25519_dalek::EdwardsPoint {
        &self.keypair.pk
    }

    /// Verifies the announce and re-encrypts this trustee's share.
    ///
    /// `tree_pos` is the position this trustee occupies in the dispatch
    /// tree; the share index is recovered through the root-swap
    /// permutation. Any failure yields [`Reply::empty`]; a bad request
    /// must never take the node down.
    #[instrument(level = "debug", skip_all, fields(position = self.position, tree_pos))]
    pub fn process_announce(&self, announce: &Announce, tree_pos: usize) -> Reply {
        match self.try_process(announce, tree_pos) {
            Ok(share) => Reply { share: Some(share) },
            Err(err) => {
                warn!(position = self.position, %err, "decrypt announce rejected");
                Reply::empty()
            }
        }
    }

    fn try_process(
        &self,
        announce: &Announce,
        tree_pos: usize,
    ) -> Result<ReencryptedShare, OcsError> {
        let request = &announce.request;
        let write_txn = unmarshal_write(&request.write_block.data)?;
        let read_txn = unmarshal_read(&request.read_block.data)?;

        // 1) The reader authorized by the write block signed this request.
        let digest = suite::sha256(&request.marshal());
        schnorr::verify(&write_txn.data.reader_pk, &digest, &announce.signature)?;

        // 2) The inclusion proof points at the read block and carries a
        //    valid committee co-signature.
        let read_hash = request.read_block.hash();
        if announce.request.inclusion_proof.hash != read_hash {
            return Err(OcsError::Protocol(
                "forward link hash does not match read transaction hash".into(),
            ));
        }
        schnorr::verify_collective(
            &request.ac_pub,
            &request.inclusion_proof.hash,
            &request.inclusion_proof.signature,
        )?;

        // 3) The read block references this write block.
        if read_txn.data.data_id != request.write_block.hash() {
            return Err(OcsError::Protocol(
                "invalid write block hash in the read block".into(),
            ));
        }

        let h = suite::point_h(&write_txn.data.reader_pk);
        let idx = keys::share_index(tree_pos, announce.root_index as usize);
        let n = write_txn.data.sc_pub.len();
        if write_txn.data.enc_shares.len() != n || write_txn.data.enc_proofs.len() != n {
            return Err(OcsError::Parameter(
                "write transaction share vectors are inconsistent".into(),
            ));
        }
        if idx >= n {
            return Err(OcsError::Parameter(format!(
                "share index {idx} out of range for committee of {n}"
            )));
        }
        if write_txn.data.sc_pub[idx] != self.keypair.pk {
            return Err(OcsError::Parameter(
                "committee snapshot does not list this trustee at its share index".into(),
            ));
        }

        let mut rng = rand::thread_rng();
        let dec = pvss::dec_share(
            &h,
            &self.keypair.pk,
            &write_txn.data.enc_proofs[idx],
            &self.keypair.sk,
            &write_txn.data.enc_shares[idx],
            &mut rng,
        )?;

        Ok(elgamal::encrypt(
            &write_txn.data.reader_pk,
            &dec.marshal(),
            &mut rng,
        ))
    }
}

fn unmarshal_write(data: &[u8]) -> Result<WriteTxn, OcsError> {
    match BlockData::unmarshal(data)? {
        BlockData::WriteTxn(txn) => Ok(txn),
        _ => Err(OcsError::Parameter(
            "write block does not carry a write transaction".into(),
        )),
    }
}

fn unmarshal_read(data: &[u8]) -> Result<ReadTxn, OcsError> {
    match BlockData::unmarshal(data)? {
        BlockData::Read(txn) => Ok(txn),
        _ => Err(OcsError::Parameter(
            "read block does not carry a read transaction".into(),
        )),
    }
}

/// Runs one scatter/gather round over the committee.
///
/// The trustee at committee position `announce.root_index` acts as root:
/// it fans the announce out to every other member (one thread per leaf),
/// processes its own share, and gathers replies until all have arrived or
/// `timeout` elapses. Tree positions follow the root-swap roster, so each
/// leaf receives the position matching its share.
///
/// The returned vector holds the root's share first and then the leaf
/// replies in arrival order; missing or failed shares are `None`. Order
/// carries no meaning; readers recover the index from the deserialized
/// share itself.
#[instrument(level = "debug", skip_all, fields(root_index = announce.root_index))]
pub fn run_decrypt(
    trustees: &[Trustee],
    announce: &Announce,
    timeout: Duration,
) -> Result<Vec<Option<ReencryptedShare>>, OcsError> {
    let n = trustees.len();
    let root_index = announce.root_index as usize;
    if root_index >= n {
        return Err(OcsError::Parameter(format!(
            "root index {root_index} out of range for committee of {n}"
        )));
    }

    let (reply_tx, reply_rx) = mpsc::channel::<Reply>();
    for tree_pos in 1..n {
        // The roster swap puts the committee member with this share index
        // at tree position `tree_pos`.
        let member = keys::share_index(tree_pos, root_index);
        let leaf = trustees[member].clone();
        let announce = announce.clone();
        let tx = reply_tx.clone();
        thread::spawn(move || {
            let reply = leaf.process_announce(&announce, tree_pos);
            // The root may have stopped waiting; a closed channel is fine.
            let _ = tx.send(reply);
        });
    }
    drop(reply_tx);

    let root = &trustees[root_index];
    let mut shares = vec![root.process_announce(announce, 0).share];

    let deadline = Instant::now() + timeout;
    while shares.len() < n {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match reply_rx.recv_timeout(remaining) {
            Ok(reply) => shares.push(reply.share),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    gathered = shares.len(),
                    expected = n,
                    "decrypt round timed out, returning partial aggregation"
                );
                break;
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::share_index;

    #[test]
    fn leaf_positions_cover_all_members_except_root() {
        for n in [3usize, 5] {
            for root in 0..n {
                let mut members: Vec<usize> =
                    (1..n).map(|pos| share_index(pos, root)).collect();
                members.sort_unstable();
                let expected: Vec<usize> = (0..n).filter(|&m| m != root).collect();
                assert_eq!(members, expected);
            }
        }
    }
}
