//! In-memory skipchain block store.
//!
//! The consensus engine is an external collaborator; this store implements
//! only the contract the OCS core consumes: verified appends, block lookup,
//! and co-signed forward links. Forward-link signatures are produced with
//! the aggregate access-control secret, standing in for the committee
//! co-signing round a deployment would run.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use curve25519_dalek::{EdwardsPoint, Scalar};
use rand::Rng;
use rand_core::{CryptoRng, RngCore};
use tracing::{debug, instrument};

use crate::crypto::schnorr::{self, SchnorrSignature};
use crate::errors::OcsError;
use crate::keys::Keypair;
use crate::suite;
use crate::transactions::{self, BlockData, WriteTxn};
use crate::wire::Wire;

/// SHA-256 block identifier.
pub type BlockId = [u8; 32];

/// Base delay of the append retry backoff.
pub const RETRY_BASE: Duration = Duration::from_millis(20);
const RETRY_ATTEMPTS: usize = 10;

/// A signed pointer from an earlier block to a later one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardLink {
    /// Hash of the target block.
    pub hash: BlockId,
    /// Committee co-signature over the target hash.
    pub signature: SchnorrSignature,
}

/// The canonical block header: everything that is hashed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkipBlockFix {
    pub index: u64,
    pub prev_hash: BlockId,
    /// Marshaled [`BlockData`].
    pub data: Vec<u8>,
}

impl SkipBlockFix {
    /// The block identifier, `SHA256(marshal(fix))`.
    pub fn hash(&self) -> BlockId {
        suite::sha256(&self.marshal())
    }
}

/// A stored block: header, cached hash, and forward links.
///
/// `forward_links[k]` points to the block at index `index + 1 + k`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkipBlock {
    pub fix: SkipBlockFix,
    pub hash: BlockId,
    pub forward_links: Vec<ForwardLink>,
}

struct Chain {
    blocks: HashMap<BlockId, SkipBlock>,
    order: Vec<BlockId>,
}

/// One read request, as surfaced by [`Ledger::read_requests`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadDoc {
    pub reader_pk: EdwardsPoint,
    pub read_id: BlockId,
    pub data_id: BlockId,
}

/// The block store.
///
/// One mutex guards the chain map; appends use `try_lock` and surface
/// contention as [`OcsError::BlockInProgress`] so callers can retry with
/// backoff instead of queueing behind long verifications.
///
/// # Example
///
/// ```no_run
/// use ocs::{BlockData, Keypair, Ledger};
/// use rand::thread_rng;
///
/// let mut rng = thread_rng();
/// let trustees: Vec<Keypair> = (0..5).map(|_| Keypair::generate(&mut rng)).collect();
/// let ledger = Ledger::new(&trustees, 5)?;
///
/// # let data: BlockData = todo!();
/// let id = ledger.append_with_retry(&data, &mut rng)?;
/// let block = ledger.get(&id)?;
/// assert_eq!(block.fix.hash(), id);
/// # Ok::<(), ocs::OcsError>(())
/// ```
pub struct Ledger {
    chain: Mutex<Chain>,
    ac_secret: Scalar,
    ac_pub: Vec<EdwardsPoint>,
    committee_size: usize,
}

impl Ledger {
    /// Creates a chain whose forward links are co-signed by `ac_keys`.
    ///
    /// The genesis block carries an empty reader roster.
    pub fn new(ac_keys: &[Keypair], committee_size: usize) -> Result<Self, OcsError> {
        if ac_keys.is_empty() {
            return Err(OcsError::Parameter(
                "access-control committee cannot be empty".into(),
            ));
        }
        let genesis_fix = SkipBlockFix {
            index: 0,
            prev_hash: [0u8; 32],
            data: BlockData::Readers(Vec::new()).marshal(),
        };
        let genesis = SkipBlock {
            hash: genesis_fix.hash(),
            fix: genesis_fix,
            forward_links: Vec::new(),
        };
        let mut blocks = HashMap::new();
        let order = vec![genesis.hash];
        blocks.insert(genesis.hash, genesis);

        Ok(Ledger {
            chain: Mutex::new(Chain { blocks, order }),
            ac_secret: ac_keys.iter().map(|k| k.sk).sum(),
            ac_pub: ac_keys.iter().map(|k| k.pk).collect(),
            committee_size,
        })
    }

    /// The access-control public keys forward links verify against.
    pub fn ac_pub(&self) -> &[EdwardsPoint] {
        &self.ac_pub
    }

    fn chain_guard(&self) -> Result<std::sync::MutexGuard<'_, Chain>, OcsError> {
        self.chain
            .lock()
            .map_err(|_| OcsError::Internal("chain mutex poisoned".into()))
    }

    pub fn genesis(&self) -> Result<BlockId, OcsError> {
        Ok(self.chain_guard()?.order[0])
    }

    /// Fetches a block by id.
    pub fn get(&self, id: &BlockId) -> Result<SkipBlock, OcsError> {
        let chain = self.chain_guard()?;
        chain
            .blocks
            .get(id)
            .cloned()
            .ok_or_else(|| OcsError::Parameter(format!("unknown block id {}", hex::encode(id))))
    }

    /// All block ids in chain order.
    pub fn order(&self) -> Result<Vec<BlockId>, OcsError> {
        Ok(self.chain_guard()?.order.clone())
    }

    /// The forward link from block `from` to block `to`.
    pub fn forward_link(&self, from: &BlockId, to: &BlockId) -> Result<ForwardLink, OcsError> {
        let (from_block, to_block) = {
            let chain = self.chain_guard()?;
            let from_block = chain
                .blocks
                .get(from)
                .cloned()
                .ok_or_else(|| OcsError::Parameter("unknown source block".into()))?;
            let to_block = chain
                .blocks
                .get(to)
                .cloned()
                .ok_or_else(|| OcsError::Parameter("unknown target block".into()))?;
            (from_block, to_block)
        };
        if to_block.fix.index <= from_block.fix.index {
            return Err(OcsError::Parameter(
                "forward link target does not follow the source block".into(),
            ));
        }
        let offset = (to_block.fix.index - from_block.fix.index - 1) as usize;
        from_block
            .forward_links
            .get(offset)
            .cloned()
            .ok_or_else(|| OcsError::Parameter("forward link does not exist".into()))
    }

    /// Verifies and appends a block carrying `data`.
    ///
    /// Verification runs outside the chain lock: the predicate's inputs are
    /// copied out first, then the lock is released for the cryptographic
    /// work and reacquired for the actual append. Contention on the lock is
    /// reported as [`OcsError::BlockInProgress`].
    #[instrument(level = "debug", skip_all)]
    pub fn append<R: RngCore + CryptoRng>(
        &self,
        data: &BlockData,
        rng: &mut R,
    ) -> Result<BlockId, OcsError> {
        self.verify(data)?;

        let mut chain = self
            .chain
            .try_lock()
            .map_err(|_| OcsError::BlockInProgress)?;

        let prev_id = *chain.order.last().ok_or_else(|| {
            OcsError::Internal("chain has no genesis block".into())
        })?;
        let prev_index = chain.blocks[&prev_id].fix.index;

        let fix = SkipBlockFix {
            index: prev_index + 1,
            prev_hash: prev_id,
            data: data.marshal(),
        };
        let block = SkipBlock {
            hash: fix.hash(),
            fix,
            forward_links: Vec::new(),
        };
        let id = block.hash;

        // The committee recognizes the new block: one co-signature over its
        // hash, linked from every earlier block.
        let signature = schnorr::sign(&self.ac_secret, &id, rng);
        for prev in chain.order.clone() {
            if let Some(existing) = chain.blocks.get_mut(&prev) {
                existing.forward_links.push(ForwardLink {
                    hash: id,
                    signature,
                });
            }
        }

        chain.order.push(id);
        chain.blocks.insert(id, block);
        debug!(index = prev_index + 1, id = %hex::encode(id), "block appended");
        Ok(id)
    }

    /// [`Ledger::append`] with randomized exponential backoff.
    ///
    /// Retries only on [`OcsError::BlockInProgress`], sleeping
    /// `attempt · base + jitter · base` with `jitter ∈ [0, 1)` between
    /// attempts.
    pub fn append_with_retry<R: RngCore + CryptoRng>(
        &self,
        data: &BlockData,
        rng: &mut R,
    ) -> Result<BlockId, OcsError> {
        let mut attempt = 0usize;
        loop {
            match self.append(data, rng) {
                Err(OcsError::BlockInProgress) if attempt + 1 < RETRY_ATTEMPTS => {
                    attempt += 1;
                    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
                    let delay = RETRY_BASE.mul_f64(attempt as f64 + jitter);
                    debug!(attempt, ?delay, "ledger busy, backing off");
                    std::thread::sleep(delay);
                }
                other => return other,
            }
        }
    }

    /// The append-time verification predicate.
    fn verify(&self, data: &BlockData) -> Result<(), OcsError> {
        match data {
            BlockData::WriteTxn(txn) => transactions::verify_write(txn, self.committee_size),
            BlockData::Read(txn) => {
                let write = self.get_write_txn(&txn.data.data_id)?;
                transactions::verify_read(txn, &write)
            }
            BlockData::Write(_) => Err(OcsError::Parameter(
                "legacy write payloads are no longer appendable".into(),
            )),
            BlockData::Readers(_) => Err(OcsError::Parameter(
                "reader rosters can only appear in the genesis block".into(),
            )),
        }
    }

    /// Lists read transactions reachable from `start`, following forward
    /// links, up to `count` entries.
    pub fn read_requests(&self, start: &BlockId, count: usize) -> Result<Vec<ReadDoc>, OcsError> {
        let mut docs = Vec::new();
        let mut current = self.get(start)?;
        loop {
            if docs.len() >= count {
                break;
            }
            if let Ok(BlockData::Read(txn)) = BlockData::unmarshal(&current.fix.data) {
                docs.push(ReadDoc {
                    reader_pk: txn.data.reader_pk,
                    read_id: current.hash,
                    data_id: txn.data.data_id,
                });
            }
            match current.forward_links.first() {
                Some(link) => current = self.get(&link.hash)?,
                None => break,
            }
        }
        Ok(docs)
    }

    /// Looks up a write transaction by block id and rechecks its writer
    /// signature.
    pub fn get_write_txn(&self, id: &BlockId) -> Result<WriteTxn, OcsError> {
        let block = self.get(id)?;
        match BlockData::unmarshal(&block.fix.data)? {
            BlockData::WriteTxn(txn) => {
                txn.verify_signature()?;
                Ok(txn)
            }
            _ => Err(OcsError::Parameter(
                "referenced block is not a write transaction".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::pvss;
    use crate::transactions::{ReadTxn, WriteTxnData};
    use rand::thread_rng;

    fn committee(n: usize) -> Vec<Keypair> {
        let mut rng = thread_rng();
        (0..n).map(|_| Keypair::generate(&mut rng)).collect()
    }

    fn write_txn(trustees: &[Keypair], reader: &Keypair, writer: &Keypair) -> WriteTxn {
        let mut rng = thread_rng();
        let pks: Vec<EdwardsPoint> = trustees.iter().map(|k| k.pk).collect();
        let h = suite::point_h(&reader.pk);
        let secret = Scalar::random(&mut rng);
        let t = 2 * trustees.len() / 3 + 1;
        let (enc_shares, pub_poly) = pvss::enc_shares(&h, &pks, &secret, t, &mut rng).unwrap();
        let enc_proofs = (0..pks.len()).map(|i| pub_poly.eval(i).v).collect();
        let data = WriteTxnData {
            g: suite::BASE,
            sc_pub: pks,
            enc_shares,
            enc_proofs,
            hash_enc: suite::sha256(b"ciphertext"),
            reader_pk: reader.pk,
            readers: Vec::new(),
        };
        WriteTxn::new(data, writer, &mut rng)
    }

    #[test]
    fn write_then_read_appends() {
        let mut rng = thread_rng();
        let trustees = committee(5);
        let reader = Keypair::generate(&mut rng);
        let writer = Keypair::generate(&mut rng);
        let ledger = Ledger::new(&trustees, 5).unwrap();

        let txn = write_txn(&trustees, &reader, &writer);
        let write_id = ledger
            .append(&BlockData::WriteTxn(txn), &mut rng)
            .unwrap();

        let read = ReadTxn::new(write_id, &reader, &mut rng);
        let read_id = ledger.append(&BlockData::Read(read), &mut rng).unwrap();

        let link = ledger.forward_link(&write_id, &read_id).unwrap();
        assert_eq!(link.hash, read_id);
        schnorr::verify_collective(ledger.ac_pub(), &link.hash, &link.signature).unwrap();
    }

    #[test]
    fn unauthorized_reader_is_rejected() {
        let mut rng = thread_rng();
        let trustees = committee(5);
        let reader = Keypair::generate(&mut rng);
        let writer = Keypair::generate(&mut rng);
        let ledger = Ledger::new(&trustees, 5).unwrap();

        let txn = write_txn(&trustees, &reader, &writer);
        let write_id = ledger
            .append(&BlockData::WriteTxn(txn), &mut rng)
            .unwrap();

        let stranger = Keypair::generate(&mut rng);
        let read = ReadTxn::new(write_id, &stranger, &mut rng);
        assert!(matches!(
            ledger.append(&BlockData::Read(read), &mut rng),
            Err(OcsError::Parameter(_))
        ));
    }

    #[test]
    fn replayed_read_appends_twice() {
        let mut rng = thread_rng();
        let trustees = committee(5);
        let reader = Keypair::generate(&mut rng);
        let writer = Keypair::generate(&mut rng);
        let ledger = Ledger::new(&trustees, 5).unwrap();

        let txn = write_txn(&trustees, &reader, &writer);
        let write_id = ledger
            .append(&BlockData::WriteTxn(txn), &mut rng)
            .unwrap();

        let read = ReadTxn::new(write_id, &reader, &mut rng);
        let first = ledger
            .append(&BlockData::Read(read.clone()), &mut rng)
            .unwrap();
        let second = ledger.append(&BlockData::Read(read), &mut rng).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn busy_ledger_reports_block_in_progress() {
        let mut rng = thread_rng();
        let trustees = committee(3);
        let ledger = Ledger::new(&trustees, 3).unwrap();

        let guard = ledger.chain.lock().unwrap();
        let reader = Keypair::generate(&mut rng);
        let writer = Keypair::generate(&mut rng);
        let txn = write_txn(&trustees, &reader, &writer);
        assert!(matches!(
            ledger.append(&BlockData::WriteTxn(txn), &mut rng),
            Err(OcsError::BlockInProgress)
        ));
        drop(guard);
    }

    #[test]
    fn legacy_and_roster_payloads_are_rejected() {
        let mut rng = thread_rng();
        let trustees = committee(3);
        let ledger = Ledger::new(&trustees, 3).unwrap();
        let legacy = BlockData::Write(crate::transactions::LegacyWrite { data: vec![1, 2] });
        assert!(ledger.append(&legacy, &mut rng).is_err());
        let roster = BlockData::Readers(vec![suite::BASE]);
        assert!(ledger.append(&roster, &mut rng).is_err());
    }
}
