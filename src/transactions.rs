//! Block payload types and the append-time verification predicates.

use curve25519_dalek::EdwardsPoint;
use rand_core::{CryptoRng, RngCore};
use tracing::instrument;

use crate::crypto::pvss::{self, PubVerShare};
use crate::crypto::schnorr::{self, SchnorrSignature};
use crate::errors::OcsError;
use crate::keys::Keypair;
use crate::ledger::BlockId;
use crate::suite;
use crate::wire::Wire;

/// The signed content of a write transaction.
///
/// Everything a verifier needs to check the PVSS sharing is recorded here:
/// the committee snapshot, the encrypted shares, and the public commitments
/// at each index. `hash_enc` fingerprints the externally encrypted payload;
/// the payload itself never touches the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteTxnData {
    /// Base point used for reconstruction.
    pub g: EdwardsPoint,
    /// Committee public keys snapshot, in share order.
    pub sc_pub: Vec<EdwardsPoint>,
    /// Encrypted shares with their consistency proofs.
    pub enc_shares: Vec<PubVerShare>,
    /// Public commitments `sH_i`, one per share index.
    pub enc_proofs: Vec<EdwardsPoint>,
    /// SHA-256 of the encrypted payload.
    pub hash_enc: [u8; 32],
    /// The authorized reader.
    pub reader_pk: EdwardsPoint,
    /// Reader-id bytes carried for wire compatibility; never interpreted.
    pub readers: Vec<u8>,
}

/// A write transaction: payload data plus the writer's signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteTxn {
    pub data: WriteTxnData,
    /// The writer's public key the signature verifies under.
    pub writer: EdwardsPoint,
    pub signature: SchnorrSignature,
}

impl WriteTxn {
    /// Signs `data` under the writer's key.
    ///
    /// The signature binds `SHA256(marshal(data))`, not the block hash the
    /// transaction eventually lands in; a malicious proposer could replay
    /// the same payload into a different skipchain.
    pub fn new<R: RngCore + CryptoRng>(
        data: WriteTxnData,
        writer: &Keypair,
        rng: &mut R,
    ) -> Self {
        let digest = suite::sha256(&data.marshal());
        let signature = schnorr::sign(&writer.sk, &digest, rng);
        WriteTxn {
            data,
            writer: writer.pk,
            signature,
        }
    }

    /// Checks the writer's signature over the marshaled payload.
    pub fn verify_signature(&self) -> Result<(), OcsError> {
        let digest = suite::sha256(&self.data.marshal());
        schnorr::verify(&self.writer, &digest, &self.signature)
    }
}

/// The signed content of a read transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadTxnData {
    /// Hash of the write block being requested.
    pub data_id: BlockId,
    /// The requesting reader.
    pub reader_pk: EdwardsPoint,
}

/// A read transaction: the reader signs the write block's hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadTxn {
    pub data: ReadTxnData,
    pub signature: SchnorrSignature,
}

impl ReadTxn {
    pub fn new<R: RngCore + CryptoRng>(data_id: BlockId, reader: &Keypair, rng: &mut R) -> Self {
        let signature = schnorr::sign(&reader.sk, &data_id, rng);
        ReadTxn {
            data: ReadTxnData {
                data_id,
                reader_pk: reader.pk,
            },
            signature,
        }
    }
}

/// The legacy escrow payload (tag 0 on the wire).
///
/// Parsed for compatibility with old chains; the append predicate rejects
/// new blocks of this kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyWrite {
    pub data: Vec<u8>,
}

/// The tagged union carried in every block body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockData {
    Write(LegacyWrite),
    WriteTxn(WriteTxn),
    Read(ReadTxn),
    Readers(Vec<EdwardsPoint>),
}

/// Append-time predicate for write transactions.
///
/// `n` is the committee size the chain was created with. All three PVSS
/// vectors must have length `n`, every encrypted share must verify against
/// the recomputed binding point `h`, and the writer's signature must check
/// out.
#[instrument(level = "debug", skip_all, fields(n))]
pub fn verify_write(txn: &WriteTxn, n: usize) -> Result<(), OcsError> {
    if txn.data.sc_pub.len() != n {
        return Err(OcsError::Parameter(format!(
            "committee snapshot has {} keys, expected {n}",
            txn.data.sc_pub.len()
        )));
    }
    if txn.data.enc_shares.len() != n || txn.data.enc_proofs.len() != n {
        return Err(OcsError::Parameter(format!(
            "expected {n} shares and proofs, got {} and {}",
            txn.data.enc_shares.len(),
            txn.data.enc_proofs.len()
        )));
    }

    let h = suite::point_h(&txn.data.reader_pk);
    let (_, valid) = pvss::verify_enc_share_batch(
        &h,
        &txn.data.sc_pub,
        &txn.data.enc_proofs,
        &txn.data.enc_shares,
    )?;
    if valid.len() < n {
        return Err(OcsError::Protocol(format!(
            "only {} of {n} encrypted shares verified",
            valid.len()
        )));
    }

    txn.verify_signature()
}

/// Append-time predicate for read transactions.
///
/// The requesting key must be the reader recorded in the referenced write
/// block, and the signature must verify over the write block's hash.
#[instrument(level = "debug", skip_all)]
pub fn verify_read(txn: &ReadTxn, write: &WriteTxn) -> Result<(), OcsError> {
    if write.data.reader_pk != txn.data.reader_pk {
        return Err(OcsError::Parameter(
            "reader is not authorized by the write transaction".into(),
        ));
    }
    schnorr::verify(&txn.data.reader_pk, &txn.data.data_id, &txn.signature)
}

/// Recomputes the payload fingerprint and compares it to the write record.
pub fn verify_enc_mesg(data: &WriteTxnData, ciphertext: &[u8]) -> Result<(), OcsError> {
    if suite::sha256(ciphertext) != data.hash_enc {
        return Err(OcsError::Protocol(
            "payload hash does not match the write transaction".into(),
        ));
    }
    Ok(())
}
