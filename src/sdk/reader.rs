//! Reader phase: request re-encryption and recover the payload.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand_core::{CryptoRng, RngCore};
use tracing::{debug, instrument};

use crate::crypto::elgamal::{self, ReencryptedShare};
use crate::crypto::pvss::{self, PubVerShare};
use crate::crypto::schnorr;
use crate::errors::OcsError;
use crate::keys::{Committee, Keypair};
use crate::ledger::{BlockId, Ledger};
use crate::protocol::messages::{Announce, DecryptRequest};
use crate::suite;
use crate::transactions::{self, BlockData, ReadTxn, WriteTxnData};
use crate::wire::Wire;

const NONCE: [u8; 12] = [0u8; 12];

/// Reader phase API.
///
/// This phase handles:
/// - Appending the signed read transaction
/// - Building and signing the decryption request for the committee
/// - ElGamal-decrypting the replies and recovering the symmetric key
///
/// # Example
///
/// ```no_run
/// use ocs::{run_decrypt, Committee, Keypair, Ledger, OcsClient, Trustee, DEFAULT_TIMEOUT};
/// use rand::thread_rng;
///
/// let mut rng = thread_rng();
/// let trustee_keys: Vec<Keypair> = (0..5).map(|_| Keypair::generate(&mut rng)).collect();
/// let trustees: Vec<Trustee> = trustee_keys
///     .iter()
///     .enumerate()
///     .map(|(i, kp)| Trustee::new(i, kp.clone()))
///     .collect();
/// let committee = Committee::new(trustee_keys.iter().map(|k| k.pk).collect())?;
/// let ledger = Ledger::new(&trustee_keys, 5)?;
/// let client = OcsClient::new(committee);
///
/// # let writer = Keypair::generate(&mut rng);
/// let reader = Keypair::generate(&mut rng);
/// let (write_id, ciphertext) =
///     client.writer().write(&ledger, b"payload", &reader.pk, &writer, &mut rng)?;
///
/// // Request access, dispatch the committee round, recover the payload.
/// let read_id = client.reader().create_read_txn(&ledger, write_id, &reader, &mut rng)?;
/// let request = client.reader().build_request(&ledger, &write_id, &read_id)?;
/// let announce = client.reader().build_announce(request, &reader, 0, &mut rng);
/// let replies = run_decrypt(&trustees, &announce, DEFAULT_TIMEOUT)?;
///
/// let write_txn = ledger.get_write_txn(&write_id)?;
/// let plaintext = client
///     .reader()
///     .recover_plaintext(&write_txn.data, &replies, &reader, &ciphertext)?;
/// assert_eq!(plaintext, b"payload");
/// # Ok::<(), ocs::OcsError>(())
/// ```
pub struct ReaderPhase<'a> {
    committee: &'a Committee,
}

impl<'a> ReaderPhase<'a> {
    pub(crate) fn new(committee: &'a Committee) -> Self {
        ReaderPhase { committee }
    }

    /// Appends a signed read transaction for the write block `data_id`.
    pub fn create_read_txn<R: RngCore + CryptoRng>(
        &self,
        ledger: &Ledger,
        data_id: BlockId,
        reader: &Keypair,
        rng: &mut R,
    ) -> Result<BlockId, OcsError> {
        let txn = ReadTxn::new(data_id, reader, rng);
        ledger.append_with_retry(&BlockData::Read(txn), rng)
    }

    /// Builds the decryption request for a write/read block pair.
    ///
    /// Fetches both block headers and the co-signed forward link from the
    /// write block to the read block; trustees re-verify all of it.
    pub fn build_request(
        &self,
        ledger: &Ledger,
        write_id: &BlockId,
        read_id: &BlockId,
    ) -> Result<DecryptRequest, OcsError> {
        let write_block = ledger.get(write_id)?;
        let read_block = ledger.get(read_id)?;
        let inclusion_proof = ledger.forward_link(write_id, read_id)?;
        Ok(DecryptRequest {
            write_block: write_block.fix,
            read_block: read_block.fix,
            inclusion_proof,
            ac_pub: ledger.ac_pub().to_vec(),
        })
    }

    /// Signs a request and wraps it into the announce for `root_index`.
    pub fn build_announce<R: RngCore + CryptoRng>(
        &self,
        request: DecryptRequest,
        reader: &Keypair,
        root_index: u32,
        rng: &mut R,
    ) -> Announce {
        let digest = suite::sha256(&request.marshal());
        let signature = schnorr::sign(&reader.sk, &digest, rng);
        Announce {
            request,
            signature,
            root_index,
        }
    }

    /// ElGamal-decrypts the committee's replies into verifiable shares.
    ///
    /// The returned vector has one slot per committee member, indexed by
    /// the share index carried inside each deserialized share; replies
    /// that fail to decrypt or parse leave their slot empty.
    pub fn decrypt_shares(
        &self,
        reader: &Keypair,
        replies: &[Option<ReencryptedShare>],
    ) -> Vec<Option<PubVerShare>> {
        let n = self.committee.len();
        let mut shares: Vec<Option<PubVerShare>> = vec![None; n];
        for reply in replies.iter().flatten() {
            let bytes = match elgamal::decrypt(&reader.sk, reply) {
                Ok(bytes) => bytes,
                Err(err) => {
                    debug!(%err, "discarding undecryptable reply");
                    continue;
                }
            };
            match PubVerShare::unmarshal(&bytes) {
                Ok(share) if share.s.i < n => shares[share.s.i] = Some(share),
                Ok(share) => {
                    debug!(index = share.s.i, "discarding share with out-of-range index")
                }
                Err(err) => debug!(%err, "discarding unparseable share"),
            }
        }
        shares
    }

    /// Verifies the decrypted shares and derives the symmetric key.
    #[instrument(level = "debug", skip_all)]
    pub fn recover_key(
        &self,
        write_data: &WriteTxnData,
        dec_shares: &[Option<PubVerShare>],
    ) -> Result<[u8; 32], OcsError> {
        let n = write_data.sc_pub.len();
        let t = self.committee.threshold();
        if write_data.enc_shares.len() != n {
            return Err(OcsError::Parameter(format!(
                "write record carries {} shares for {n} committee keys",
                write_data.enc_shares.len()
            )));
        }

        let mut pks = Vec::new();
        let mut encs = Vec::new();
        let mut decs = Vec::new();
        for (i, dec) in dec_shares.iter().enumerate() {
            if let Some(dec) = dec {
                if i < n {
                    pks.push(write_data.sc_pub[i]);
                    encs.push(write_data.enc_shares[i]);
                    decs.push(*dec);
                }
            }
        }
        if decs.len() < t {
            return Err(OcsError::TooFewShares {
                required: t,
                provided: decs.len(),
            });
        }

        let secret_point = pvss::recover_secret(&pks, &encs, &decs, t, n)?;
        Ok(crate::sdk::writer::symmetric_key(&secret_point))
    }

    /// AEAD-decrypts the payload with a recovered key.
    pub fn decrypt_message(&self, key: &[u8; 32], ciphertext: &[u8]) -> Result<Vec<u8>, OcsError> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
        cipher
            .decrypt(Nonce::from_slice(&NONCE), ciphertext)
            .map_err(|_| OcsError::Protocol("payload decryption failed".into()))
    }

    /// Full recovery pipeline from committee replies to plaintext.
    ///
    /// Checks the ciphertext against the write record's fingerprint before
    /// decrypting; no partial plaintext is ever returned.
    #[instrument(level = "info", skip_all, fields(replies = replies.len()))]
    pub fn recover_plaintext(
        &self,
        write_data: &WriteTxnData,
        replies: &[Option<ReencryptedShare>],
        reader: &Keypair,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, OcsError> {
        transactions::verify_enc_mesg(write_data, ciphertext)?;
        let shares = self.decrypt_shares(reader, replies);
        let key = self.recover_key(write_data, &shares)?;
        self.decrypt_message(&key, ciphertext)
    }
}
