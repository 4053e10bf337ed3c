//! Writer phase: share a secret payload with the committee.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use curve25519_dalek::{EdwardsPoint, Scalar};
use rand_core::{CryptoRng, RngCore};
use tracing::instrument;

use crate::crypto::pvss::{self, PubVerShare};
use crate::errors::OcsError;
use crate::keys::{Committee, Keypair};
use crate::ledger::{BlockId, Ledger};
use crate::suite;
use crate::transactions::{BlockData, WriteTxn, WriteTxnData};

/// The one-shot AEAD nonce: every symmetric key encrypts exactly one
/// payload, so the nonce never repeats under a key.
const NONCE: [u8; 12] = [0u8; 12];

/// PVSS material for one write: created once, immutable thereafter.
pub struct WriteParams {
    /// Binding point `h = H(reader_pk)`.
    pub h: EdwardsPoint,
    /// The sharing polynomial's constant term.
    pub secret: Scalar,
    pub threshold: usize,
    pub enc_shares: Vec<PubVerShare>,
    /// Public commitments `sH_i`, evaluated per share index.
    pub enc_proofs: Vec<EdwardsPoint>,
}

/// Derives the payload key from the secret commitment `p(0)·g`.
pub(crate) fn symmetric_key(secret_point: &EdwardsPoint) -> [u8; 32] {
    suite::sha256(secret_point.compress().as_bytes())
}

/// Writer phase API.
///
/// This phase handles:
/// - PVSS sharing of a fresh secret towards the authorized reader
/// - Payload encryption under the derived symmetric key
/// - Write-transaction assembly, signing and append
///
/// # Example
///
/// ```no_run
/// use ocs::{Committee, Keypair, Ledger, OcsClient};
/// use rand::thread_rng;
///
/// let mut rng = thread_rng();
/// let trustee_keys: Vec<Keypair> = (0..5).map(|_| Keypair::generate(&mut rng)).collect();
/// let committee = Committee::new(trustee_keys.iter().map(|k| k.pk).collect())?;
/// let ledger = Ledger::new(&trustee_keys, 5)?;
/// let client = OcsClient::new(committee);
///
/// let writer = Keypair::generate(&mut rng);
/// let reader = Keypair::generate(&mut rng);
///
/// // One call runs setup, encryption, signing and the append.
/// let (write_id, ciphertext) =
///     client.writer().write(&ledger, b"secret payload", &reader.pk, &writer, &mut rng)?;
///
/// // Or step by step, keeping the PVSS material in hand:
/// let params = client.writer().setup_pvss(&reader.pk, &mut rng)?;
/// let (ciphertext, hash_enc) = client.writer().encrypt_message(&params, b"another one")?;
/// let txn = client
///     .writer()
///     .create_write_txn(&params, hash_enc, &reader.pk, &writer, &mut rng);
/// # Ok::<(), ocs::OcsError>(())
/// ```
pub struct WriterPhase<'a> {
    committee: &'a Committee,
}

impl<'a> WriterPhase<'a> {
    pub(crate) fn new(committee: &'a Committee) -> Self {
        WriterPhase { committee }
    }

    /// Runs the PVSS sharing towards `reader_pk`.
    ///
    /// Samples a fresh secret, derives the binding point `h` from the
    /// reader's key and encrypts one share per committee member with
    /// threshold `t = ⌊2n/3⌋ + 1`.
    #[instrument(level = "debug", skip_all, fields(n = self.committee.len()))]
    pub fn setup_pvss<R: RngCore + CryptoRng>(
        &self,
        reader_pk: &EdwardsPoint,
        rng: &mut R,
    ) -> Result<WriteParams, OcsError> {
        let h = suite::point_h(reader_pk);
        let secret = Scalar::random(rng);
        let threshold = self.committee.threshold();

        let (enc_shares, pub_poly) =
            pvss::enc_shares(&h, self.committee.keys(), &secret, threshold, rng)?;
        let enc_proofs = (0..self.committee.len())
            .map(|i| pub_poly.eval(i).v)
            .collect();

        Ok(WriteParams {
            h,
            secret,
            threshold,
            enc_shares,
            enc_proofs,
        })
    }

    /// Encrypts `msg` under the key derived from the shared secret.
    ///
    /// Returns the ciphertext and its SHA-256 fingerprint `hash_enc`.
    pub fn encrypt_message(
        &self,
        params: &WriteParams,
        msg: &[u8],
    ) -> Result<(Vec<u8>, [u8; 32]), OcsError> {
        let key = symmetric_key(&suite::mul_base(&params.secret));
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&NONCE), msg)
            .map_err(|_| OcsError::Internal("payload encryption failed".into()))?;
        let hash_enc = suite::sha256(&ciphertext);
        Ok((ciphertext, hash_enc))
    }

    /// Assembles and signs the write transaction.
    pub fn create_write_txn<R: RngCore + CryptoRng>(
        &self,
        params: &WriteParams,
        hash_enc: [u8; 32],
        reader_pk: &EdwardsPoint,
        writer: &Keypair,
        rng: &mut R,
    ) -> WriteTxn {
        let data = WriteTxnData {
            g: suite::BASE,
            sc_pub: self.committee.keys().to_vec(),
            enc_shares: params.enc_shares.clone(),
            enc_proofs: params.enc_proofs.clone(),
            hash_enc,
            reader_pk: *reader_pk,
            readers: Vec::new(),
        };
        WriteTxn::new(data, writer, rng)
    }

    /// Shares `msg` with `reader_pk` on the ledger.
    ///
    /// Convenience over the three steps above plus the append; returns the
    /// write block id and the ciphertext the writer distributes off-chain.
    #[instrument(level = "info", skip_all, fields(payload_len = msg.len()))]
    pub fn write<R: RngCore + CryptoRng>(
        &self,
        ledger: &Ledger,
        msg: &[u8],
        reader_pk: &EdwardsPoint,
        writer: &Keypair,
        rng: &mut R,
    ) -> Result<(BlockId, Vec<u8>), OcsError> {
        let params = self.setup_pvss(reader_pk, rng)?;
        let (ciphertext, hash_enc) = self.encrypt_message(&params, msg)?;
        let txn = self.create_write_txn(&params, hash_enc, reader_pk, writer, rng);
        let id = ledger.append_with_retry(&BlockData::WriteTxn(txn), rng)?;
        Ok((id, ciphertext))
    }
}
