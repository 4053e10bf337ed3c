//! Shared helpers for the end-to-end protocol tests.

use rand::thread_rng;

use ocs::crypto::elgamal::ReencryptedShare;
use ocs::errors::OcsError;
use ocs::keys::{Committee, Keypair};
use ocs::ledger::{BlockId, Ledger};
use ocs::protocol::{self, Announce, Trustee, DEFAULT_TIMEOUT};
use ocs::sdk::OcsClient;

/// A complete in-process deployment: committee, ledger, writer and reader.
pub struct TestBed {
    pub trustee_keys: Vec<Keypair>,
    pub trustees: Vec<Trustee>,
    pub committee: Committee,
    pub ledger: Ledger,
    pub writer: Keypair,
    pub reader: Keypair,
}

impl TestBed {
    pub fn new(n: usize) -> Self {
        let mut rng = thread_rng();
        let trustee_keys: Vec<Keypair> = (0..n).map(|_| Keypair::generate(&mut rng)).collect();
        let committee =
            Committee::new(trustee_keys.iter().map(|k| k.pk).collect()).expect("non-empty");
        let trustees = trustee_keys
            .iter()
            .enumerate()
            .map(|(i, kp)| Trustee::new(i, kp.clone()))
            .collect();
        let ledger = Ledger::new(&trustee_keys, n).expect("valid committee");
        TestBed {
            trustee_keys,
            trustees,
            committee,
            ledger,
            writer: Keypair::generate(&mut rng),
            reader: Keypair::generate(&mut rng),
        }
    }

    pub fn client(&self) -> OcsClient {
        OcsClient::new(self.committee.clone())
    }

    /// Simulates a trustee that lost its key material: announces verify
    /// fine everywhere else, but this member can only reply empty.
    pub fn disable_trustee(&mut self, i: usize) {
        let mut rng = thread_rng();
        self.trustees[i] = Trustee::new(i, Keypair::generate(&mut rng));
    }

    pub fn write(&self, msg: &[u8]) -> (BlockId, Vec<u8>) {
        let mut rng = thread_rng();
        self.client()
            .writer()
            .write(&self.ledger, msg, &self.reader.pk, &self.writer, &mut rng)
            .expect("write transaction accepted")
    }

    pub fn read(&self, write_id: BlockId) -> BlockId {
        let mut rng = thread_rng();
        self.client()
            .reader()
            .create_read_txn(&self.ledger, write_id, &self.reader, &mut rng)
            .expect("read transaction accepted")
    }

    pub fn announce(&self, write_id: &BlockId, read_id: &BlockId, root_index: u32) -> Announce {
        let mut rng = thread_rng();
        let client = self.client();
        let request = client
            .reader()
            .build_request(&self.ledger, write_id, read_id)
            .expect("blocks and forward link present");
        client
            .reader()
            .build_announce(request, &self.reader, root_index, &mut rng)
    }

    pub fn run_decrypt(&self, announce: &Announce) -> Vec<Option<ReencryptedShare>> {
        protocol::run_decrypt(&self.trustees, announce, DEFAULT_TIMEOUT)
            .expect("valid root index")
    }

    pub fn recover(
        &self,
        write_id: &BlockId,
        replies: &[Option<ReencryptedShare>],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, OcsError> {
        let write_txn = self.ledger.get_write_txn(write_id)?;
        self.client()
            .reader()
            .recover_plaintext(&write_txn.data, replies, &self.reader, ciphertext)
    }

    /// The whole pipeline for a given root choice.
    pub fn roundtrip(&self, msg: &[u8], root_index: u32) -> Result<Vec<u8>, OcsError> {
        let (write_id, ciphertext) = self.write(msg);
        let read_id = self.read(write_id);
        let announce = self.announce(&write_id, &read_id, root_index);
        let replies = self.run_decrypt(&announce);
        self.recover(&write_id, &replies, &ciphertext)
    }
}
