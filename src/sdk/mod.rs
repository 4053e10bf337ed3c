//! # OCS SDK - on-chain secrets API
//!
//! A phase-based API over the write/read/decrypt lifecycle:
//!
//! 1. **Writer phase**: PVSS setup against the committee, payload
//!    encryption, write-transaction creation and append.
//! 2. **Reader phase**: read-transaction append, decrypt-request
//!    construction and signing, share decryption and key recovery.
//!
//! The committee protocol itself lives in [`crate::protocol`]; the reader
//! phase produces the [`crate::protocol::Announce`] it consumes and digests
//! the replies it returns.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ocs::{Committee, Keypair, Ledger, OcsClient};
//! use rand::thread_rng;
//!
//! let mut rng = thread_rng();
//!
//! // Five in-process trustees back the committee and the ledger.
//! let trustee_keys: Vec<Keypair> = (0..5).map(|_| Keypair::generate(&mut rng)).collect();
//! let committee = Committee::new(trustee_keys.iter().map(|k| k.pk).collect())?;
//! let ledger = Ledger::new(&trustee_keys, 5)?;
//!
//! let writer = Keypair::generate(&mut rng);
//! let reader = Keypair::generate(&mut rng);
//! let client = OcsClient::new(committee);
//!
//! // Writer phase: share a payload towards the reader's key.
//! let (write_id, ciphertext) =
//!     client.writer().write(&ledger, b"secret payload", &reader.pk, &writer, &mut rng)?;
//!
//! // Reader phase: request access on chain.
//! let read_id = client.reader().create_read_txn(&ledger, write_id, &reader, &mut rng)?;
//! # Ok::<(), ocs::OcsError>(())
//! ```

pub mod reader;
pub mod writer;

pub use reader::ReaderPhase;
pub use writer::WriterPhase;

use crate::keys::Committee;

/// Entry point binding a committee snapshot to the two client phases.
///
/// # Example
///
/// ```no_run
/// use ocs::{Committee, Keypair, OcsClient};
/// use rand::thread_rng;
///
/// let mut rng = thread_rng();
/// let keys: Vec<Keypair> = (0..5).map(|_| Keypair::generate(&mut rng)).collect();
/// let committee = Committee::new(keys.iter().map(|k| k.pk).collect())?;
///
/// let client = OcsClient::new(committee);
/// let writer = client.writer();
/// let reader = client.reader();
/// # Ok::<(), ocs::OcsError>(())
/// ```
pub struct OcsClient {
    committee: Committee,
}

impl OcsClient {
    pub fn new(committee: Committee) -> Self {
        OcsClient { committee }
    }

    pub fn committee(&self) -> &Committee {
        &self.committee
    }

    /// Access the writer phase API.
    pub fn writer(&self) -> WriterPhase<'_> {
        WriterPhase::new(&self.committee)
    }

    /// Access the reader phase API.
    pub fn reader(&self) -> ReaderPhase<'_> {
        ReaderPhase::new(&self.committee)
    }
}
