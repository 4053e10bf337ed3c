//! One-time on-chain secrets (OCS).
//!
//! A writer commits an encrypted payload to an append-only skipchain such
//! that only an authorized reader can recover the symmetric key, using a
//! committee of trustees that never learns the key and performs a publicly
//! verifiable threshold re-encryption.
//!
//! The crate is organized around three tightly coupled pieces:
//! - [`crypto`]: PVSS with DLEQ consistency proofs, Schnorr signatures and
//!   the ElGamal encodings used for re-encryption.
//! - [`ledger`] + [`transactions`]: the write/read transaction layer over
//!   the block store, including the append-time verification predicates.
//! - [`protocol`]: the one-round committee scatter/gather that turns
//!   encrypted shares into shares only the reader can open.
//!
//! [`sdk`] wraps the writer and reader ends of the lifecycle, and [`cli`]
//! exposes a demo-grade command line on top.

pub mod cli;
pub mod crypto;
pub mod errors;
pub mod keys;
pub mod ledger;
pub mod protocol;
pub mod sdk;
pub mod suite;
pub mod transactions;
pub mod wire;

pub use crypto::dleq::DleqProof;
pub use crypto::elgamal::ReencryptedShare;
pub use crypto::pvss::{PubVerShare, PvssError};
pub use crypto::schnorr::SchnorrSignature;
pub use errors::OcsError;
pub use keys::{Committee, Keypair};
pub use ledger::{BlockId, ForwardLink, Ledger, SkipBlock, SkipBlockFix};
pub use protocol::{run_decrypt, Announce, DecryptRequest, Reply, Trustee, DEFAULT_TIMEOUT};
pub use sdk::{OcsClient, ReaderPhase, WriterPhase};
pub use transactions::{BlockData, ReadTxn, ReadTxnData, WriteTxn, WriteTxnData};
pub use wire::{Wire, WireError};
