//! Cryptographic building blocks of the OCS protocol.
//!
//! # Submodules
//!
//! - [`poly`]: secret-sharing polynomials and Lagrange reconstruction
//! - [`dleq`]: non-interactive discrete-logarithm-equality proofs
//! - [`pvss`]: publicly verifiable secret sharing built on the two above
//! - [`schnorr`]: request and transaction signatures
//! - [`elgamal`]: key encoding and share re-encryption to the reader
//!
//! # Cryptographic stack
//!
//! ```text
//! OCS crypto layer
//! ├── PVSS (pvss/, poly/, dleq/)
//! │   ├── Encrypted share generation with consistency proofs
//! │   ├── Verifiable share decryption
//! │   └── Threshold secret recovery
//! ├── Re-encryption (elgamal/)
//! │   ├── Symmetric-key encoding under the committee key
//! │   └── Per-share ElGamal encryption to the reader
//! └── Signatures (schnorr/)
//!     ├── Writer/reader transaction authenticity
//!     └── Forward-link collective signature verification
//! ```

pub mod dleq;
pub mod elgamal;
pub mod poly;
pub mod pvss;
pub mod schnorr;
