//! Error taxonomy for the OCS protocol.

use std::fmt;

use crate::crypto::pvss::PvssError;
use crate::wire::WireError;

/// OCS-specific error type.
///
/// Every client-visible failure carries one of these kinds. Only
/// [`OcsError::BlockInProgress`] is retryable; everything else is final for
/// the operation that produced it.
#[derive(Debug)]
pub enum OcsError {
    /// Malformed serialization.
    Parse(String),
    /// Length mismatch, unknown block id, missing reader.
    Parameter(String),
    /// Cryptographic verification failed, timeout, propagation failure.
    Protocol(String),
    /// The ledger is busy appending another block.
    BlockInProgress,
    /// Recovery threshold not met.
    TooFewShares { required: usize, provided: usize },
    /// Invariant violation.
    Internal(String),
}

impl fmt::Display for OcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcsError::Parse(msg) => write!(f, "Parse error: {msg}"),
            OcsError::Parameter(msg) => write!(f, "Invalid parameter: {msg}"),
            OcsError::Protocol(msg) => write!(f, "Protocol error: {msg}"),
            OcsError::BlockInProgress => write!(f, "Block in progress: ledger busy"),
            OcsError::TooFewShares { required, provided } => {
                write!(
                    f,
                    "Not enough shares: required {required}, provided {provided}"
                )
            }
            OcsError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for OcsError {}

impl From<PvssError> for OcsError {
    fn from(err: PvssError) -> Self {
        match err {
            PvssError::TooFewShares { required, provided } => {
                OcsError::TooFewShares { required, provided }
            }
            PvssError::LengthMismatch => OcsError::Parameter(err.to_string()),
            _ => OcsError::Protocol(err.to_string()),
        }
    }
}

impl From<WireError> for OcsError {
    fn from(err: WireError) -> Self {
        OcsError::Parse(err.to_string())
    }
}
