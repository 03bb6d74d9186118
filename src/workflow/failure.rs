use thiserror::Error;

use crate::{fen::FenError, models::SetPositionResult};

/// Why a position did not reach the board. Each renders as the message surfaced to
/// callers and observers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendFailure {
    #[error("No position recognized")]
    NoPositionAvailable,
    #[error("Recognition did not produce a valid FEN")]
    NoValidFen,
    #[error("Invalid FEN: {0}")]
    InvalidFen(#[from] FenError),
    #[error("Board not connected")]
    NotConnected,
    #[error("Low confidence - confirmation required")]
    ConfirmationRequired,
    /// The driver answered with a non-success result; its message is kept verbatim.
    #[error("{0}")]
    DriverRejected(String),
    /// The driver call itself failed; the error text is kept verbatim.
    #[error("{0}")]
    DriverException(String),
}

impl From<SendFailure> for SetPositionResult {
    fn from(failure: SendFailure) -> Self {
        SetPositionResult::failed(failure.to_string())
    }
}
