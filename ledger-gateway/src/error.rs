use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transaction reverted: {reason}")]
    Reverted { reason: String },
    #[error("ledger rpc rejected request (code {code}): {message}")]
    Rpc { code: i64, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("no wallet connected; transaction requires a signer")]
    NoSigner,
}

impl LedgerError {
    /// Transport failures may succeed on resubmission; reverts and explicit
    /// rpc rejections will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Transport(_))
    }
}
