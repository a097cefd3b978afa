// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! On-chain boundary for the payment streaming core.
//!
//! The crate exposes:
//! - [`LedgerGateway`]: the contract surface the core consumes
//!   (`withdraw` / `stopStream`, submission-level semantics).
//! - [`RpcLedgerGateway`]: reqwest-backed adapter submitting transactions
//!   to an RPC endpoint on behalf of the connected wallet.
//! - [`WalletProvider`]: identity source for signing.
//! - [`RetryPolicy`]: jittered backoff, applied to transport failures only.
//!
//! Success from a gateway call means the ledger accepted the submission; the
//! registry's advisory state must only be reconciled after that point.

pub mod error;
pub mod retry;
pub mod rpc;
pub mod wallet;

pub use error::LedgerError;
pub use retry::RetryPolicy;
pub use rpc::{RpcGatewayConfig, RpcLedgerGateway};
pub use wallet::{StaticWallet, WalletProvider};

use serde::{Deserialize, Serialize};

/// Acknowledgement of an accepted transaction submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
}

/// Authoritative ledger operations the dashboard core delegates to.
///
/// Stream ids are plain integers here; the on-chain contract has no notion of
/// the registry's richer record.
#[async_trait::async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Initiates transfer of accrued, not-yet-withdrawn funds.
    async fn withdraw(&self, stream_id: u64) -> Result<TxReceipt, LedgerError>;

    /// Halts further on-chain accrual and finalizes the stream.
    async fn stop_stream(&self, stream_id: u64) -> Result<TxReceipt, LedgerError>;
}
