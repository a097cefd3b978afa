// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Orchestration layer for the pay-per-second dashboard core.
//!
//! [`PayStreamService`] wires the advisory [`StreamRegistry`] to the
//! authoritative [`LedgerGateway`] and the connected wallet. Reconciliation
//! is one-way: local state may be read for display, but withdraw/stop only
//! touch it after the ledger reports success. A failed gateway call leaves
//! the registry exactly as it was.

pub mod config;
pub mod driver;

pub use config::ServiceConfig;
pub use driver::{DriverHandle, ObserverDriver};

use std::sync::Arc;

use chrono::Utc;
use ledger_gateway::{LedgerError, LedgerGateway, TxReceipt, WalletProvider};
use log::info;
use stream_registry::{
    RegistryError, Stream, StreamId, StreamParams, StreamRegistry, StreamSnapshot,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("ledger {action} failed for stream {id}: {source}")]
    Ledger {
        id: StreamId,
        action: &'static str,
        #[source]
        source: LedgerError,
    },
    #[error("{action} for stream {id} requires a connected wallet")]
    WalletDisconnected { id: StreamId, action: &'static str },
    #[error("wallet {address} is not authorized to {action} stream {id}")]
    NotAuthorized {
        id: StreamId,
        action: &'static str,
        address: String,
    },
}

/// Result of a confirmed withdrawal submission.
#[derive(Debug, Clone)]
pub struct WithdrawOutcome {
    pub receipt: TxReceipt,
    /// Claimable value recorded as withdrawn, mirroring what the ledger
    /// moves. Withdrawals never change the stream's lifecycle state.
    pub amount: f64,
    pub stream: Stream,
}

/// Result of a confirmed on-chain stop.
#[derive(Debug, Clone)]
pub struct StopOutcome {
    pub receipt: TxReceipt,
    pub stream: Stream,
}

pub struct PayStreamService<G, W> {
    registry: Arc<StreamRegistry>,
    gateway: Arc<G>,
    wallet: W,
}

impl<G, W> PayStreamService<G, W>
where
    G: LedgerGateway,
    W: WalletProvider,
{
    pub fn new(registry: Arc<StreamRegistry>, gateway: Arc<G>, wallet: W) -> Self {
        Self {
            registry,
            gateway,
            wallet,
        }
    }

    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    /// Starts a stream from the connected wallet to `receiver`.
    pub fn create_stream(
        &self,
        id: StreamId,
        receiver: impl Into<String>,
        rate_per_sec: f64,
        deposit: f64,
    ) -> Result<Stream, ServiceError> {
        let sender = self
            .wallet
            .connected_address()
            .ok_or(ServiceError::WalletDisconnected {
                id,
                action: "create",
            })?;
        let params = StreamParams {
            id,
            sender,
            receiver: receiver.into(),
            rate_per_sec,
            deposit,
        };
        Ok(self.registry.create_stream(params, Utc::now())?)
    }

    pub fn observe(&self, id: StreamId) -> Result<StreamSnapshot, ServiceError> {
        Ok(self.registry.observe(id, Utc::now())?)
    }

    pub fn observe_all(&self) -> Vec<StreamSnapshot> {
        self.registry.observe_all(Utc::now())
    }

    /// Local-only cancellation (the dashboard cancel button). The on-chain
    /// stream is unaffected; use [`stop`](Self::stop) to halt it for real.
    pub fn cancel(&self, id: StreamId) -> Result<Stream, ServiceError> {
        Ok(self.registry.cancel(id)?)
    }

    /// Submits a withdrawal for the stream's claimable value.
    ///
    /// The unknown-id check runs before any gateway call. On success the
    /// claimable amount is recorded as withdrawn; state never changes.
    pub async fn withdraw(&self, id: StreamId) -> Result<WithdrawOutcome, ServiceError> {
        let stream = self
            .registry
            .get(id)
            .ok_or(RegistryError::NotFound { id })?;
        let address = self
            .wallet
            .connected_address()
            .ok_or(ServiceError::WalletDisconnected {
                id,
                action: "withdraw",
            })?;
        if address != stream.sender && address != stream.receiver {
            return Err(ServiceError::NotAuthorized {
                id,
                action: "withdraw",
                address,
            });
        }

        let snapshot = self.registry.observe(id, Utc::now())?;
        let amount = (snapshot.accrued - snapshot.withdrawn).max(0.0);
        let receipt = self
            .gateway
            .withdraw(id)
            .await
            .map_err(|source| ServiceError::Ledger {
                id,
                action: "withdraw",
                source,
            })?;
        let stream = self.registry.record_withdrawal(id, amount)?;
        info!(
            "stream {id}: withdrew {amount} (tx {})",
            receipt.tx_hash
        );
        Ok(WithdrawOutcome {
            receipt,
            amount,
            stream,
        })
    }

    /// Stops the stream on-chain, then mirrors the result locally.
    ///
    /// The local transition happens only after the ledger accepted the stop;
    /// a gateway failure leaves the registry untouched.
    pub async fn stop(&self, id: StreamId) -> Result<StopOutcome, ServiceError> {
        let stream = self
            .registry
            .get(id)
            .ok_or(RegistryError::NotFound { id })?;
        let address = self
            .wallet
            .connected_address()
            .ok_or(ServiceError::WalletDisconnected { id, action: "stop" })?;
        if address != stream.sender {
            return Err(ServiceError::NotAuthorized {
                id,
                action: "stop",
                address,
            });
        }
        if stream.state.is_terminal() {
            return Err(RegistryError::InvalidState {
                id,
                state: stream.state,
            }
            .into());
        }

        let receipt = self
            .gateway
            .stop_stream(id)
            .await
            .map_err(|source| ServiceError::Ledger {
                id,
                action: "stop",
                source,
            })?;
        // Mirror on-chain reality; a concurrent local transition already
        // agrees with the ledger, so it is not an error here.
        let stream = match self.registry.cancel(id) {
            Ok(stream) => stream,
            Err(RegistryError::InvalidState { .. }) => self
                .registry
                .get(id)
                .ok_or(RegistryError::NotFound { id })?,
            Err(err) => return Err(err.into()),
        };
        info!("stream {id}: stopped on-chain (tx {})", receipt.tx_hash);
        Ok(StopOutcome { receipt, stream })
    }
}
