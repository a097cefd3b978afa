use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    error::LedgerError, retry::RetryPolicy, wallet::WalletProvider, LedgerGateway, TxReceipt,
};

/// Flat gas budget for submitted transactions.
pub const DEFAULT_GAS_LIMIT: u64 = 200_000;

#[derive(Debug, Clone)]
pub struct RpcGatewayConfig {
    pub endpoint: String,
    pub gas_limit: u64,
    pub retry: RetryPolicy,
}

impl RpcGatewayConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            gas_limit: DEFAULT_GAS_LIMIT,
            retry: RetryPolicy::default_submission(),
        }
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Transaction submission body. Field names mirror the contract ABI call:
/// `withdraw(streamId)` / `stopStream(streamId)` built from the connected
/// wallet with a fixed gas budget.
#[derive(Debug, Clone, Serialize)]
struct TxRequest {
    method: String,
    stream_id: u64,
    from: String,
    gas: u64,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    tx_hash: Option<String>,
    #[serde(default)]
    error: Option<RpcFailure>,
}

#[derive(Debug, Deserialize)]
struct RpcFailure {
    code: i64,
    message: String,
    #[serde(default)]
    reverted: bool,
}

/// reqwest-backed [`LedgerGateway`] submitting transactions to an RPC
/// endpoint. Transport failures are resubmitted per the configured retry
/// policy; reverts and rpc rejections surface immediately.
pub struct RpcLedgerGateway<W> {
    client: Client,
    config: RpcGatewayConfig,
    wallet: W,
}

impl<W: WalletProvider> RpcLedgerGateway<W> {
    pub fn new(config: RpcGatewayConfig, wallet: W) -> Self {
        Self {
            client: Client::new(),
            config,
            wallet,
        }
    }

    async fn submit(&self, method: &'static str, stream_id: u64) -> Result<TxReceipt, LedgerError> {
        let from = self
            .wallet
            .connected_address()
            .ok_or(LedgerError::NoSigner)?;
        let request = TxRequest {
            method: method.to_string(),
            stream_id,
            from,
            gas: self.config.gas_limit,
        };
        let client = self.client.clone();
        let endpoint = self.config.endpoint.clone();

        let receipt = self
            .config
            .retry
            .run(LedgerError::is_retryable, move |attempt| {
                let client = client.clone();
                let endpoint = endpoint.clone();
                let request = request.clone();
                async move {
                    if attempt > 0 {
                        debug!("resubmitting {method} for stream {stream_id} (attempt {attempt})");
                    }
                    let response = client.post(endpoint.as_str()).json(&request).send().await?;
                    let body: TxResponse = response.error_for_status()?.json().await?;
                    parse_response(body)
                }
            })
            .await?;

        info!(
            "{method} accepted for stream {stream_id}: tx {}",
            receipt.tx_hash
        );
        Ok(receipt)
    }
}

#[async_trait::async_trait]
impl<W: WalletProvider> LedgerGateway for RpcLedgerGateway<W> {
    async fn withdraw(&self, stream_id: u64) -> Result<TxReceipt, LedgerError> {
        self.submit("withdraw", stream_id).await
    }

    async fn stop_stream(&self, stream_id: u64) -> Result<TxReceipt, LedgerError> {
        self.submit("stopStream", stream_id).await
    }
}

fn parse_response(body: TxResponse) -> Result<TxReceipt, LedgerError> {
    if let Some(failure) = body.error {
        if failure.reverted {
            return Err(LedgerError::Reverted {
                reason: failure.message,
            });
        }
        return Err(LedgerError::Rpc {
            code: failure.code,
            message: failure.message,
        });
    }
    match body.tx_hash {
        Some(tx_hash) => Ok(TxReceipt { tx_hash }),
        None => Err(LedgerError::Rpc {
            code: -1,
            message: "response carried neither tx_hash nor error".to_string(),
        }),
    }
}
