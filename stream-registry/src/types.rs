use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied stream identifier, unique within one registry.
pub type StreamId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamState {
    Running,
    Completed,
    Cancelled,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, StreamState::Running)
    }
}

/// Creation parameters for a stream. Amounts are currency units; the rate is
/// units accrued per second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamParams {
    pub id: StreamId,
    pub sender: String,
    pub receiver: String,
    pub rate_per_sec: f64,
    pub deposit: f64,
}

/// One payment stream as tracked by the registry.
///
/// `accrued` is the last observed accrued value and freezes on a terminal
/// transition. `withdrawn` tracks value confirmed moved by the ledger; it is
/// bookkeeping only and never feeds back into accrual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stream {
    pub id: StreamId,
    pub sender: String,
    pub receiver: String,
    pub rate_per_sec: f64,
    pub deposit: f64,
    pub started_at: DateTime<Utc>,
    pub state: StreamState,
    pub accrued: f64,
    pub withdrawn: f64,
}

impl Stream {
    /// Accrued value not yet moved off-stream by a confirmed withdrawal.
    pub fn claimable(&self) -> f64 {
        (self.accrued - self.withdrawn).max(0.0)
    }
}

/// Point-in-time view of a stream, produced by `observe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSnapshot {
    pub id: StreamId,
    pub state: StreamState,
    pub accrued: f64,
    pub remaining: f64,
    pub withdrawn: f64,
    pub progress_percent: u8,
    pub observed_at: DateTime<Utc>,
}
