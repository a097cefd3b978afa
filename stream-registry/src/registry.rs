use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{info, warn};
use parking_lot::Mutex;

use crate::{
    accrual,
    error::{RegistryError, Result},
    types::{Stream, StreamId, StreamParams, StreamSnapshot, StreamState},
};

/// Process-local collection of streams with the lifecycle state machine.
///
/// Every operation holds the map lock for its full read-transition-write
/// sequence, so concurrent observers never see a half-applied transition and
/// accrued values for a fixed clock reading are consistent across callers.
pub struct StreamRegistry {
    streams: Mutex<HashMap<StreamId, Stream>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a stream in the `Running` state, capturing `now` as its start.
    ///
    /// Reusing an id overwrites the previous stream (last-writer-wins). That
    /// is an explicit, logged behavior; callers should treat a collision as a
    /// logical error on their side.
    pub fn create_stream(&self, params: StreamParams, now: DateTime<Utc>) -> Result<Stream> {
        validate_params(&params)?;
        let stream = Stream {
            id: params.id,
            sender: params.sender,
            receiver: params.receiver,
            rate_per_sec: params.rate_per_sec,
            deposit: params.deposit,
            started_at: now,
            state: StreamState::Running,
            accrued: 0.0,
            withdrawn: 0.0,
        };
        let mut streams = self.streams.lock();
        if let Some(prev) = streams.insert(stream.id, stream.clone()) {
            warn!(
                "stream {} overwritten (previous: {} -> {} at {}/s, deposit {})",
                prev.id, prev.sender, prev.receiver, prev.rate_per_sec, prev.deposit
            );
        }
        info!(
            "stream {} started: {} -> {} at {}/s, deposit {}",
            stream.id, stream.sender, stream.receiver, stream.rate_per_sec, stream.deposit
        );
        Ok(stream)
    }

    /// Recomputes accrual at `now` and returns a snapshot.
    ///
    /// Reaching the deposit transitions the stream to `Completed` before the
    /// snapshot is taken. Terminal streams return their frozen accrued value
    /// regardless of `now`.
    pub fn observe(&self, id: StreamId, now: DateTime<Utc>) -> Result<StreamSnapshot> {
        let mut streams = self.streams.lock();
        let stream = streams
            .get_mut(&id)
            .ok_or(RegistryError::NotFound { id })?;
        Ok(observe_locked(stream, now))
    }

    /// Observes every stream under one lock acquisition. Snapshot order
    /// follows ascending stream id so dashboard output is stable.
    pub fn observe_all(&self, now: DateTime<Utc>) -> Vec<StreamSnapshot> {
        let mut streams = self.streams.lock();
        let mut snapshots: Vec<StreamSnapshot> = streams
            .values_mut()
            .map(|stream| observe_locked(stream, now))
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.id);
        snapshots
    }

    /// Transitions a running stream to `Cancelled`, freezing accrued at the
    /// last observed value.
    pub fn cancel(&self, id: StreamId) -> Result<Stream> {
        let mut streams = self.streams.lock();
        let stream = streams
            .get_mut(&id)
            .ok_or(RegistryError::NotFound { id })?;
        if stream.state.is_terminal() {
            return Err(RegistryError::InvalidState {
                id,
                state: stream.state,
            });
        }
        stream.state = StreamState::Cancelled;
        info!("stream {} cancelled at accrued {}", id, stream.accrued);
        Ok(stream.clone())
    }

    /// Advances the withdrawn total after the ledger confirmed a withdrawal.
    /// Never touches `state` or `accrued`: withdrawals move value, they do
    /// not alter the lifecycle.
    pub fn record_withdrawal(&self, id: StreamId, amount: f64) -> Result<Stream> {
        if !(amount >= 0.0) {
            return Err(RegistryError::InvalidInput {
                id,
                reason: format!("withdrawal amount must be non-negative, got {amount}"),
            });
        }
        let mut streams = self.streams.lock();
        let stream = streams
            .get_mut(&id)
            .ok_or(RegistryError::NotFound { id })?;
        stream.withdrawn += amount;
        info!(
            "stream {} withdrawal recorded: {} (total withdrawn {})",
            id, amount, stream.withdrawn
        );
        Ok(stream.clone())
    }

    pub fn get(&self, id: StreamId) -> Option<Stream> {
        self.streams.lock().get(&id).cloned()
    }

    pub fn contains(&self, id: StreamId) -> bool {
        self.streams.lock().contains_key(&id)
    }

    pub fn ids(&self) -> Vec<StreamId> {
        let streams = self.streams.lock();
        let mut ids: Vec<StreamId> = streams.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.streams.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.lock().is_empty()
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_params(params: &StreamParams) -> Result<()> {
    let fail = |reason: String| RegistryError::InvalidInput {
        id: params.id,
        reason,
    };
    if params.sender.trim().is_empty() {
        return Err(fail("sender address is empty".to_string()));
    }
    if params.receiver.trim().is_empty() {
        return Err(fail("receiver address is empty".to_string()));
    }
    if !(params.rate_per_sec > 0.0) {
        return Err(fail(format!(
            "rate must be positive, got {}",
            params.rate_per_sec
        )));
    }
    if !(params.deposit > 0.0) {
        return Err(fail(format!(
            "deposit must be positive, got {}",
            params.deposit
        )));
    }
    Ok(())
}

fn observe_locked(stream: &mut Stream, now: DateTime<Utc>) -> StreamSnapshot {
    if stream.state == StreamState::Running {
        let value = accrual::accrued(stream.rate_per_sec, stream.deposit, stream.started_at, now);
        // max() keeps accrued monotone if a caller's clock steps backwards.
        stream.accrued = stream.accrued.max(value);
        if stream.accrued >= stream.deposit {
            stream.accrued = stream.deposit;
            stream.state = StreamState::Completed;
            info!("stream {} completed: deposit {} exhausted", stream.id, stream.deposit);
        }
    }
    StreamSnapshot {
        id: stream.id,
        state: stream.state,
        accrued: stream.accrued,
        remaining: accrual::remaining(stream.deposit, stream.accrued),
        withdrawn: stream.withdrawn,
        progress_percent: accrual::progress_percent(stream.accrued, stream.deposit),
        observed_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn params(id: StreamId) -> StreamParams {
        StreamParams {
            id,
            sender: "0xsender".to_string(),
            receiver: "0xreceiver".to_string(),
            rate_per_sec: 0.00001,
            deposit: 0.01,
        }
    }

    #[test]
    fn create_validates_inputs() {
        let registry = StreamRegistry::new();

        let mut bad = params(1);
        bad.rate_per_sec = 0.0;
        assert!(matches!(
            registry.create_stream(bad, at(0)),
            Err(RegistryError::InvalidInput { id: 1, .. })
        ));

        let mut bad = params(1);
        bad.deposit = -1.0;
        assert!(matches!(
            registry.create_stream(bad, at(0)),
            Err(RegistryError::InvalidInput { .. })
        ));

        let mut bad = params(1);
        bad.sender = "  ".to_string();
        assert!(matches!(
            registry.create_stream(bad, at(0)),
            Err(RegistryError::InvalidInput { .. })
        ));

        let mut bad = params(1);
        bad.receiver = String::new();
        assert!(matches!(
            registry.create_stream(bad, at(0)),
            Err(RegistryError::InvalidInput { .. })
        ));

        assert!(registry.is_empty());
    }

    #[test]
    fn observe_tracks_the_worked_example() {
        let registry = StreamRegistry::new();
        registry.create_stream(params(1), at(0)).unwrap();

        let snap = registry.observe(1, at(500)).unwrap();
        assert_eq!(snap.state, StreamState::Running);
        assert!((snap.accrued - 0.005).abs() < 1e-12);
        assert!((snap.remaining - 0.005).abs() < 1e-12);
        assert_eq!(snap.progress_percent, 50);

        let snap = registry.observe(1, at(1_000)).unwrap();
        assert_eq!(snap.state, StreamState::Completed);
        assert_eq!(snap.accrued, 0.01);
        assert_eq!(snap.remaining, 0.0);
        assert_eq!(snap.progress_percent, 100);
    }

    #[test]
    fn completion_triggers_exactly_at_deposit() {
        let registry = StreamRegistry::new();
        let mut p = params(1);
        p.rate_per_sec = 0.001;
        p.deposit = 1.0;
        registry.create_stream(p, at(0)).unwrap();

        let snap = registry.observe(1, at(999)).unwrap();
        assert_eq!(snap.state, StreamState::Running);

        let snap = registry.observe(1, at(1_000)).unwrap();
        assert_eq!(snap.state, StreamState::Completed);
        assert_eq!(snap.accrued, 1.0);
    }

    #[test]
    fn terminal_streams_freeze_accrued() {
        let registry = StreamRegistry::new();
        registry.create_stream(params(1), at(0)).unwrap();
        registry.observe(1, at(1_000)).unwrap();

        // Completed: later observations return the frozen value.
        let snap = registry.observe(1, at(50_000)).unwrap();
        assert_eq!(snap.state, StreamState::Completed);
        assert_eq!(snap.accrued, 0.01);
    }

    #[test]
    fn cancel_freezes_accrued_at_last_observation() {
        let registry = StreamRegistry::new();
        registry.create_stream(params(1), at(0)).unwrap();

        let snap = registry.observe(1, at(300)).unwrap();
        let frozen = snap.accrued;
        assert!((frozen - 0.003).abs() < 1e-12);

        let stream = registry.cancel(1).unwrap();
        assert_eq!(stream.state, StreamState::Cancelled);
        assert_eq!(stream.accrued, frozen);

        let snap = registry.observe(1, at(1_300)).unwrap();
        assert_eq!(snap.state, StreamState::Cancelled);
        assert_eq!(snap.accrued, frozen);
    }

    #[test]
    fn cancel_rejects_unknown_and_terminal_streams() {
        let registry = StreamRegistry::new();
        assert!(matches!(
            registry.cancel(99),
            Err(RegistryError::NotFound { id: 99 })
        ));

        registry.create_stream(params(1), at(0)).unwrap();
        registry.cancel(1).unwrap();
        assert!(matches!(
            registry.cancel(1),
            Err(RegistryError::InvalidState {
                id: 1,
                state: StreamState::Cancelled,
            })
        ));
    }

    #[test]
    fn create_overwrites_existing_id() {
        let registry = StreamRegistry::new();
        registry.create_stream(params(1), at(0)).unwrap();
        registry.observe(1, at(400)).unwrap();

        let mut second = params(1);
        second.rate_per_sec = 0.002;
        second.deposit = 2.0;
        registry.create_stream(second, at(1_000)).unwrap();
        assert!(registry.contains(1));

        let snap = registry.observe(1, at(1_500)).unwrap();
        assert_eq!(snap.state, StreamState::Running);
        assert!((snap.accrued - 1.0).abs() < 1e-9);
        assert_eq!(snap.withdrawn, 0.0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn accrued_survives_clock_stepping_backwards() {
        let registry = StreamRegistry::new();
        registry.create_stream(params(1), at(0)).unwrap();

        let snap = registry.observe(1, at(600)).unwrap();
        let high = snap.accrued;

        let snap = registry.observe(1, at(200)).unwrap();
        assert_eq!(snap.accrued, high);
    }

    #[test]
    fn record_withdrawal_moves_value_without_touching_state() {
        let registry = StreamRegistry::new();
        registry.create_stream(params(1), at(0)).unwrap();
        registry.observe(1, at(500)).unwrap();

        let stream = registry.record_withdrawal(1, 0.004).unwrap();
        assert_eq!(stream.state, StreamState::Running);
        assert!((stream.withdrawn - 0.004).abs() < 1e-12);
        assert!((stream.claimable() - 0.001).abs() < 1e-12);

        assert!(matches!(
            registry.record_withdrawal(1, -0.1),
            Err(RegistryError::InvalidInput { .. })
        ));
        assert!(matches!(
            registry.record_withdrawal(42, 0.1),
            Err(RegistryError::NotFound { id: 42 })
        ));
    }

    #[test]
    fn observe_all_returns_stable_order() {
        let registry = StreamRegistry::new();
        registry.create_stream(params(3), at(0)).unwrap();
        registry.create_stream(params(1), at(0)).unwrap();
        registry.create_stream(params(2), at(0)).unwrap();

        let snaps = registry.observe_all(at(100));
        let ids: Vec<StreamId> = snaps.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(registry.ids(), vec![1, 2, 3]);
    }

    #[test]
    fn concurrent_observers_agree() {
        use std::sync::Arc;

        let registry = Arc::new(StreamRegistry::new());
        registry.create_stream(params(1), at(0)).unwrap();

        let now = at(700);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.observe(1, now).unwrap().accrued)
            })
            .collect();
        let values: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(values.windows(2).all(|w| w[0] == w[1]));
    }
}
