// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! In-memory registry for pay-per-second payment streams.
//!
//! The crate exposes:
//! - [`StreamRegistry`]: lifecycle state machine over the process-local stream map.
//! - [`accrual`]: pure accrual math, driven by an injected clock.
//!
//! The registry is advisory: the on-chain ledger remains the source of truth
//! for deposits and withdrawals, and callers reconcile against it through the
//! gateway crate.

pub mod accrual;
pub mod error;
pub mod registry;
pub mod types;

pub use error::{RegistryError, Result};
pub use registry::StreamRegistry;
pub use types::{Stream, StreamId, StreamParams, StreamSnapshot, StreamState};
