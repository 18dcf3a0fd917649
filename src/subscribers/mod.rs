//! # Event subscribers for the harness.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! the built-in subscribers fed from the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Worker/Poller ── publish(Event) ──► Bus ──► harness listener ──► SubscriberSet::emit
//!                                                                     │
//!                                                   ┌─────────────────┼──────────────┐
//!                                                   ▼                 ▼              ▼
//!                                               LogWriter    DiagnosticWriter      Custom
//! ```
//!
//! ## Built-in subscribers
//! - [`LogWriter`] forwards lifecycle events to `tracing`.
//! - [`DiagnosticWriter`] persists structural-anomaly snapshots to disk (best-effort).

mod diagnostics;
mod log;
mod set;
mod subscribe;

pub use diagnostics::DiagnosticWriter;
pub use log::LogWriter;
pub use set::SubscriberSet;
pub(crate) use set::panic_message;
pub use subscribe::Subscribe;
