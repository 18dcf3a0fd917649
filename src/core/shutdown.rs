//! # Cancellation source: interrupt signals and the global time budget.
//!
//! Provides [`wait_for_shutdown_signal`] and [`CancellationSource`], which turns
//! the first interrupt (or an exhausted time budget) into cancellation of the
//! single run token shared by the pool, every worker and every poller.
//!
//! ## Signals
//! **Unix platforms:** `SIGINT`, `SIGTERM`, `SIGQUIT`
//!
//! **Windows platforms:** `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! ```text
//! CancellationSource::arm(bus)
//!   select! {
//!     signal         ─► publish ShutdownRequested ─► token.cancel()
//!     budget elapsed ─► publish BudgetExhausted   ─► token.cancel()
//!     token cancelled elsewhere ─► exit
//!   }
//! ```
//!
//! Cancellation is cooperative: nothing is aborted, the run still waits for
//! every worker before summarizing.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::InitError;
use crate::events::{Bus, Event, EventKind};

/// Waits for a termination signal.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Owner of the run's cancellation token.
#[derive(Debug, Clone)]
pub struct CancellationSource {
    token: CancellationToken,
    budget: Option<Duration>,
    signals: bool,
}

impl CancellationSource {
    /// New source with a fresh token; `budget = None` means no deadline.
    pub fn new(budget: Option<Duration>) -> Self {
        Self {
            token: CancellationToken::new(),
            budget,
            signals: true,
        }
    }

    /// Disables OS signal handling (budget and explicit cancel still apply).
    pub fn without_signals(mut self) -> Self {
        self.signals = false;
        self
    }

    /// Token to hand to the harness.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Starts listening. The returned handle must be disarmed once the run is over.
    pub fn arm(self, bus: Bus) -> ArmedSource {
        let token = self.token.clone();
        let handle = tokio::spawn(async move {
            let signal = async {
                if !self.signals {
                    return std::future::pending::<()>().await;
                }
                if let Err(err) = wait_for_shutdown_signal().await {
                    tracing::warn!(%err, "signal handlers unavailable; interrupts will not cancel the run");
                    std::future::pending::<()>().await;
                }
            };
            let budget = async {
                match self.budget {
                    Some(d) => tokio::time::sleep(d).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = self.token.cancelled() => {}
                _ = signal => {
                    bus.publish(Event::new(EventKind::ShutdownRequested));
                    self.token.cancel();
                }
                _ = budget => {
                    let mut ev = Event::new(EventKind::BudgetExhausted);
                    if let Some(d) = self.budget {
                        ev = ev.with_delay(d);
                    }
                    bus.publish(ev);
                    self.token.cancel();
                }
            }
        });
        ArmedSource { token, handle }
    }
}

/// Running listener; see [`CancellationSource::arm`].
#[derive(Debug)]
pub struct ArmedSource {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ArmedSource {
    /// True once the run token has been cancelled (by signal, budget, or anyone else).
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Runs a startup step unless cancellation comes first.
    ///
    /// Arm the source before reading and registering the job so an interrupt
    /// during startup ends in [`InitError::Interrupted`] instead of killing the
    /// process. The step itself is dropped when cancellation wins.
    pub async fn guard_startup<T, F>(&self, step: F) -> Result<T, InitError>
    where
        F: Future<Output = Result<T, InitError>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(InitError::Interrupted),
            res = step => res,
        }
    }

    /// Stops listening without cancelling the token.
    pub async fn disarm(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}
