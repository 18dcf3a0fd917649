//! # InstancePoller: one dispatch-and-wait cycle.
//!
//! Submits one instance and polls it on a fixed interval until the named task
//! reaches a terminal state, an error occurs, or cancellation wins.
//!
//! ## State machine
//! ```text
//! token cancelled? ──yes──► Cancelled(before dispatch)
//!        │ no
//!        ▼
//! dispatch ──err──► Dispatch
//!        │
//!        ▼
//! loop (biased select, every poll_interval):
//!   ├─ token cancelled          ─► Cancelled(while waiting)
//!   └─ tick
//!        ├─ query ──err──► [retry per QueryRetryPolicy] ─► Query
//!        ├─ no units            ─► Pending, continue
//!        ├─ units[0] lacks task ─► Structural(snapshot)
//!        ├─ task not terminal   ─► Pending/Running/Unknown, continue
//!        ├─ terminal + failed   ─► TaskFailed("<e1> <e2> ...")
//!        └─ terminal            ─► Ok
//! ```
//!
//! ## Rules
//! - Cancellation takes priority over a pending tick.
//! - In-flight dispatch and query calls are never aborted; cancellation is
//!   observed at the next tick boundary.
//! - Only the first unit is inspected; additional units are ignored.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::WorkParameter;
use crate::error::{CancelStage, PollError};
use crate::events::{Bus, Event, EventKind};
use crate::policies::QueryRetryPolicy;
use crate::scheduler::{
    DispatchHandle, InstanceSnapshot, InstanceState, JobId, RunningUnit, Scheduler,
};

/// Drives dispatched instances to a terminal state.
///
/// Stateless between calls; shared by all workers behind an `Arc`.
pub struct InstancePoller {
    scheduler: Arc<dyn Scheduler>,
    job: JobId,
    task_name: String,
    param_key: String,
    interval: Duration,
    retry: QueryRetryPolicy,
    bus: Bus,
}

/// Result of inspecting one tick's units.
enum Tick {
    Continue(InstanceState),
    Done(Result<(), PollError>),
}

impl InstancePoller {
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        job: JobId,
        task_name: impl Into<String>,
        param_key: impl Into<String>,
        interval: Duration,
        retry: QueryRetryPolicy,
        bus: Bus,
    ) -> Self {
        Self {
            scheduler,
            job,
            task_name: task_name.into(),
            param_key: param_key.into(),
            interval,
            retry,
            bus,
        }
    }

    /// Dispatches one instance with `parameter` and waits for its named task to finish.
    pub async fn wait_for_completion(
        &self,
        token: &CancellationToken,
        parameter: &WorkParameter,
    ) -> Result<(), PollError> {
        if token.is_cancelled() {
            return Err(PollError::Cancelled {
                stage: CancelStage::BeforeDispatch,
            });
        }

        let mut params = BTreeMap::new();
        params.insert(self.param_key.clone(), parameter.to_string());
        let dispatch = self
            .scheduler
            .dispatch_instance(&self.job, &params)
            .await
            .map_err(|e| PollError::Dispatch {
                error: e.to_string(),
            })?;

        self.bus.publish(
            Event::new(EventKind::InstanceDispatched)
                .with_parameter(parameter.shared())
                .with_dispatch(&dispatch),
        );

        let period = self.interval.max(Duration::from_millis(1));
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return Err(PollError::Cancelled { stage: CancelStage::AwaitingCompletion });
                }
                _ = ticker.tick() => {}
            }

            let units = self.query(token, &dispatch).await?;
            match self.inspect(&dispatch, units) {
                Tick::Continue(state) => {
                    self.bus.publish(
                        Event::new(EventKind::InstancePolled)
                            .with_parameter(parameter.shared())
                            .with_dispatch(&dispatch)
                            .with_state(state),
                    );
                }
                Tick::Done(res) => return res,
            }
        }
    }

    /// One state query, retried per policy.
    async fn query(
        &self,
        token: &CancellationToken,
        dispatch: &DispatchHandle,
    ) -> Result<Vec<RunningUnit>, PollError> {
        let mut retry: u32 = 0;
        loop {
            let err = match self.scheduler.query_task_states(dispatch).await {
                Ok(units) => return Ok(units),
                Err(e) => e,
            };

            let Some(delay) = self.retry.delay_for(retry) else {
                return Err(PollError::Query {
                    dispatch: dispatch.clone(),
                    error: err.to_string(),
                });
            };
            retry += 1;
            self.bus.publish(
                Event::new(EventKind::QueryRetryScheduled)
                    .with_dispatch(dispatch)
                    .with_index(retry)
                    .with_delay(delay)
                    .with_reason(err.to_string()),
            );

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return Err(PollError::Cancelled { stage: CancelStage::AwaitingCompletion });
                }
                _ = time::sleep(delay) => {}
            }
        }
    }

    fn inspect(&self, dispatch: &DispatchHandle, units: Vec<RunningUnit>) -> Tick {
        let Some(unit) = units.first() else {
            return Tick::Continue(InstanceState::Pending);
        };

        let Some(task) = unit.task_states.get(&self.task_name) else {
            return Tick::Done(Err(PollError::Structural {
                task: self.task_name.clone(),
                dispatch: dispatch.clone(),
                snapshot: Arc::new(InstanceSnapshot {
                    dispatch: dispatch.clone(),
                    units,
                }),
            }));
        };

        match InstanceState::from_task(task) {
            InstanceState::Failed => Tick::Done(Err(PollError::TaskFailed {
                task: self.task_name.clone(),
                dispatch: dispatch.clone(),
                events: task.bracketed_events(),
            })),
            InstanceState::Succeeded => Tick::Done(Ok(())),
            live => Tick::Continue(live),
        }
    }
}
