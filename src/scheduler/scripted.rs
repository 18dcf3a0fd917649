//! Deterministic in-memory [`Scheduler`] for tests.
//!
//! Each dispatch is given a [`Plan`] chosen by a script from the dispatched
//! parameter and how many times that parameter has been dispatched so far.
//! Every query consumes the next [`Tick`] of the plan; the last tick repeats.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use super::{
    DispatchHandle, JobDefinition, JobId, RunningUnit, Scheduler, SchedulerError, TaskEvent,
    TaskState,
};

pub(crate) const TASK: &str = "sleeper";
pub(crate) const PARAM_KEY: &str = "dur";

#[derive(Clone, Debug)]
pub(crate) enum Tick {
    /// No unit placed yet.
    Unplaced,
    Running,
    Succeeded,
    Failed(Vec<&'static str>),
    /// A unit exists but the named task is not in it.
    MissingTask,
    QueryError(&'static str),
    Panic,
}

#[derive(Clone, Debug)]
pub(crate) struct Plan {
    dispatch_error: Option<&'static str>,
    ticks: Vec<Tick>,
}

impl Plan {
    pub(crate) fn ticks(ticks: Vec<Tick>) -> Self {
        Self {
            dispatch_error: None,
            ticks,
        }
    }

    /// Pending for `n - 1` ticks, succeeded on tick `n`.
    pub(crate) fn succeed_on_tick(n: usize) -> Self {
        let mut ticks = vec![Tick::Unplaced; n.saturating_sub(1)];
        ticks.push(Tick::Succeeded);
        Self::ticks(ticks)
    }

    pub(crate) fn fail_with(events: Vec<&'static str>) -> Self {
        Self::ticks(vec![Tick::Running, Tick::Failed(events)])
    }

    pub(crate) fn reject_dispatch(msg: &'static str) -> Self {
        Self {
            dispatch_error: Some(msg),
            ticks: vec![Tick::Unplaced],
        }
    }

    pub(crate) fn never_finishes() -> Self {
        Self::ticks(vec![Tick::Running])
    }
}

struct Live {
    plan: Plan,
    next: usize,
}

#[derive(Default)]
struct State {
    per_param: HashMap<String, usize>,
    live: HashMap<DispatchHandle, Live>,
    dispatched: usize,
    queries: usize,
}

type Script = Box<dyn Fn(&str, usize) -> Plan + Send + Sync>;

pub(crate) struct ScriptedScheduler {
    script: Script,
    state: Mutex<State>,
}

impl ScriptedScheduler {
    pub(crate) fn new(script: impl Fn(&str, usize) -> Plan + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            state: Mutex::new(State::default()),
        }
    }

    /// Every dispatch follows the same plan.
    pub(crate) fn uniform(plan: Plan) -> Self {
        Self::new(move |_, _| plan.clone())
    }

    pub(crate) fn dispatched(&self) -> usize {
        self.state.lock().unwrap().dispatched
    }

    pub(crate) fn queries(&self) -> usize {
        self.state.lock().unwrap().queries
    }
}

fn unit(id: &str, task: &str, state: &str, failed: bool, events: &[&str]) -> RunningUnit {
    let task_state = TaskState {
        state: state.to_string(),
        failed,
        events: events.iter().map(|m| TaskEvent::new(*m)).collect(),
    };
    let mut task_states = BTreeMap::new();
    task_states.insert(task.to_string(), task_state);
    RunningUnit {
        id: id.to_string(),
        task_states,
        raw: json!({ "ID": id, "TaskGroup": task }),
    }
}

#[async_trait]
impl Scheduler for ScriptedScheduler {
    async fn register_job(&self, definition: &JobDefinition) -> Result<JobId, SchedulerError> {
        Ok(definition.id.clone())
    }

    async fn dispatch_instance(
        &self,
        job: &JobId,
        parameters: &BTreeMap<String, String>,
    ) -> Result<DispatchHandle, SchedulerError> {
        let param = parameters.get(PARAM_KEY).cloned().unwrap_or_default();
        let mut st = self.state.lock().unwrap();
        let ordinal = {
            let n = st.per_param.entry(param.clone()).or_insert(0);
            let current = *n;
            *n += 1;
            current
        };
        let plan = (self.script)(&param, ordinal);
        if let Some(msg) = plan.dispatch_error {
            return Err(SchedulerError::Rejected(msg.to_string()));
        }

        st.dispatched += 1;
        let handle = DispatchHandle::new(format!("{job}/dispatch-{param}-{ordinal}"));
        st.live.insert(handle.clone(), Live { plan, next: 0 });
        Ok(handle)
    }

    async fn query_task_states(
        &self,
        handle: &DispatchHandle,
    ) -> Result<Vec<RunningUnit>, SchedulerError> {
        let tick = {
            let mut st = self.state.lock().unwrap();
            st.queries += 1;
            let live = st
                .live
                .get_mut(handle)
                .ok_or_else(|| SchedulerError::Rejected(format!("unknown dispatch {handle}")))?;
            let idx = live.next.min(live.plan.ticks.len() - 1);
            live.next += 1;
            live.plan.ticks[idx].clone()
        };

        let id = format!("alloc-{}", handle.as_str().replace('/', "-"));
        match tick {
            Tick::Unplaced => Ok(Vec::new()),
            Tick::Running => Ok(vec![unit(&id, TASK, "running", false, &[])]),
            Tick::Succeeded => Ok(vec![unit(&id, TASK, "dead", false, &[])]),
            Tick::Failed(events) => Ok(vec![unit(&id, TASK, "dead", true, &events)]),
            Tick::MissingTask => Ok(vec![unit(&id, "sidecar", "running", false, &[])]),
            Tick::QueryError(msg) => Err(SchedulerError::Rejected(msg.to_string())),
            Tick::Panic => panic!("scripted panic for {handle}"),
        }
    }
}
