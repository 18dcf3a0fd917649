//! # Nomad HTTP client.
//!
//! [`NomadClient`] implements [`Scheduler`] against the Nomad HTTP API:
//!
//! ```text
//! parse_job        POST /v1/jobs/parse            {"JobHCL": .., "Canonicalize": true}
//! register_job     POST /v1/jobs                  {"Job": ..}
//! dispatch         POST /v1/job/<id>/dispatch     {"Meta": {..}}    → DispatchedJobID
//! query            GET  /v1/job/<dispatched>/allocations?all=true   → [AllocListStub]
//! ```
//!
//! The client is stateless apart from the `reqwest` connection pool, so a single
//! instance is shared by all workers.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    DispatchHandle, JobDefinition, JobId, RunningUnit, Scheduler, SchedulerError, TaskEvent,
    TaskState,
};

const DEFAULT_ADDRESS: &str = "http://127.0.0.1:4646";
const TOKEN_HEADER: &str = "X-Nomad-Token";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`NomadClient`].
#[derive(Clone, Debug)]
pub struct NomadConfig {
    /// Base URL of the agent, e.g. `http://127.0.0.1:4646`.
    pub address: String,
    /// ACL token sent as `X-Nomad-Token` when set.
    pub token: Option<String>,
    /// Bound on establishing a connection.
    pub connect_timeout: Duration,
    /// Bound on one whole request, response body included.
    ///
    /// In-flight calls are never cancelled by the run, so this is what ends a
    /// call to an agent that stopped answering.
    pub request_timeout: Duration,
}

impl NomadConfig {
    /// Reads `NOMAD_ADDR` and `NOMAD_TOKEN`, falling back to the local agent.
    pub fn from_env() -> Self {
        Self {
            address: std::env::var("NOMAD_ADDR").unwrap_or_else(|_| DEFAULT_ADDRESS.to_string()),
            token: std::env::var("NOMAD_TOKEN").ok().filter(|t| !t.is_empty()),
            ..Self::default()
        }
    }
}

impl Default for NomadConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            token: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Nomad-backed [`Scheduler`].
#[derive(Clone, Debug)]
pub struct NomadClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ParseRequest<'a> {
    #[serde(rename = "JobHCL")]
    job_hcl: &'a str,
    #[serde(rename = "Canonicalize")]
    canonicalize: bool,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    #[serde(rename = "Job")]
    job: &'a Value,
}

#[derive(Serialize)]
struct DispatchRequest<'a> {
    #[serde(rename = "Meta")]
    meta: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct DispatchResponse {
    #[serde(rename = "DispatchedJobID")]
    dispatched_job_id: String,
}

#[derive(Deserialize)]
struct AllocStub {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "TaskStates", default)]
    task_states: Option<BTreeMap<String, RawTaskState>>,
}

#[derive(Deserialize)]
struct RawTaskState {
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Failed", default)]
    failed: bool,
    #[serde(rename = "Events", default)]
    events: Option<Vec<RawTaskEvent>>,
}

#[derive(Deserialize)]
struct RawTaskEvent {
    #[serde(rename = "DisplayMessage", default)]
    display_message: String,
}

impl NomadClient {
    /// Creates a client for the given agent.
    pub fn new(cfg: NomadConfig) -> Result<Self, SchedulerError> {
        let http = reqwest::Client::builder()
            .connect_timeout(cfg.connect_timeout)
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self {
            base_url: cfg.address.trim_end_matches('/').to_string(),
            token: cfg.token,
            http,
        })
    }

    /// Asks the agent to parse an HCL job specification into its JSON form.
    pub async fn parse_job(&self, hcl: &str) -> Result<JobDefinition, SchedulerError> {
        let body: Value = self
            .post(
                "/v1/jobs/parse",
                &ParseRequest {
                    job_hcl: hcl,
                    canonicalize: true,
                },
            )
            .await?;
        let id = body
            .get("ID")
            .and_then(Value::as_str)
            .ok_or_else(|| SchedulerError::Rejected("parsed job has no ID".into()))?;
        Ok(JobDefinition {
            id: JobId::new(id),
            body,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let req = self.http.request(method, url);
        match &self.token {
            Some(token) => req.header(TOKEN_HEADER, token),
            None => req,
        }
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, SchedulerError> {
        let resp = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn get(&self, path: &str) -> Result<Value, SchedulerError> {
        let resp = self.request(reqwest::Method::GET, path).send().await?;
        read_json(resp).await
    }
}

async fn read_json(resp: reqwest::Response) -> Result<Value, SchedulerError> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(SchedulerError::Status {
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(serde_json::from_str(&text)?)
}

/// Dispatched job ids contain `/`; escape it so the id stays one path segment.
fn escape_segment(id: &str) -> String {
    id.replace('%', "%25").replace('/', "%2F").replace('?', "%3F")
}

/// Decodes an allocation list, keeping each allocation's raw JSON for diagnostics.
fn decode_allocations(body: Value) -> Result<Vec<RunningUnit>, SchedulerError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => {
            return Err(SchedulerError::Rejected(format!(
                "expected allocation list, got {other}"
            )));
        }
    };

    items
        .into_iter()
        .map(|raw| {
            let stub: AllocStub = serde_json::from_value(raw.clone())?;
            let task_states = stub
                .task_states
                .unwrap_or_default()
                .into_iter()
                .map(|(name, ts)| {
                    let state = TaskState {
                        state: ts.state,
                        failed: ts.failed,
                        events: ts
                            .events
                            .unwrap_or_default()
                            .into_iter()
                            .map(|e| TaskEvent::new(e.display_message))
                            .collect(),
                    };
                    (name, state)
                })
                .collect();
            Ok(RunningUnit {
                id: stub.id,
                task_states,
                raw,
            })
        })
        .collect()
}

#[async_trait]
impl Scheduler for NomadClient {
    async fn register_job(&self, definition: &JobDefinition) -> Result<JobId, SchedulerError> {
        self.post(
            "/v1/jobs",
            &RegisterRequest {
                job: &definition.body,
            },
        )
        .await?;
        Ok(definition.id.clone())
    }

    async fn dispatch_instance(
        &self,
        job: &JobId,
        parameters: &BTreeMap<String, String>,
    ) -> Result<DispatchHandle, SchedulerError> {
        let path = format!("/v1/job/{}/dispatch", escape_segment(job.as_str()));
        let body = self.post(&path, &DispatchRequest { meta: parameters }).await?;
        let resp: DispatchResponse = serde_json::from_value(body)?;
        Ok(DispatchHandle::new(resp.dispatched_job_id))
    }

    async fn query_task_states(
        &self,
        handle: &DispatchHandle,
    ) -> Result<Vec<RunningUnit>, SchedulerError> {
        let path = format!(
            "/v1/job/{}/allocations?all=true",
            escape_segment(handle.as_str())
        );
        let body = self.get(&path).await?;
        decode_allocations(body)
    }
}
