use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use dispatchload::{
    BackoffPolicy, Bus, CancellationSource, DiagnosticWriter, Harness, HarnessConfig, InitError,
    JobId, LogWriter, NomadClient, NomadConfig, QueryRetryPolicy, Scheduler, Subscribe,
};

/// Dispatch a parameterized batch job concurrently and report how the instances ended.
#[derive(Parser, Debug)]
#[command(name = "dispatchload", version, about)]
struct Args {
    /// Job definition file (HCL) to register before the run.
    #[arg(long, default_value = "sleeper.nomad.hcl")]
    job: PathBuf,

    /// Number of concurrent workers.
    #[arg(long, alias = "goroutines", default_value_t = 50)]
    workers: usize,

    /// Parameters are spread over 0..max-sleep.
    #[arg(long, default_value_t = 3)]
    max_sleep: u32,

    /// Dispatch-and-wait cycles per worker.
    #[arg(short = 'n', long, default_value_t = 10)]
    iterations: u32,

    /// Seconds between state queries of one instance.
    #[arg(long, default_value_t = 3)]
    poll_interval: u64,

    /// Global time budget in seconds (0 = none).
    #[arg(long, default_value_t = 0)]
    budget: u64,

    /// Extra attempts for a failed state query.
    #[arg(long, default_value_t = 0)]
    query_retries: u32,

    /// Directory for `<id>.alloc.json` diagnostics.
    #[arg(long, default_value = ".")]
    diag_dir: PathBuf,

    /// Overrides the job ID declared in the definition.
    #[arg(long)]
    job_id: Option<String>,

    /// Task whose state decides success.
    #[arg(long, default_value = "sleeper")]
    task: String,

    /// Dispatch metadata key carrying the parameter.
    #[arg(long, default_value = "dur")]
    param_key: String,

    /// Scheduler API address.
    #[arg(long, env = "NOMAD_ADDR")]
    addr: Option<String>,

    /// Scheduler ACL token.
    #[arg(long, env = "NOMAD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Seconds allowed to connect to the scheduler API.
    #[arg(long, default_value_t = 5)]
    connect_timeout: u64,

    /// Seconds allowed for one scheduler API request.
    #[arg(long, default_value_t = 30)]
    request_timeout: u64,
}

impl Args {
    fn nomad_config(&self) -> NomadConfig {
        let mut cfg = NomadConfig::default();
        if let Some(addr) = &self.addr {
            cfg.address = addr.clone();
        }
        cfg.token = self.token.clone().filter(|t| !t.is_empty());
        cfg.connect_timeout = Duration::from_secs(self.connect_timeout.max(1));
        cfg.request_timeout = Duration::from_secs(self.request_timeout.max(1));
        cfg
    }

    fn harness_config(&self) -> HarnessConfig {
        HarnessConfig {
            workers: self.workers,
            iterations: self.iterations,
            max_param: self.max_sleep,
            poll_interval: Duration::from_secs(self.poll_interval.max(1)),
            time_budget: Duration::from_secs(self.budget),
            task_name: self.task.clone(),
            param_key: self.param_key.clone(),
            query_retry: QueryRetryPolicy {
                max_retries: self.query_retries,
                backoff: BackoffPolicy::default(),
            },
            ..HarnessConfig::default()
        }
    }
}

/// Builds the client, then reads, parses and registers the job.
async fn prepare(args: &Args) -> Result<(Arc<NomadClient>, JobId), InitError> {
    let client = NomadClient::new(args.nomad_config()).map_err(|e| InitError::Client {
        error: e.to_string(),
    })?;

    let hcl = tokio::fs::read_to_string(&args.job)
        .await
        .map_err(|source| InitError::ReadJob {
            path: args.job.clone(),
            source,
        })?;

    let mut definition = client
        .parse_job(&hcl)
        .await
        .map_err(|source| InitError::ParseJob { source })?;
    if let Some(id) = &args.job_id {
        definition.id = JobId::new(id.clone());
        if let Some(body) = definition.body.as_object_mut() {
            body.insert("ID".to_string(), id.clone().into());
        }
    }

    let job = client
        .register_job(&definition)
        .await
        .map_err(|source| InitError::RegisterJob { source })?;
    Ok((Arc::new(client), job))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let cfg = args.harness_config();

    // Armed before startup so an interrupt while registering exits cleanly.
    let bus = Bus::new(cfg.bus_capacity);
    let source = CancellationSource::new(cfg.time_budget());
    let token = source.token();
    let armed = source.arm(bus.clone());

    let (client, job) = match armed.guard_startup(prepare(&args)).await {
        Ok(ready) => ready,
        Err(err) => {
            tracing::error!(label = err.as_label(), "startup failed");
            eprintln!("{err}");
            armed.disarm().await;
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%job, "job registered");

    let subscribers: Vec<Arc<dyn Subscribe>> = vec![
        Arc::new(LogWriter::new()),
        Arc::new(DiagnosticWriter::new(args.diag_dir.clone())),
    ];
    let harness = Harness::builder(cfg)
        .with_bus(bus)
        .with_subscribers(subscribers)
        .build(client);

    let summary = harness.run(&job, token).await;
    if armed.is_cancelled() {
        tracing::warn!("run was cancelled before every iteration finished");
    }
    armed.disarm().await;

    tracing::debug!(?summary, "run finished");
    ExitCode::SUCCESS
}
