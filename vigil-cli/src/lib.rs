//! Command-line access to the alerting store.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use vigil_alerting::action::{
    GetMonitorRequest, IndexDestinationRequest, IndexJobRequest, IndexMonitorRequest,
};
use vigil_alerting::{AlertingService, AlertingSettings, ClusterSettings, TransportAction};
use vigil_model::ScheduledJob;
use vigil_storage::DuckDbJobStore;
use vigil_types::{Caller, JobId, PrimaryTerm, RefreshPolicy, RestMethod, SeqNo, User};

#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(about = "Create, update and read alerting monitors and destinations")]
pub struct Cli {
    /// DuckDB file holding the scheduled-jobs index
    #[arg(long, default_value = "vigil.duckdb", global = true)]
    pub db: PathBuf,

    /// TOML settings file
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Caller name; without it requests run as if security were disabled
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Backend role of the caller (repeatable)
    #[arg(long = "backend-role", global = true)]
    pub backend_roles: Vec<String>,

    /// Security role of the caller (repeatable)
    #[arg(long = "role", global = true)]
    pub roles: Vec<String>,

    /// Ignore --user and run without a principal
    #[arg(long, global = true)]
    pub security_disabled: bool,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create or update a destination from a JSON file
    PutDestination(WriteArgs),
    /// Create or update a monitor from a JSON file
    PutMonitor(WriteArgs),
    /// Read a monitor
    GetMonitor {
        #[arg(long)]
        id: String,

        /// Only report the version, not the monitor
        #[arg(long)]
        head: bool,

        /// Fail unless the stored version equals this one
        #[arg(long)]
        version: Option<i64>,
    },
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// JSON document of the resource
    #[arg(long)]
    pub file: PathBuf,

    /// Update this id instead of creating a new resource
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long, default_value_t = SeqNo::UNASSIGNED.value(), allow_hyphen_values = true)]
    pub if_seq_no: i64,

    #[arg(long, default_value_t = PrimaryTerm::UNASSIGNED.value())]
    pub if_primary_term: i64,

    /// `true`, `false` or `wait_for`
    #[arg(long, default_value = "true")]
    pub refresh: String,
}

impl Cli {
    /// The identity requests are made with.
    #[must_use]
    pub fn caller(&self) -> Caller {
        match &self.user {
            Some(name) if !self.security_disabled => Caller::Authenticated(User::new(
                name.clone(),
                self.backend_roles.clone(),
                self.roles.clone(),
                Vec::new(),
            )),
            _ => Caller::SecurityDisabled,
        }
    }
}

/// Opens the store, runs the command and returns the response as JSON.
pub async fn run(cli: &Cli) -> Result<Value> {
    let settings = match &cli.settings {
        Some(path) => AlertingSettings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => AlertingSettings::default(),
    };
    let store = DuckDbJobStore::open(&cli.db)
        .with_context(|| format!("failed to open store at {}", cli.db.display()))?;
    let service = AlertingService::new(Arc::new(store), ClusterSettings::new(settings));
    execute(&service, &cli.command, &cli.caller()).await
}

/// Runs one command against an already wired service.
pub async fn execute(service: &AlertingService, command: &Command, caller: &Caller) -> Result<Value> {
    debug!("Executing {:?} as [{}]", command, caller.name());
    let value = match command {
        Command::PutDestination(args) => {
            let request: IndexDestinationRequest = write_request(args)?;
            let response = service.index_destination.execute(request, caller).await?;
            serde_json::to_value(response)?
        }
        Command::PutMonitor(args) => {
            let request: IndexMonitorRequest = write_request(args)?;
            let response = service.index_monitor.execute(request, caller).await?;
            serde_json::to_value(response)?
        }
        Command::GetMonitor { id, head, version } => {
            let id = JobId::parse(id)?;
            let mut request = if *head {
                GetMonitorRequest::head(id)
            } else {
                GetMonitorRequest::new(id)
            };
            request.version = *version;
            let response = service.get_monitor.execute(request, caller).await?;
            serde_json::to_value(response)?
        }
    };
    Ok(value)
}

fn write_request<J>(args: &WriteArgs) -> Result<IndexJobRequest<J>>
where
    J: ScheduledJob + serde::de::DeserializeOwned,
{
    let job: J = read_json(&args.file)?;
    let id = args.id.as_deref().map(JobId::parse).transpose()?;
    let method = if id.is_some() {
        RestMethod::Put
    } else {
        RestMethod::Post
    };
    Ok(IndexJobRequest {
        id,
        seq_no: SeqNo::new(args.if_seq_no),
        primary_term: PrimaryTerm::new(args.if_primary_term),
        refresh_policy: RefreshPolicy::parse(&args.refresh)?,
        method,
        job,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("invalid JSON in {}", path.display()))
}
