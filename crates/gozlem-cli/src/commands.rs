use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use gozlem_aggregate::DigestFilter;
use gozlem_core::models::domain::{Domain, Locale, ObservationContext, RiskLevel};
use gozlem_core::models::media::PendingMedia;
use gozlem_core::models::observation::{ObservationDraft, ObservationPatch};
use gozlem_heuristic::RiskHeuristic;
use gozlem_service::clock::SystemClock;
use gozlem_service::connectivity::ConnectivitySignal;
use gozlem_service::events::ChangeEvent;
use gozlem_service::{Collaborators, ObservationService, SyncCoordinator};
use gozlem_storage::queue::FileQueue;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::aws;
use crate::config::{self, CredentialSource, GozlemConfig};

/// How long a command waits for background assessments before exiting.
const ASSESSMENT_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "gozlem")]
#[command(about = "Preschool observation capture with offline queueing", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "GOZLEM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Treat the store as unreachable: submissions are queued locally
    #[arg(long, global = true)]
    pub offline: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a new config file
    Init(InitArgs),
    /// Record an observation
    Submit {
        #[arg(long)]
        child: Uuid,
        #[arg(long)]
        note: String,
        /// Development domain; repeat for several
        #[arg(long = "domain", required = true)]
        domains: Vec<Domain>,
        #[arg(long, default_value = "classroom")]
        context: ObservationContext,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Local photo, video or audio file to attach; repeat for several
        #[arg(long = "media")]
        media: Vec<PathBuf>,
        #[arg(long)]
        share_with_family: bool,
    },
    /// List a child's observations, queued ones first
    List {
        #[arg(long)]
        child: Uuid,
    },
    /// Edit a stored observation
    Update {
        id: Uuid,
        #[arg(long)]
        note: Option<String>,
        #[arg(long = "domain")]
        domains: Vec<Domain>,
        #[arg(long)]
        context: Option<ObservationContext>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        share_with_family: Option<bool>,
    },
    /// Delete an observation, or discard it if still queued
    Delete { id: Uuid },
    /// Push queued observations to the store
    Sync {
        /// Reset attempt counters on parked entries first
        #[arg(long)]
        retry_parked: bool,
    },
    /// Run the risk heuristic on a note without storing anything
    Evaluate {
        #[arg(long)]
        note: String,
        #[arg(long = "domain", required = true)]
        domains: Vec<Domain>,
        #[arg(long, default_value = "tr")]
        locale: Locale,
    },
    /// Recompute assessments for the configured author's observations
    Recompute {
        /// Recompute observations that already have an assessment too
        #[arg(long)]
        force: bool,
        #[arg(long)]
        author: Option<Uuid>,
    },
    /// Overview, activity and trend for one child
    ChildReport {
        #[arg(long)]
        child: Uuid,
    },
    /// Digest across children
    ClassReport(ClassReportArgs),
    /// Time-limited URL for a stored media path
    MediaUrl { path: String },
}

#[derive(Debug, Args)]
pub struct InitArgs {
    #[arg(long, env = "AWS_REGION")]
    pub region: String,
    #[arg(long)]
    pub bucket: String,
    /// Defaults to a fresh id
    #[arg(long)]
    pub author_id: Option<Uuid>,
    #[arg(long)]
    pub queue_path: Option<PathBuf>,
    #[arg(long, default_value = "tr")]
    pub locale: Locale,
    /// Named profile from ~/.aws
    #[arg(long, conflicts_with = "access_key_id")]
    pub profile: Option<String>,
    #[arg(long, env = "GOZLEM_ACCESS_KEY_ID", requires = "secret_access_key")]
    pub access_key_id: Option<String>,
    #[arg(long, env = "GOZLEM_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,
    #[arg(long, env = "GOZLEM_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,
    /// Overwrite an existing config
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct ClassReportArgs {
    /// Restrict to these children; repeat for several
    #[arg(long = "child")]
    pub children: Vec<Uuid>,
    #[arg(long, default_value_t = DigestFilter::default().days)]
    pub days: i64,
    #[arg(long = "domain")]
    pub domains: Vec<Domain>,
    #[arg(long = "risk")]
    pub risks: Vec<RiskLevel>,
    #[arg(long, default_value_t = DigestFilter::default().max_observations)]
    pub max_observations: usize,
}

pub async fn run(cli: Cli) -> eyre::Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };

    match cli.command {
        Command::Init(args) => init(&config_path, args),
        Command::Evaluate {
            note,
            domains,
            locale,
        } => print_json(&RiskHeuristic::new(locale).evaluate(&note, &domains)),
        command => {
            let config = config::load_config(&config_path)?;
            let app = App::connect(&config, !cli.offline).await?;
            app.execute(command).await
        }
    }
}

fn init(path: &Path, args: InitArgs) -> eyre::Result<()> {
    if path.exists() && !args.force {
        return Err(eyre::eyre!(
            "config already exists at {} (pass --force to overwrite)",
            path.display()
        ));
    }

    let credentials = match (args.profile, args.access_key_id, args.secret_access_key) {
        (Some(profile_name), _, _) => CredentialSource::Profile { profile_name },
        (None, Some(access_key_id), Some(secret_access_key)) => CredentialSource::Inline {
            access_key_id,
            secret_access_key,
            session_token: args.session_token,
        },
        _ => CredentialSource::DefaultChain,
    };
    let queue_path = match args.queue_path {
        Some(path) => path,
        None => config::default_queue_path()?,
    };

    let config = GozlemConfig {
        config_version: config::CURRENT_VERSION,
        region: args.region,
        bucket: args.bucket,
        author_id: args.author_id.unwrap_or_else(Uuid::new_v4),
        queue_path,
        service: gozlem_service::config::ServiceConfig {
            locale: args.locale,
            ..Default::default()
        },
        created_at: jiff::Timestamp::now(),
        credentials,
    };
    config::save_config(path, &config)?;
    print_json(&config::config_info(path, &config))
}

/// A wired service for one command invocation.
struct App {
    service: Arc<ObservationService>,
    author_id: Uuid,
}

impl App {
    async fn connect(config: &GozlemConfig, online: bool) -> eyre::Result<Self> {
        let store = Arc::new(aws::build_store(config).await);
        let queue = Arc::new(FileQueue::open(&config.queue_path)?);
        let deps = Collaborators {
            observations: store.clone(),
            assessments: store.clone(),
            media: store,
            queue,
            connectivity: Arc::new(ConnectivitySignal::new(online)),
            clock: Arc::new(SystemClock),
        };
        Ok(Self {
            service: Arc::new(ObservationService::new(deps, config.service.clone())),
            author_id: config.author_id,
        })
    }

    async fn execute(&self, command: Command) -> eyre::Result<()> {
        let service = &self.service;
        match command {
            Command::Submit {
                child,
                note,
                domains,
                context,
                tags,
                media,
                share_with_family,
            } => {
                let draft = ObservationDraft {
                    child_id: child,
                    author_id: self.author_id,
                    note,
                    domains,
                    context,
                    tags,
                    media_ids: Vec::new(),
                    pending_media: media.into_iter().map(pending_media).collect::<eyre::Result<_>>()?,
                    shared_with_family: share_with_family,
                };
                let mut events = service.feed().subscribe();
                let observation = service.submit(draft).await?;
                if !observation.pending_sync {
                    await_assessments(&mut events, 1).await;
                }
                print_json(&observation)
            }
            Command::List { child } => print_json(&service.list_for_child(child).await?),
            Command::Update {
                id,
                note,
                domains,
                context,
                tags,
                share_with_family,
            } => {
                let patch = ObservationPatch {
                    note,
                    domains: (!domains.is_empty()).then_some(domains),
                    context,
                    tags: (!tags.is_empty()).then_some(tags),
                    shared_with_family: share_with_family,
                };
                let reassess = patch.note.is_some() || patch.domains.is_some();
                let mut events = service.feed().subscribe();
                let updated = service.update(id, patch).await.map_err(retry_hint)?;
                if reassess {
                    await_assessments(&mut events, 1).await;
                }
                print_json(&updated)
            }
            Command::Delete { id } => {
                service.delete(id).await.map_err(retry_hint)?;
                print_json(&serde_json::json!({ "deleted": id }))
            }
            Command::Sync { retry_parked } => {
                let coordinator = SyncCoordinator::new(service.clone());
                let mut events = service.feed().subscribe();
                let report = if retry_parked {
                    coordinator.retry_parked().await?
                } else {
                    coordinator.drain().await?
                };
                await_assessments(&mut events, report.succeeded).await;
                print_json(&report)
            }
            Command::Recompute { force, author } => {
                let report = service
                    .recompute_assessments(author.unwrap_or(self.author_id), force)
                    .await?;
                print_json(&report)
            }
            Command::ChildReport { child } => print_json(&service.child_overview(child).await?),
            Command::ClassReport(args) => {
                let filter = DigestFilter {
                    days: args.days,
                    child_ids: Vec::new(),
                    domains: args.domains,
                    risks: args.risks,
                    max_observations: args.max_observations,
                };
                print_json(&service.class_digest(args.children, filter).await?)
            }
            Command::MediaUrl { path } => {
                let url = service.media_url(&path).await?;
                print_json(&serde_json::json!({ "path": path, "url": url }))
            }
            Command::Init(_) | Command::Evaluate { .. } => {
                Err(eyre::eyre!("command does not need a connected service"))
            }
        }
    }
}

fn retry_hint(e: gozlem_service::error::ServiceError) -> eyre::Report {
    if e.is_recoverable() {
        eyre::eyre!("{e}; nothing was changed, try again when the store is reachable")
    } else {
        e.into()
    }
}

/// Wait for `expected` assessment outcomes so background work is not cut
/// off when the process exits.
async fn await_assessments(events: &mut broadcast::Receiver<ChangeEvent>, expected: usize) {
    let mut seen = 0;
    let wait = tokio::time::timeout(ASSESSMENT_WAIT, async {
        while seen < expected {
            match events.recv().await {
                Ok(ChangeEvent::AssessmentUpdated { .. } | ChangeEvent::AssessmentFailed { .. }) => {
                    seen += 1;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "change feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    if wait.await.is_err() {
        tracing::warn!(expected, seen, "timed out waiting for assessments");
    }
}

fn pending_media(path: PathBuf) -> eyre::Result<PendingMedia> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| eyre::eyre!("media path {} has no file name", path.display()))?
        .to_string();
    let content_type = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(content_type_for)
        .map(str::to_string);
    Ok(PendingMedia {
        local_path: path,
        file_name,
        content_type,
    })
}

fn content_type_for(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "heic" => Some("image/heic"),
        "mp4" => Some("video/mp4"),
        "mov" => Some("video/quicktime"),
        "m4a" => Some("audio/mp4"),
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        _ => None,
    }
}

fn print_json<T: Serialize>(value: &T) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
