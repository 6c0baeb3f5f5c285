//! firebreakd - The firebreak background service
//!
//! This is the main entry point for the firebreakd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization and first-run seeding
//! - Session controller and site roster
//! - Local wake-up scheduler and rules-file engine
//! - IPC server

use anyhow::{Context, Result};
use clap::Parser;
use firebreak_api::{
    Command, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, Response,
    ResponsePayload, SessionPhase,
};
use firebreak_config::load_config;
use firebreak_core::{keys, CoreError, CoreEvent, SessionController, SiteRoster};
use firebreak_host_api::{HostError, RuleEngine, WakeupScheduler};
use firebreak_ipc::{IpcServer, ServerMessage};
use firebreak_store::{AuditEvent, AuditEventType, AuditLog, KvStore, SqliteStore};
use firebreak_util::{default_config_path, ClientId};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// firebreakd - Focus sessions that block distracting sites
#[derive(Parser, Debug)]
#[command(name = "firebreakd")]
#[command(about = "Focus sessions that block distracting sites", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set FIREBREAK_SOCKET env var)
    #[arg(short, long, env = "FIREBREAK_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set FIREBREAK_DATA_DIR env var)
    #[arg(short, long, env = "FIREBREAK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    controller: Arc<SessionController>,
    roster: SiteRoster,
    engine: Arc<dyn RuleEngine>,
    scheduler: Arc<firebreak_host_local::TokioScheduler>,
    ipc: Arc<IpcServer>,
    store: Arc<SqliteStore>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let config = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        let socket_path = args.socket.clone().unwrap_or_else(|| config.socket_path.clone());
        let data_dir = args.data_dir.clone().unwrap_or_else(|| config.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        // Initialize store
        let db_path = data_dir.join("firebreakd.db");
        let store = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        seed_defaults(store.as_ref()).await?;

        store
            .append(AuditEvent::new(AuditEventType::ServiceStarted))
            .await?;

        // Collaborators
        let scheduler = Arc::new(firebreak_host_local::TokioScheduler::new());
        let rules_path = if args.data_dir.is_some() {
            data_dir.join("rules.json")
        } else {
            config.rules_path.clone()
        };
        let engine: Arc<dyn RuleEngine> =
            Arc::new(firebreak_host_local::FileRules::new(&rules_path));

        info!(rules_path = %rules_path.display(), "Rule engine initialized");

        // Core
        let kv: Arc<dyn KvStore> = store.clone();
        let audit: Arc<dyn AuditLog> = store.clone();
        let sched: Arc<dyn WakeupScheduler> = scheduler.clone();
        let controller = Arc::new(SessionController::new(
            kv.clone(),
            audit.clone(),
            sched,
            engine.clone(),
        ));
        let roster = SiteRoster::new(kv, audit);

        // IPC server
        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        Ok(Self {
            controller,
            roster,
            engine,
            scheduler,
            ipc: Arc::new(ipc),
            store,
        })
    }

    async fn run(self) -> Result<()> {
        let mut wakeups = self.scheduler.subscribe();

        let ipc_ref = self.ipc.clone();
        let mut ipc_messages = ipc_ref
            .take_message_receiver()
            .await
            .context("Message receiver should be available")?;

        // Spawn IPC accept task
        let ipc_accept = ipc_ref.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        // Reconcile rules with whatever state the last run left behind
        match self.controller.resync(firebreak_util::now()).await {
            Ok(Some(event)) => self.broadcast(event),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Startup resync failed"),
        }

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // Wake-up timer fired
                Some(wakeup) = wakeups.recv() => {
                    match self.controller.on_wake_up(&wakeup.name).await {
                        Ok(Some(event)) => self.broadcast(event),
                        Ok(None) => {}
                        Err(e) => error!(error = %e, "Wake-up handling failed"),
                    }
                }

                // IPC messages
                Some(msg) = ipc_messages.recv() => {
                    self.handle_ipc_message(msg).await;
                }
            }
        }

        // Graceful shutdown. The session record stays durable; rules stay
        // installed for an active session and the startup resync of the
        // next run re-derives them either way.
        self.ipc.broadcast_event(Event::new(EventPayload::Shutdown));

        if let Err(e) = self
            .store
            .append(AuditEvent::new(AuditEventType::ServiceStopped))
            .await
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_ipc_message(&self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let response = self.dispatch(&client_id, request.request_id, request.command).await;
                if let Err(e) = self.ipc.send_response(&client_id, response).await {
                    warn!(client_id = %client_id, error = %e, "Failed to send response");
                }
            }
            ServerMessage::ClientConnected { client_id } => {
                info!(client_id = %client_id, "Client connected");
            }
            ServerMessage::ClientDisconnected { client_id } => {
                info!(client_id = %client_id, "Client disconnected");
            }
        }
    }

    async fn dispatch(&self, client_id: &ClientId, request_id: u64, command: Command) -> Response {
        match command {
            Command::Start {
                duration_minutes,
                strict,
            } => {
                match self
                    .controller
                    .start(duration_minutes, strict, firebreak_util::now())
                    .await
                {
                    Ok(CoreEvent::SessionStarted { end_time, locked }) => {
                        self.broadcast(CoreEvent::SessionStarted { end_time, locked });
                        Response::success(request_id, ResponsePayload::Started { end_time, locked })
                    }
                    Ok(_) => Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::InternalError, "unexpected start result"),
                    ),
                    Err(e) => Response::error(request_id, map_core_error(&e)),
                }
            }

            Command::Stop => match self.controller.stop().await {
                Ok(event) => {
                    self.broadcast(event);
                    Response::success(request_id, ResponsePayload::Stopped)
                }
                Err(e) => Response::error(request_id, map_core_error(&e)),
            },

            Command::AddSite { host } => match self.roster.add(&host).await {
                Ok(sites) => self.after_roster_change(request_id, sites).await,
                Err(e) => Response::error(request_id, map_core_error(&e)),
            },

            Command::RemoveSite { host } => match self.roster.remove(&host).await {
                Ok(sites) => self.after_roster_change(request_id, sites).await,
                Err(e) => Response::error(request_id, map_core_error(&e)),
            },

            Command::ListSites => match self.roster.sites().await {
                Ok(sites) => Response::success(request_id, ResponsePayload::Sites { sites }),
                Err(e) => Response::error(request_id, map_core_error(&e)),
            },

            Command::Status => match self.controller.status(firebreak_util::now()).await {
                Ok((view, healed)) => {
                    if let Some(event) = healed {
                        self.broadcast(event);
                    }
                    Response::success(request_id, ResponsePayload::Status(view))
                }
                Err(e) => Response::error(request_id, map_core_error(&e)),
            },

            Command::SubscribeEvents => Response::success(
                request_id,
                ResponsePayload::Subscribed {
                    client_id: client_id.clone(),
                },
            ),

            Command::GetHealth => {
                let (session_running, active_rules) =
                    match self.controller.status(firebreak_util::now()).await {
                        Ok((view, healed)) => {
                            if let Some(event) = healed {
                                self.broadcast(event);
                            }
                            let rules = self
                                .engine
                                .list_active()
                                .await
                                .map(|r| r.len())
                                .unwrap_or(0);
                            (view.phase != SessionPhase::Idle, rules)
                        }
                        Err(_) => (false, 0),
                    };

                Response::success(
                    request_id,
                    ResponsePayload::Health(HealthStatus {
                        store_healthy: self.store.is_healthy(),
                        session_running,
                        active_rules,
                    }),
                )
            }

            Command::Ping => Response::success(request_id, ResponsePayload::Pong),
        }
    }

    /// A roster change during an active session must be reflected in
    /// the installed rules; resync re-derives them from current state.
    async fn after_roster_change(&self, request_id: u64, sites: Vec<String>) -> Response {
        match self.controller.resync(firebreak_util::now()).await {
            Ok(healed) => {
                if let Some(event) = healed {
                    self.broadcast(event);
                }
                self.broadcast(CoreEvent::SitesChanged {
                    sites: sites.clone(),
                });
                Response::success(request_id, ResponsePayload::Sites { sites })
            }
            Err(e) => Response::error(request_id, map_core_error(&e)),
        }
    }

    fn broadcast(&self, event: CoreEvent) {
        let payload = match event {
            CoreEvent::SessionStarted { end_time, locked } => {
                EventPayload::SessionStarted { end_time, locked }
            }
            CoreEvent::SessionEnded { reason } => EventPayload::SessionEnded { reason },
            CoreEvent::SitesChanged { sites } => EventPayload::SitesChanged { sites },
        };
        self.ipc.broadcast_event(Event::new(payload));
    }
}

/// First run: create the persisted record with install defaults.
async fn seed_defaults(store: &SqliteStore) -> Result<()> {
    let existing = store.get(&[keys::RUNNING, keys::SITES]).await?;
    if existing.contains_key(keys::RUNNING) {
        return Ok(());
    }

    let mut entries = HashMap::new();
    entries.insert(keys::RUNNING.to_string(), json!(false));
    entries.insert(keys::LOCKED.to_string(), json!(false));
    if !existing.contains_key(keys::SITES) {
        entries.insert(keys::SITES.to_string(), json!([]));
    }
    store.set(entries).await?;

    info!("First run: seeded default state");
    Ok(())
}

fn map_core_error(e: &CoreError) -> ErrorInfo {
    let code = match e {
        CoreError::Locked => ErrorCode::SessionLocked,
        CoreError::InvalidDuration(_) => ErrorCode::InvalidDuration,
        CoreError::InvalidSite(_) => ErrorCode::InvalidSite,
        CoreError::DuplicateSite(_) => ErrorCode::DuplicateSite,
        CoreError::Storage(_) => ErrorCode::StorageError,
        CoreError::Host(HostError::Scheduler(_)) => ErrorCode::SchedulerError,
        CoreError::Host(HostError::RuleEngine(_)) => ErrorCode::RuleEngineError,
        CoreError::Host(HostError::Io(_)) => ErrorCode::InternalError,
    };
    ErrorInfo::new(code, e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(version = env!("CARGO_PKG_VERSION"), "firebreakd starting");

    let service = Service::new(&args).await?;
    service.run().await
}
