//! Live reload server and deploy engine for hotdrop.
//!
//! Serves the live reload protocol to browsers and runs the deploy
//! engine that feeds it:
//!
//! - `GET /livereload`: WebSocket endpoint for browsers
//! - `GET /forcereload?path=<resource>`: broadcast a reload by hand
//! - `GET /info`: connected clients, applications and deploy locations
//!
//! # Quick Start
//!
//! ```ignore
//! use hotdrop_config::Config;
//! use hotdrop_server::{run_server, server_config_from_hotdrop_config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load(None, None).unwrap();
//!     let server_config = server_config_from_hotdrop_config(&config, "1.0.0".to_owned()).unwrap();
//!     run_server(server_config, None).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! filesystem ──notify──► dispatcher thread (engine)
//!                             │
//!                             ├─► DeployOrchestrator ─┐
//!                             ├─► DeployLocationCache │
//!                             └─► ChangeRouter ───────┤
//!                                                     ▼
//! Browser ◄──WebSocket── axum server ◄── NotificationHub
//! ```

mod app;
mod engine;
mod error;
mod handlers;
mod live_reload;
mod state;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hotdrop_config::{Config, ConfigError};
use hotdrop_deploy::{DEFAULT_EXEMPT_LIBRARIES, ReloadNotifier, RouterSettings};
use hotdrop_watch::{WatchMode, WatchOptions};
use state::AppState;

pub use engine::Engine;
pub use error::{ProtocolError, ServerError};
pub use live_reload::{
    ClientEvent, ClientId, ClientMessage, HubStatus, NotificationHub, PROTOCOL_V7, ServerMessage,
    StatusCallback,
};

/// Name announced in the live reload greeting.
pub const SERVER_NAME: &str = "hotdrop";

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Developer workspace root.
    pub workspace_dir: PathBuf,
    /// Directory receiving new artifacts.
    pub drop_dir: PathBuf,
    /// Per-deploy extraction area of the server.
    pub staged_dir: PathBuf,
    /// Published applications of the server.
    pub published_dir: PathBuf,
    /// Server auto-deploy directory.
    pub auto_deploy_dir: PathBuf,
    /// Server log announcing deploys.
    pub log_file: PathBuf,
    /// Undeploy log pattern with a `{name}` placeholder.
    pub undeploy_signal: String,
    /// Deploy log pattern with a `{name}` placeholder.
    pub deploy_signal: String,
    /// Budget for each log signal.
    pub signal_timeout: Duration,
    /// Delay between log reads.
    pub signal_poll_interval: Duration,
    /// Libraries never compared.
    pub exempt_libraries: Vec<String>,
    /// Source propagation settings.
    pub router: RouterSettings,
    /// Style compiler executable.
    pub sass_command: String,
    /// Filesystem watching settings.
    pub watch: WatchOptions,
    /// Application version.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 35729,
            workspace_dir: PathBuf::from("."),
            drop_dir: PathBuf::from("hotdrop"),
            staged_dir: PathBuf::from("temp"),
            published_dir: PathBuf::from("webapps"),
            auto_deploy_dir: PathBuf::from("deploy"),
            log_file: PathBuf::from("logs/catalina.out"),
            undeploy_signal: r"for {name} \w+ unregistered".to_owned(),
            deploy_signal: r"for {name} \w+ available for use".to_owned(),
            signal_timeout: Duration::from_secs(60),
            signal_poll_interval: Duration::from_millis(250),
            exempt_libraries: DEFAULT_EXEMPT_LIBRARIES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            router: RouterSettings::new(PathBuf::from("webapps/ROOT")),
            sass_command: "sass".to_owned(),
            watch: WatchOptions::default(),
            version: String::new(),
        }
    }
}

/// Run the engine and the HTTP server until Ctrl-C.
///
/// `on_status` is told about every browser joining or leaving.
pub async fn run_server(
    config: ServerConfig,
    on_status: Option<StatusCallback>,
) -> Result<(), ServerError> {
    let mut hub = NotificationHub::new(SERVER_NAME);
    if let Some(callback) = on_status {
        hub = hub.with_status_callback(callback);
    }
    let hub = Arc::new(hub);

    let engine = Engine::start(&config, Arc::clone(&hub) as Arc<dyn ReloadNotifier>)?;

    let state = Arc::new(AppState {
        hub: Arc::clone(&hub),
        workspace: engine.workspace(),
        locations: engine.locations(),
        version: config.version.clone(),
    });
    let app = app::create_router(state);

    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
    tracing::info!(address = %address, "Starting server");

    let shutdown_hub = Arc::clone(&hub);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_hub.shutdown();
        })
        .await
        .map_err(ServerError::Serve)?;

    engine.stop();
    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from hotdrop config.
pub fn server_config_from_hotdrop_config(
    config: &Config,
    version: String,
) -> Result<ServerConfig, ConfigError> {
    let paths = &config.paths_resolved;
    let propagate = &config.propagate;

    let mut router = RouterSettings::new(paths.portal_dir(&config.portal.context)?);
    router.extensions.clone_from(&propagate.extensions);
    router
        .compiled_extensions
        .clone_from(&propagate.compiled_extensions);
    router.style_extensions.clone_from(&propagate.style_extensions);
    router
        .script_extensions
        .clone_from(&propagate.script_extensions);
    router.statics_dir.clone_from(&paths.statics_dir);
    router.class_reload_delay = propagate.class_reload_delay();
    router.backup_suffix.clone_from(&propagate.backup_suffix);

    let mode = if config.watch.poll {
        WatchMode::Polling(Duration::from_millis(config.watch.poll_interval_ms))
    } else {
        WatchMode::Native
    };

    Ok(ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        workspace_dir: paths.workspace_dir.clone(),
        drop_dir: paths.drop_dir()?,
        staged_dir: paths.staged_dir()?,
        published_dir: paths.published_dir()?,
        auto_deploy_dir: paths.auto_deploy_dir()?,
        log_file: paths.log_file()?,
        undeploy_signal: config.deploy.undeploy_signal.clone(),
        deploy_signal: config.deploy.deploy_signal.clone(),
        signal_timeout: config.deploy.timeout(),
        signal_poll_interval: config.deploy.poll_interval(),
        exempt_libraries: config.deploy.exempt_libraries.clone(),
        router,
        sass_command: propagate.sass_command.clone(),
        watch: WatchOptions {
            mode,
            debounce: Duration::from_millis(config.watch.debounce_ms),
            ignore: config.watch.ignore.clone(),
        },
        version,
    })
}
