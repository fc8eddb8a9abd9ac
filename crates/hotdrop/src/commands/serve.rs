//! `hotdrop serve` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use hotdrop_config::{CliSettings, Config};
use hotdrop_server::{ClientEvent, HubStatus, run_server, server_config_from_hotdrop_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Workspace directory holding the projects (overrides config).
    workspace: Option<PathBuf>,

    /// Tomcat directory of the running portal (overrides config).
    server_dir: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover hotdrop.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory watched for new artifacts (default: `hotdrop` next to the server).
    #[arg(long)]
    drop_dir: Option<PathBuf>,

    /// Context of the portal web application (default: ROOT).
    #[arg(long)]
    portal_context: Option<String>,

    /// Poll directories instead of using native notifications.
    #[arg(long)]
    poll: bool,

    /// Directory also receiving copies of styles and scripts.
    #[arg(long)]
    statics_dir: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,
}

impl ServeArgs {
    /// Execute the serve command.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            workspace_dir: self.workspace,
            server_dir: self.server_dir,
            drop_dir: self.drop_dir,
            portal_context: self.portal_context,
            poll: self.poll.then_some(true),
            statics_dir: self.statics_dir,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let server_config = server_config_from_hotdrop_config(&config, version.to_owned())?;

        output.highlight(&format!("hotdrop {version}"));
        output.info(&format!(
            "Live reload on ws://{}:{}/livereload",
            server_config.host, server_config.port
        ));
        output.info(&format!("Workspace: {}", server_config.workspace_dir.display()));
        output.info(&format!("Drop artifacts into: {}", server_config.drop_dir.display()));
        output.info(&format!("Server log: {}", server_config.log_file.display()));
        if config.watch.poll {
            output.info("Watching: polling");
        }
        if !server_config.log_file.is_file() {
            output.warning("Server log not found; deploys will fail until the server is running");
        }

        run_server(server_config, Some(Arc::new(report_status))).await?;
        output.success("Stopped");
        Ok(())
    }
}

/// Print browser connections as they come and go.
fn report_status(status: &HubStatus) {
    let output = Output::new();
    match status.event {
        ClientEvent::Registered => output.success(&format!(
            "Browser connected: {} ({} connected)",
            status.url, status.clients
        )),
        ClientEvent::Unregistered => output.muted(&format!(
            "Browser disconnected: {} ({} connected)",
            status.url, status.clients
        )),
    }
}
