//! `hotdrop scan` command implementation.

use std::path::PathBuf;

use clap::Args;
use hotdrop_config::{CliSettings, Config};
use hotdrop_deploy::{DeployLocationCache, LocationSource, scan_workspace};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the scan command.
#[derive(Args)]
pub(crate) struct ScanArgs {
    /// Workspace directory holding the projects (overrides config).
    workspace: Option<PathBuf>,

    /// Tomcat directory of the running portal (overrides config).
    server_dir: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover hotdrop.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ScanArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            workspace_dir: self.workspace,
            server_dir: self.server_dir,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let paths = &config.paths_resolved;

        let applications = scan_workspace(&paths.workspace_dir);
        output.highlight(&format!(
            "Applications in {} ({})",
            paths.workspace_dir.display(),
            applications.len()
        ));
        for app in &applications {
            output.result(&format!("{}\t{}", app.name, app.source_root.display()));
        }

        let locations = DeployLocationCache::new(paths.staged_dir()?, paths.published_dir()?);
        locations.rescan();
        let snapshot = locations.snapshot();
        output.highlight(&format!("Deploy locations ({})", snapshot.len()));
        for (name, location) in &snapshot {
            let source = match location.source {
                LocationSource::Staged => "staged",
                LocationSource::Published => "published",
            };
            output.result(&format!("{name}\t{source}\t{}", location.path.display()));
        }

        let undeployed = applications
            .iter()
            .filter(|app| !snapshot.contains_key(&app.name))
            .count();
        if undeployed > 0 {
            output.muted(&format!("{undeployed} application(s) not deployed"));
        }
        Ok(())
    }
}
