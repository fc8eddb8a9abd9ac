//! `hotdrop diff` command implementation.

use std::path::PathBuf;

use clap::Args;
use hotdrop_config::Config;
use hotdrop_deploy::{DependencyDiffer, LibraryDiff, LibraryStatus};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the diff command.
#[derive(Args)]
pub(crate) struct DiffArgs {
    /// Artifact (WAR) to compare.
    artifact: PathBuf,

    /// Exploded application directory of the running copy.
    runtime_dir: PathBuf,

    /// Path to configuration file (default: auto-discover hotdrop.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the classification as JSON.
    #[arg(long)]
    json: bool,
}

impl DiffArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;

        let differ = DependencyDiffer::new(config.deploy.exempt_libraries.clone());
        let diff = differ.diff(&self.artifact, &self.runtime_dir)?;

        if self.json {
            output.result(&serde_json::to_string_pretty(&diff)?);
            return Ok(());
        }

        print_diff(&output, &diff);
        Ok(())
    }
}

fn print_diff(output: &Output, diff: &LibraryDiff) {
    for (library, status) in &diff.entries {
        let line = format!("{:<10} {library}", status_label(*status));
        match status {
            LibraryStatus::Outdated | LibraryStatus::Lingering => output.warning(&line),
            LibraryStatus::Missing => output.info(&line),
            LibraryStatus::Unchanged | LibraryStatus::Exempt => output.muted(&line),
        }
    }

    if diff.needs_redeploy {
        output.warning("Redeploy required: running libraries differ");
    } else {
        output.success("No redeploy needed");
    }
}

fn status_label(status: LibraryStatus) -> &'static str {
    match status {
        LibraryStatus::Unchanged => "unchanged",
        LibraryStatus::Outdated => "outdated",
        LibraryStatus::Missing => "missing",
        LibraryStatus::Lingering => "lingering",
        LibraryStatus::Exempt => "exempt",
    }
}
