//! Conditional redeploy of dropped artifacts.
//!
//! Each artifact becomes a [`DeployTask`] running on its own thread:
//!
//! ```text
//! Arrived -> DiffChecked -> [Undeploying -> Undeployed ->] Publishing -> Published -> Notified
//! ```
//!
//! The undeploy branch is taken only when the running copy's libraries
//! differ from the artifact's. Either wait may end in `TimedOut`; I/O
//! failures end in `Failed`. Nothing is retried or rolled back.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use regex::Regex;

use crate::artifact::Artifact;
use crate::diff::{DependencyDiffer, LibraryDiff};
use crate::error::DeployError;
use crate::locations::{DeployLocationCache, RuntimeLocation};
use crate::reload::{ReloadNotifier, ReloadScope};
use crate::signal::{Awaited, DeploySignal, SignalKind};

static VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d+(\.\d+)+(-SNAPSHOT)?$").unwrap());

/// Logical application name of an artifact file.
///
/// The extension and a trailing `-<version>` are removed:
/// `orders-portlet-1.2.0-SNAPSHOT.war` becomes `orders-portlet`.
pub fn logical_name(artifact: &Path) -> String {
    let stem = artifact
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    VERSION_SUFFIX.replace(&stem, "").into_owned()
}

/// Deploy state machine states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeployState {
    Arrived,
    DiffChecked,
    Undeploying,
    Undeployed,
    Publishing,
    Published,
    Notified,
    TimedOut,
    Failed,
}

impl DeployState {
    /// Whether no further transitions follow.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Notified | Self::TimedOut | Self::Failed)
    }
}

/// A single artifact deploy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployTask {
    /// Dropped artifact.
    pub artifact_path: PathBuf,
    /// Name derived from the artifact file name.
    pub logical_name: String,
    /// Running copy at task start.
    pub current_location: Option<RuntimeLocation>,
}

/// What happened to a task.
#[derive(Debug)]
pub struct DeployOutcome {
    /// The task.
    pub task: DeployTask,
    /// Every state passed through, in order.
    pub transitions: Vec<DeployState>,
    /// Library comparison, when a running copy existed.
    pub diff: Option<LibraryDiff>,
    /// Cause of a `TimedOut` or `Failed` end.
    pub error: Option<DeployError>,
}

impl DeployOutcome {
    /// Last state reached.
    pub fn final_state(&self) -> DeployState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(DeployState::Arrived)
    }
}

/// Directories the orchestrator writes to.
#[derive(Clone, Debug)]
pub struct DeployTargets {
    /// Published applications; undeploy removes `<published_dir>/<name>`.
    pub published_dir: PathBuf,
    /// Server auto-deploy directory receiving artifacts.
    pub auto_deploy_dir: PathBuf,
}

/// Runs deploy tasks.
///
/// Tasks for the same logical name run one after another; different
/// names run concurrently.
pub struct DeployOrchestrator {
    locations: Arc<DeployLocationCache>,
    differ: DependencyDiffer,
    signal: Arc<dyn DeploySignal>,
    notifier: Arc<dyn ReloadNotifier>,
    targets: DeployTargets,
    name_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DeployOrchestrator {
    pub fn new(
        locations: Arc<DeployLocationCache>,
        differ: DependencyDiffer,
        signal: Arc<dyn DeploySignal>,
        notifier: Arc<dyn ReloadNotifier>,
        targets: DeployTargets,
    ) -> Self {
        Self {
            locations,
            differ,
            signal,
            notifier,
            targets,
            name_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Run a task for `artifact` on a new `deploy-<name>` thread.
    pub fn submit(self: &Arc<Self>, artifact: PathBuf) -> std::io::Result<JoinHandle<DeployOutcome>> {
        let name = logical_name(&artifact);
        let orchestrator = Arc::clone(self);
        std::thread::Builder::new()
            .name(format!("deploy-{name}"))
            .spawn(move || orchestrator.run(&artifact))
    }

    /// Run a task for `artifact` on the calling thread.
    pub fn run(&self, artifact: &Path) -> DeployOutcome {
        let start = Instant::now();
        let name = logical_name(artifact);
        tracing::info!(artifact = %artifact.display(), name = %name, "Artifact arrived");

        let lock = self.name_lock(&name);
        let _guard = lock.lock().unwrap();

        let mut run = TaskRun {
            outcome: DeployOutcome {
                task: DeployTask {
                    artifact_path: artifact.to_path_buf(),
                    logical_name: name,
                    current_location: None,
                },
                transitions: vec![DeployState::Arrived],
                diff: None,
                error: None,
            },
        };
        log_descriptor(artifact);

        if let Err(e) = self.drive(&mut run) {
            let state = if matches!(e, DeployError::Timeout { .. }) {
                DeployState::TimedOut
            } else {
                DeployState::Failed
            };
            tracing::error!(
                name = %run.outcome.task.logical_name,
                error = %e,
                ?state,
                "Deployment failed"
            );
            run.enter(state);
            run.outcome.error = Some(e);
        } else {
            tracing::info!(
                name = %run.outcome.task.logical_name,
                elapsed_ms = start.elapsed().as_millis(),
                "Deployment finished"
            );
        }
        run.outcome
    }

    fn drive(&self, run: &mut TaskRun) -> Result<(), DeployError> {
        let name = run.outcome.task.logical_name.clone();
        let artifact = run.outcome.task.artifact_path.clone();

        let location = self.locations.locate(&name);
        let needs_redeploy = match &location {
            Some(location) => {
                let diff = self.differ.diff(&artifact, &location.path)?;
                let needs = diff.needs_redeploy;
                run.outcome.diff = Some(diff);
                needs
            }
            None => false,
        };
        run.outcome.task.current_location = location;
        run.enter(DeployState::DiffChecked);

        if needs_redeploy {
            run.enter(DeployState::Undeploying);
            tracing::info!(name = %name, "Undeploying");
            let published = self.targets.published_dir.join(&name);
            let awaited = self
                .signal
                .await_after(&name, SignalKind::Unregistered, &mut || remove_published(&published))?;
            if awaited == Awaited::Skipped {
                tracing::debug!(name = %name, "Nothing published; treated as undeployed");
            }
            run.enter(DeployState::Undeployed);
        }

        run.enter(DeployState::Publishing);
        tracing::info!(name = %name, "Deploying");
        let auto_deploy_dir = &self.targets.auto_deploy_dir;
        self.signal
            .await_after(&name, SignalKind::Available, &mut || {
                move_into(&artifact, auto_deploy_dir).map(|()| true)
            })?;
        run.enter(DeployState::Published);

        self.notifier.reload(ReloadScope::All);
        run.enter(DeployState::Notified);
        Ok(())
    }

    fn name_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.name_locks.lock().unwrap();
        Arc::clone(locks.entry(name.to_owned()).or_default())
    }
}

struct TaskRun {
    outcome: DeployOutcome,
}

impl TaskRun {
    fn enter(&mut self, state: DeployState) {
        tracing::debug!(name = %self.outcome.task.logical_name, ?state, "Deploy state");
        self.outcome.transitions.push(state);
    }
}

fn log_descriptor(artifact: &Path) {
    match Artifact::open(artifact).and_then(|mut a| a.descriptor()) {
        Ok(descriptor) => tracing::info!(
            portlets = ?descriptor.portlet_names,
            plugin = descriptor.plugin_name.as_deref().unwrap_or("-"),
            "Artifact descriptor"
        ),
        Err(e) => tracing::warn!(error = %e, "Artifact descriptor unreadable"),
    }
}

/// Remove a published application. `false` if it was not there.
fn remove_published(path: &Path) -> Result<bool, DeployError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DeployError::io(path, e)),
    }
}

/// Move `artifact` into `dir`, copying across filesystems.
fn move_into(artifact: &Path, dir: &Path) -> Result<(), DeployError> {
    fs::create_dir_all(dir).map_err(|e| DeployError::io(dir, e))?;
    let file_name = artifact
        .file_name()
        .ok_or_else(|| DeployError::io(artifact, ErrorKind::InvalidInput.into()))?;
    let target = dir.join(file_name);

    match fs::rename(artifact, &target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            fs::copy(artifact, &target).map_err(|e| DeployError::io(&target, e))?;
            fs::remove_file(artifact).map_err(|e| DeployError::io(artifact, e))
        }
        Err(e) => Err(DeployError::io(artifact, e)),
    }
}
