//! Wiring of watchers to the deploy components.
//!
//! One watcher covers every root. A dispatcher thread sends each
//! debounced event to the component owning its root:
//!
//! ```text
//! drop dir       ──► DeployOrchestrator (new artifacts)
//! staged dir     ──► DeployLocationCache::rescan_staged
//! published dir  ──► DeployLocationCache::rescan_published
//! workspace      ──► ChangeRouter
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hotdrop_deploy::{
    ChangeKind, ChangeRouter, CommandCompiler, DependencyDiffer, DeployLocationCache,
    DeployOrchestrator, DeployTargets, LogSignal, ReloadNotifier, RouteOutcome, WorkspaceIndex,
};
use hotdrop_watch::{FsWatcher, WatchEvent, WatchEventKind, WatchHandle};

use crate::ServerConfig;
use crate::error::ServerError;

/// Directory an event came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EventRoot {
    Drop,
    Staged,
    Published,
    Workspace,
}

/// Watched roots, most specific first.
#[derive(Clone, Debug)]
pub(crate) struct Roots {
    drop_dir: PathBuf,
    staged_dir: PathBuf,
    published_dir: PathBuf,
    workspace_dir: PathBuf,
}

impl Roots {
    /// Root owning `path`. Runtime roots win over an enclosing workspace.
    pub(crate) fn classify(&self, path: &Path) -> Option<EventRoot> {
        [
            (&self.drop_dir, EventRoot::Drop),
            (&self.staged_dir, EventRoot::Staged),
            (&self.published_dir, EventRoot::Published),
            (&self.workspace_dir, EventRoot::Workspace),
        ]
        .into_iter()
        .find(|(root, _)| path.starts_with(root))
        .map(|(_, kind)| kind)
    }

    fn root(&self, kind: EventRoot) -> &Path {
        match kind {
            EventRoot::Drop => &self.drop_dir,
            EventRoot::Staged => &self.staged_dir,
            EventRoot::Published => &self.published_dir,
            EventRoot::Workspace => &self.workspace_dir,
        }
    }

    /// Whether `path` sits directly inside the root `kind`.
    fn is_top_level(&self, kind: EventRoot, path: &Path) -> bool {
        path.parent() == Some(self.root(kind))
    }
}

/// Routes debounced events to the deploy components.
pub(crate) struct Dispatcher {
    roots: Roots,
    locations: Arc<DeployLocationCache>,
    orchestrator: Arc<DeployOrchestrator>,
    router: ChangeRouter,
}

impl Dispatcher {
    pub(crate) fn dispatch(&self, event: &WatchEvent) {
        let Some(root) = self.roots.classify(&event.path) else {
            return;
        };
        tracing::debug!(path = %event.path.display(), kind = ?event.kind, ?root, "Dispatching");

        match root {
            EventRoot::Drop => self.on_drop(event),
            EventRoot::Staged if self.roots.is_top_level(root, &event.path) => {
                self.locations.rescan_staged();
            }
            EventRoot::Published if self.roots.is_top_level(root, &event.path) => {
                self.locations.rescan_published();
            }
            EventRoot::Staged | EventRoot::Published => {}
            EventRoot::Workspace => self.on_workspace_change(event),
        }
    }

    fn on_drop(&self, event: &WatchEvent) {
        if event.kind != WatchEventKind::Created
            || !self.roots.is_top_level(EventRoot::Drop, &event.path)
            || is_hidden(&event.path)
            || !event.path.is_file()
        {
            return;
        }
        if let Err(e) = self.orchestrator.submit(event.path.clone()) {
            tracing::error!(path = %event.path.display(), error = %e, "Failed to start deploy task");
        }
    }

    fn on_workspace_change(&self, event: &WatchEvent) {
        let change = match event.kind {
            WatchEventKind::Created | WatchEventKind::Modified => ChangeKind::Written,
            WatchEventKind::Removed => ChangeKind::Removed,
        };
        match self.router.route(&event.path, change) {
            Ok(RouteOutcome::Propagated {
                name,
                destination,
                scope,
            }) => tracing::info!(
                name = %name,
                destination = %destination.display(),
                scope = %scope,
                "Propagated"
            ),
            Ok(RouteOutcome::ClassCopied { name, destination }) => tracing::info!(
                name = %name,
                destination = %destination.display(),
                "Class copied"
            ),
            Ok(RouteOutcome::NotDeployed { name }) => {
                tracing::debug!(name = %name, path = %event.path.display(), "Application not deployed");
            }
            Ok(RouteOutcome::WorkspaceRescanned) => tracing::info!("Workspace rescanned"),
            Ok(RouteOutcome::Ignored | RouteOutcome::UnknownApplication) => {}
            Err(e) => tracing::error!(path = %event.path.display(), error = %e, "Propagation failed"),
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

/// Running deploy engine. Watching stops when dropped.
pub struct Engine {
    workspace: Arc<WorkspaceIndex>,
    locations: Arc<DeployLocationCache>,
    watch: WatchHandle,
}

impl Engine {
    /// Scan the workspace and server, then start watching.
    pub fn start(config: &ServerConfig, notifier: Arc<dyn ReloadNotifier>) -> Result<Self, ServerError> {
        let start = std::time::Instant::now();
        std::fs::create_dir_all(&config.drop_dir).map_err(|source| ServerError::Io {
            path: config.drop_dir.clone(),
            source,
        })?;

        let workspace = Arc::new(WorkspaceIndex::new(config.workspace_dir.clone()));
        workspace.rescan();
        let locations = Arc::new(DeployLocationCache::new(
            config.staged_dir.clone(),
            config.published_dir.clone(),
        ));
        locations.rescan();

        let dispatcher = Dispatcher {
            roots: Roots {
                drop_dir: config.drop_dir.clone(),
                staged_dir: config.staged_dir.clone(),
                published_dir: config.published_dir.clone(),
                workspace_dir: config.workspace_dir.clone(),
            },
            orchestrator: Arc::new(build_orchestrator(config, &locations, Arc::clone(&notifier))),
            router: ChangeRouter::new(
                Arc::clone(&workspace),
                Arc::clone(&locations),
                notifier,
                Arc::new(CommandCompiler::new(config.sass_command.clone())),
                config.router.clone(),
            ),
            locations: Arc::clone(&locations),
        };

        let roots: Vec<PathBuf> = [
            &config.drop_dir,
            &config.staged_dir,
            &config.published_dir,
            &config.workspace_dir,
        ]
        .into_iter()
        .filter(|dir| {
            let exists = dir.is_dir();
            if !exists {
                tracing::warn!(path = %dir.display(), "Directory does not exist, not watching");
            }
            exists
        })
        .cloned()
        .collect();

        let watcher = FsWatcher::new(config.watch.clone())?;
        let (events, watch) = watcher.watch(&roots)?;

        std::thread::Builder::new()
            .name("dispatch".to_owned())
            .spawn(move || {
                for event in events.iter() {
                    dispatcher.dispatch(&event);
                }
                tracing::debug!("Dispatcher stopped");
            })
            .map_err(ServerError::Spawn)?;

        tracing::info!(
            applications = workspace.applications().len(),
            locations = locations.snapshot().len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Engine started"
        );

        Ok(Self {
            workspace,
            locations,
            watch,
        })
    }

    pub fn workspace(&self) -> Arc<WorkspaceIndex> {
        Arc::clone(&self.workspace)
    }

    pub fn locations(&self) -> Arc<DeployLocationCache> {
        Arc::clone(&self.locations)
    }

    /// Stop watching. In-flight deploy tasks finish on their own threads.
    pub fn stop(self) {
        self.watch.stop();
    }
}

fn build_orchestrator(
    config: &ServerConfig,
    locations: &Arc<DeployLocationCache>,
    notifier: Arc<dyn ReloadNotifier>,
) -> DeployOrchestrator {
    let signal = LogSignal::new(
        config.log_file.clone(),
        config.undeploy_signal.clone(),
        config.deploy_signal.clone(),
        config.signal_timeout,
        config.signal_poll_interval,
    );
    DeployOrchestrator::new(
        Arc::clone(locations),
        DependencyDiffer::new(config.exempt_libraries.clone()),
        Arc::new(signal),
        notifier,
        DeployTargets {
            published_dir: config.published_dir.clone(),
            auto_deploy_dir: config.auto_deploy_dir.clone(),
        },
    )
}
