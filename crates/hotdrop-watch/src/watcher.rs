//! Recursive filesystem watcher over several roots.

use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use glob::Pattern;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecursiveMode, Watcher};

use crate::debouncer::EventDebouncer;
use crate::event::{EventReceiver, WatchEventKind, WatchHandle};

/// How often the drain thread checks for ready events and shutdown.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Error starting a watch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// An ignore pattern is not a valid glob.
    #[error("Invalid ignore pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    /// The notification backend could not be created.
    #[error("Failed to create file watcher: {0}")]
    Backend(#[source] notify::Error),
    /// A root could not be subscribed.
    #[error("Failed to watch {}: {source}", path.display())]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Change detection strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchMode {
    /// Operating system notifications.
    Native,
    /// Periodic re-listing, for filesystems that do not deliver
    /// notifications (network mounts, shared folders of virtual machines).
    Polling(Duration),
}

/// Watcher settings.
#[derive(Clone, Debug)]
pub struct WatchOptions {
    /// Change detection strategy.
    pub mode: WatchMode,
    /// Quiet period before a path's events are delivered.
    pub debounce: Duration,
    /// Glob patterns, matched against paths relative to their root.
    pub ignore: Vec<String>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            mode: WatchMode::Native,
            debounce: Duration::from_millis(100),
            ignore: Vec::new(),
        }
    }
}

/// Recursive watcher feeding one debounced event channel.
///
/// # Example
///
/// ```ignore
/// let watcher = FsWatcher::new(WatchOptions::default())?;
/// let (events, _handle) = watcher.watch(&[drop_dir, workspace_dir])?;
/// for event in events.iter() {
///     println!("{:?} {}", event.kind, event.path.display());
/// }
/// ```
pub struct FsWatcher {
    options: WatchOptions,
    ignore: Arc<Vec<Pattern>>,
}

impl FsWatcher {
    /// Create a watcher, compiling the ignore patterns.
    pub fn new(options: WatchOptions) -> Result<Self, WatchError> {
        let ignore = options
            .ignore
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|source| WatchError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            options,
            ignore: Arc::new(ignore),
        })
    }

    /// Whether `path` (under one of `roots`) matches an ignore pattern.
    pub fn is_ignored(&self, roots: &[PathBuf], path: &Path) -> bool {
        is_ignored(&self.ignore, roots, path)
    }

    /// Subscribe to every root recursively.
    ///
    /// Events arrive on the returned receiver until the handle is dropped.
    pub fn watch(&self, roots: &[PathBuf]) -> Result<(EventReceiver, WatchHandle), WatchError> {
        let (event_tx, event_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let debouncer = Arc::new(EventDebouncer::new(self.options.debounce));
        let handler = {
            let debouncer = Arc::clone(&debouncer);
            let ignore = Arc::clone(&self.ignore);
            let roots = roots.to_vec();
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for (path, kind) in classify(&event) {
                        if !is_ignored(&ignore, &roots, &path) {
                            debouncer.record(path, kind);
                        }
                    }
                }
                Err(e) => tracing::warn!(error = %e, "File watcher error"),
            }
        };

        let mut watcher: Box<dyn Watcher + Send> = match self.options.mode {
            WatchMode::Native => {
                Box::new(notify::recommended_watcher(handler).map_err(WatchError::Backend)?)
            }
            WatchMode::Polling(interval) => Box::new(
                notify::PollWatcher::new(
                    handler,
                    notify::Config::default().with_poll_interval(interval),
                )
                .map_err(WatchError::Backend)?,
            ),
        };

        for root in roots {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(|source| WatchError::Subscribe {
                    path: root.clone(),
                    source,
                })?;
            tracing::debug!(path = %root.display(), mode = ?self.options.mode, "Watching");
        }

        std::thread::Builder::new()
            .name("watch-drain".to_owned())
            .spawn(move || {
                let _watcher = watcher;
                loop {
                    match shutdown_rx.recv_timeout(DRAIN_INTERVAL) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                    }
                    for event in debouncer.drain_ready() {
                        if event_tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                tracing::debug!("Watch stopped");
            })
            .map_err(|e| WatchError::Backend(notify::Error::io(e)))?;

        Ok((EventReceiver::new(event_rx), WatchHandle::new(shutdown_tx)))
    }
}

/// Map a raw notification to per-path event kinds.
fn classify(event: &notify::Event) -> Vec<(PathBuf, WatchEventKind)> {
    let kind = match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            WatchEventKind::Created
        }
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            WatchEventKind::Removed
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // paths = [from, to]
            return event
                .paths
                .iter()
                .enumerate()
                .map(|(i, path)| {
                    let kind = if i == 0 {
                        WatchEventKind::Removed
                    } else {
                        WatchEventKind::Created
                    };
                    (path.clone(), kind)
                })
                .collect();
        }
        EventKind::Modify(_) => WatchEventKind::Modified,
        _ => return Vec::new(),
    };
    event.paths.iter().map(|path| (path.clone(), kind)).collect()
}

fn is_ignored(patterns: &[Pattern], roots: &[PathBuf], path: &Path) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let relative = roots
        .iter()
        .find_map(|root| path.strip_prefix(root).ok())
        .unwrap_or(path);
    patterns.iter().any(|pattern| pattern.matches_path(relative))
}
