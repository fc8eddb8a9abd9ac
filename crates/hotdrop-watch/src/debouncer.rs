//! Event debouncing.
//!
//! Editors and build tools emit several events per save; the debouncer
//! folds them into one event per path, delivered once the path has been
//! quiet for the debounce period.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::event::{WatchEvent, WatchEventKind};

/// Net change for one path and when it was last touched.
struct Pending {
    kind: WatchEventKind,
    touched: Instant,
}

/// Thread-safe per-path event coalescer.
///
/// Keyed by path in sorted order, so a drain yields parents before
/// children and a directory's creation precedes events inside it.
pub(crate) struct EventDebouncer {
    pending: Mutex<BTreeMap<PathBuf, Pending>>,
    quiet_period: Duration,
}

impl EventDebouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            pending: Mutex::new(BTreeMap::new()),
            quiet_period,
        }
    }

    /// Fold a raw event into the path's net change and restart its quiet period.
    ///
    /// Called from watcher callbacks.
    pub fn record(&self, path: PathBuf, kind: WatchEventKind) {
        let touched = Instant::now();
        let mut pending = self.pending.lock().unwrap();

        let net = match pending.remove(&path) {
            Some(earlier) => earlier.kind.then(kind),
            None => Some(kind),
        };
        if let Some(kind) = net {
            pending.insert(path, Pending { kind, touched });
        }
    }

    /// Take every path that has been quiet for the whole period.
    pub fn drain_ready(&self) -> Vec<WatchEvent> {
        let now = Instant::now();
        let mut pending = self.pending.lock().unwrap();

        let mut ready = Vec::new();
        pending.retain(|path, entry| {
            if now.saturating_duration_since(entry.touched) < self.quiet_period {
                return true;
            }
            ready.push(WatchEvent::new(path.clone(), entry.kind));
            false
        });
        ready
    }

    /// Number of paths still waiting for their quiet period.
    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}
