//! Filesystem event source for hotdrop.
//!
//! Watches several directory trees recursively and delivers debounced
//! `(path, kind)` events on a single channel. Two detection modes are
//! supported with identical event semantics:
//!
//! - [`WatchMode::Native`]: operating system notifications via `notify`
//! - [`WatchMode::Polling`]: periodic re-listing, for network and shared
//!   filesystems
//!
//! Watching stops when the returned [`WatchHandle`] is dropped.

mod debouncer;
mod event;
mod watcher;

pub use event::{EventReceiver, WatchEvent, WatchEventKind, WatchHandle};
pub use watcher::{FsWatcher, WatchError, WatchMode, WatchOptions};
