//! Watch event types.
//!
//! Events are delivered through [`EventReceiver`]; the watch stays alive
//! for as long as its [`WatchHandle`] does.

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

/// Kind of filesystem change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    /// File or directory appeared (including being moved in).
    Created,
    /// Content or metadata changed.
    Modified,
    /// File or directory disappeared (including being moved out).
    Removed,
}

impl WatchEventKind {
    /// Net effect of `self` followed by `next` on the same path.
    ///
    /// `None` when the two cancel out: the path appeared and vanished
    /// before anyone looked.
    pub(crate) fn then(self, next: Self) -> Option<Self> {
        use WatchEventKind::{Created, Modified, Removed};

        match (self, next) {
            (Created, Removed) => None,
            (Created, _) | (Modified, Created) => Some(Created),
            // Removed then created is a replace in place, as by an atomic save
            (Removed, Created) | (Modified, Modified) => Some(Modified),
            (Removed, _) | (_, Removed) => Some(Removed),
        }
    }
}

/// A debounced filesystem change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchEvent {
    /// Absolute path of the changed entry.
    pub path: PathBuf,
    /// Kind of change.
    pub kind: WatchEventKind,
}

impl WatchEvent {
    /// Create an event.
    pub fn new(path: impl Into<PathBuf>, kind: WatchEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Receiver for watch events.
///
/// Wraps a [`std::sync::mpsc::Receiver`] for synchronous event delivery.
pub struct EventReceiver {
    rx: mpsc::Receiver<WatchEvent>,
}

impl EventReceiver {
    pub(crate) fn new(rx: mpsc::Receiver<WatchEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next event (blocking).
    ///
    /// Returns `None` once the watch has stopped.
    #[must_use]
    pub fn recv(&self) -> Option<WatchEvent> {
        self.rx.recv().ok()
    }

    /// Wait for the next event for at most `timeout`.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<WatchEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Try to receive an event without blocking.
    #[must_use]
    pub fn try_recv(&self) -> Option<WatchEvent> {
        self.rx.try_recv().ok()
    }

    /// Blocking iterator over events, ending when the watch stops.
    pub fn iter(&self) -> impl Iterator<Item = WatchEvent> + '_ {
        self.rx.iter()
    }
}

/// Handle to stop watching for changes.
///
/// Dropping the handle stops the watch: the drain thread notices the
/// closed shutdown channel, exits, and releases the underlying watcher.
pub struct WatchHandle {
    _shutdown: Option<mpsc::Sender<()>>,
}

impl WatchHandle {
    pub(crate) fn new(shutdown: mpsc::Sender<()>) -> Self {
        Self {
            _shutdown: Some(shutdown),
        }
    }

    /// Stop watching immediately (consumes the handle).
    pub fn stop(mut self) {
        self._shutdown.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_then_keeps_net_effect() {
        use WatchEventKind::{Created, Modified, Removed};

        // Anything after a creation is still a creation, unless it is undone
        assert_eq!(Created.then(Created), Some(Created));
        assert_eq!(Created.then(Modified), Some(Created));
        assert_eq!(Created.then(Removed), None);

        assert_eq!(Modified.then(Created), Some(Created));
        assert_eq!(Modified.then(Modified), Some(Modified));
        assert_eq!(Modified.then(Removed), Some(Removed));

        assert_eq!(Removed.then(Created), Some(Modified));
        assert_eq!(Removed.then(Modified), Some(Removed));
        assert_eq!(Removed.then(Removed), Some(Removed));
    }

    #[test]
    fn test_longer_sequences_fold_left() {
        use WatchEventKind::{Created, Modified, Removed};

        let fold = |kinds: &[WatchEventKind]| {
            kinds[1..]
                .iter()
                .try_fold(kinds[0], |net, &next| net.then(next))
        };

        // Temporary file written then renamed away
        assert_eq!(fold(&[Created, Modified, Modified, Removed]), None);
        // Delete, recreate, then keep writing
        assert_eq!(fold(&[Removed, Created, Modified]), Some(Modified));
    }

    #[test]
    fn test_receiver_delivers_in_order() {
        let (tx, rx) = mpsc::channel();
        let receiver = EventReceiver::new(rx);

        let events = vec![
            WatchEvent::new("/drop/orders-1.2.0.war", WatchEventKind::Created),
            WatchEvent::new("/server/webapps/orders", WatchEventKind::Removed),
        ];
        for event in &events {
            tx.send(event.clone()).unwrap();
        }
        drop(tx);

        let received: Vec<_> = receiver.iter().collect();
        assert_eq!(received, events);
    }

    #[test]
    fn test_receiver_recv_on_closed_channel() {
        let (tx, rx) = mpsc::channel();
        let receiver = EventReceiver::new(rx);
        drop(tx);

        assert!(receiver.recv().is_none());
        assert!(receiver.recv_timeout(Duration::from_millis(1)).is_none());
    }

    #[test]
    fn test_receiver_try_recv_empty() {
        let (_tx, rx) = mpsc::channel();
        let receiver = EventReceiver::new(rx);
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_watch_handle_stop_closes_channel() {
        let (tx, rx) = mpsc::channel();
        let handle = WatchHandle::new(tx);

        handle.stop();

        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_watch_handle_drop_closes_channel() {
        let (tx, rx) = mpsc::channel();
        let handle = WatchHandle::new(tx);

        drop(handle);

        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_handle_and_receiver_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WatchHandle>();
        assert_send::<EventReceiver>();
    }
}
