//! Registry of connected browsers.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use hotdrop_deploy::{ReloadNotifier, ReloadScope};
use tokio::sync::{mpsc, watch};

use super::protocol::ServerMessage;

/// Identifier of one WebSocket connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Membership change reported to the status callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    Registered,
    Unregistered,
}

/// Snapshot passed to the status callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HubStatus {
    pub event: ClientEvent,
    pub id: ClientId,
    /// Page the client reported in its handshake.
    pub url: String,
    /// Registered clients after the change.
    pub clients: usize,
}

/// Observer of client membership.
pub type StatusCallback = Arc<dyn Fn(&HubStatus) + Send + Sync>;

struct Client {
    url: String,
    sender: mpsc::UnboundedSender<String>,
}

/// Tracks connected clients and broadcasts reload requests to them.
///
/// A client joins once its handshake completes and leaves when it
/// disconnects or a send to it fails.
pub struct NotificationHub {
    server_name: String,
    clients: Mutex<HashMap<ClientId, Client>>,
    next_id: AtomicU64,
    on_status: Option<StatusCallback>,
    closing: watch::Sender<bool>,
}

impl NotificationHub {
    #[must_use]
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            on_status: None,
            closing: watch::Sender::new(false),
        }
    }

    /// Invoke `callback` whenever a client registers or leaves.
    #[must_use]
    pub fn with_status_callback(mut self, callback: StatusCallback) -> Self {
        self.on_status = Some(callback);
        self
    }

    /// Greeting sent in reply to a client `hello`.
    pub fn greeting(&self) -> ServerMessage {
        ServerMessage::hello(&self.server_name)
    }

    /// Allocate an id for a new connection.
    pub fn next_client_id(&self) -> ClientId {
        ClientId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Add a client; `sender` carries encoded frames to its connection.
    pub fn register_client(
        &self,
        id: ClientId,
        url: impl Into<String>,
        sender: mpsc::UnboundedSender<String>,
    ) {
        let url = url.into();
        let clients = {
            let mut clients = self.clients.lock().unwrap();
            clients.insert(
                id,
                Client {
                    url: url.clone(),
                    sender,
                },
            );
            clients.len()
        };
        tracing::info!(client = %id, url = %url, clients, "Browser connected");
        self.report(ClientEvent::Registered, id, url, clients);
    }

    /// Remove a client. Returns whether it was registered.
    pub fn unregister_client(&self, id: ClientId) -> bool {
        let (removed, clients) = {
            let mut clients = self.clients.lock().unwrap();
            let removed = clients.remove(&id);
            (removed, clients.len())
        };
        match removed {
            Some(client) => {
                tracing::info!(client = %id, url = %client.url, clients, "Browser disconnected");
                self.report(ClientEvent::Unregistered, id, client.url, clients);
                true
            }
            None => false,
        }
    }

    /// Send a reload request to every client. Returns the number reached.
    ///
    /// Clients whose connection is gone are removed; the rest still
    /// receive the message.
    pub fn broadcast(&self, scope: &ReloadScope) -> usize {
        let frame = match ServerMessage::reload(scope.as_path()).to_json() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode reload message");
                return 0;
            }
        };

        let mut failed = Vec::new();
        let delivered = {
            let clients = self.clients.lock().unwrap();
            let mut delivered = 0;
            for (id, client) in clients.iter() {
                if client.sender.send(frame.clone()).is_ok() {
                    delivered += 1;
                } else {
                    failed.push(*id);
                }
            }
            delivered
        };
        for id in failed {
            self.unregister_client(id);
        }

        tracing::info!(path = %scope, clients = delivered, "Reload broadcast");
        delivered
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.clients.lock().unwrap().len()
    }

    /// Pages of the registered clients, ordered by connection.
    pub fn client_urls(&self) -> Vec<String> {
        let clients = self.clients.lock().unwrap();
        let mut entries: Vec<_> = clients.iter().collect();
        entries.sort_by_key(|(id, _)| **id);
        entries.into_iter().map(|(_, c)| c.url.clone()).collect()
    }

    /// Receiver flipping to `true` when the hub shuts down.
    pub fn closing(&self) -> watch::Receiver<bool> {
        self.closing.subscribe()
    }

    /// Drop every client and tell open connections to close.
    pub fn shutdown(&self) {
        let dropped = {
            let mut clients = self.clients.lock().unwrap();
            let dropped = clients.len();
            clients.clear();
            dropped
        };
        self.closing.send_replace(true);
        tracing::debug!(clients = dropped, "Notification hub shut down");
    }

    fn report(&self, event: ClientEvent, id: ClientId, url: String, clients: usize) {
        if let Some(callback) = &self.on_status {
            callback(&HubStatus {
                event,
                id,
                url,
                clients,
            });
        }
    }
}

impl ReloadNotifier for NotificationHub {
    fn reload(&self, scope: ReloadScope) {
        self.broadcast(&scope);
    }
}
