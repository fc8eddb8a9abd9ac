//! Live reload wire protocol.
//!
//! JSON text frames tagged by `command`. A client greets with `hello`,
//! identifies its page with `info`, and from then on receives `reload`.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Protocol revision announced in the server greeting.
pub const PROTOCOL_V7: &str = "http://livereload.com/protocols/official-7";

/// Message received from a browser.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Greeting listing the protocols the client speaks.
    Hello {
        #[serde(default)]
        protocols: Vec<String>,
    },
    /// Page the client is showing; completes the handshake.
    Info {
        #[serde(default)]
        url: Option<String>,
    },
    /// Any other command.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Message sent to browsers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Greeting answering a client `hello`.
    Hello {
        protocols: Vec<String>,
        #[serde(rename = "serverName")]
        server_name: String,
    },
    /// Refresh `path`, or the whole page for `*`.
    Reload {
        path: String,
        #[serde(rename = "liveCSS")]
        live_css: bool,
        #[serde(rename = "liveImg")]
        live_img: bool,
    },
}

impl ServerMessage {
    /// Greeting for a server called `server_name`.
    pub fn hello(server_name: &str) -> Self {
        Self::Hello {
            protocols: vec![PROTOCOL_V7.to_owned()],
            server_name: server_name.to_owned(),
        }
    }

    /// Reload request for `path`.
    pub fn reload(path: &str) -> Self {
        Self::Reload {
            path: path.to_owned(),
            live_css: true,
            live_img: true,
        }
    }

    /// Encode as a text frame.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
