//! CLI error types.

use hotdrop_config::ConfigError;
use hotdrop_deploy::DeployError;
use hotdrop_server::ServerError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Deploy(#[from] DeployError),

    #[error("{0}")]
    Server(#[from] ServerError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
