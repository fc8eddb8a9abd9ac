//! Configuration management for hotdrop.
//!
//! Parses `hotdrop.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Server Directory Layout
//!
//! Most runtime paths are derived from `paths.server_dir` (the servlet
//! container root) unless set explicitly:
//!
//! - staged runtime directory: `<server_dir>/temp`
//! - published runtime directory: `<server_dir>/webapps`
//! - server log: `<server_dir>/logs/catalina.out`
//! - auto-deploy directory: `<server_dir>/../deploy`
//! - artifact drop directory: `<server_dir>/../hotdrop`
//!
//! ## Environment Variable Expansion
//!
//! Every string under `[paths]` and `server.host` support `${VAR}` and
//! `${VAR:-default}` references.

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override workspace directory.
    pub workspace_dir: Option<PathBuf>,
    /// Override servlet container directory.
    pub server_dir: Option<PathBuf>,
    /// Override artifact drop directory.
    pub drop_dir: Option<PathBuf>,
    /// Override the portal context name.
    pub portal_context: Option<String>,
    /// Override polling mode.
    pub poll: Option<bool>,
    /// Override exported statics directory.
    pub statics_dir: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "hotdrop.toml";

/// Placeholder replaced by the logical application name in deploy signals.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Notification server configuration.
    pub server: ServerConfig,
    /// Filesystem locations (relative strings from TOML).
    paths: PathsConfigRaw,
    /// Portal configuration.
    pub portal: PortalConfig,
    /// Deploy orchestration configuration.
    pub deploy: DeployConfig,
    /// Filesystem watching configuration.
    pub watch: WatchConfig,
    /// Source change propagation configuration.
    pub propagate: PropagateConfig,

    /// Resolved paths (set after loading).
    #[serde(skip)]
    pub paths_resolved: PathsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Notification server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 35729,
        }
    }
}

/// Raw path configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PathsConfigRaw {
    workspace_dir: Option<String>,
    server_dir: Option<String>,
    drop_dir: Option<String>,
    auto_deploy_dir: Option<String>,
    log_file: Option<String>,
    statics_dir: Option<String>,
}

/// Resolved filesystem locations with absolute paths.
#[derive(Debug, Default, Clone)]
pub struct PathsConfig {
    /// Root of the developer workspace containing project descriptors.
    pub workspace_dir: PathBuf,
    /// Servlet container root (`None` until configured).
    pub server_dir: Option<PathBuf>,
    /// Explicit artifact drop directory.
    pub drop_dir: Option<PathBuf>,
    /// Explicit auto-deploy directory.
    pub auto_deploy_dir: Option<PathBuf>,
    /// Explicit server log file.
    pub log_file: Option<PathBuf>,
    /// Secondary directory receiving copies of compiled assets and scripts.
    pub statics_dir: Option<PathBuf>,
}

impl PathsConfig {
    /// Servlet container root.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if no server directory is configured.
    pub fn server_dir(&self) -> Result<&Path, ConfigError> {
        self.server_dir.as_deref().ok_or_else(|| {
            ConfigError::Validation(
                "paths.server_dir is required (set it in hotdrop.toml or pass it on the command line)"
                    .to_owned(),
            )
        })
    }

    /// Directory holding per-deploy extracted copies (`<server_dir>/temp`).
    pub fn staged_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.server_dir()?.join("temp"))
    }

    /// Directory holding published applications (`<server_dir>/webapps`).
    pub fn published_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.server_dir()?.join("webapps"))
    }

    /// Published directory of the portal itself.
    pub fn portal_dir(&self, context: &str) -> Result<PathBuf, ConfigError> {
        Ok(self.published_dir()?.join(context))
    }

    /// Server log file, defaulting to `<server_dir>/logs/catalina.out`.
    pub fn log_file(&self) -> Result<PathBuf, ConfigError> {
        match &self.log_file {
            Some(path) => Ok(path.clone()),
            None => Ok(self.server_dir()?.join("logs").join("catalina.out")),
        }
    }

    /// Auto-deploy directory, defaulting to a `deploy` sibling of the server directory.
    pub fn auto_deploy_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.auto_deploy_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(sibling_of(self.server_dir()?, "deploy")),
        }
    }

    /// Artifact drop directory, defaulting to a `hotdrop` sibling of the server directory.
    pub fn drop_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.drop_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(sibling_of(self.server_dir()?, "hotdrop")),
        }
    }
}

/// Path of `name` next to `dir`.
fn sibling_of(dir: &Path, name: &str) -> PathBuf {
    match dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => dir.join("..").join(name),
    }
}

/// Portal configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Context (published directory name) of the portal web application.
    pub context: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            context: "ROOT".to_owned(),
        }
    }
}

/// Deploy orchestration configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Maximum time to wait for each server log signal.
    pub timeout_secs: u64,
    /// Delay between reads of the server log.
    pub poll_interval_ms: u64,
    /// Log pattern announcing that an application was unregistered.
    /// `{name}` is replaced by the escaped logical name.
    pub undeploy_signal: String,
    /// Log pattern announcing that an application is available.
    pub deploy_signal: String,
    /// Libraries always provided by the portal, never diffed.
    pub exempt_libraries: Vec<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            poll_interval_ms: 250,
            undeploy_signal: r"for {name} \w+ unregistered".to_owned(),
            deploy_signal: r"for {name} \w+ available for use".to_owned(),
            exempt_libraries: vec![
                "util-taglib.jar".to_owned(),
                "util-java.jar".to_owned(),
                "util-bridges.jar".to_owned(),
            ],
        }
    }
}

impl DeployConfig {
    /// Wait budget for a single log signal.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay between log reads.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Filesystem watching configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Poll directories instead of relying on native notifications
    /// (network shares, shared folders of virtual machines).
    pub poll: bool,
    /// Interval between directory re-listings in polling mode.
    pub poll_interval_ms: u64,
    /// Quiet period before a burst of events on one path is delivered.
    pub debounce_ms: u64,
    /// Glob patterns for paths that never produce events.
    pub ignore: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll: false,
            poll_interval_ms: 1000,
            debounce_ms: 100,
            ignore: vec![
                "**/.svn/**".to_owned(),
                "**/.git/**".to_owned(),
                "**/.settings/**".to_owned(),
                "**/.metadata/**".to_owned(),
            ],
        }
    }
}

/// Source change propagation configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PropagateConfig {
    /// Extensions (without dot) copied from `src/main/webapp` into the runtime.
    pub extensions: Vec<String>,
    /// Extensions run through the style compiler before copying.
    pub compiled_extensions: Vec<String>,
    /// Extensions that browsers can hot-swap (scoped reload).
    pub style_extensions: Vec<String>,
    /// Extensions that require a full page reload and are mirrored to statics.
    pub script_extensions: Vec<String>,
    /// Delay coalescing class file bursts into one reload.
    pub class_reload_delay_ms: u64,
    /// Style compiler executable.
    pub sass_command: String,
    /// Suffix of the one-time backup made before overriding a portal file.
    pub backup_suffix: String,
}

impl Default for PropagateConfig {
    fn default() -> Self {
        Self {
            extensions: ["jsp", "jspf", "js", "css", "scss", "tag", "vm"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            compiled_extensions: vec!["scss".to_owned()],
            style_extensions: vec!["css".to_owned()],
            script_extensions: vec!["js".to_owned()],
            class_reload_delay_ms: 1200,
            sass_command: "sass".to_owned(),
            backup_suffix: ".hotdrop".to_owned(),
        }
    }
}

impl PropagateConfig {
    /// Debounce delay for class file reloads.
    #[must_use]
    pub fn class_reload_delay(&self) -> Duration {
        Duration::from_millis(self.class_reload_delay_ms)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`paths.server_dir`").
        field: String,
        /// Error message (e.g., "${`TOMCAT_HOME`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a signal template to reference the application name.
fn require_placeholder(value: &str, field: &str) -> Result<(), ConfigError> {
    if !value.contains(NAME_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "{field} must contain {NAME_PLACEHOLDER}"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `hotdrop.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(workspace_dir) = &settings.workspace_dir {
            self.paths_resolved.workspace_dir.clone_from(workspace_dir);
        }
        if let Some(server_dir) = &settings.server_dir {
            self.paths_resolved.server_dir = Some(server_dir.clone());
        }
        if let Some(drop_dir) = &settings.drop_dir {
            self.paths_resolved.drop_dir = Some(drop_dir.clone());
        }
        if let Some(context) = &settings.portal_context {
            self.portal.context.clone_from(context);
        }
        if let Some(poll) = settings.poll {
            self.watch.poll = poll;
        }
        if let Some(statics_dir) = &settings.statics_dir {
            self.paths_resolved.statics_dir = Some(statics_dir.clone());
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            paths: PathsConfigRaw::default(),
            portal: PortalConfig::default(),
            deploy: DeployConfig::default(),
            watch: WatchConfig::default(),
            propagate: PropagateConfig::default(),
            paths_resolved: PathsConfig {
                workspace_dir: base.to_path_buf(),
                ..PathsConfig::default()
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_deploy()?;
        self.validate_propagate()?;
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }
        require_non_empty(&self.portal.context, "portal.context")?;
        Ok(())
    }

    /// Validate deploy configuration.
    fn validate_deploy(&self) -> Result<(), ConfigError> {
        if self.deploy.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "deploy.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        if self.deploy.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "deploy.poll_interval_ms must be greater than 0".to_owned(),
            ));
        }
        require_placeholder(&self.deploy.undeploy_signal, "deploy.undeploy_signal")?;
        require_placeholder(&self.deploy.deploy_signal, "deploy.deploy_signal")?;
        Ok(())
    }

    /// Validate propagation configuration.
    fn validate_propagate(&self) -> Result<(), ConfigError> {
        if self.propagate.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "propagate.extensions cannot be empty".to_owned(),
            ));
        }
        if let Some(ext) = self.propagate.extensions.iter().find(|e| e.starts_with('.')) {
            return Err(ConfigError::Validation(format!(
                "propagate.extensions entries must not start with a dot: {ext}"
            )));
        }
        require_non_empty(&self.propagate.backup_suffix, "propagate.backup_suffix")?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        let paths = &mut self.paths;
        expand::expand_opt(&mut paths.workspace_dir, "paths.workspace_dir")?;
        expand::expand_opt(&mut paths.server_dir, "paths.server_dir")?;
        expand::expand_opt(&mut paths.drop_dir, "paths.drop_dir")?;
        expand::expand_opt(&mut paths.auto_deploy_dir, "paths.auto_deploy_dir")?;
        expand::expand_opt(&mut paths.log_file, "paths.log_file")?;
        expand::expand_opt(&mut paths.statics_dir, "paths.statics_dir")?;

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&String>| path.map(|p| config_dir.join(p));

        self.paths_resolved = PathsConfig {
            workspace_dir: resolve(self.paths.workspace_dir.as_ref())
                .unwrap_or_else(|| config_dir.to_path_buf()),
            server_dir: resolve(self.paths.server_dir.as_ref()),
            drop_dir: resolve(self.paths.drop_dir.as_ref()),
            auto_deploy_dir: resolve(self.paths.auto_deploy_dir.as_ref()),
            log_file: resolve(self.paths.log_file.as_ref()),
            statics_dir: resolve(self.paths.statics_dir.as_ref()),
        };
    }
}
