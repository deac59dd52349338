use std::path::Path;
use std::time::Duration;

use actionhub_action::RegistryConfig;
use actionhub_executor::{ProcessQueueConfig, WorkerCommand};
use semver::Version;
use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration for the action hub, loaded from a TOML file.
///
/// Secrets never live here; they are read from the environment.
#[derive(Debug, Default, Deserialize)]
pub struct HubConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Process-isolated execution queue.
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Which actions are exposed.
    #[serde(default)]
    pub registry: RegistryFileConfig,
    /// Envelope encryption settings.
    #[serde(default)]
    pub crypto: CryptoConfig,
}

/// HTTP server bind configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL the BI product uses to reach this hub. Action URLs in
    /// listings are built from it.
    ///
    /// If not set, defaults to `http://{host}:{port}`.
    pub base_url: Option<String>,
    /// Name shown for this hub in listings.
    #[serde(default = "default_label")]
    pub label: String,
    /// Log at `debug` unless `RUST_LOG` says otherwise.
    #[serde(default)]
    pub debug: bool,
    /// Register the built-in debug actions.
    #[serde(default)]
    pub debug_endpoint: bool,
    /// Largest accepted request body.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
            label: default_label(),
            debug: false,
            debug_endpoint: false,
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl ServerConfig {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.host, self.port))
    }
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
    8080
}

fn default_label() -> String {
    "Action Hub".to_owned()
}

fn default_body_limit() -> usize {
    250 * 1024 * 1024
}

/// Configuration for the process-isolated execution queue.
#[derive(Debug, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum number of worker processes alive at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Run flagged actions in their own process. When false they run in the
    /// hub process like any other action.
    #[serde(default = "default_true")]
    pub enable_forking: bool,
    /// Kill a worker still running after this many seconds.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_seconds: u64,
    /// Worker executable. Defaults to this binary.
    pub worker_program: Option<String>,
    /// Arguments for `worker_program`.
    pub worker_args: Option<Vec<String>>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            enable_forking: true,
            job_timeout_seconds: default_job_timeout(),
            worker_program: None,
            worker_args: None,
        }
    }
}

fn default_max_concurrent() -> usize {
    ProcessQueueConfig::DEFAULT_MAX_CONCURRENT
}

fn default_job_timeout() -> u64 {
    ProcessQueueConfig::DEFAULT_JOB_TIMEOUT.as_secs()
}

fn default_true() -> bool {
    true
}

/// Registry filtering.
#[derive(Debug, Default, Deserialize)]
pub struct RegistryFileConfig {
    /// Only these action names are exposed.
    pub allow_list: Option<Vec<String>>,
    /// Callers older than this version see no actions.
    pub minimum_caller_version: Option<String>,
}

/// Envelope encryption settings. The keys themselves come from the
/// environment.
#[derive(Debug, Deserialize)]
pub struct CryptoConfig {
    /// Identifier recorded alongside ciphertext made with the active key.
    #[serde(default = "default_cipher_id")]
    pub cipher_id: String,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            cipher_id: default_cipher_id(),
        }
    }
}

fn default_cipher_id() -> String {
    "1".to_owned()
}

impl HubConfig {
    /// Load configuration from `path`, or use defaults if the file does not
    /// exist.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| ServerError::Config(format!("invalid {}: {e}", path.display())))
    }

    /// Apply the non-secret environment overrides, looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ServerError> {
        if let Some(url) = var("ACTION_HUB_BASE_URL") {
            self.server.base_url = Some(url);
        }
        if let Some(label) = var("ACTION_HUB_LABEL") {
            self.server.label = label;
        }
        if let Some(port) = var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ServerError::Config(format!("invalid PORT {port:?}")))?;
        }
        if var("ACTION_HUB_DEBUG").is_some_and(|v| !v.is_empty()) {
            self.server.debug = true;
        }
        if var("ACTION_HUB_DEBUG_ENDPOINT").is_some_and(|v| !v.is_empty()) {
            self.server.debug_endpoint = true;
        }
        if let Some(raw) = var("ACTION_WHITELIST") {
            self.registry.allow_list = RegistryConfig::parse_allow_list(&raw);
        }
        if var("ACTION_HUB_ENABLE_FORKING").is_some_and(|v| v.eq_ignore_ascii_case("false")) {
            self.executor.enable_forking = false;
        }
        if let Some(count) = var("ACTION_HUB_PROCESS_COUNT") {
            self.executor.max_concurrent = count.parse().map_err(|_| {
                ServerError::Config(format!("invalid ACTION_HUB_PROCESS_COUNT {count:?}"))
            })?;
        }
        Ok(())
    }

    pub fn registry_config(&self) -> Result<RegistryConfig, ServerError> {
        let minimum_caller_version = self
            .registry
            .minimum_caller_version
            .as_deref()
            .map(|raw| {
                Version::parse(raw).map_err(|e| {
                    ServerError::Config(format!("invalid minimum_caller_version {raw:?}: {e}"))
                })
            })
            .transpose()?;
        Ok(RegistryConfig {
            allow_list: self.registry.allow_list.clone(),
            minimum_caller_version,
        })
    }

    /// Queue configuration. `config_path` is handed to workers started from
    /// this binary so they load the same settings.
    pub fn queue_config(&self, config_path: &Path) -> Result<ProcessQueueConfig, ServerError> {
        let worker = match &self.executor.worker_program {
            Some(program) => {
                WorkerCommand::new(program, self.executor.worker_args.clone().unwrap_or_default())
            }
            None => {
                let mut cmd = WorkerCommand::current_exe()?;
                cmd.args = vec![
                    "--config".to_owned(),
                    config_path.display().to_string(),
                    "worker".to_owned(),
                ];
                cmd
            }
        };
        let mut config = ProcessQueueConfig::new(worker);
        config.max_concurrent = self.executor.max_concurrent.max(1);
        config.job_timeout = Duration::from_secs(self.executor.job_timeout_seconds);
        Ok(config)
    }
}
