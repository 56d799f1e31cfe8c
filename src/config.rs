use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for the task-fsm binary
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Task execution settings
    pub runner: RunnerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive, e.g. "info" or "task_fsm=debug"
    pub log_level: String,
    /// Emit logs as JSON lines instead of human readable text
    pub json_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Abort a whole run after this many seconds (no limit when unset)
    pub timeout_seconds: Option<u64>,
    /// Shell used to execute command tasks from graph files
    pub shell: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            shell: "sh".to_string(),
        }
    }
}

impl EngineSettings {
    /// Load settings from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (task-fsm.toml, .task-fsm-rc)
    /// 3. Environment variables (prefixed with TASK_FSM_)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("task-fsm.toml").exists() {
            builder = builder.add_source(File::with_name("task-fsm"));
        }

        if Path::new(".task-fsm-rc").exists() {
            builder = builder.add_source(
                File::with_name(".task-fsm-rc").format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("TASK_FSM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: EngineSettings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}

/// Result of looking for a `.env` file before settings are loaded
#[derive(Debug)]
pub enum DotenvStatus {
    Missing,
    Loaded(PathBuf),
    Failed(dotenvy::Error),
}

impl From<dotenvy::Result<PathBuf>> for DotenvStatus {
    fn from(result: dotenvy::Result<PathBuf>) -> Self {
        match result {
            Ok(path) => DotenvStatus::Loaded(path),
            Err(e) if e.not_found() => DotenvStatus::Missing,
            Err(e) => DotenvStatus::Failed(e),
        }
    }
}

impl DotenvStatus {
    /// Must run before logging is initialized so `.env` can set RUST_LOG.
    pub fn load() -> Self {
        dotenvy::dotenv().into()
    }

    /// Report the outcome once a subscriber is installed
    pub fn log(&self) {
        match self {
            DotenvStatus::Missing => {}
            DotenvStatus::Loaded(path) => {
                tracing::info!(path = %path.display(), "Loaded environment variables from .env file")
            }
            DotenvStatus::Failed(e) => {
                tracing::warn!(error = %e, "Ignoring .env file that could not be loaded")
            }
        }
    }
}
