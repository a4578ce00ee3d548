use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub proctor: ProctorConfig,
    pub viewport: ViewportConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProctorConfig {
    /// Warnings allowed before the exam is force-submitted.
    pub max_warnings: u32,
    /// Delay between the terminal warning and the forced submission.
    pub auto_submit_delay_ms: u64,
    pub log_context_menu: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub lock_orientation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub state_file: String,
    pub reports_dir: String,
    pub logs_dir: String,
}

impl AppConfig {
    pub fn load(path: Option<&PathBuf>) -> Result<Self, ConfigError> {
        let config_path = if let Some(p) = path {
            p.clone()
        } else {
            std::env::var("EXAMGUARD_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config/default.yaml"))
        };

        info!("Loading configuration from: {:?}", config_path);

        let config = Config::builder()
            .add_source(File::from(config_path))
            // Environment variables with prefix EXAMGUARD_ override the file
            .add_source(Environment::with_prefix("EXAMGUARD").separator("_"))
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;

        debug!("Configuration loaded successfully");
        debug!("Environment: {}", app_config.app.environment);
        debug!("Log level: {}", app_config.app.log_level);

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.proctor.max_warnings == 0 {
            errors.push("Max warnings must be greater than 0".to_string());
        }

        if self.proctor.auto_submit_delay_ms > 60_000 {
            errors.push("Auto-submit delay must not exceed 60 seconds".to_string());
        }

        if self.storage.state_file.is_empty() {
            errors.push("State file path cannot be empty".to_string());
        }

        if self.storage.reports_dir.is_empty() {
            errors.push("Reports directory cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn is_development(&self) -> bool {
        self.app.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.app.environment == "production"
    }
}

fn default_state_file() -> String {
    dirs::data_local_dir()
        .unwrap_or_default()
        .join("examguard")
        .join("session_state.json")
        .to_string_lossy()
        .to_string()
}

fn default_reports_dir() -> String {
    dirs::document_dir()
        .unwrap_or_default()
        .join("examguard")
        .join("reports")
        .to_string_lossy()
        .to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: "examguard".to_string(),
                environment: "development".to_string(),
                log_level: "info".to_string(),
            },
            proctor: ProctorConfig {
                max_warnings: 3,
                auto_submit_delay_ms: 2000,
                log_context_menu: true,
            },
            viewport: ViewportConfig {
                lock_orientation: true,
            },
            storage: StorageConfig {
                state_file: default_state_file(),
                reports_dir: default_reports_dir(),
                logs_dir: "logs".to_string(),
            },
        }
    }
}
