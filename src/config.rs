use crate::service::FailurePolicy;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `FILMCHECK__BACKEND__BASE_URL`
pub const ENV_PREFIX: &str = "FILMCHECK";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub upload: UploadConfig,
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Upstream parsing/lookup backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Base name (without extension) the reference file must carry
    pub required_reference_name: String,
    /// Request body limit for uploads
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub failure_policy: FailurePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            backend: BackendConfig {
                base_url: "http://127.0.0.1:5000".to_string(),
                timeout_secs: 30,
            },
            upload: UploadConfig {
                required_reference_name: "Film percentages".to_string(),
                max_bytes: 20 * 1024 * 1024,
            },
            reconcile: ReconcileConfig {
                failure_policy: FailurePolicy::default(),
            },
        }
    }
}

impl AppConfig {
    /// Load defaults overlaid with `FILMCHECK__*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::with_prefix(ENV_PREFIX))
    }

    fn load(env: Environment) -> Result<Self, ConfigError> {
        let defaults = Config::try_from(&Self::default())?;

        Config::builder()
            .add_source(defaults)
            .add_source(env.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
