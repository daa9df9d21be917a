use serde::{Deserialize, Serialize};

pub mod accrual;
pub mod database;
pub mod reconciler;
pub mod loader;

pub use accrual::AccrualConfig;
pub use database::DatabaseConfig;
pub use loader::AppConfig;
pub use reconciler::ReconcilerConfig;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}
