use crate::config::*;
use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub accrual: AccrualConfig,
    pub reconciler: ReconcilerConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        Self::load_from("config", env)
    }

    pub fn load_from(dir: &str, env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(&format!("{}/default", dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", dir, env)).required(false))
            .add_source(Environment::with_prefix("LOYALTY").separator("__"))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let app: AppConfig = config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        app.validate()?;
        Ok(app)
    }

    fn validate(&self) -> Result<()> {
        if self.reconciler.max_concurrency == 0 {
            return Err(Error::ConfigError("reconciler.max_concurrency must be positive".into()));
        }
        if self.reconciler.interval_ms == 0 {
            return Err(Error::ConfigError("reconciler.interval_ms must be positive".into()));
        }
        if self.reconciler.outcome_buffer == 0 {
            return Err(Error::ConfigError("reconciler.outcome_buffer must be positive".into()));
        }
        if self.database.max_connections == 0 {
            return Err(Error::ConfigError("database.max_connections must be positive".into()));
        }
        if !self.accrual.base_url.starts_with("http://") && !self.accrual.base_url.starts_with("https://") {
            return Err(Error::ConfigError(format!(
                "accrual.base_url must be an http(s) URL, got {:?}",
                self.accrual.base_url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("loyalty-config-{}-{}", name, uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn defaults_without_files() {
        let dir = temp_dir("empty");
        let config = AppConfig::load_from(dir.to_str().unwrap(), "test").unwrap();

        assert_eq!(config.accrual.timeout_ms, 200);
        assert_eq!(config.accrual.retry_count, 2);
        assert_eq!(config.reconciler.interval_ms, 1_000);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.dsn.is_none());
    }

    #[test]
    fn env_file_overrides_default_file() {
        let dir = temp_dir("layered");
        fs::write(
            dir.join("default.toml"),
            "[accrual]\nbase_url = \"http://accrual:8080\"\n[reconciler]\nmax_concurrency = 4\n",
        ).unwrap();
        fs::write(dir.join("staging.toml"), "[reconciler]\nmax_concurrency = 16\n").unwrap();

        let config = AppConfig::load_from(dir.to_str().unwrap(), "staging").unwrap();

        assert_eq!(config.accrual.base_url, "http://accrual:8080");
        assert_eq!(config.reconciler.max_concurrency, 16);
        assert_eq!(config.reconciler.outcome_buffer, 256);
    }

    #[test]
    fn rejects_zero_concurrency() {
        let dir = temp_dir("invalid");
        fs::write(dir.join("default.toml"), "[reconciler]\nmax_concurrency = 0\n").unwrap();

        let err = AppConfig::load_from(dir.to_str().unwrap(), "test").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
