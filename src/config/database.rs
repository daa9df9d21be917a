use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres DSN. Without one the process runs on the in-memory store.
    pub dsn: Option<String>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            dsn: None,
            max_connections: 5,  // keep load on the primary small
            run_migrations: true,
        }
    }
}
