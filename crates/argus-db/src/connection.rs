//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;
use crate::session::SurrealSession;

/// Connection settings for a SurrealDB server, with local-development
/// defaults. Embedded/in-memory use does not go through here; construct
/// a `surrealdb::engine::local::Mem` client and hand it to
/// [`SurrealSession::new`] directly.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket URL (e.g., `127.0.0.1:8000`).
    pub url: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "argus".into(),
            database: "auth".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Build a configuration from `ARGUS_DB_*` environment variables,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            url: lookup("ARGUS_DB_URL").unwrap_or(defaults.url),
            namespace: lookup("ARGUS_DB_NAMESPACE").unwrap_or(defaults.namespace),
            database: lookup("ARGUS_DB_DATABASE").unwrap_or(defaults.database),
            username: lookup("ARGUS_DB_USERNAME").unwrap_or(defaults.username),
            password: lookup("ARGUS_DB_PASSWORD").unwrap_or(defaults.password),
        }
    }
}

/// Connect to a SurrealDB server, bring its schema up to date and wrap
/// the client in a ready-to-use session.
pub async fn connect(config: &DbConfig) -> Result<SurrealSession<Client>, DbError> {
    info!(
        url = %config.url,
        namespace = %config.namespace,
        database = %config.database,
        "connecting to SurrealDB"
    );

    let db = Surreal::new::<Ws>(config.url.as_str()).await?;
    db.signin(Root {
        username: &config.username,
        password: &config.password,
    })
    .await?;
    db.use_ns(&config.namespace)
        .use_db(&config.database)
        .await?;

    run_migrations(&db).await?;
    Ok(SurrealSession::new(db))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_point_at_a_local_server() {
        let config = DbConfig::default();
        assert_eq!(config.url, "127.0.0.1:8000");
        assert_eq!(config.namespace, "argus");
        assert_eq!(config.database, "auth");
    }

    #[test]
    fn environment_overrides_fall_back_per_variable() {
        let vars = HashMap::from([
            ("ARGUS_DB_URL".to_string(), "db.internal:8000".to_string()),
            ("ARGUS_DB_PASSWORD".to_string(), "hunter2".to_string()),
        ]);
        let config = DbConfig::from_lookup(|name| vars.get(name).cloned());
        assert_eq!(config.url, "db.internal:8000");
        assert_eq!(config.password, "hunter2");
        assert_eq!(config.namespace, "argus");
        assert_eq!(config.username, "root");
    }
}
