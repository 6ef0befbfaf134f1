use anyhow::{Context, Result};
use sqlx::postgres::PgConnectOptions;
use std::env;
use std::str::FromStr;

/// Largest batch accepted; Postgres caps a statement at 65535 bind parameters
/// and every record binds six.
pub const MAX_BATCH_SIZE: usize = 10_000;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: None,
            user: None,
            password: None,
            max_connections: 5,
            connect_timeout_secs: 10,
            run_migrations: false,
        }
    }
}

// Hand-written so the password never reaches the logs.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

impl DatabaseConfig {
    /// Connection options for the users database. Unset fields fall back to
    /// libpq defaults, so a missing database name only surfaces on connect.
    pub fn connect_options(&self) -> PgConnectOptions {
        let mut options = PgConnectOptions::new().host(&self.host).port(self.port);
        if let Some(name) = &self.name {
            options = options.database(name);
        }
        if let Some(user) = &self.user {
            options = options.username(user);
        }
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        options
    }
}

#[derive(Clone)]
pub struct StorageConfig {
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_endpoint: Option<String>,
    pub upload_prefix: String,
    pub presign_expiry_secs: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            s3_bucket: String::new(),
            s3_region: "us-east-1".to_string(),
            s3_access_key_id: None,
            s3_secret_access_key: None,
            s3_endpoint: None,
            upload_prefix: "uploads".to_string(),
            presign_expiry_secs: 900,
        }
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_region", &self.s3_region)
            .field("s3_access_key_id", &self.s3_access_key_id)
            .field("s3_secret_access_key", &self.s3_secret_access_key.as_ref().map(|_| "***"))
            .field("s3_endpoint", &self.s3_endpoint)
            .field("upload_prefix", &self.upload_prefix)
            .field("presign_expiry_secs", &self.presign_expiry_secs)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { batch_size: 200 }
    }
}

#[derive(Clone)]
pub struct WebhookConfig {
    pub base_url: Option<String>,
    pub key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            key: None,
            timeout_secs: 15,
        }
    }
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("base_url", &self.base_url)
            .field("key", &self.key.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source. Empty
    /// values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let batch_size = parse_or(&var, "INGEST_BATCH_SIZE", defaults.ingest.batch_size)?;
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            anyhow::bail!("INGEST_BATCH_SIZE must be between 1 and {MAX_BATCH_SIZE}, got {batch_size}");
        }

        Ok(Self {
            server: ServerConfig {
                port: parse_or(&var, "PORT", defaults.server.port)?,
                host: var("HOST").unwrap_or(defaults.server.host),
                cors_allowed_origins: var("ALLOWED_ORIGINS")
                    .map(|origins| {
                        origins
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or(defaults.server.cors_allowed_origins),
            },
            database: DatabaseConfig {
                host: var("RDS_HOST").unwrap_or(defaults.database.host),
                port: parse_or(&var, "RDS_PORT", defaults.database.port)?,
                name: var("RDS_DB"),
                user: var("RDS_USER"),
                password: var("RDS_PASSWORD"),
                max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", defaults.database.max_connections)?,
                connect_timeout_secs: parse_or(
                    &var,
                    "DB_CONNECT_TIMEOUT_SECS",
                    defaults.database.connect_timeout_secs,
                )?,
                run_migrations: parse_or(&var, "DB_RUN_MIGRATIONS", defaults.database.run_migrations)?,
            },
            storage: StorageConfig {
                s3_bucket: var("S3_BUCKET").unwrap_or(defaults.storage.s3_bucket),
                s3_region: var("S3_REGION").unwrap_or(defaults.storage.s3_region),
                s3_access_key_id: var("AWS_ACCESS_KEY_ID"),
                s3_secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
                s3_endpoint: var("S3_ENDPOINT"),
                upload_prefix: var("UPLOAD_PREFIX")
                    .map(|p| p.trim_matches('/').to_string())
                    .unwrap_or(defaults.storage.upload_prefix),
                presign_expiry_secs: parse_or(
                    &var,
                    "PRESIGN_EXPIRY_SECS",
                    defaults.storage.presign_expiry_secs,
                )?,
            },
            ingest: IngestConfig { batch_size },
            webhook: WebhookConfig {
                base_url: var("N8N_WEBHOOK_BASE_URL"),
                key: var("N8N_WEBHOOK_KEY"),
                timeout_secs: parse_or(&var, "WEBHOOK_TIMEOUT_SECS", defaults.webhook.timeout_secs)?,
            },
        })
    }
}

fn parse_or<T, F>(var: &F, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.connect_timeout_secs, 10);
        assert!(!config.database.run_migrations);
        assert_eq!(config.storage.upload_prefix, "uploads");
        assert_eq!(config.storage.presign_expiry_secs, 900);
        assert_eq!(config.ingest.batch_size, 200);
        assert_eq!(config.webhook.timeout_secs, 15);
        assert!(config.webhook.base_url.is_none());
        assert!(config.webhook.key.is_none());
    }

    #[test]
    fn test_reads_database_and_webhook_settings() {
        let config = Config::from_lookup(lookup_from(&[
            ("RDS_HOST", "db.internal"),
            ("RDS_PORT", "6543"),
            ("RDS_DB", "users"),
            ("RDS_USER", "ingest"),
            ("RDS_PASSWORD", "hunter2"),
            ("N8N_WEBHOOK_BASE_URL", "https://n8n.example.com"),
            ("N8N_WEBHOOK_KEY", "secret"),
            ("S3_BUCKET", "csv-drop"),
        ]))
        .unwrap();

        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 6543);
        assert_eq!(config.database.name.as_deref(), Some("users"));
        assert_eq!(config.database.user.as_deref(), Some("ingest"));
        assert_eq!(config.webhook.base_url.as_deref(), Some("https://n8n.example.com"));
        assert_eq!(config.webhook.key.as_deref(), Some("secret"));
        assert_eq!(config.storage.s3_bucket, "csv-drop");
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config = Config::from_lookup(lookup_from(&[
            ("N8N_WEBHOOK_BASE_URL", ""),
            ("RDS_PORT", "  "),
        ]))
        .unwrap();

        assert!(config.webhook.base_url.is_none());
        assert_eq!(config.database.port, 5432);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[("RDS_PORT", "not-a-port")])).unwrap_err();
        assert!(err.to_string().contains("RDS_PORT"));

        assert!(Config::from_lookup(lookup_from(&[("INGEST_BATCH_SIZE", "0")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("INGEST_BATCH_SIZE", "20000")])).is_err());
    }

    #[test]
    fn test_debug_output_masks_secrets() {
        let config = Config::from_lookup(lookup_from(&[
            ("RDS_PASSWORD", "hunter2"),
            ("N8N_WEBHOOK_KEY", "secret-key"),
            ("AWS_SECRET_ACCESS_KEY", "aws-secret"),
        ]))
        .unwrap();

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("secret-key"));
        assert!(!rendered.contains("aws-secret"));
    }
}
