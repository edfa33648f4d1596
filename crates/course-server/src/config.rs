//! Service settings with layered precedence (file → environment → legacy
//! deployment variables).

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::service::ServiceConfig;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const CONFIG_FILE_VAR: &str = "COURSE_CONFIG_FILE";
const ENV_PREFIX: &str = "COURSE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Validated settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub cache: CacheSettings,
    pub service: ServiceSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub body_limit_bytes: usize,
    pub shutdown_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Connection URL of the SQLite database.
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
    pub ttl: Duration,
    pub max_capacity: u64,
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub collection: String,
    pub call_timeout: Duration,
    /// Deadline of every HTTP request, shared by all calls it makes.
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Settings {
    /// Loads settings from the default file, the file named by
    /// `COURSE_CONFIG_FILE`, `COURSE__SECTION__KEY` variables and the legacy
    /// deployment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var(CONFIG_FILE_VAR).ok();
        Self::load_with(file.as_deref().map(Path::new), |name| std::env::var(name).ok())
    }

    /// Like [`load`](Self::load), reading legacy variables through `lookup`.
    pub fn load_with(
        file: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut builder =
            Config::builder().add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false));

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let mut raw: RawSettings = builder.build()?.try_deserialize()?;
        raw.apply_legacy_env(lookup);
        Self::from_raw(raw)
    }

    /// Settings built from defaults only.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::from_raw(RawSettings::default())
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            collection: self.service.collection.clone(),
            ttl: self.cache.ttl,
            call_timeout: self.service.call_timeout,
        }
    }

    fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let host: IpAddr = raw
            .server
            .host
            .parse()
            .map_err(|e| ConfigError::invalid("server.host", format!("{e}")))?;
        if raw.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "must be non-zero"));
        }
        if raw.server.body_limit_bytes == 0 {
            return Err(ConfigError::invalid(
                "server.body_limit_bytes",
                "must be non-zero",
            ));
        }

        if raw.store.max_connections == 0 {
            return Err(ConfigError::invalid("store.max_connections", "must be non-zero"));
        }
        let store_url = raw
            .store
            .url
            .unwrap_or_else(|| format!("sqlite://{}.db", raw.store.database));

        if raw.cache.ttl_secs == 0 {
            return Err(ConfigError::invalid("cache.ttl_secs", "must be non-zero"));
        }
        if raw.cache.backend == CacheBackend::Redis && raw.cache.redis_url.is_none() {
            return Err(ConfigError::invalid(
                "cache.redis_url",
                "required when cache.backend is redis",
            ));
        }

        if raw.service.collection.trim().is_empty() {
            return Err(ConfigError::invalid("service.collection", "must not be empty"));
        }
        if raw.service.call_timeout_ms == 0 {
            return Err(ConfigError::invalid("service.call_timeout_ms", "must be non-zero"));
        }
        if raw.service.request_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "service.request_timeout_ms",
                "must be non-zero",
            ));
        }

        let default_level = if raw.logging.production { "info" } else { "debug" };
        let level = raw
            .logging
            .level
            .unwrap_or_else(|| default_level.to_string());

        Ok(Self {
            server: ServerSettings {
                addr: SocketAddr::new(host, raw.server.port),
                body_limit_bytes: raw.server.body_limit_bytes,
                shutdown_timeout: Duration::from_secs(raw.server.shutdown_timeout_secs),
            },
            store: StoreSettings {
                backend: raw.store.backend,
                url: store_url,
                max_connections: raw.store.max_connections,
            },
            cache: CacheSettings {
                backend: raw.cache.backend,
                redis_url: raw.cache.redis_url,
                ttl: Duration::from_secs(raw.cache.ttl_secs),
                max_capacity: raw.cache.max_capacity,
            },
            service: ServiceSettings {
                collection: raw.service.collection,
                call_timeout: Duration::from_millis(raw.service.call_timeout_ms),
                request_timeout: Duration::from_millis(raw.service.request_timeout_ms),
            },
            logging: LoggingSettings {
                level,
                format: raw.logging.format,
            },
        })
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    store: RawStoreSettings,
    cache: RawCacheSettings,
    service: RawServiceSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    /// Applies the variables earlier deployments were configured with.
    fn apply_legacy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("COURSE_DB_HOST") {
            self.store.url = Some(host);
        }
        if let Some(database) = lookup("COURSE_DB") {
            self.store.database = database;
        }
        if let Some(host) = lookup("COURSE_REDIS_HOST") {
            let url = if host.contains("://") {
                host
            } else {
                format!("redis://{host}")
            };
            self.cache.redis_url = Some(url);
            self.cache.backend = CacheBackend::Redis;
        }
        if lookup("ENV").is_some_and(|env| env == "prod") {
            self.logging.production = true;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawServerSettings {
    host: String,
    port: u16,
    body_limit_bytes: usize,
    shutdown_timeout_secs: u64,
}

impl Default for RawServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9090,
            body_limit_bytes: 2 * 1024 * 1024,
            shutdown_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawStoreSettings {
    backend: StoreBackend,
    url: Option<String>,
    database: String,
    max_connections: u32,
}

impl Default for RawStoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: None,
            database: "coursemanagement".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawCacheSettings {
    backend: CacheBackend,
    redis_url: Option<String>,
    ttl_secs: u64,
    max_capacity: u64,
}

impl Default for RawCacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: None,
            ttl_secs: 60,
            max_capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawServiceSettings {
    collection: String,
    call_timeout_ms: u64,
    request_timeout_ms: u64,
}

impl Default for RawServiceSettings {
    fn default() -> Self {
        Self {
            collection: "course".to_string(),
            call_timeout_ms: 1_000,
            request_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    format: LogFormat,
    #[serde(skip)]
    production: bool,
}

impl Default for RawLoggingSettings {
    fn default() -> Self {
        Self {
            level: None,
            format: LogFormat::Pretty,
            production: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::defaults().unwrap();

        assert_eq!(settings.server.addr.port(), 9090);
        assert_eq!(settings.server.body_limit_bytes, 2 * 1024 * 1024);
        assert_eq!(settings.store.backend, StoreBackend::Memory);
        assert_eq!(settings.store.url, "sqlite://coursemanagement.db");
        assert_eq!(settings.cache.backend, CacheBackend::Memory);
        assert_eq!(settings.cache.ttl, Duration::from_secs(60));
        assert_eq!(settings.service.collection, "course");
        assert_eq!(settings.service.call_timeout, Duration::from_secs(1));
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_config(
            r#"
            [server]
            port = 8080

            [store]
            backend = "sqlite"
            url = "sqlite://data/courses.db"

            [cache]
            ttl_secs = 5

            [logging]
            level = "warn"
            format = "json"
            "#,
        );

        let settings = Settings::load_with(Some(file.path()), no_env).unwrap();

        assert_eq!(settings.server.addr.port(), 8080);
        assert_eq!(settings.store.backend, StoreBackend::Sqlite);
        assert_eq!(settings.store.url, "sqlite://data/courses.db");
        assert_eq!(settings.cache.ttl, Duration::from_secs(5));
        assert_eq!(settings.logging.level, "warn");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_legacy_variables() {
        let settings = Settings::load_with(
            None,
            env(&[
                ("COURSE_DB", "catalog"),
                ("COURSE_REDIS_HOST", "cache.internal:6379"),
                ("ENV", "prod"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.store.url, "sqlite://catalog.db");
        assert_eq!(settings.cache.backend, CacheBackend::Redis);
        assert_eq!(
            settings.cache.redis_url.as_deref(),
            Some("redis://cache.internal:6379")
        );
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_legacy_db_host_wins_over_database_name() {
        let settings = Settings::load_with(
            None,
            env(&[("COURSE_DB_HOST", "sqlite://shared.db"), ("COURSE_DB", "x")]),
        )
        .unwrap();

        assert_eq!(settings.store.url, "sqlite://shared.db");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cases = [
            ("[server]\nport = 0", "server.port"),
            ("[cache]\nttl_secs = 0", "cache.ttl_secs"),
            ("[cache]\nbackend = \"redis\"", "cache.redis_url"),
            ("[service]\ncall_timeout_ms = 0", "service.call_timeout_ms"),
            ("[service]\nrequest_timeout_ms = 0", "service.request_timeout_ms"),
        ];

        for (contents, expected_key) in cases {
            let file = write_config(contents);
            match Settings::load_with(Some(file.path()), no_env) {
                Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, expected_key),
                other => panic!("expected invalid {expected_key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let file = write_config("[store]\nbackend = \"mongo\"");

        let result = Settings::load_with(Some(file.path()), no_env);
        assert!(matches!(result, Err(ConfigError::Build(_))));
    }

    #[test]
    fn test_service_config() {
        let settings = Settings::defaults().unwrap();
        let config = settings.service_config();

        assert_eq!(config.collection, "course");
        assert_eq!(config.ttl, Duration::from_secs(60));
        assert_eq!(config.call_timeout, Duration::from_secs(1));
    }
}
