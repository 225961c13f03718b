//! Pool configuration.
//!
//! A [`PoolConfig`] is built once by the caller and consumed by
//! [`PoolManager::initialize`](crate::PoolManager::initialize).
//!
//! # Example
//!
//! ```ignore
//! use pgkit::{AuthConfig, Password, PoolConfig};
//!
//! let config = PoolConfig::new("app")
//!     .with_auth(
//!         AuthConfig::new()
//!             .host("localhost")
//!             .database("app")
//!             .user("app")
//!             .password(Password::provider(|| async { fetch_token().await })),
//!     )
//!     .with_max(8)
//!     .with_initial_script("CREATE TABLE IF NOT EXISTS list (id int PRIMARY KEY, value text)");
//! ```
//!
//! Fields left unset by both `auth` and `url` fall back to the libpq
//! environment variables (`PGHOST`, `PGPORT`, `PGDATABASE`, `PGUSER`,
//! `PGPASSWORD`), since `tokio-postgres` does not read them itself.

use crate::error::{PgError, PgResult};
use futures_core::future::BoxFuture;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Async password source, invoked once per new physical connection.
pub type PasswordProvider = Arc<dyn Fn() -> BoxFuture<'static, Result<String, String>> + Send + Sync>;

/// A connection password: fixed, or fetched lazily (e.g. a short-lived token).
#[derive(Clone, Deserialize)]
#[serde(from = "String")]
pub enum Password {
    Static(String),
    Provider(PasswordProvider),
}

impl Password {
    /// Wrap an async closure that produces the password on demand.
    pub fn provider<F, Fut, E>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, E>> + Send + 'static,
        E: fmt::Display,
    {
        Self::Provider(Arc::new(move || -> BoxFuture<'static, Result<String, String>> {
            let fut = f();
            Box::pin(async move { fut.await.map_err(|e| e.to_string()) })
        }))
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self::Static(value)
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self::Static(value.to_string())
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(_) => f.write_str("Password::Static(<redacted>)"),
            Self::Provider(_) => f.write_str("Password::Provider(<fn>)"),
        }
    }
}

/// Connection credentials. Every field is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<Password>,
}

impl AuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<Password>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// Everything needed to build a pool.
#[derive(Clone, Deserialize)]
pub struct PoolConfig {
    /// Label attached to every log line about this pool.
    pub name: String,
    /// Base connection string. `auth` may override user, database and
    /// password; host and port must come from one place only.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    /// Maximum number of connections (driver default when unset).
    #[serde(default)]
    pub max: Option<usize>,
    /// SQL run once, on a single connection, right after the pool is created.
    #[serde(default)]
    pub initial_script: Option<String>,
}

impl PoolConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            auth: None,
            max: None,
            initial_script: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_initial_script(mut self, script: impl Into<String>) -> Self {
        self.initial_script = Some(script.into());
        self
    }

    /// Resolve the driver config, reading fallbacks from the process environment.
    pub fn connect_config(&self) -> PgResult<ConnectConfig> {
        self.connect_config_with(|key| std::env::var(key).ok())
    }

    /// Resolve the driver config with an explicit environment lookup.
    ///
    /// Precedence per field: `auth`, then `url`, then `env`, then defaults.
    /// Host or port given by both `url` and `auth` is rejected.
    pub fn connect_config_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> PgResult<ConnectConfig> {
        if self.max == Some(0) {
            return Err(PgError::Config(format!(
                "pool '{}': max must be at least 1",
                self.name
            )));
        }

        let mut pg = match &self.url {
            Some(url) => url
                .parse::<tokio_postgres::Config>()
                .map_err(|e| PgError::Config(format!("pool '{}': {e}", self.name)))?,
            None => tokio_postgres::Config::new(),
        };
        let auth = self.auth.clone().unwrap_or_default();

        // Config::host / Config::port append, so a url host cannot be replaced.
        if !pg.get_hosts().is_empty() && auth.host.is_some() {
            return Err(PgError::Config(format!(
                "pool '{}': host is set in both url and auth",
                self.name
            )));
        }
        if !pg.get_ports().is_empty() && auth.port.is_some() {
            return Err(PgError::Config(format!(
                "pool '{}': port is set in both url and auth",
                self.name
            )));
        }

        if pg.get_hosts().is_empty() {
            let host = auth
                .host
                .or_else(|| env("PGHOST"))
                .unwrap_or_else(|| "localhost".to_string());
            pg.host(&host);
        }

        let port = match auth.port {
            Some(port) => Some(port),
            None if pg.get_ports().is_empty() => match env("PGPORT") {
                Some(raw) => Some(raw.parse::<u16>().map_err(|_| {
                    PgError::Config(format!("pool '{}': invalid PGPORT '{raw}'", self.name))
                })?),
                None => None,
            },
            None => None,
        };
        if let Some(port) = port {
            pg.port(port);
        }

        if let Some(database) = auth
            .database
            .or_else(|| pg.get_dbname().is_none().then(|| env("PGDATABASE")).flatten())
        {
            pg.dbname(&database);
        }

        if let Some(user) = auth.user.or_else(|| {
            pg.get_user()
                .is_none()
                .then(|| env("PGUSER").or_else(|| env("USER")))
                .flatten()
        }) {
            pg.user(&user);
        }

        let password = auth.password.or_else(|| {
            pg.get_password()
                .is_none()
                .then(|| env("PGPASSWORD").map(Password::Static))
                .flatten()
        });
        let provider = match password {
            Some(Password::Static(password)) => {
                pg.password(password);
                None
            }
            Some(Password::Provider(provider)) => Some(provider),
            None => None,
        };

        Ok(ConnectConfig { pg, provider })
    }
}

impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("name", &self.name)
            .field("url", &self.url.as_deref().map(redact_url))
            .field("auth", &self.auth)
            .field("max", &self.max)
            .field("initial_script", &self.initial_script)
            .finish()
    }
}

/// Mask the password in the userinfo part of a `postgres://` URL.
///
/// Key/value connection strings are masked entirely when they mention a
/// password.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return if url.contains("password") {
            "<redacted>".to_string()
        } else {
            url.to_string()
        };
    };
    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let Some(at) = rest[..authority_end].rfind('@') else {
        return url.to_string();
    };
    let (userinfo, host) = rest.split_at(at);
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:<redacted>{host}"),
        None => url.to_string(),
    }
}

/// Driver-level connection settings derived from a [`PoolConfig`].
#[derive(Clone)]
pub struct ConnectConfig {
    pub pg: tokio_postgres::Config,
    /// Set when the password must be fetched per connection.
    pub provider: Option<PasswordProvider>,
}

impl fmt::Debug for ConnectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectConfig")
            .field("pg", &self.pg)
            .field("provider", &self.provider.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
