//! Connection pool management.
//!
//! [`PoolManager`] is a handle that lazily holds one pool. Build it once at
//! startup, share it (e.g. in an `Arc` or via [`PoolManager::global`]) and
//! check connections out with [`PoolManager::get`]:
//!
//! ```ignore
//! use pgkit::{PoolConfig, PoolManager, record};
//!
//! let pools = PoolManager::new();
//! pools.initialize(PoolConfig::new("app").with_max(8)).await?;
//!
//! let conn = pools.get().await?;
//! pgkit::remove(&conn, "list", &record! { "id" => 1i32 }).await?;
//! // `conn` goes back to the pool when dropped, on every exit path.
//! ```

use crate::config::{ConnectConfig, PasswordProvider, PoolConfig};
use crate::error::{DriverError, PgError, PgResult};
use deadpool::managed::{self, Manager as _, Metrics, RecycleError, RecycleResult};
use deadpool_postgres::{ClientWrapper, ManagerConfig, RecyclingMethod};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::sync::OnceCell;
use tokio_postgres::NoTls;
use tracing::{debug, info, warn};

/// The pool type built by [`PoolManager`].
pub type Pool = managed::Pool<ConnectionManager>;

/// A checked-out connection. Returned to the pool on drop.
pub type PoolClient = managed::Object<ConnectionManager>;

/// A `deadpool` manager that wraps `deadpool_postgres::Manager` and logs every
/// physical connect / disconnect with the pool's current connection count.
pub struct ConnectionManager {
    name: Arc<str>,
    inner: deadpool_postgres::Manager,
    pg_config: tokio_postgres::Config,
    provider: Option<PasswordProvider>,
    live: Arc<AtomicUsize>,
}

impl ConnectionManager {
    pub fn new(name: &str, config: ConnectConfig) -> Self {
        let inner = deadpool_postgres::Manager::from_config(
            config.pg.clone(),
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        Self {
            name: Arc::from(name),
            inner,
            pg_config: config.pg,
            provider: config.provider,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of physical connections currently open.
    pub fn live_connections(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    async fn connect_with_provider(
        &self,
        provider: &PasswordProvider,
    ) -> Result<ClientWrapper, DriverError> {
        let password = (**provider)().await.map_err(DriverError::Other)?;
        let mut pg_config = self.pg_config.clone();
        pg_config.password(password);

        let (client, connection) = pg_config.connect(NoTls).await?;
        let name = Arc::clone(&self.name);
        let conn_task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(pool = %name, error = %e, "connection terminated with error");
            }
        });
        Ok(ClientWrapper::new(client, conn_task))
    }
}

impl managed::Manager for ConnectionManager {
    type Type = TrackedConnection;
    type Error = DriverError;

    async fn create(&self) -> Result<TrackedConnection, DriverError> {
        let client = match &self.provider {
            Some(provider) => self.connect_with_provider(provider).await?,
            None => self.inner.create().await?,
        };
        Ok(TrackedConnection {
            client,
            _live: LiveConnection::open(&self.name, &self.live),
        })
    }

    async fn recycle(
        &self,
        conn: &mut TrackedConnection,
        metrics: &Metrics,
    ) -> RecycleResult<DriverError> {
        self.inner
            .recycle(&mut conn.client, metrics)
            .await
            .map_err(|e| match e {
                RecycleError::Message(msg) => RecycleError::Message(msg),
                RecycleError::Backend(e) => RecycleError::Backend(e.into()),
            })
    }

    fn detach(&self, conn: &mut TrackedConnection) {
        self.inner.detach(&mut conn.client);
    }
}

/// A pooled physical connection. Derefs to the `tokio_postgres` client.
pub struct TrackedConnection {
    client: ClientWrapper,
    _live: LiveConnection,
}

impl Deref for TrackedConnection {
    type Target = ClientWrapper;

    fn deref(&self) -> &ClientWrapper {
        &self.client
    }
}

/// Counts one open connection; logs on open and on drop.
struct LiveConnection {
    name: Arc<str>,
    live: Arc<AtomicUsize>,
}

impl LiveConnection {
    fn open(name: &Arc<str>, live: &Arc<AtomicUsize>) -> Self {
        let total = live.fetch_add(1, Ordering::SeqCst) + 1;
        info!(pool = %name, total, "connection established");
        Self {
            name: Arc::clone(name),
            live: Arc::clone(live),
        }
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        let total = self.live.fetch_sub(1, Ordering::SeqCst) - 1;
        info!(pool = %self.name, total, "connection removed");
    }
}

/// Holds at most one pool, created by the first successful [`initialize`](Self::initialize).
#[derive(Default)]
pub struct PoolManager {
    pool: OnceCell<Pool>,
}

impl PoolManager {
    /// An empty handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// A process-wide handle, created on first use.
    pub fn global() -> &'static PoolManager {
        static GLOBAL: OnceLock<PoolManager> = OnceLock::new();
        GLOBAL.get_or_init(PoolManager::new)
    }

    /// Build the pool and run the configured initialization script.
    ///
    /// Idempotent: once a pool exists, later calls return `Ok(())` without
    /// touching it, whatever config they carry. The pool is stored before the
    /// script runs, so a failing script leaves the pool in place and a retry
    /// will not run the script again.
    ///
    /// Concurrent calls do not wait for the script: a call that loses the race
    /// returns `Ok(())` as soon as the pool exists, possibly while the winning
    /// call is still running the script. Await the first `initialize` before
    /// handing the manager to code that depends on the script's effects.
    pub async fn initialize(&self, config: PoolConfig) -> PgResult<()> {
        let created = &AtomicBool::new(false);
        let cfg = &config;
        let pool = self
            .pool
            .get_or_try_init(|| async move {
                created.store(true, Ordering::SeqCst);
                build_pool(cfg)
            })
            .await?;

        if !created.load(Ordering::SeqCst) {
            debug!(pool = %config.name, "pool already initialized; ignoring config");
            return Ok(());
        }

        let status = pool.status();
        info!(pool = %config.name, max_size = status.max_size, "pool created");

        if let Some(script) = config.initial_script.as_deref() {
            run_initial_script(pool, &config.name, script).await?;
        }
        Ok(())
    }

    /// Check out a connection.
    pub async fn get(&self) -> PgResult<PoolClient> {
        let pool = self
            .pool
            .get()
            .ok_or_else(|| PgError::Pool("pool is not initialized".to_string()))?;
        Ok(pool.get().await?)
    }

    pub fn pool(&self) -> Option<&Pool> {
        self.pool.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.initialized()
    }

    /// Name from the config that created the pool.
    pub fn name(&self) -> Option<&str> {
        self.pool.get().map(|pool| &*pool.manager().name)
    }

    pub fn status(&self) -> Option<managed::Status> {
        self.pool.get().map(Pool::status)
    }
}

fn build_pool(config: &PoolConfig) -> PgResult<Pool> {
    let manager = ConnectionManager::new(&config.name, config.connect_config()?);
    let mut builder = Pool::builder(manager);
    if let Some(max) = config.max {
        builder = builder.max_size(max);
    }
    builder.build().map_err(|e| PgError::Pool(e.to_string()))
}

async fn run_initial_script(pool: &Pool, name: &str, script: &str) -> PgResult<()> {
    info!(pool = %name, "running initialization script");
    let started = Instant::now();

    let conn = pool.get().await?;
    let result = conn.batch_execute(script).await;
    drop(conn);

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(()) => {
            info!(pool = %name, elapsed_ms, "initialization script finished");
            Ok(())
        }
        Err(e) => {
            warn!(pool = %name, elapsed_ms, error = %e, "initialization script failed");
            Err(PgError::from_driver(e.into(), script, &[]))
        }
    }
}
