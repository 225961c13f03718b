//! # pgkit
//!
//! Pooled PostgreSQL connections and parameterized CRUD helpers on top of
//! `tokio-postgres`.
//!
//! ## Features
//!
//! - **One pool per handle**: [`PoolManager`] builds its pool once, from the first config it is given
//! - **Per-connection credentials**: a [`Password`] may be a provider called for every new connection
//! - **Parameterized only**: values always travel as `$n` parameters, identifiers are validated
//! - **Loud failures**: server errors carry the SQL text and the parameter values
//! - **Transaction-friendly**: pass a transaction anywhere a `GenericClient` is expected
//!
//! ## CRUD helpers
//!
//! ```ignore
//! use pgkit::{PoolConfig, PoolManager, record};
//!
//! let pools = PoolManager::new();
//! pools.initialize(PoolConfig::new("app").with_url(database_url)).await?;
//! let conn = pools.get().await?;
//!
//! // INSERT ... RETURNING *
//! let rows: Vec<Item> = pgkit::insert(
//!     &conn,
//!     "list",
//!     &[record! { "id" => 1i32, "value" => "a" }],
//!     &[],
//! )
//! .await?;
//!
//! // UPDATE ... RETURNING *, first row
//! let item: Item = pgkit::update(&conn, "list", &record! { "id" => 1i32 }, &record! { "value" => "z" }).await?;
//!
//! // DELETE
//! pgkit::remove(&conn, "list", &record! { "id" => 1i32 }).await?;
//! ```

pub mod client;
pub mod config;
pub mod crud;
pub mod error;
pub mod ident;
pub mod param;
pub mod pool;
pub mod record;
pub mod row;
pub mod statement;

pub use client::GenericClient;
pub use config::{AuthConfig, ConnectConfig, Password, PasswordProvider, PoolConfig};
pub use crud::{find, insert, query, query_as, remove, update};
pub use error::{DbErrorInfo, DriverError, PgError, PgResult, QueryFailure};
pub use ident::Ident;
pub use param::{Param, ParamList};
pub use pool::{ConnectionManager, Pool, PoolClient, PoolManager, TrackedConnection};
pub use record::Record;
pub use row::{FromRow, RowExt};
pub use statement::Statement;
