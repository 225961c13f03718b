//! Generic client trait for unified database access.

use crate::error::DriverError;
use crate::pool::{PoolClient, TrackedConnection};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Anything that can run a parameterized statement and return rows.
///
/// Implemented for plain `tokio_postgres` clients and transactions, for
/// `deadpool_postgres` objects, and for connections checked out of a
/// [`PoolManager`](crate::PoolManager). Helpers accept `&impl GenericClient`,
/// so the same call works inside or outside a transaction.
///
/// Errors come back as [`DriverError`]; the executor in [`crate::crud`]
/// attaches the SQL text and parameters before surfacing them.
pub trait GenericClient: Send + Sync {
    /// Execute a statement and return all rows, in the order the server sent them.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = Result<Vec<Row>, DriverError>> + Send;
}

impl GenericClient for tokio_postgres::Client {
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, DriverError> {
        tokio_postgres::Client::query(self, sql, params)
            .await
            .map_err(DriverError::from)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, DriverError> {
        tokio_postgres::Transaction::query(self, sql, params)
            .await
            .map_err(DriverError::from)
    }
}

// ===== deadpool-postgres support =====

impl GenericClient for deadpool_postgres::ClientWrapper {
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, DriverError> {
        GenericClient::query(&**self, sql, params).await
    }
}

impl GenericClient for deadpool_postgres::Client {
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, DriverError> {
        GenericClient::query(&**self, sql, params).await
    }
}

impl GenericClient for deadpool_postgres::Transaction<'_> {
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, DriverError> {
        GenericClient::query(&**self, sql, params).await
    }
}

// ===== pgkit pool =====

impl GenericClient for TrackedConnection {
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, DriverError> {
        GenericClient::query(&**self, sql, params).await
    }
}

impl GenericClient for PoolClient {
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, DriverError> {
        GenericClient::query(&**self, sql, params).await
    }
}
