//! Query executor and CRUD helpers.
//!
//! Every helper takes a borrowed connection (anything implementing
//! [`GenericClient`]), builds its statement with [`crate::statement`] and runs
//! it through [`query`], so all failures carry the same diagnostics.
//!
//! ```ignore
//! use pgkit::record;
//!
//! let conn = pools.get().await?;
//! let inserted: Vec<Item> = pgkit::insert(
//!     &conn,
//!     "list",
//!     &[record! { "id" => 1i32, "value" => "a" }, record! { "id" => 2i32, "value" => "b" }],
//!     &[],
//! )
//! .await?;
//! let item: Item = pgkit::update(&conn, "list", &record! { "id" => 1i32 }, &record! { "value" => "z" }).await?;
//! pgkit::remove(&conn, "list", &record! { "id" => 2i32 }).await?;
//! ```

use crate::client::GenericClient;
use crate::error::{PgError, PgResult};
use crate::record::Record;
use crate::row::FromRow;
use crate::statement;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;
use tracing::debug;

/// Run `sql` with positional `params` and return the rows as the server sent them.
///
/// Server-side failures become [`PgError::Database`] carrying the SQL and the
/// parameter values; any other failure becomes [`PgError::Query`] with only
/// the driver's message. Nothing is retried.
pub async fn query(
    conn: &impl GenericClient,
    sql: &str,
    params: &[&(dyn ToSql + Sync)],
) -> PgResult<Vec<Row>> {
    debug!(target: "pgkit.sql", sql = %sql, param_count = params.len(), "executing query");
    conn.query(sql, params)
        .await
        .map_err(|err| PgError::from_driver(err, sql, params))
}

/// [`query`], mapping every row to `T`.
pub async fn query_as<T: FromRow>(
    conn: &impl GenericClient,
    sql: &str,
    params: &[&(dyn ToSql + Sync)],
) -> PgResult<Vec<T>> {
    let rows = query(conn, sql, params).await?;
    rows.iter().map(T::from_row).collect()
}

/// Insert `rows` in one statement and return what `RETURNING *` produced.
///
/// An empty `rows` slice returns an empty vec without touching `conn`.
/// A non-empty `conflict_columns` turns the insert into an upsert that
/// overwrites every inserted column from `EXCLUDED`.
pub async fn insert<T: FromRow>(
    conn: &impl GenericClient,
    table: &str,
    rows: &[Record],
    conflict_columns: &[&str],
) -> PgResult<Vec<T>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let stmt = statement::insert(table, rows, conflict_columns)?;
    let returned = stmt.query(conn).await?;
    returned.iter().map(T::from_row).collect()
}

/// Update the rows matching `filter` with `data` and return the first updated row.
///
/// Matching nothing is an error ([`PgError::UpdateFailed`]).
pub async fn update<T: FromRow>(
    conn: &impl GenericClient,
    table: &str,
    filter: &Record,
    data: &Record,
) -> PgResult<T> {
    let stmt = statement::update(table, filter, data)?;
    let returned = stmt.query(conn).await?;
    let row = returned.first().ok_or_else(|| PgError::UpdateFailed {
        table: table.to_string(),
    })?;
    T::from_row(row)
}

/// Delete the rows matching `filter`. Deleting nothing is not an error.
pub async fn remove(conn: &impl GenericClient, table: &str, filter: &Record) -> PgResult<()> {
    let stmt = statement::delete(table, filter)?;
    stmt.query(conn).await?;
    Ok(())
}

/// Select the rows matching `filter`; an empty filter returns the whole table.
pub async fn find<T: FromRow>(
    conn: &impl GenericClient,
    table: &str,
    filter: &Record,
) -> PgResult<Vec<T>> {
    let stmt = statement::select(table, filter)?;
    let rows = stmt.query(conn).await?;
    rows.iter().map(T::from_row).collect()
}
