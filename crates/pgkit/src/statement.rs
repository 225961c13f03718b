//! SQL generation for the CRUD helpers.
//!
//! Every builder here is pure: it validates identifiers, numbers placeholders
//! and returns a [`Statement`] without touching a connection.

use crate::client::GenericClient;
use crate::crud;
use crate::error::{PgError, PgResult};
use crate::ident::Ident;
use crate::param::ParamList;
use crate::record::Record;
use tokio_postgres::Row;

/// Generated SQL together with its positional parameters.
#[derive(Clone, Debug)]
pub struct Statement {
    sql: String,
    params: ParamList,
}

impl Statement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &ParamList {
        &self.params
    }

    /// Run the statement through the generic executor.
    pub async fn query(&self, conn: &impl GenericClient) -> PgResult<Vec<Row>> {
        crud::query(conn, &self.sql, &self.params.as_refs()).await
    }
}

/// `INSERT INTO t (c1, .., ck) VALUES (..), (..) [ON CONFLICT ..] RETURNING *`
///
/// The column list comes from the first record; every other record must carry
/// the same column set. The value for row `r`, column `c` binds to
/// `$(r * k + c + 1)`.
pub fn insert(table: &str, rows: &[Record], conflict_columns: &[&str]) -> PgResult<Statement> {
    let table = Ident::parse(table)?.to_sql();
    let Some(first) = rows.first() else {
        return Err(PgError::validation("insert requires at least one row"));
    };
    if first.is_empty() {
        return Err(PgError::validation("insert requires at least one column"));
    }

    let columns: Vec<&str> = first.columns().collect();
    let column_sql = columns
        .iter()
        .map(|c| Ident::column(c).map(|i| i.to_sql()))
        .collect::<PgResult<Vec<_>>>()?;

    let mut params = ParamList::new();
    let mut tuples = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        if !first.same_columns(row) {
            return Err(PgError::validation(format!(
                "insert row {index} has columns [{}], expected [{}]",
                row.columns().collect::<Vec<_>>().join(", "),
                columns.join(", ")
            )));
        }

        let placeholders = columns
            .iter()
            .map(|column| {
                let param = row.get(column).cloned().ok_or_else(|| {
                    PgError::validation(format!("insert row {index} is missing '{column}'"))
                })?;
                Ok(format!("${}", params.push_param(param)))
            })
            .collect::<PgResult<Vec<_>>>()?;
        tuples.push(format!("({})", placeholders.join(", ")));
    }

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        column_sql.join(", "),
        tuples.join(", ")
    );

    if !conflict_columns.is_empty() {
        let target = conflict_columns
            .iter()
            .map(|c| Ident::column(c).map(|i| i.to_sql()))
            .collect::<PgResult<Vec<_>>>()?;
        let assignments: Vec<String> = column_sql
            .iter()
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect();
        sql.push_str(&format!(
            " ON CONFLICT ({}) DO UPDATE SET {}",
            target.join(", "),
            assignments.join(", ")
        ));
    }

    sql.push_str(" RETURNING *");
    Ok(Statement { sql, params })
}

/// `UPDATE t SET a = $1, .. WHERE x = $n AND .. RETURNING *`
///
/// SET parameters come first, then the filter parameters.
pub fn update(table: &str, filter: &Record, data: &Record) -> PgResult<Statement> {
    let table = Ident::parse(table)?.to_sql();
    if data.is_empty() {
        return Err(PgError::validation("update requires at least one column to set"));
    }
    if filter.is_empty() {
        return Err(PgError::validation("update requires a non-empty filter"));
    }

    let mut params = ParamList::new();
    let assignments = equalities(data, &mut params)?;
    let conditions = equalities(filter, &mut params)?;

    let sql = format!(
        "UPDATE {} SET {} WHERE {} RETURNING *",
        table,
        assignments.join(", "),
        conditions.join(" AND ")
    );
    Ok(Statement { sql, params })
}

/// `DELETE FROM t WHERE x = $1 AND ..`
pub fn delete(table: &str, filter: &Record) -> PgResult<Statement> {
    let table = Ident::parse(table)?.to_sql();
    if filter.is_empty() {
        return Err(PgError::validation("delete requires a non-empty filter"));
    }

    let mut params = ParamList::new();
    let conditions = equalities(filter, &mut params)?;
    let sql = format!("DELETE FROM {} WHERE {}", table, conditions.join(" AND "));
    Ok(Statement { sql, params })
}

/// `SELECT * FROM t [WHERE x = $1 AND ..]`; an empty filter selects everything.
pub fn select(table: &str, filter: &Record) -> PgResult<Statement> {
    let table = Ident::parse(table)?.to_sql();
    let mut params = ParamList::new();
    let conditions = equalities(filter, &mut params)?;

    let sql = if conditions.is_empty() {
        format!("SELECT * FROM {table}")
    } else {
        format!("SELECT * FROM {} WHERE {}", table, conditions.join(" AND "))
    };
    Ok(Statement { sql, params })
}

/// `col = $n` for each entry, numbering after whatever `params` already holds.
fn equalities(record: &Record, params: &mut ParamList) -> PgResult<Vec<String>> {
    record
        .iter()
        .map(|(column, param)| {
            let column = Ident::column(column)?.to_sql();
            let idx = params.push_param(param.clone());
            Ok(format!("{column} = ${idx}"))
        })
        .collect()
}

#[cfg(test)]
mod tests;
