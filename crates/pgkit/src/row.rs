//! Row mapping traits and utilities

use crate::error::{PgError, PgResult};
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};

/// Trait for converting a database row into a Rust type.
///
/// The CRUD helpers are generic over it, so the caller's type parameter
/// decides the shape of the returned rows.
///
/// # Example
///
/// ```ignore
/// use pgkit::{FromRow, PgResult, RowExt};
/// use tokio_postgres::Row;
///
/// struct Item {
///     id: i32,
///     value: String,
/// }
///
/// impl FromRow for Item {
///     fn from_row(row: &Row) -> PgResult<Self> {
///         Ok(Self {
///             id: row.try_get_column("id")?,
///             value: row.try_get_column("value")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> PgResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning PgError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> PgResult<T>
    where
        T: for<'a> FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> PgResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| PgError::decode(column, e.to_string()))
    }
}

/// Every column of the row as JSON, keyed by column name.
///
/// Handy when the caller has no struct for the table. Supported types are
/// `bool`, `int2`/`int4`/`int8`, `float4`/`float8`, `text`/`varchar`/`bpchar`/`name`
/// and `json`/`jsonb`; SQL `NULL` becomes `null`.
///
/// A non-null value of any other type (`numeric`, timestamps, `uuid`,
/// arrays, ...) is a [`PgError::Decode`]; cast it in SQL (e.g. `col::text`)
/// or map the row into a struct instead.
impl FromRow for serde_json::Map<String, serde_json::Value> {
    fn from_row(row: &Row) -> PgResult<Self> {
        let mut map = serde_json::Map::with_capacity(row.len());
        for (idx, column) in row.columns().iter().enumerate() {
            map.insert(column.name().to_string(), column_to_json(row, idx)?);
        }
        Ok(map)
    }
}

fn column_to_json(row: &Row, idx: usize) -> PgResult<serde_json::Value> {
    use serde_json::Value;

    let column = &row.columns()[idx];
    let decode = |e: tokio_postgres::Error| PgError::decode(column.name(), e.to_string());

    let value = match column.type_().name() {
        "bool" => row.try_get::<_, Option<bool>>(idx).map_err(decode)?.map(Value::from),
        "int2" => row.try_get::<_, Option<i16>>(idx).map_err(decode)?.map(Value::from),
        "int4" => row.try_get::<_, Option<i32>>(idx).map_err(decode)?.map(Value::from),
        "int8" => row.try_get::<_, Option<i64>>(idx).map_err(decode)?.map(Value::from),
        "float4" => row.try_get::<_, Option<f32>>(idx).map_err(decode)?.map(Value::from),
        "float8" => row.try_get::<_, Option<f64>>(idx).map_err(decode)?.map(Value::from),
        "text" | "varchar" | "bpchar" | "name" => row
            .try_get::<_, Option<String>>(idx)
            .map_err(decode)?
            .map(Value::from),
        "json" | "jsonb" => row.try_get::<_, Option<Value>>(idx).map_err(decode)?,
        other => match row.try_get::<_, Option<Present>>(idx).map_err(decode)? {
            None => None,
            Some(Present) => {
                return Err(PgError::decode(
                    column.name(),
                    format!("no JSON mapping for type '{other}'"),
                ));
            }
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Accepts any non-null value without decoding it.
struct Present;

impl<'a> FromSql<'a> for Present {
    fn from_sql(
        _ty: &Type,
        _raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Present)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}
