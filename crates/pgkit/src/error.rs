//! Error types for pgkit

use std::fmt;
use thiserror::Error;
use tokio_postgres::error::ErrorPosition;
use tokio_postgres::types::ToSql;

/// Result type alias for pgkit operations
pub type PgResult<T> = Result<T, PgError>;

/// Error types for pool and query operations
#[derive(Debug, Error)]
pub enum PgError {
    /// The server rejected a statement; carries the full diagnostic payload
    #[error("{0}")]
    Database(Box<QueryFailure>),

    /// Any other driver failure (connection loss, protocol error, ...)
    #[error("Query error: {0}")]
    Query(String),

    /// An update matched no rows
    #[error("Update failed: no rows matched in table '{table}'")]
    UpdateFailed { table: String },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Input rejected before any SQL was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Pool error
    #[error("Pool error: {0}")]
    Pool(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PgError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is the "update matched nothing" error
    pub fn is_update_failed(&self) -> bool {
        matches!(self, Self::UpdateFailed { .. })
    }

    /// SQLSTATE code reported by the server, if this is a database failure.
    pub fn db_code(&self) -> Option<&str> {
        match self {
            Self::Database(failure) => failure.info.code.as_deref(),
            _ => None,
        }
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        self.db_code() == Some("23505")
    }

    /// Check if this is a foreign key violation error
    pub fn is_foreign_key_violation(&self) -> bool {
        self.db_code() == Some("23503")
    }

    /// Name of the violated constraint, when the server reported one.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            Self::Database(failure) => failure.info.constraint.as_deref(),
            _ => None,
        }
    }

    /// Wrap a failure reported by a client, attaching the statement that caused it.
    ///
    /// Structured server errors keep the SQL text and the parameter list so the
    /// message can be read without reproducing the call. Everything else keeps
    /// only the driver's message.
    pub fn from_driver(err: DriverError, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Self {
        match err {
            DriverError::Database(info) => Self::Database(Box::new(QueryFailure {
                info,
                sql: sql.to_string(),
                params: format!("{params:?}"),
            })),
            DriverError::Other(message) if message.is_empty() => {
                Self::Query("unknown error".to_string())
            }
            DriverError::Other(message) => Self::Query(message),
        }
    }
}

/// Diagnostic fields reported by the server for a failed statement.
///
/// Absent fields stay `None`; they are only rendered as `N/A` when the
/// failure is formatted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbErrorInfo {
    pub message: String,
    pub code: Option<String>,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub position: Option<u32>,
    pub constraint: Option<String>,
}

impl DbErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    fn from_db_error(db: &tokio_postgres::error::DbError) -> Self {
        let position = db.position().map(|p| match p {
            ErrorPosition::Original(pos) => *pos,
            ErrorPosition::Internal { position, .. } => *position,
        });
        Self {
            message: db.message().to_string(),
            code: Some(db.code().code().to_string()),
            detail: db.detail().map(str::to_string),
            hint: db.hint().map(str::to_string),
            position,
            constraint: db.constraint().map(str::to_string),
        }
    }
}

/// A failure returned by a [`GenericClient`](crate::GenericClient) before any
/// statement context is attached.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// Structured error reported by the server
    #[error("{}", .0.message)]
    Database(DbErrorInfo),

    /// Anything else: I/O, protocol, closed connection
    #[error("{0}")]
    Other(String),
}

impl From<tokio_postgres::Error> for DriverError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db) => Self::Database(DbErrorInfo::from_db_error(db)),
            None => Self::Other(err.to_string()),
        }
    }
}

/// A statement the server rejected, with everything needed to diagnose it.
#[derive(Debug, Clone)]
pub struct QueryFailure {
    pub info: DbErrorInfo,
    pub sql: String,
    /// `Debug` rendering of the bound parameters, e.g. `[1, "a"]`.
    pub params: String,
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_na(value: Option<&str>) -> &str {
            value.unwrap_or("N/A")
        }

        let position = self.info.position.map(|p| p.to_string());
        writeln!(f, "Database query failed: {}", self.info.message)?;
        writeln!(f, "  code: {}", or_na(self.info.code.as_deref()))?;
        writeln!(f, "  detail: {}", or_na(self.info.detail.as_deref()))?;
        writeln!(f, "  hint: {}", or_na(self.info.hint.as_deref()))?;
        writeln!(f, "  position: {}", or_na(position.as_deref()))?;
        writeln!(f, "  sql: {}", self.sql)?;
        write!(f, "  params: {}", self.params)
    }
}

impl From<deadpool::managed::PoolError<DriverError>> for PgError {
    fn from(err: deadpool::managed::PoolError<DriverError>) -> Self {
        match err {
            deadpool::managed::PoolError::Backend(e) => Self::Connection(e.to_string()),
            other => Self::Pool(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_failure_echoes_sql_and_params() {
        let info = DbErrorInfo::new("duplicate key value violates unique constraint \"list_pkey\"")
            .with_code("23505")
            .with_detail("Key (id)=(1) already exists.");
        let id = 1i32;
        let value = "a";
        let params: [&(dyn ToSql + Sync); 2] = [&id, &value];

        let err = PgError::from_driver(
            DriverError::Database(info),
            "INSERT INTO list (id, value) VALUES ($1, $2) RETURNING *",
            &params,
        );

        assert!(err.is_unique_violation());
        let msg = err.to_string();
        assert!(msg.starts_with("Database query failed: duplicate key value"));
        assert!(msg.contains("code: 23505"));
        assert!(msg.contains("detail: Key (id)=(1) already exists."));
        assert!(msg.contains("hint: N/A"));
        assert!(msg.contains("position: N/A"));
        assert!(msg.contains("sql: INSERT INTO list (id, value) VALUES ($1, $2) RETURNING *"));
        assert!(msg.contains(r#"params: [1, "a"]"#));
    }

    #[test]
    fn foreign_key_violation_reports_constraint() {
        let info = DbErrorInfo::new(
            "insert or update on table \"item\" violates foreign key constraint \"item_list_id_fkey\"",
        )
        .with_code("23503")
        .with_constraint("item_list_id_fkey");
        let list_id = 9i32;
        let params: [&(dyn ToSql + Sync); 1] = [&list_id];

        let err = PgError::from_driver(
            DriverError::Database(info),
            "INSERT INTO item (list_id) VALUES ($1) RETURNING *",
            &params,
        );

        assert!(err.is_foreign_key_violation());
        assert!(!err.is_unique_violation());
        assert_eq!(err.constraint(), Some("item_list_id_fkey"));
        assert_eq!(PgError::validation("x").constraint(), None);
    }

    #[test]
    fn absent_fields_stay_none_until_formatting() {
        let info = DbErrorInfo::new("syntax error").with_position(8);
        assert_eq!(info.code, None);
        assert_eq!(info.position, Some(8));

        let err = PgError::from_driver(DriverError::Database(info), "SELEC 1", &[]);
        assert_eq!(err.db_code(), None);
        let msg = err.to_string();
        assert!(msg.contains("code: N/A"));
        assert!(msg.contains("position: 8"));
        assert!(msg.contains("params: []"));
    }

    #[test]
    fn unstructured_failure_keeps_only_the_message() {
        let secret = "hunter2";
        let params: [&(dyn ToSql + Sync); 1] = [&secret];
        let err = PgError::from_driver(
            DriverError::Other("connection closed".to_string()),
            "SELECT * FROM list WHERE value = $1",
            &params,
        );

        assert_eq!(err.to_string(), "Query error: connection closed");
        assert!(!err.to_string().contains("SELECT"));
        assert!(!err.to_string().contains(secret));
    }

    #[test]
    fn empty_driver_message_becomes_unknown_error() {
        let err = PgError::from_driver(DriverError::Other(String::new()), "SELECT 1", &[]);
        assert_eq!(err.to_string(), "Query error: unknown error");
    }

    #[test]
    fn update_failed_names_the_table() {
        let err = PgError::UpdateFailed {
            table: "list".to_string(),
        };
        assert!(err.is_update_failed());
        assert_eq!(
            err.to_string(),
            "Update failed: no rows matched in table 'list'"
        );
    }
}
