//! Ordered column/value mappings.
//!
//! A [`Record`] is the structured input to every CRUD helper: one row for
//! `insert`, the SET data for `update`, and the equality filter for
//! `update` / `remove` / `find`.
//!
//! ```ignore
//! use pgkit::{Record, record};
//!
//! let row = Record::new().set("id", 1i32).set("value", "a");
//! let same = record! { "id" => 1i32, "value" => "a" };
//! ```

use crate::param::Param;
use std::collections::BTreeSet;
use tokio_postgres::types::ToSql;

/// An ordered mapping from column name to parameter value.
///
/// Columns keep the order in which they were first set. Setting a column
/// again replaces its value in place.
#[derive(Clone, Debug, Default)]
pub struct Record {
    entries: Vec<(String, Param)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value (builder form).
    pub fn set<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a JSON column from any serializable value.
    pub fn set_json<T: serde::Serialize>(self, column: &str, value: &T) -> serde_json::Result<Self> {
        let json_val = serde_json::to_value(value)?;
        Ok(self.set(column, json_val))
    }

    /// Set a column value in place.
    pub fn insert<T: ToSql + Send + Sync + 'static>(&mut self, column: &str, value: T) {
        self.insert_param(column, Param::new(value));
    }

    pub fn insert_param(&mut self, column: &str, param: Param) {
        match self.entries.iter_mut().find(|(name, _)| name == column) {
            Some((_, slot)) => *slot = param,
            None => self.entries.push((column.to_string(), param)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Param> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, param)| param)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.entries.iter().map(|(name, param)| (name.as_str(), param))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether both records carry exactly the same column names, in any order.
    pub fn same_columns(&self, other: &Record) -> bool {
        self.len() == other.len()
            && self.columns().collect::<BTreeSet<_>>() == other.columns().collect::<BTreeSet<_>>()
    }
}

/// Build a [`Record`] from `column => value` pairs.
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $( record.insert($column, $value); )+
        record
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_set_order_and_replaces_in_place() {
        let record = Record::new()
            .set("id", 1i32)
            .set("value", "a")
            .set("id", 2i32);

        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["id", "value"]);
        assert_eq!(format!("{:?}", record.get("id").unwrap()), "2");
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn record_macro_matches_builder() {
        let built = Record::new().set("id", 1i32).set("value", "a");
        let from_macro = record! { "id" => 1i32, "value" => "a" };

        assert_eq!(
            built.columns().collect::<Vec<_>>(),
            from_macro.columns().collect::<Vec<_>>()
        );
        assert!(record! {}.is_empty());
    }

    #[test]
    fn same_columns_ignores_order() {
        let a = record! { "id" => 1i32, "value" => "a" };
        let b = record! { "value" => "b", "id" => 2i32 };
        let c = record! { "id" => 3i32, "label" => "c" };

        assert!(a.same_columns(&b));
        assert!(!a.same_columns(&c));
        assert!(!a.same_columns(&record! { "id" => 4i32 }));
    }

    #[test]
    fn set_json_binds_a_json_value() {
        #[derive(serde::Serialize)]
        struct Meta {
            tags: Vec<&'static str>,
        }

        let record = Record::new()
            .set_json("meta", &Meta { tags: vec!["x"] })
            .unwrap();
        assert!(record.contains("meta"));
        assert_eq!(
            format!("{:?}", record.get("meta").unwrap()),
            format!("{:?}", serde_json::json!({ "tags": ["x"] }))
        );
    }
}
