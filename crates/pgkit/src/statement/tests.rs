//! SQL generation tests for the CRUD builders.

use crate::record;
use crate::record::Record;
use crate::statement::{delete, insert, select, update};

fn params_of(stmt: &crate::Statement) -> String {
    format!("{:?}", stmt.params().as_refs())
}

#[test]
fn test_insert_two_rows_into_list() {
    let rows = vec![
        record! { "id" => 1i32, "value" => "a" },
        record! { "id" => 2i32, "value" => "b" },
    ];

    let stmt = insert("list", &rows, &[]).unwrap();
    assert_eq!(
        stmt.sql(),
        "INSERT INTO list (id, value) VALUES ($1, $2), ($3, $4) RETURNING *"
    );
    assert_eq!(params_of(&stmt), r#"[1, "a", 2, "b"]"#);
}

#[test]
fn test_insert_placeholder_numbering() {
    let (n, k) = (4usize, 3usize);
    let rows: Vec<Record> = (0..n)
        .map(|r| {
            Record::new()
                .set("a", (r * k) as i64)
                .set("b", (r * k + 1) as i64)
                .set("c", (r * k + 2) as i64)
        })
        .collect();

    let stmt = insert("t", &rows, &[]).unwrap();
    assert_eq!(stmt.params().len(), n * k);

    let expected: Vec<String> = (0..n)
        .map(|r| {
            let cells: Vec<String> = (0..k).map(|c| format!("${}", r * k + c + 1)).collect();
            format!("({})", cells.join(", "))
        })
        .collect();
    assert!(stmt.sql().contains(&format!("VALUES {} RETURNING", expected.join(", "))));

    // Value bound at position p is exactly p - 1 when row r / column c holds r*k + c.
    let bound: Vec<String> = (0..n * k).map(|p| p.to_string()).collect();
    assert_eq!(params_of(&stmt), format!("[{}]", bound.join(", ")));
}

#[test]
fn test_insert_later_rows_follow_first_row_column_order() {
    let rows = vec![
        record! { "id" => 1i32, "value" => "a" },
        record! { "value" => "b", "id" => 2i32 },
    ];

    let stmt = insert("list", &rows, &[]).unwrap();
    assert_eq!(params_of(&stmt), r#"[1, "a", 2, "b"]"#);
}

#[test]
fn test_insert_rejects_mismatched_rows() {
    let extra = vec![
        record! { "id" => 1i32 },
        record! { "id" => 2i32, "value" => "b" },
    ];
    let err = insert("list", &extra, &[]).unwrap_err();
    assert!(err.to_string().contains("insert row 1"));

    let renamed = vec![
        record! { "id" => 1i32, "value" => "a" },
        record! { "id" => 2i32, "label" => "b" },
    ];
    assert!(insert("list", &renamed, &[]).is_err());
}

#[test]
fn test_insert_rejects_empty_input() {
    assert!(insert("list", &[], &[]).is_err());
    assert!(insert("list", &[Record::new()], &[]).is_err());
}

#[test]
fn test_insert_upsert_sets_every_column_from_excluded() {
    let rows = vec![record! { "id" => 1i32, "value" => "a", "rank" => 3i32 }];

    let stmt = insert("list", &rows, &["id"]).unwrap();
    assert_eq!(
        stmt.sql(),
        "INSERT INTO list (id, value, rank) VALUES ($1, $2, $3) \
         ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id, value = EXCLUDED.value, \
         rank = EXCLUDED.rank RETURNING *"
    );
}

#[test]
fn test_insert_composite_conflict_target() {
    let rows = vec![record! { "org" => 1i32, "slug" => "x", "title" => "X" }];
    let stmt = insert("pages", &rows, &["org", "slug"]).unwrap();
    assert!(stmt.sql().contains("ON CONFLICT (org, slug) DO UPDATE SET"));
    for column in ["org", "slug", "title"] {
        assert!(stmt.sql().contains(&format!("{column} = EXCLUDED.{column}")));
    }
}

#[test]
fn test_insert_rejects_unsafe_identifiers() {
    let rows = vec![record! { "id" => 1i32 }];
    assert!(insert("list; DROP TABLE list", &rows, &[]).is_err());
    assert!(insert("list", &[record! { "id) VALUES (1); --" => 1i32 }], &[]).is_err());
    assert!(insert("list", &rows, &["id; --"]).is_err());
}

#[test]
fn test_insert_quoted_and_qualified_names() {
    let rows = vec![record! { r#""Value""# => "a" }];
    let stmt = insert("public.list", &rows, &[]).unwrap();
    assert_eq!(
        stmt.sql(),
        r#"INSERT INTO public.list ("Value") VALUES ($1) RETURNING *"#
    );
}

#[test]
fn test_update_set_then_where() {
    let stmt = update(
        "list",
        &record! { "id" => 1i32 },
        &record! { "value" => "z" },
    )
    .unwrap();
    assert_eq!(
        stmt.sql(),
        "UPDATE list SET value = $1 WHERE id = $2 RETURNING *"
    );
    assert_eq!(params_of(&stmt), r#"["z", 1]"#);
}

#[test]
fn test_update_multiple_columns_and_conditions() {
    let stmt = update(
        "list",
        &record! { "id" => 1i32, "owner" => "ann" },
        &record! { "value" => "z", "rank" => 2i32 },
    )
    .unwrap();
    assert_eq!(
        stmt.sql(),
        "UPDATE list SET value = $1, rank = $2 WHERE id = $3 AND owner = $4 RETURNING *"
    );
    assert_eq!(params_of(&stmt), r#"["z", 2, 1, "ann"]"#);
}

#[test]
fn test_update_requires_data_and_filter() {
    assert!(update("list", &record! { "id" => 1i32 }, &Record::new()).is_err());
    assert!(update("list", &Record::new(), &record! { "value" => "z" }).is_err());
}

#[test]
fn test_delete_basic() {
    let stmt = delete("list", &record! { "id" => 1i32, "value" => "a" }).unwrap();
    assert_eq!(stmt.sql(), "DELETE FROM list WHERE id = $1 AND value = $2");
    assert!(!stmt.sql().contains("RETURNING"));
    assert_eq!(params_of(&stmt), r#"[1, "a"]"#);
}

#[test]
fn test_delete_requires_filter() {
    assert!(delete("list", &Record::new()).is_err());
}

#[test]
fn test_select_with_and_without_filter() {
    let all = select("list", &Record::new()).unwrap();
    assert_eq!(all.sql(), "SELECT * FROM list");
    assert!(all.params().is_empty());

    let one = select("list", &record! { "id" => 1i32 }).unwrap();
    assert_eq!(one.sql(), "SELECT * FROM list WHERE id = $1");
    assert_eq!(one.params().len(), 1);
}
