mod common;

use dbdash::backend::CellValue;
use dbdash::error::DashError;
use dbdash::query::{build_join_query, default_select_list, perform_join, JoinSpec, TableColumns};

use common::{open_session, seed_database, JOIN_FIXTURE};

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn preds(preds: &[&str]) -> Vec<String> {
    cols(preds)
}

fn a_and_b() -> Vec<TableColumns> {
    vec![
        TableColumns::new("A", cols(&["id", "name"])),
        TableColumns::new("B", cols(&["id", "val"])),
    ]
}

// --- builder ---

#[test]
fn default_selection_aliases_every_column_in_order() {
    assert_eq!(
        default_select_list(&a_and_b()),
        vec!["A.id AS A_id", "A.name AS A_name", "B.id AS B_id", "B.val AS B_val"]
    );
}

#[test]
fn two_table_join_text() {
    let sql = build_join_query(&a_and_b(), &preds(&["A.id = B.id"]), &[]).unwrap();
    assert_eq!(
        sql,
        "SELECT A.id AS A_id, A.name AS A_name, B.id AS B_id, B.val AS B_val \
         FROM A INNER JOIN B ON A.id = B.id"
    );
}

#[test]
fn join_clauses_follow_table_order() {
    let tables = vec![
        TableColumns::new("T0", cols(&["a"])),
        TableColumns::new("T1", cols(&["b"])),
        TableColumns::new("T2", cols(&["c"])),
        TableColumns::new("T3", cols(&["d"])),
    ];
    let predicates = preds(&["T0.a = T1.b", "T1.b = T2.c", "T2.c = T3.d AND T3.d > 0"]);
    let sql = build_join_query(&tables, &predicates, &[]).unwrap();

    assert_eq!(sql.matches("INNER JOIN").count(), 3);
    let mut cursor = 0;
    for (table, predicate) in tables[1..].iter().zip(&predicates) {
        let clause = format!("INNER JOIN {} ON {}", table.table, predicate);
        let at = sql[cursor..]
            .find(&clause)
            .unwrap_or_else(|| panic!("missing '{}' after byte {} in {}", clause, cursor, sql));
        cursor += at + clause.len();
    }
}

#[test]
fn explicit_selection_is_used_verbatim() {
    let sql = build_join_query(&a_and_b(), &preds(&["A.id = B.id"]), &cols(&["A.name", "B.val"]))
        .unwrap();
    assert_eq!(sql, "SELECT A.name, B.val FROM A INNER JOIN B ON A.id = B.id");
}

#[test]
fn precondition_failures_build_nothing() {
    let one = vec![TableColumns::new("A", cols(&["id"]))];
    assert_eq!(build_join_query(&one, &[], &[]), None);
    assert_eq!(build_join_query(&[], &[], &[]), None);
    assert_eq!(build_join_query(&a_and_b(), &[], &[]), None);
    assert_eq!(build_join_query(&a_and_b(), &preds(&["  "]), &[]), None);
    assert_eq!(build_join_query(&a_and_b(), &preds(&["A.id = B.id", "x = y"]), &[]), None);
}

#[test]
fn join_spec_completeness() {
    let spec = JoinSpec {
        tables: cols(&["A", "B", "C"]),
        predicates: preds(&["A.id = B.a_id"]),
        select: vec![],
    };
    assert!(!spec.is_complete());
    assert!(JoinSpec {
        predicates: preds(&["A.id = B.a_id", "B.id = C.b_id"]),
        ..spec
    }
    .is_complete());
}

#[test]
fn extra_predicates_are_rejected_not_truncated() {
    let surplus = preds(&["A.id = B.a_id", "B.id = A.b_id"]);
    assert_eq!(build_join_query(&a_and_b(), &surplus, &[]), None);

    let spec = JoinSpec {
        tables: cols(&["A", "B"]),
        predicates: surplus,
        select: vec![],
    };
    assert!(!spec.is_complete());
    assert!(JoinSpec {
        predicates: preds(&["A.id = B.a_id"]),
        ..spec
    }
    .is_complete());
}

// --- execution against SQLite ---

#[tokio::test]
async fn perform_join_returns_joined_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed_database(dir.path(), "shop.db", JOIN_FIXTURE).await;
    let mut session = open_session(&path).await;

    let spec = JoinSpec {
        tables: cols(&["A", "B"]),
        predicates: preds(&["A.id = B.a_id"]),
        select: vec![],
    };
    let outcome = perform_join(&mut session, &spec, None).await.unwrap().unwrap();

    assert_eq!(
        outcome.frame.column_names(),
        vec!["A_id", "A_name", "B_id", "B_a_id", "B_val"]
    );
    assert_eq!(outcome.frame.rows.len(), 3);
    assert!(outcome.sql.contains("FROM A INNER JOIN B ON A.id = B.a_id"));

    let alpha_rows = outcome
        .frame
        .rows
        .iter()
        .filter(|row| row[1] == CellValue::Text("alpha".to_string()))
        .count();
    assert_eq!(alpha_rows, 2);

    session.close().await.unwrap();
}

#[tokio::test]
async fn perform_join_with_explicit_selection() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed_database(dir.path(), "shop.db", JOIN_FIXTURE).await;
    let mut session = open_session(&path).await;

    let spec = JoinSpec {
        tables: cols(&["a", "b"]),
        predicates: preds(&["A.id = B.a_id"]),
        select: cols(&["a.NAME", "B.val"]),
    };
    let outcome = perform_join(&mut session, &spec, None).await.unwrap().unwrap();
    assert!(outcome.sql.starts_with("SELECT A.name, B.val FROM A INNER JOIN B"), "Got: {}", outcome.sql);
    assert_eq!(outcome.frame.columns.len(), 2);

    session.close().await.unwrap();
}

#[tokio::test]
async fn perform_join_applies_row_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed_database(dir.path(), "shop.db", JOIN_FIXTURE).await;
    let mut session = open_session(&path).await;

    let spec = JoinSpec {
        tables: cols(&["A", "B"]),
        predicates: preds(&["A.id = B.a_id"]),
        select: vec![],
    };
    let outcome = perform_join(&mut session, &spec, Some(1)).await.unwrap().unwrap();
    assert_eq!(outcome.frame.rows.len(), 1);
    assert!(outcome.frame.truncated);

    session.close().await.unwrap();
}

#[tokio::test]
async fn perform_join_skips_incomplete_requests() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed_database(dir.path(), "shop.db", JOIN_FIXTURE).await;
    let mut session = open_session(&path).await;

    let spec = JoinSpec {
        tables: cols(&["A"]),
        predicates: vec![],
        select: vec![],
    };
    assert!(perform_join(&mut session, &spec, None).await.unwrap().is_none());

    session.close().await.unwrap();
}

#[tokio::test]
async fn perform_join_rejects_unknown_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed_database(dir.path(), "shop.db", JOIN_FIXTURE).await;
    let mut session = open_session(&path).await;

    let spec = JoinSpec {
        tables: cols(&["A", "B; DROP TABLE A"]),
        predicates: preds(&["A.id = B.a_id"]),
        select: vec![],
    };
    let err = perform_join(&mut session, &spec, None).await.unwrap_err();
    assert!(matches!(err, DashError::Validation { .. }), "Got: {}", err);

    // Table A is still there.
    assert_eq!(
        session.fetch("SELECT COUNT(*) FROM A", &[]).await.unwrap().first_cell(),
        Some(&CellValue::Int(3))
    );

    session.close().await.unwrap();
}

#[tokio::test]
async fn perform_join_rejects_stacked_predicates() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed_database(dir.path(), "shop.db", JOIN_FIXTURE).await;
    let mut session = open_session(&path).await;

    let spec = JoinSpec {
        tables: cols(&["A", "B"]),
        predicates: preds(&["A.id = B.a_id; DELETE FROM A"]),
        select: vec![],
    };
    let err = perform_join(&mut session, &spec, None).await.unwrap_err();
    assert!(matches!(err, DashError::Validation { .. }), "Got: {}", err);

    session.close().await.unwrap();
}

#[tokio::test]
async fn perform_join_rejects_unknown_selected_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed_database(dir.path(), "shop.db", JOIN_FIXTURE).await;
    let mut session = open_session(&path).await;

    let spec = JoinSpec {
        tables: cols(&["A", "B"]),
        predicates: preds(&["A.id = B.a_id"]),
        select: cols(&["A.password"]),
    };
    let err = perform_join(&mut session, &spec, None).await.unwrap_err();
    assert!(err.to_string().contains("has no column 'password'"), "Got: {}", err);

    session.close().await.unwrap();
}
