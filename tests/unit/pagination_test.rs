mod common;

use dbdash::backend::CellValue;
use dbdash::pagination::{count_rows, load_page, load_page_view, total_pages, PageRequest};
use dbdash::schema::{Catalog, TableRef};

use common::{open_session, seed_numbers};

fn table(name: &str) -> TableRef {
    Catalog::from_tables(vec![name.to_string()]).resolve(name).unwrap()
}

#[test]
fn total_pages_rounds_up() {
    assert_eq!(total_pages(101, 50), 3);
    assert_eq!(total_pages(100, 50), 2);
    assert_eq!(total_pages(1, 50), 1);
    assert_eq!(total_pages(0, 50), 0);
}

#[test]
fn offset_is_page_times_size() {
    let request = PageRequest::new(table("nums"), 3, 25).unwrap();
    assert_eq!(request.offset(), 75);
    assert_eq!(PageRequest::new(table("nums"), 0, 25).unwrap().offset(), 0);
}

#[test]
fn page_size_must_be_in_range() {
    assert!(PageRequest::new(table("nums"), 0, 0).is_err());
    assert!(PageRequest::new(table("nums"), 0, 501).is_err());
    assert!(PageRequest::new(table("nums"), 0, 500).is_ok());
}

#[tokio::test]
async fn count_and_pages_for_101_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed_numbers(dir.path(), 101).await;
    let mut session = open_session(&path).await;

    let count = count_rows(&mut session, &table("nums")).await.unwrap();
    assert_eq!(count, 101);
    assert_eq!(total_pages(count, 50), 3);

    session.close().await.unwrap();
}

#[tokio::test]
async fn pages_are_disjoint_windows() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed_numbers(dir.path(), 101).await;
    let mut session = open_session(&path).await;

    let first = load_page(&mut session, &PageRequest::new(table("nums"), 0, 50).unwrap())
        .await
        .unwrap();
    assert_eq!(first.rows.len(), 50);
    assert_eq!(first.rows[0][0], CellValue::Int(1));
    assert_eq!(first.rows[49][0], CellValue::Int(50));

    let second = load_page(&mut session, &PageRequest::new(table("nums"), 1, 50).unwrap())
        .await
        .unwrap();
    assert_eq!(second.rows[0][0], CellValue::Int(51));

    let last = load_page(&mut session, &PageRequest::new(table("nums"), 2, 50).unwrap())
        .await
        .unwrap();
    assert_eq!(last.rows.len(), 1);
    assert_eq!(last.rows[0][0], CellValue::Int(101));

    session.close().await.unwrap();
}

#[tokio::test]
async fn page_view_reports_totals() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed_numbers(dir.path(), 101).await;
    let mut session = open_session(&path).await;

    let view = load_page_view(&mut session, PageRequest::new(table("nums"), 1, 50).unwrap())
        .await
        .unwrap();
    assert_eq!(view.total_rows, 101);
    assert_eq!(view.total_pages, 3);
    assert_eq!(view.frame.rows.len(), 50);
    assert!(!view.is_past_end());

    let beyond = load_page_view(&mut session, PageRequest::new(table("nums"), 7, 50).unwrap())
        .await
        .unwrap();
    assert!(beyond.frame.rows.is_empty());
    assert_eq!(beyond.frame.column_names(), vec!["id"]);
    assert!(beyond.is_past_end());

    session.close().await.unwrap();
}
