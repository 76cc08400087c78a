use dbdash::backend::BackendKind;
use dbdash::dialect::{dialect_for, Dialect, SqlServerDialect, SqliteDialect};

#[test]
fn catalog_queries_match_each_backend() {
    let expected = [
        (BackendKind::Sqlite, "SELECT name FROM sqlite_master WHERE type='table';"),
        (BackendKind::MySql, "SHOW TABLES;"),
        (
            BackendKind::Postgres,
            "SELECT table_name FROM information_schema.tables WHERE table_schema='public';",
        ),
        (
            BackendKind::SqlServer,
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE='BASE TABLE';",
        ),
    ];
    for (kind, sql) in expected {
        assert_eq!(dialect_for(kind).catalog_query(), sql, "catalog query for {}", kind);
    }
}

#[test]
fn dialect_for_is_a_pure_mapping() {
    for kind in BackendKind::ALL {
        assert_eq!(dialect_for(kind).kind(), kind);
    }
}

#[test]
fn limit_offset_uses_page_times_size() {
    for kind in [BackendKind::Sqlite, BackendKind::MySql, BackendKind::Postgres] {
        assert_eq!(
            dialect_for(kind).paged_query("vendas", 2, 50),
            "SELECT * FROM vendas LIMIT 50 OFFSET 100"
        );
    }
}

#[test]
fn first_page_has_zero_offset() {
    assert_eq!(
        SqliteDialect.paged_query("vendas", 0, 10),
        "SELECT * FROM vendas LIMIT 10 OFFSET 0"
    );
}

#[test]
fn sqlserver_uses_offset_fetch() {
    assert_eq!(
        SqlServerDialect.paged_query("vendas", 3, 25),
        "SELECT * FROM vendas ORDER BY (SELECT NULL) OFFSET 75 ROWS FETCH NEXT 25 ROWS ONLY"
    );
}

#[test]
fn count_query_is_shared() {
    for kind in BackendKind::ALL {
        assert_eq!(dialect_for(kind).count_query("t"), "SELECT COUNT(*) FROM t");
    }
}

#[test]
fn columns_queries_bind_the_table_name() {
    assert!(dialect_for(BackendKind::Sqlite).columns_query().contains("pragma_table_info(?)"));
    assert!(dialect_for(BackendKind::MySql).columns_query().contains("TABLE_NAME = ?"));
    assert!(dialect_for(BackendKind::Postgres).columns_query().contains("table_name = $1"));
    assert!(dialect_for(BackendKind::SqlServer).columns_query().contains("TABLE_NAME = ?"));
}
