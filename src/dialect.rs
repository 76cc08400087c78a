//! Per-backend SQL text.
//!
//! Each backend kind has one unit implementation of [`Dialect`]; selection
//! is a pure mapping from [`BackendKind`] through [`dialect_for`].

use crate::backend::BackendKind;

pub trait Dialect: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Query listing the user tables of the connected database.
    fn catalog_query(&self) -> &'static str;

    /// Query listing one table's column names in declaration order.
    /// The table name is bound as the single positional parameter.
    fn columns_query(&self) -> &'static str;

    /// One page of `table`, skipping `page * page_size` rows.
    /// `table` must already be allow-listed.
    fn paged_query(&self, table: &str, page: u64, page_size: u64) -> String;

    fn count_query(&self, table: &str) -> String {
        format!("SELECT COUNT(*) FROM {}", table)
    }
}

/// Shared LIMIT/OFFSET rendering for the three dialects that support it.
fn limit_offset(table: &str, page: u64, page_size: u64) -> String {
    format!(
        "SELECT * FROM {} LIMIT {} OFFSET {}",
        table,
        page_size,
        page.saturating_mul(page_size)
    )
}

#[derive(Debug, Clone, Copy)]
pub struct SqliteDialect;

#[derive(Debug, Clone, Copy)]
pub struct MySqlDialect;

#[derive(Debug, Clone, Copy)]
pub struct PostgresDialect;

#[derive(Debug, Clone, Copy)]
pub struct SqlServerDialect;

impl Dialect for SqliteDialect {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn catalog_query(&self) -> &'static str {
        "SELECT name FROM sqlite_master WHERE type='table';"
    }

    fn columns_query(&self) -> &'static str {
        "SELECT name FROM pragma_table_info(?)"
    }

    fn paged_query(&self, table: &str, page: u64, page_size: u64) -> String {
        limit_offset(table, page, page_size)
    }
}

impl Dialect for MySqlDialect {
    fn kind(&self) -> BackendKind {
        BackendKind::MySql
    }

    fn catalog_query(&self) -> &'static str {
        "SHOW TABLES;"
    }

    fn columns_query(&self) -> &'static str {
        "SELECT COLUMN_NAME FROM INFORMATION_SCHEMA.COLUMNS \
         WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION"
    }

    fn paged_query(&self, table: &str, page: u64, page_size: u64) -> String {
        limit_offset(table, page, page_size)
    }
}

impl Dialect for PostgresDialect {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn catalog_query(&self) -> &'static str {
        "SELECT table_name FROM information_schema.tables WHERE table_schema='public';"
    }

    fn columns_query(&self) -> &'static str {
        "SELECT column_name FROM information_schema.columns \
         WHERE table_schema = 'public' AND table_name = $1 ORDER BY ordinal_position"
    }

    fn paged_query(&self, table: &str, page: u64, page_size: u64) -> String {
        limit_offset(table, page, page_size)
    }
}

impl Dialect for SqlServerDialect {
    fn kind(&self) -> BackendKind {
        BackendKind::SqlServer
    }

    fn catalog_query(&self) -> &'static str {
        "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE='BASE TABLE';"
    }

    fn columns_query(&self) -> &'static str {
        "SELECT COLUMN_NAME FROM INFORMATION_SCHEMA.COLUMNS \
         WHERE TABLE_NAME = ? ORDER BY ORDINAL_POSITION"
    }

    // OFFSET/FETCH requires an ORDER BY; the row order stays unspecified.
    fn paged_query(&self, table: &str, page: u64, page_size: u64) -> String {
        format!(
            "SELECT * FROM {} ORDER BY (SELECT NULL) OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
            table,
            page.saturating_mul(page_size),
            page_size
        )
    }
}

pub fn dialect_for(kind: BackendKind) -> &'static dyn Dialect {
    match kind {
        BackendKind::Sqlite => &SqliteDialect,
        BackendKind::MySql => &MySqlDialect,
        BackendKind::Postgres => &PostgresDialect,
        BackendKind::SqlServer => &SqlServerDialect,
    }
}
