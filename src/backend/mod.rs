pub mod mysql;
pub mod postgres;
pub mod sqlite;
pub mod sqlserver;

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::BackendConfig;
use crate::error::DashError;

/// The four supported relational systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Sqlite,
    MySql,
    Postgres,
    SqlServer,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Sqlite,
        BackendKind::MySql,
        BackendKind::Postgres,
        BackendKind::SqlServer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::MySql => "mysql",
            BackendKind::Postgres => "postgres",
            BackendKind::SqlServer => "sqlserver",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(BackendKind::Sqlite),
            "mysql" => Ok(BackendKind::MySql),
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "sqlserver" | "mssql" => Ok(BackendKind::SqlServer),
            other => Err(DashError::Config {
                message: format!(
                    "unknown backend type: '{}' (expected 'sqlite', 'mysql', 'postgres' or 'sqlserver')",
                    other
                ),
            }),
        }
    }
}

/// Metadata for a single result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub type_name: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// A single typed cell value from a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Calendar day of a temporal cell.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// An in-memory tabular result: ordered named columns and row-major cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultFrame {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<CellValue>>,
    /// Set when materialization stopped at a row limit.
    pub truncated: bool,
}

impl ResultFrame {
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            columns,
            rows,
            truncated: false,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Cells of one column, top to bottom. Short rows yield `Null`.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &CellValue> {
        self.rows
            .iter()
            .map(move |row| row.get(idx).unwrap_or(&CellValue::Null))
    }

    pub fn first_cell(&self) -> Option<&CellValue> {
        self.rows.first().and_then(|row| row.first())
    }

    /// Non-null values of the first column rendered as text.
    pub fn first_column_strings(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first())
            .filter(|cell| !cell.is_null())
            .map(|cell| cell.to_string())
            .collect()
    }
}

/// Trait for database backends.
pub trait Backend {
    /// Execute one statement, binding `params` positionally, and materialize
    /// at most `limit` rows.
    fn execute(
        &mut self,
        sql: &str,
        params: &[String],
        limit: Option<usize>,
    ) -> impl std::future::Future<Output = Result<ResultFrame, DashError>> + Send;

    /// Release the underlying connection.
    fn close(self) -> impl std::future::Future<Output = Result<(), DashError>> + Send;
}

/// An open connection to one of the supported backends.
pub enum Connection {
    Sqlite(sqlite::SqliteBackend),
    MySql(mysql::MySqlBackend),
    Postgres(postgres::PostgresBackend),
    SqlServer(sqlserver::SqlServerBackend),
}

impl Connection {
    /// Open a connection for the configured backend.
    ///
    /// Returns `Ok(None)` when the embedded-file backend has no database
    /// selected: no connection is attempted in that case.
    pub async fn open(
        config: &BackendConfig,
        query_timeout_secs: u64,
    ) -> Result<Option<Self>, DashError> {
        let connection = match config {
            BackendConfig::Sqlite { path: None } => return Ok(None),
            BackendConfig::Sqlite { path: Some(path) } => {
                Connection::Sqlite(sqlite::SqliteBackend::connect(path).await?)
            }
            BackendConfig::MySql(params) => {
                Connection::MySql(mysql::MySqlBackend::connect(params).await?)
            }
            BackendConfig::Postgres(params) => {
                Connection::Postgres(postgres::PostgresBackend::connect(params).await?)
            }
            BackendConfig::SqlServer(params) => Connection::SqlServer(
                sqlserver::SqlServerBackend::connect(params, query_timeout_secs).await?,
            ),
        };
        Ok(Some(connection))
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Connection::Sqlite(_) => BackendKind::Sqlite,
            Connection::MySql(_) => BackendKind::MySql,
            Connection::Postgres(_) => BackendKind::Postgres,
            Connection::SqlServer(_) => BackendKind::SqlServer,
        }
    }
}

impl Backend for Connection {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[String],
        limit: Option<usize>,
    ) -> Result<ResultFrame, DashError> {
        match self {
            Connection::Sqlite(b) => b.execute(sql, params, limit).await,
            Connection::MySql(b) => b.execute(sql, params, limit).await,
            Connection::Postgres(b) => b.execute(sql, params, limit).await,
            Connection::SqlServer(b) => b.execute(sql, params, limit).await,
        }
    }

    async fn close(self) -> Result<(), DashError> {
        match self {
            Connection::Sqlite(b) => b.close().await,
            Connection::MySql(b) => b.close().await,
            Connection::Postgres(b) => b.close().await,
            Connection::SqlServer(b) => b.close().await,
        }
    }
}

/// Parse date or datetime text as produced by SQLite and ODBC text buffers.
pub(crate) fn parse_temporal(text: &str) -> Option<CellValue> {
    let text = text.trim();
    const DATETIME_FORMATS: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(CellValue::DateTime(dt));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(CellValue::Date)
}

pub(crate) fn query_error(e: impl fmt::Display) -> DashError {
    DashError::Query {
        message: format!("query execution failed: {}", e),
    }
}

/// A non-null value the driver could not turn into a cell.
pub(crate) fn decode_error(column: &str, type_name: &str, e: impl fmt::Display) -> DashError {
    DashError::Query {
        message: format!("cannot decode column '{}' ({}): {}", column, type_name, e),
    }
}

/// Binary values as `0x`-prefixed lowercase hex.
pub(crate) fn hex_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
