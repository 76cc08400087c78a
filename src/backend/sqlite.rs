use std::path::{Path, PathBuf};

use futures_util::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection as _, Executor, Row, TypeInfo, ValueRef};

use crate::backend::{
    Backend, CellValue, ColumnMeta, ResultFrame, decode_error, hex_text, parse_temporal, query_error,
};
use crate::error::DashError;

pub struct SqliteBackend {
    path: PathBuf,
    conn: SqliteConnection,
}

impl SqliteBackend {
    /// Open an existing database file. Missing files are a connection error
    /// rather than silently creating an empty database.
    pub async fn connect(path: &Path) -> Result<Self, DashError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false);

        let conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| DashError::Connection {
                message: format!("cannot open sqlite database {}: {}", path.display(), e),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    async fn describe_columns(&mut self, sql: &str) -> Result<Vec<ColumnMeta>, DashError> {
        let describe = self.conn.describe(sql).await.map_err(query_error)?;
        Ok(describe
            .columns()
            .iter()
            .map(|c| ColumnMeta::new(c.name(), c.type_info().name()))
            .collect())
    }
}

impl Backend for SqliteBackend {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[String],
        limit: Option<usize>,
    ) -> Result<ResultFrame, DashError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.as_str());
        }

        let mut columns: Option<Vec<ColumnMeta>> = None;
        let mut rows = Vec::new();
        let mut truncated = false;

        {
            let mut stream = query.fetch(&mut self.conn);
            while let Some(row) = stream.try_next().await.map_err(query_error)? {
                if limit.is_some_and(|lim| rows.len() >= lim) {
                    truncated = true;
                    break;
                }
                let meta = columns.get_or_insert_with(|| column_meta(&row));
                rows.push(decode_row(&row, meta)?);
            }
        }

        // Empty results still report their column names.
        let columns = match columns {
            Some(columns) => columns,
            None => self.describe_columns(sql).await?,
        };

        Ok(ResultFrame {
            columns,
            rows,
            truncated,
        })
    }

    async fn close(self) -> Result<(), DashError> {
        self.conn.close().await.map_err(|e| DashError::Connection {
            message: format!("failed to close sqlite database {}: {}", self.path.display(), e),
        })
    }
}

fn column_meta(row: &SqliteRow) -> Vec<ColumnMeta> {
    row.columns()
        .iter()
        .map(|c| ColumnMeta::new(c.name(), c.type_info().name()))
        .collect()
}

fn decode_row(row: &SqliteRow, columns: &[ColumnMeta]) -> Result<Vec<CellValue>, DashError> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, meta)| decode_cell(row, idx, meta))
        .collect()
}

/// SQLite is dynamically typed: decode by storage class, then use the
/// declared column type as a hint for dates stored as text.
fn decode_cell(row: &SqliteRow, idx: usize, meta: &ColumnMeta) -> Result<CellValue, DashError> {
    if row.try_get_raw(idx).map_err(query_error)?.is_null() {
        return Ok(CellValue::Null);
    }
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Ok(CellValue::Int(v));
    }
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return Ok(CellValue::Float(v));
    }
    if let Ok(text) = row.try_get::<String, _>(idx) {
        if is_temporal_declared(&meta.type_name)
            && let Some(cell) = parse_temporal(&text)
        {
            return Ok(cell);
        }
        return Ok(CellValue::Text(text));
    }
    row.try_get::<Vec<u8>, _>(idx)
        .map(|bytes| CellValue::Text(hex_text(&bytes)))
        .map_err(|e| decode_error(&meta.name, &meta.type_name, e))
}

fn is_temporal_declared(declared: &str) -> bool {
    let upper = declared.to_ascii_uppercase();
    upper.contains("DATE") || upper.contains("TIME")
}
