use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures_util::TryStreamExt;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use sqlx::mysql::types::MySqlTime;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection as _, Executor, Row, TypeInfo, ValueRef};

use crate::backend::{
    Backend, CellValue, ColumnMeta, ResultFrame, decode_error, hex_text, query_error,
};
use crate::config::NetworkParams;
use crate::error::DashError;

pub struct MySqlBackend {
    conn: MySqlConnection,
}

impl MySqlBackend {
    pub async fn connect(params: &NetworkParams) -> Result<Self, DashError> {
        let mut options = MySqlConnectOptions::new()
            .host(&params.host)
            .username(&params.user)
            .password(params.password.expose_secret())
            .database(&params.database);
        if let Some(port) = params.port {
            options = options.port(port);
        }

        let conn = MySqlConnection::connect_with(&options)
            .await
            .map_err(|e| DashError::Connection {
                message: format!("connection failed: {}", e),
            })?;

        Ok(Self { conn })
    }
}

impl Backend for MySqlBackend {
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
                rows.push(
                    meta.iter()
                        .enumerate()
                        .map(|(idx, col)| decode_cell(&row, idx, col))
                        .collect::<Result<Vec<_>, _>>()?,
                );
            }
        }

        let columns = match columns {
            Some(columns) => columns,
            None => {
                let describe = self.conn.describe(sql).await.map_err(query_error)?;
                describe
                    .columns()
                    .iter()
                    .map(|c| ColumnMeta::new(c.name(), c.type_info().name()))
                    .collect()
            }
        };

        Ok(ResultFrame {
            columns,
            rows,
            truncated,
        })
    }

    async fn close(self) -> Result<(), DashError> {
        self.conn.close().await.map_err(|e| DashError::Connection {
            message: format!("failed to close connection: {}", e),
        })
    }
}

fn column_meta(row: &MySqlRow) -> Vec<ColumnMeta> {
    row.columns()
        .iter()
        .map(|c| ColumnMeta::new(c.name(), c.type_info().name()))
        .collect()
}

/// Try the common MySQL decodes in order of specificity. TIME is read as a
/// signed duration; bytes that are not UTF-8 render as hex.
fn decode_cell(row: &MySqlRow, idx: usize, meta: &ColumnMeta) -> Result<CellValue, DashError> {
    if row.try_get_raw(idx).map_err(query_error)?.is_null() {
        return Ok(CellValue::Null);
    }
    if meta.type_name == "TIME" {
        return row
            .try_get::<MySqlTime, _>(idx)
            .map(|t| CellValue::Text(t.to_string()))
            .map_err(|e| decode_error(&meta.name, &meta.type_name, e));
    }
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Ok(CellValue::Int(v));
    }
    if let Ok(v) = row.try_get::<u64, _>(idx) {
        return Ok(i64::try_from(v).map_or_else(|_| CellValue::Text(v.to_string()), CellValue::Int));
    }
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return Ok(CellValue::Float(v));
    }
    if let Ok(v) = row.try_get::<f32, _>(idx) {
        return Ok(CellValue::Float(f64::from(v)));
    }
    if let Ok(v) = row.try_get::<Decimal, _>(idx) {
        return Ok(v
            .to_f64()
            .map_or_else(|| CellValue::Text(v.to_string()), CellValue::Float));
    }
    if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
        return Ok(CellValue::DateTime(v));
    }
    if let Ok(v) = row.try_get::<DateTime<Utc>, _>(idx) {
        return Ok(CellValue::DateTime(v.naive_utc()));
    }
    if let Ok(v) = row.try_get::<NaiveDate, _>(idx) {
        return Ok(CellValue::Date(v));
    }
    if let Ok(v) = row.try_get::<String, _>(idx) {
        return Ok(CellValue::Text(v));
    }
    // ENUM, SET, JSON and binary columns arrive as raw bytes.
    let bytes = row
        .try_get_unchecked::<Vec<u8>, _>(idx)
        .map_err(|e| decode_error(&meta.name, &meta.type_name, e))?;
    Ok(bytes_cell(bytes))
}

fn bytes_cell(bytes: Vec<u8>) -> CellValue {
    match String::from_utf8(bytes) {
        Ok(text) => CellValue::Text(text),
        Err(e) => CellValue::Text(hex_text(e.as_bytes())),
    }
}
