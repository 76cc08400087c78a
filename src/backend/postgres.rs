use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::TryStreamExt;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::types::{JsonValue, Uuid};
use sqlx::{Column, Connection as _, Executor, Row, TypeInfo, ValueRef};

use crate::backend::{
    Backend, CellValue, ColumnMeta, ResultFrame, decode_error, hex_text, query_error,
};
use crate::config::NetworkParams;
use crate::error::DashError;

pub struct PostgresBackend {
    conn: PgConnection,
}

impl PostgresBackend {
    pub async fn connect(params: &NetworkParams) -> Result<Self, DashError> {
        let mut options = PgConnectOptions::new()
            .host(&params.host)
            .username(&params.user)
            .password(params.password.expose_secret())
            .database(&params.database);
        if let Some(port) = params.port {
            options = options.port(port);
        }

        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| DashError::Connection {
                message: format!("connection failed: {}", e),
            })?;

        Ok(Self { conn })
    }
}

impl Backend for PostgresBackend {
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

fn column_meta(row: &PgRow) -> Vec<ColumnMeta> {
    row.columns()
        .iter()
        .map(|c| ColumnMeta::new(c.name(), c.type_info().name()))
        .collect()
}

/// How a Postgres column is read off the binary wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoding {
    Bool,
    Int2,
    Int4,
    Int8,
    Oid,
    Float4,
    Float8,
    Numeric,
    Money,
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Interval,
    Uuid,
    Json,
    Bytes,
    /// Text-like types, including catalog domains such as `sql_identifier`.
    Text,
}

fn decoding_for(pg_type_name: &str) -> Decoding {
    match pg_type_name {
        "BOOL" => Decoding::Bool,
        "INT2" => Decoding::Int2,
        "INT4" => Decoding::Int4,
        "INT8" => Decoding::Int8,
        "OID" => Decoding::Oid,
        "FLOAT4" => Decoding::Float4,
        "FLOAT8" => Decoding::Float8,
        "NUMERIC" => Decoding::Numeric,
        "MONEY" => Decoding::Money,
        "DATE" => Decoding::Date,
        "TIME" => Decoding::Time,
        "TIMETZ" => Decoding::TimeTz,
        "TIMESTAMP" => Decoding::Timestamp,
        "TIMESTAMPTZ" => Decoding::TimestampTz,
        "INTERVAL" => Decoding::Interval,
        "UUID" => Decoding::Uuid,
        "JSON" | "JSONB" => Decoding::Json,
        "BYTEA" => Decoding::Bytes,
        _ => Decoding::Text,
    }
}

/// Postgres-style interval text, e.g. `1 mons 2 days 03:04:05.000006`.
fn interval_text(interval: &PgInterval) -> String {
    let sign = if interval.microseconds < 0 { "-" } else { "" };
    let micros = interval.microseconds.unsigned_abs();
    let secs = micros / 1_000_000;
    format!(
        "{} mons {} days {}{:02}:{:02}:{:02}.{:06}",
        interval.months,
        interval.days,
        sign,
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        micros % 1_000_000
    )
}

fn decode_cell(row: &PgRow, idx: usize, meta: &ColumnMeta) -> Result<CellValue, DashError> {
    if row.try_get_raw(idx).map_err(query_error)?.is_null() {
        return Ok(CellValue::Null);
    }
    let fail = |e: sqlx::Error| decode_error(&meta.name, &meta.type_name, e);

    let cell = match decoding_for(&meta.type_name) {
        Decoding::Bool => CellValue::Bool(row.try_get::<bool, _>(idx).map_err(fail)?),
        Decoding::Int2 => CellValue::Int(i64::from(row.try_get::<i16, _>(idx).map_err(fail)?)),
        Decoding::Int4 => CellValue::Int(i64::from(row.try_get::<i32, _>(idx).map_err(fail)?)),
        Decoding::Int8 => CellValue::Int(row.try_get::<i64, _>(idx).map_err(fail)?),
        Decoding::Oid => CellValue::Int(i64::from(row.try_get::<Oid, _>(idx).map_err(fail)?.0)),
        Decoding::Float4 => CellValue::Float(f64::from(row.try_get::<f32, _>(idx).map_err(fail)?)),
        Decoding::Float8 => CellValue::Float(row.try_get::<f64, _>(idx).map_err(fail)?),
        Decoding::Numeric => decimal_cell(row.try_get::<Decimal, _>(idx).map_err(fail)?),
        Decoding::Money => decimal_cell(row.try_get::<PgMoney, _>(idx).map_err(fail)?.to_decimal(2)),
        Decoding::Date => CellValue::Date(row.try_get::<NaiveDate, _>(idx).map_err(fail)?),
        Decoding::Time => {
            let time = row.try_get::<NaiveTime, _>(idx).map_err(fail)?;
            CellValue::Text(time.format("%H:%M:%S%.f").to_string())
        }
        Decoding::TimeTz => {
            let tz = row
                .try_get::<PgTimeTz<NaiveTime, FixedOffset>, _>(idx)
                .map_err(fail)?;
            CellValue::Text(format!("{}{}", tz.time.format("%H:%M:%S%.f"), tz.offset))
        }
        Decoding::Timestamp => CellValue::DateTime(row.try_get::<NaiveDateTime, _>(idx).map_err(fail)?),
        Decoding::TimestampTz => {
            CellValue::DateTime(row.try_get::<DateTime<Utc>, _>(idx).map_err(fail)?.naive_utc())
        }
        Decoding::Interval => {
            CellValue::Text(interval_text(&row.try_get::<PgInterval, _>(idx).map_err(fail)?))
        }
        Decoding::Uuid => CellValue::Text(row.try_get::<Uuid, _>(idx).map_err(fail)?.to_string()),
        Decoding::Json => CellValue::Text(row.try_get::<JsonValue, _>(idx).map_err(fail)?.to_string()),
        Decoding::Bytes => CellValue::Text(hex_text(&row.try_get::<Vec<u8>, _>(idx).map_err(fail)?)),
        Decoding::Text => match row.try_get::<String, _>(idx) {
            Ok(text) => CellValue::Text(text),
            // Domain types over text do not pass the type check but share its encoding.
            Err(_) => CellValue::Text(row.try_get_unchecked::<String, _>(idx).map_err(fail)?),
        },
    };
    Ok(cell)
}

/// Decimals that do not fit an f64 keep their exact text.
fn decimal_cell(value: Decimal) -> CellValue {
    value
        .to_f64()
        .map_or_else(|| CellValue::Text(value.to_string()), CellValue::Float)
}
