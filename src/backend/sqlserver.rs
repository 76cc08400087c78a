use std::sync::{Arc, Mutex, OnceLock};

use chrono::NaiveDate;
use odbc_api::buffers::TextRowSet;
use odbc_api::parameter::InputParameter;
use odbc_api::{
    ColumnDescription, Connection, ConnectionOptions, Cursor, DataType, Environment,
    IntoParameter, ResultSetMetadata,
};

use crate::backend::{Backend, CellValue, ColumnMeta, ResultFrame, parse_temporal};
use crate::config::{SqlServerAuth, SqlServerParams};
use crate::error::DashError;

const BATCH_SIZE: usize = 5000;
const MAX_TEXT_LEN: usize = 4096;

static ODBC_ENV: OnceLock<Environment> = OnceLock::new();

fn environment() -> Result<&'static Environment, DashError> {
    if let Some(env) = ODBC_ENV.get() {
        return Ok(env);
    }
    let env = Environment::new().map_err(|e| DashError::Connection {
        message: format!("ODBC environment error: {}", e),
    })?;
    Ok(ODBC_ENV.get_or_init(|| env))
}

pub struct SqlServerBackend {
    conn: Arc<Mutex<Connection<'static>>>,
    query_timeout_secs: u64,
}

impl SqlServerBackend {
    pub async fn connect(
        params: &SqlServerParams,
        query_timeout_secs: u64,
    ) -> Result<Self, DashError> {
        let conn_str = connection_string(params);

        // odbc-api calls block, so they run on the blocking pool
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection<'static>, DashError> {
            let env = environment()?;
            env.connect_with_connection_string(
                &conn_str,
                ConnectionOptions {
                    login_timeout_sec: Some(30),
                    ..Default::default()
                },
            )
            .map_err(|e| DashError::Connection {
                message: format!("connection failed: {}", e),
            })
        })
        .await
        .map_err(|e| DashError::Connection {
            message: format!("task join error: {}", e),
        })??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            query_timeout_secs,
        })
    }
}

impl Backend for SqlServerBackend {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[String],
        limit: Option<usize>,
    ) -> Result<ResultFrame, DashError> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        let params = params.to_vec();
        let timeout_secs = self.query_timeout_secs;

        tokio::task::spawn_blocking(move || -> Result<ResultFrame, DashError> {
            let conn = conn.lock().map_err(|_| DashError::Query {
                message: "connection lock poisoned".to_string(),
            })?;
            run_statement(&conn, &sql, &params, limit, timeout_secs)
        })
        .await
        .map_err(|e| DashError::Query {
            message: format!("task join error: {}", e),
        })?
    }

    async fn close(self) -> Result<(), DashError> {
        // Dropping the last handle disconnects; do it off the async thread.
        let conn = self.conn;
        tokio::task::spawn_blocking(move || drop(conn))
            .await
            .map_err(|e| DashError::Connection {
                message: format!("task join error: {}", e),
            })
    }
}

/// Build the ODBC connection string for the configured server.
pub fn connection_string(params: &SqlServerParams) -> String {
    let mut parts = vec![
        format!("DRIVER={{{}}}", params.driver),
        format!("SERVER={}", params.server),
        format!("DATABASE={}", params.database),
    ];

    match &params.auth {
        SqlServerAuth::WindowsIntegrated => {
            parts.push("Trusted_Connection=yes".to_string());
        }
        SqlServerAuth::SqlLogin { username, password } => {
            use secrecy::ExposeSecret;
            parts.push(format!("UID={}", username));
            parts.push(format!(
                "PWD={}",
                odbc_api::escape_attribute_value(password.expose_secret())
            ));
        }
    }

    if params.trust_server_certificate {
        parts.push("TrustServerCertificate=yes".to_string());
    }

    parts.join(";") + ";"
}

fn run_statement(
    conn: &Connection<'_>,
    sql: &str,
    params: &[String],
    limit: Option<usize>,
    timeout_secs: u64,
) -> Result<ResultFrame, DashError> {
    let bound: Vec<Box<dyn InputParameter>> = params
        .iter()
        .map(|p| Box::new(p.clone().into_parameter()) as Box<dyn InputParameter>)
        .collect();

    let cursor = conn
        .execute(sql, bound.as_slice(), Some(timeout_secs as usize))
        .map_err(|e| DashError::Query {
            message: format!("query execution failed: {}", e),
        })?;

    let Some(mut cursor) = cursor else {
        return Ok(ResultFrame::default());
    };

    let num_cols = cursor.num_result_cols().map_err(|e| DashError::Query {
        message: format!("failed to get column count: {}", e),
    })? as usize;

    let mut columns = Vec::with_capacity(num_cols);
    let mut types = Vec::with_capacity(num_cols);

    for i in 1..=num_cols as u16 {
        let mut col_desc = ColumnDescription::default();
        cursor
            .describe_col(i, &mut col_desc)
            .map_err(|e| DashError::Query {
                message: format!("failed to describe column {}: {}", i, e),
            })?;

        let name = col_desc.name_to_string().map_err(|e| DashError::Query {
            message: format!("failed to decode column name {}: {}", i, e),
        })?;

        columns.push(ColumnMeta::new(name, normalize_odbc_type(&col_desc.data_type)));
        types.push(col_desc.data_type);
    }

    let mut buffers = TextRowSet::for_cursor(BATCH_SIZE, &mut cursor, Some(MAX_TEXT_LEN))
        .map_err(|e| DashError::Query {
            message: format!("failed to create buffer: {}", e),
        })?;

    let mut row_set_cursor = cursor.bind_buffer(&mut buffers).map_err(|e| DashError::Query {
        message: format!("failed to bind buffer: {}", e),
    })?;

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    let mut truncated = false;

    while let Some(batch) = row_set_cursor.fetch().map_err(|e| DashError::Query {
        message: format!("fetch error: {}", e),
    })? {
        for row_idx in 0..batch.num_rows() {
            if let Some(lim) = limit
                && rows.len() >= lim
            {
                truncated = true;
                break;
            }

            let row = (0..num_cols)
                .map(|col_idx| match batch.at(col_idx, row_idx) {
                    Some(bytes) => cell_from_text(&types[col_idx], &String::from_utf8_lossy(bytes)),
                    None => CellValue::Null,
                })
                .collect();
            rows.push(row);
        }

        if truncated {
            break;
        }
    }

    Ok(ResultFrame {
        columns,
        rows,
        truncated,
    })
}

/// Render an ODBC column type as the SQL Server type name shown to users.
/// Unbounded character and binary types render as `(MAX)`.
pub fn normalize_odbc_type(data_type: &DataType) -> String {
    let sized = |base: &str, length: &Option<std::num::NonZeroUsize>| match length {
        Some(n) => format!("{}({})", base, n),
        None => base.to_string(),
    };
    let max = |base: &str, length: &Option<std::num::NonZeroUsize>| match length {
        Some(n) => format!("{}({})", base, n),
        None => format!("{}(MAX)", base),
    };

    match data_type {
        DataType::TinyInt => "TINYINT".to_string(),
        DataType::SmallInt => "SMALLINT".to_string(),
        DataType::Integer => "INT".to_string(),
        DataType::BigInt => "BIGINT".to_string(),
        DataType::Real => "REAL".to_string(),
        DataType::Double => "FLOAT".to_string(),
        DataType::Float { precision } => format!("FLOAT({})", precision),
        DataType::Decimal { precision, scale } => format!("DECIMAL({},{})", precision, scale),
        DataType::Numeric { precision, scale } => format!("NUMERIC({},{})", precision, scale),
        DataType::Bit => "BIT".to_string(),
        DataType::Date => "DATE".to_string(),
        DataType::Time { precision } => format!("TIME({})", precision),
        DataType::Timestamp { precision } => format!("DATETIME2({})", precision),
        DataType::Char { length } => sized("CHAR", length),
        DataType::WChar { length } => sized("NCHAR", length),
        DataType::Binary { length } => sized("BINARY", length),
        DataType::Varchar { length } => max("VARCHAR", length),
        DataType::WVarchar { length } => max("NVARCHAR", length),
        DataType::Varbinary { length } => max("VARBINARY", length),
        DataType::LongVarchar { .. } => "VARCHAR(MAX)".to_string(),
        DataType::WLongVarchar { .. } => "NVARCHAR(MAX)".to_string(),
        DataType::LongVarbinary { .. } => "VARBINARY(MAX)".to_string(),
        _ => "UNKNOWN".to_string(),
    }
}

/// Convert the text rendering of an ODBC value into a typed cell.
/// Values that do not parse as their column type stay text.
pub fn cell_from_text(data_type: &DataType, text: &str) -> CellValue {
    let parsed = match data_type {
        DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt => {
            text.trim().parse::<i64>().ok().map(CellValue::Int)
        }
        DataType::Real
        | DataType::Float { .. }
        | DataType::Double
        | DataType::Decimal { .. }
        | DataType::Numeric { .. } => text.trim().parse::<f64>().ok().map(CellValue::Float),
        DataType::Bit => match text.trim() {
            "1" => Some(CellValue::Bool(true)),
            "0" => Some(CellValue::Bool(false)),
            _ => None,
        },
        DataType::Date => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .ok()
            .map(CellValue::Date),
        DataType::Timestamp { .. } => parse_temporal(text),
        _ => None,
    };
    parsed.unwrap_or_else(|| CellValue::Text(text.to_string()))
}
