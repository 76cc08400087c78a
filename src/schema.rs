use std::fmt;

use tracing::debug;

use crate::error::DashError;
use crate::session::Session;

/// A table name that was found in the live catalog.
///
/// Only [`Catalog::resolve`] constructs one, so any `TableRef` is safe to
/// interpolate into SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef(String);

impl TableRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run the backend's catalog query and return table names in catalog order.
pub async fn list_tables(session: &mut Session) -> Result<Vec<String>, DashError> {
    let sql = session.dialect().catalog_query();
    let frame = session
        .fetch(sql, &[])
        .await
        .map_err(DashError::into_schema)?;
    let tables = frame.first_column_strings();
    debug!(count = tables.len(), "listed tables");
    Ok(tables)
}

/// Column names of an allow-listed table, in declaration order.
pub async fn list_columns(session: &mut Session, table: &TableRef) -> Result<Vec<String>, DashError> {
    let sql = session.dialect().columns_query();
    let frame = session
        .fetch(sql, &[table.as_str().to_string()])
        .await
        .map_err(DashError::into_schema)?;
    let columns = frame.first_column_strings();
    if columns.is_empty() {
        return Err(DashError::Schema {
            message: format!("no columns found for table '{}'", table),
        });
    }
    Ok(columns)
}

/// Allow-list of the tables present in the connected database.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: Vec<String>,
}

impl Catalog {
    pub async fn load(session: &mut Session) -> Result<Self, DashError> {
        Ok(Self::from_tables(list_tables(session).await?))
    }

    pub fn from_tables(tables: Vec<String>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Map user input to a catalog table. An exact match wins; otherwise a
    /// single case-insensitive match is accepted.
    pub fn resolve(&self, name: &str) -> Result<TableRef, DashError> {
        let name = name.trim();
        if let Some(exact) = self.tables.iter().find(|t| t.as_str() == name) {
            return Ok(TableRef(exact.clone()));
        }

        let mut folded = self.tables.iter().filter(|t| t.eq_ignore_ascii_case(name));
        match (folded.next(), folded.next()) {
            (Some(only), None) => Ok(TableRef(only.clone())),
            (Some(_), Some(_)) => Err(DashError::Validation {
                reason: format!("table name '{}' is ambiguous", name),
            }),
            (None, _) => Err(DashError::Validation {
                reason: format!("unknown table '{}'", name),
            }),
        }
    }
}
