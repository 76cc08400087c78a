use tracing::{debug, info};

use crate::backend::ResultFrame;
use crate::error::DashError;
use crate::schema::{self, Catalog, TableRef};
use crate::session::Session;
use crate::validation;

/// A table taking part in a join, with its columns in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumns {
    pub table: String,
    pub columns: Vec<String>,
}

impl TableColumns {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }
}

/// User request for a multi-table INNER JOIN.
#[derive(Debug, Clone, Default)]
pub struct JoinSpec {
    pub tables: Vec<String>,
    /// `predicates[i]` joins `tables[i + 1]` onto the tables before it.
    pub predicates: Vec<String>,
    /// Explicit `table.column` selection; empty selects every column.
    pub select: Vec<String>,
}

impl JoinSpec {
    /// At least two tables, exactly one non-blank predicate per joined table.
    /// More predicates than joined tables is rejected rather than truncated.
    pub fn is_complete(&self) -> bool {
        join_precondition(self.tables.len(), &self.predicates)
    }
}

#[derive(Debug)]
pub struct JoinOutcome {
    pub sql: String,
    pub frame: ResultFrame,
}

// Surplus predicates fail the check; they are never silently dropped.
fn join_precondition(table_count: usize, predicates: &[String]) -> bool {
    table_count >= 2
        && predicates.len() == table_count - 1
        && predicates.iter().all(|p| !p.trim().is_empty())
}

/// `table.column AS table_column` for every column of every table.
pub fn default_select_list(tables: &[TableColumns]) -> Vec<String> {
    tables
        .iter()
        .flat_map(|t| {
            t.columns
                .iter()
                .map(move |c| format!("{}.{} AS {}_{}", t.table, c, t.table, c))
        })
        .collect()
}

/// Assemble `SELECT <cols> FROM T0 INNER JOIN T1 ON P0 INNER JOIN T2 ON P1 ...`.
///
/// Returns `None` when fewer than two tables are given or the predicate
/// count is not one less than the table count. Predicates are inserted as
/// given.
pub fn build_join_query(
    tables: &[TableColumns],
    predicates: &[String],
    select: &[String],
) -> Option<String> {
    if !join_precondition(tables.len(), predicates) {
        return None;
    }

    let columns = if select.is_empty() {
        default_select_list(tables)
    } else {
        select.to_vec()
    };
    if columns.is_empty() {
        return None;
    }

    let mut sql = format!("SELECT {} FROM {}", columns.join(", "), tables[0].table);
    for (table, predicate) in tables[1..].iter().zip(predicates) {
        sql.push_str(&format!(" INNER JOIN {} ON {}", table.table, predicate));
    }
    Some(sql)
}

/// Check an explicit `table.column` selection against the joined tables.
fn resolve_selection(
    select: &[String],
    tables: &[TableColumns],
) -> Result<Vec<String>, DashError> {
    select
        .iter()
        .map(|item| {
            let item = item.trim();
            let (table, column) = item.split_once('.').ok_or_else(|| DashError::Validation {
                reason: format!("selected column '{}' must be written as table.column", item),
            })?;
            let owner = tables
                .iter()
                .find(|t| t.table.eq_ignore_ascii_case(table.trim()))
                .ok_or_else(|| DashError::Validation {
                    reason: format!("selected column '{}' names a table outside the join", item),
                })?;
            let column = owner
                .columns
                .iter()
                .find(|c| c.eq_ignore_ascii_case(column.trim()))
                .ok_or_else(|| DashError::Validation {
                    reason: format!("table '{}' has no column '{}'", owner.table, column.trim()),
                })?;
            Ok(format!("{}.{}", owner.table, column))
        })
        .collect()
}

/// Validate and run a join inside an open session.
///
/// Returns `Ok(None)` when the request does not meet the join precondition;
/// no statement is executed in that case.
pub async fn perform_join(
    session: &mut Session,
    spec: &JoinSpec,
    row_limit: Option<usize>,
) -> Result<Option<JoinOutcome>, DashError> {
    if !spec.is_complete() {
        debug!(
            tables = spec.tables.len(),
            predicates = spec.predicates.len(),
            "join precondition not met"
        );
        return Ok(None);
    }

    let kind = session.kind();
    for predicate in &spec.predicates {
        validation::validate_predicate(predicate, kind)?;
    }

    let catalog = Catalog::load(session).await?;
    let refs = spec
        .tables
        .iter()
        .map(|name| catalog.resolve(name))
        .collect::<Result<Vec<TableRef>, _>>()?;

    let mut tables = Vec::with_capacity(refs.len());
    for table in &refs {
        let columns = schema::list_columns(session, table).await?;
        tables.push(TableColumns::new(table.as_str(), columns));
    }

    let select = resolve_selection(&spec.select, &tables)?;
    let Some(sql) = build_join_query(&tables, &spec.predicates, &select) else {
        return Ok(None);
    };

    validation::validate(&sql, kind).into_result()?;

    info!(tables = tables.len(), "running join");
    let frame = session.fetch_limited(&sql, &[], row_limit).await?;
    Ok(Some(JoinOutcome { sql, frame }))
}
