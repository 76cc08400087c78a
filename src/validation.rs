use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::{Dialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

use crate::backend::BackendKind;
use crate::error::DashError;

/// Why a statement was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialKind {
    WriteStatement,
    SelectInto,
    CteWrappedWrite,
    StoredProcedure,
    ParseFailure,
    Unrecognized,
}

/// A single denial reason.
#[derive(Debug, Clone)]
pub struct DenialReason {
    pub statement_index: usize,
    pub kind: DenialKind,
    pub detail: String,
}

/// Outcome of read-only query validation.
#[derive(Debug)]
pub enum ValidationResult {
    Safe,
    Denied { reasons: Vec<DenialReason> },
}

impl ValidationResult {
    pub fn is_safe(&self) -> bool {
        matches!(self, ValidationResult::Safe)
    }

    /// Collapse into a `Validation` error carrying every denial detail.
    pub fn into_result(self) -> Result<(), DashError> {
        match self {
            ValidationResult::Safe => Ok(()),
            ValidationResult::Denied { reasons } => Err(DashError::Validation {
                reason: reasons
                    .iter()
                    .map(|r| r.detail.clone())
                    .collect::<Vec<_>>()
                    .join("; "),
            }),
        }
    }
}

fn parser_dialect(kind: BackendKind) -> Box<dyn Dialect> {
    match kind {
        BackendKind::Sqlite => Box::new(SQLiteDialect {}),
        BackendKind::MySql => Box::new(MySqlDialect {}),
        BackendKind::Postgres => Box::new(PostgreSqlDialect {}),
        BackendKind::SqlServer => Box::new(MsSqlDialect {}),
    }
}

/// Validate that all SQL statements are read-only.
pub fn validate(sql: &str, kind: BackendKind) -> ValidationResult {
    let dialect = parser_dialect(kind);
    let statements = match Parser::parse_sql(dialect.as_ref(), sql) {
        Ok(stmts) => stmts,
        Err(e) => {
            return ValidationResult::Denied {
                reasons: vec![DenialReason {
                    statement_index: 0,
                    kind: DenialKind::ParseFailure,
                    detail: format!("cannot verify query safety: {}", e),
                }],
            };
        }
    };

    let reasons: Vec<DenialReason> = statements
        .iter()
        .enumerate()
        .filter(|(_, stmt)| !is_safe_statement(stmt))
        .map(|(i, stmt)| {
            let (kind, detail) = classify_denial(stmt);
            DenialReason {
                statement_index: i,
                kind,
                detail,
            }
        })
        .collect();

    if reasons.is_empty() {
        ValidationResult::Safe
    } else {
        ValidationResult::Denied { reasons }
    }
}

/// Check that a join predicate is exactly one boolean SQL expression.
///
/// Trailing tokens (a `;` followed by another statement, a dangling
/// clause) are rejected so the predicate cannot escape its `ON` slot.
pub fn validate_predicate(predicate: &str, kind: BackendKind) -> Result<(), DashError> {
    let trimmed = predicate.trim();
    if trimmed.is_empty() {
        return Err(DashError::Validation {
            reason: "join predicate is empty".to_string(),
        });
    }

    let dialect = parser_dialect(kind);
    let mut parser = Parser::new(dialect.as_ref())
        .try_with_sql(trimmed)
        .map_err(|e| DashError::Validation {
            reason: format!("cannot parse join predicate '{}': {}", trimmed, e),
        })?;

    parser.parse_expr().map_err(|e| DashError::Validation {
        reason: format!("cannot parse join predicate '{}': {}", trimmed, e),
    })?;

    let next = parser.peek_token();
    if next.token != Token::EOF {
        return Err(DashError::Validation {
            reason: format!(
                "join predicate '{}' has trailing input starting at '{}'",
                trimmed, next.token
            ),
        });
    }
    Ok(())
}

fn is_safe_statement(stmt: &Statement) -> bool {
    match stmt {
        Statement::Query(query) => is_safe_query_body(&query.body),
        Statement::ShowTables { .. } | Statement::ShowColumns { .. } => true,
        _ => false,
    }
}

fn is_safe_query_body(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(select) => select.into.is_none(),
        SetExpr::Query(query) => is_safe_query_body(&query.body),
        SetExpr::SetOperation { left, right, .. } => {
            is_safe_query_body(left) && is_safe_query_body(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => true,
        _ => false,
    }
}

fn classify_denial(stmt: &Statement) -> (DenialKind, String) {
    let write = |what: &str| {
        (
            DenialKind::WriteStatement,
            format!("query would modify state: {}", what),
        )
    };
    match stmt {
        Statement::Insert(_) => write("INSERT"),
        Statement::Update { .. } => write("UPDATE"),
        Statement::Delete(_) => write("DELETE"),
        Statement::Drop { .. } => write("DROP"),
        Statement::CreateTable { .. } | Statement::CreateView { .. } => write("DDL"),
        Statement::AlterTable { .. } => write("ALTER"),
        Statement::Truncate { .. } => write("TRUNCATE"),
        Statement::Merge { .. } => write("MERGE"),
        Statement::Execute { .. } => (
            DenialKind::StoredProcedure,
            "stored procedure execution is not allowed".to_string(),
        ),
        Statement::Query(query) => classify_query_denial(&query.body),
        _ => (
            DenialKind::Unrecognized,
            "unrecognized statement type, denied by default".to_string(),
        ),
    }
}

fn classify_query_denial(body: &SetExpr) -> (DenialKind, String) {
    match body {
        SetExpr::Select(select) if select.into.is_some() => (
            DenialKind::SelectInto,
            "SELECT INTO would create a table".to_string(),
        ),
        SetExpr::Insert(_) | SetExpr::Update(_) | SetExpr::Delete(_) | SetExpr::Merge(_) => (
            DenialKind::CteWrappedWrite,
            "CTE-wrapped write is not allowed".to_string(),
        ),
        _ => (
            DenialKind::Unrecognized,
            "query contains unsafe operations".to_string(),
        ),
    }
}
