//! Per-column filters over an in-memory page of rows.

use std::fmt;

use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};

use crate::backend::{CellValue, ResultFrame};
use crate::error::DashError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    DateTime,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub table: String,
    pub name: String,
    pub kind: ColumnKind,
}

/// Infer a column's kind from its non-null cells. Columns with no values,
/// mixed kinds, booleans or text are `Other`.
pub fn infer_kind(frame: &ResultFrame, idx: usize) -> ColumnKind {
    let mut kind = None;
    for cell in frame.column_values(idx) {
        let cell_kind = match cell {
            CellValue::Null => continue,
            CellValue::Int(_) | CellValue::Float(_) => ColumnKind::Numeric,
            CellValue::Date(_) | CellValue::DateTime(_) => ColumnKind::DateTime,
            CellValue::Bool(_) | CellValue::Text(_) => return ColumnKind::Other,
        };
        match kind {
            None => kind = Some(cell_kind),
            Some(k) if k != cell_kind => return ColumnKind::Other,
            Some(_) => {}
        }
    }
    kind.unwrap_or(ColumnKind::Other)
}

pub fn describe_columns(table: &str, frame: &ResultFrame) -> Vec<ColumnDescriptor> {
    frame
        .columns
        .iter()
        .enumerate()
        .map(|(idx, col)| ColumnDescriptor {
            table: table.to_string(),
            name: col.name.clone(),
            kind: infer_kind(frame, idx),
        })
        .collect()
}

/// A restriction on one column. Null cells never match.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Inclusive numeric range.
    NumericRange { min: f64, max: f64 },
    /// Inclusive range of calendar days.
    DateRange { start: NaiveDate, end: NaiveDate },
    /// Cell text must be one of the allowed values.
    OneOf(IndexSet<String>),
}

impl Filter {
    pub fn matches(&self, cell: &CellValue) -> bool {
        if cell.is_null() {
            return false;
        }
        match self {
            Filter::NumericRange { min, max } => {
                cell.as_f64().is_some_and(|v| v >= *min && v <= *max)
            }
            Filter::DateRange { start, end } => {
                cell.as_date().is_some_and(|d| d >= *start && d <= *end)
            }
            Filter::OneOf(allowed) => allowed.contains(&cell.to_string()),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::NumericRange { min, max } => write!(f, "({}, {})", min, max),
            Filter::DateRange { start, end } => write!(
                f,
                "({}, {})",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ),
            Filter::OneOf(values) => {
                let joined = values.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
                write!(f, "[{}]", joined)
            }
        }
    }
}

fn numeric_bounds(frame: &ResultFrame, idx: usize) -> Option<(f64, f64)> {
    frame
        .column_values(idx)
        .filter_map(CellValue::as_f64)
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn date_bounds(frame: &ResultFrame, idx: usize) -> Option<(NaiveDate, NaiveDate)> {
    frame
        .column_values(idx)
        .filter_map(CellValue::as_date)
        .fold(None, |acc, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })
}

/// Full-range filter for one column of the loaded page, or `None` when the
/// column is not numeric/temporal or holds a single distinct value.
pub fn derive_filter(frame: &ResultFrame, idx: usize) -> Option<Filter> {
    match infer_kind(frame, idx) {
        ColumnKind::Numeric => {
            let (min, max) = numeric_bounds(frame, idx)?;
            (min < max).then_some(Filter::NumericRange { min, max })
        }
        ColumnKind::DateTime => {
            let (start, end) = date_bounds(frame, idx)?;
            (start < end).then_some(Filter::DateRange { start, end })
        }
        ColumnKind::Other => None,
    }
}

/// Column name to active filter, applied conjunctively in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    entries: IndexMap<String, Filter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a column's filter. A replaced entry keeps its position.
    pub fn insert(&mut self, column: impl Into<String>, filter: Filter) {
        self.entries.insert(column.into(), filter);
    }

    pub fn get(&self, column: &str) -> Option<&Filter> {
        self.entries.get(column)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Filter)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Retain the rows that satisfy every filter. An empty set is the identity.
    pub fn apply(&self, frame: &ResultFrame) -> Result<ResultFrame, DashError> {
        let bound = self
            .entries
            .iter()
            .map(|(column, filter)| {
                frame
                    .column_index(column)
                    .map(|idx| (idx, filter))
                    .ok_or_else(|| DashError::Filter {
                        message: format!("no column '{}' in result", column),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows = frame
            .rows
            .iter()
            .filter(|row| {
                bound
                    .iter()
                    .all(|(idx, filter)| filter.matches(row.get(*idx).unwrap_or(&CellValue::Null)))
            })
            .cloned()
            .collect();

        Ok(ResultFrame {
            columns: frame.columns.clone(),
            rows,
            truncated: frame.truncated,
        })
    }
}

/// Full-range filters for every numeric or temporal column with spread.
pub fn default_filters(frame: &ResultFrame) -> FilterSet {
    let mut set = FilterSet::new();
    for (idx, col) in frame.columns.iter().enumerate() {
        if let Some(filter) = derive_filter(frame, idx) {
            set.insert(col.name.clone(), filter);
        }
    }
    set
}

/// `COL=MIN..MAX`; an empty side means "the page's own bound".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeArg {
    pub column: String,
    pub low: Option<String>,
    pub high: Option<String>,
}

/// `COL=A,B,C`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetArg {
    pub column: String,
    pub values: Vec<String>,
}

fn split_assignment<'a>(arg: &'a str, form: &str) -> Result<(&'a str, &'a str), String> {
    let (column, rest) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected {}, got '{}'", form, arg))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("missing column name in '{}'", arg));
    }
    Ok((column, rest))
}

/// Parser for `--range`, usable as a clap `value_parser`.
pub fn parse_range_arg(arg: &str) -> Result<RangeArg, String> {
    let (column, rest) = split_assignment(arg, "COL=MIN..MAX")?;
    let (low, high) = rest
        .split_once("..")
        .ok_or_else(|| format!("expected COL=MIN..MAX, got '{}'", arg))?;
    let side = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
    Ok(RangeArg {
        column: column.to_string(),
        low: side(low),
        high: side(high),
    })
}

/// Parser for `--in`, usable as a clap `value_parser`.
pub fn parse_set_arg(arg: &str) -> Result<SetArg, String> {
    let (column, rest) = split_assignment(arg, "COL=A,B")?;
    let values: Vec<String> = rest
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        return Err(format!("no values given in '{}'", arg));
    }
    Ok(SetArg {
        column: column.to_string(),
        values,
    })
}

fn filter_error(message: String) -> DashError {
    DashError::Filter { message }
}

fn range_filter(frame: &ResultFrame, arg: &RangeArg) -> Result<Filter, DashError> {
    let idx = frame
        .column_index(&arg.column)
        .ok_or_else(|| filter_error(format!("no column '{}' in result", arg.column)))?;

    match infer_kind(frame, idx) {
        ColumnKind::Numeric => {
            let (page_min, page_max) = numeric_bounds(frame, idx).unwrap_or((0.0, 0.0));
            let parse = |s: &Option<String>, fallback: f64| match s {
                Some(s) => s.parse::<f64>().map_err(|e| {
                    filter_error(format!("invalid number '{}' for {}: {}", s, arg.column, e))
                }),
                None => Ok(fallback),
            };
            let min = parse(&arg.low, page_min)?;
            let max = parse(&arg.high, page_max)?;
            if min > max {
                return Err(filter_error(format!(
                    "empty range for {}: {} > {}",
                    arg.column, min, max
                )));
            }
            Ok(Filter::NumericRange { min, max })
        }
        ColumnKind::DateTime => {
            let (page_start, page_end) = date_bounds(frame, idx)
                .ok_or_else(|| filter_error(format!("column {} has no dates", arg.column)))?;
            let parse = |s: &Option<String>, fallback: NaiveDate| match s {
                Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
                    filter_error(format!("invalid date '{}' for {}: {}", s, arg.column, e))
                }),
                None => Ok(fallback),
            };
            let start = parse(&arg.low, page_start)?;
            let end = parse(&arg.high, page_end)?;
            if start > end {
                return Err(filter_error(format!(
                    "empty range for {}: {} > {}",
                    arg.column, start, end
                )));
            }
            Ok(Filter::DateRange { start, end })
        }
        ColumnKind::Other => Err(filter_error(format!(
            "column {} is neither numeric nor a date; use --in",
            arg.column
        ))),
    }
}

/// Build the active filter set for a loaded page.
///
/// With `with_defaults`, every column that offers a filter starts with its
/// full page range; explicit ranges and sets then override per column.
pub fn build_filter_set(
    frame: &ResultFrame,
    ranges: &[RangeArg],
    sets: &[SetArg],
    with_defaults: bool,
) -> Result<FilterSet, DashError> {
    let mut set = if with_defaults {
        default_filters(frame)
    } else {
        FilterSet::new()
    };

    for arg in ranges {
        set.insert(arg.column.clone(), range_filter(frame, arg)?);
    }

    for arg in sets {
        if frame.column_index(&arg.column).is_none() {
            return Err(filter_error(format!("no column '{}' in result", arg.column)));
        }
        set.insert(
            arg.column.clone(),
            Filter::OneOf(arg.values.iter().cloned().collect()),
        );
    }

    Ok(set)
}
