use tracing::debug;

use crate::backend::{CellValue, ResultFrame};
use crate::config::validate_page_size;
use crate::error::DashError;
use crate::schema::TableRef;
use crate::session::Session;

/// A zero-indexed, fixed-size window over a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub table: TableRef,
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    pub fn new(table: TableRef, page: u64, page_size: u64) -> Result<Self, DashError> {
        validate_page_size(page_size)?;
        Ok(Self {
            table,
            page,
            page_size,
        })
    }

    /// Rows skipped before this page: `page * page_size`.
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.page_size)
    }
}

/// `ceil(count / page_size)`; zero rows means zero pages.
pub fn total_pages(count: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

pub async fn load_page(session: &mut Session, request: &PageRequest) -> Result<ResultFrame, DashError> {
    let sql = session
        .dialect()
        .paged_query(request.table.as_str(), request.page, request.page_size);
    debug!(
        table = %request.table,
        page = request.page,
        page_size = request.page_size,
        "loading page"
    );
    session.fetch(&sql, &[]).await
}

pub async fn count_rows(session: &mut Session, table: &TableRef) -> Result<u64, DashError> {
    let sql = session.dialect().count_query(table.as_str());
    let frame = session.fetch(&sql, &[]).await?;
    match frame.first_cell() {
        Some(CellValue::Int(n)) => u64::try_from(*n).map_err(|_| DashError::Query {
            message: format!("negative row count for {}: {}", table, n),
        }),
        Some(CellValue::Float(f)) if *f >= 0.0 => Ok(*f as u64),
        Some(CellValue::Text(s)) => s.trim().parse::<u64>().map_err(|e| DashError::Query {
            message: format!("unexpected row count '{}' for {}: {}", s, table, e),
        }),
        other => Err(DashError::Query {
            message: format!("unexpected row count for {}: {:?}", table, other),
        }),
    }
}

/// One page of rows with the table-wide totals needed to navigate.
#[derive(Debug)]
pub struct PageView {
    pub request: PageRequest,
    pub total_rows: u64,
    pub total_pages: u64,
    pub frame: ResultFrame,
}

impl PageView {
    /// Whether the requested page lies past the last page.
    pub fn is_past_end(&self) -> bool {
        self.request.page >= self.total_pages && self.total_rows > 0
    }
}

/// Count, then load the requested page.
pub async fn load_page_view(session: &mut Session, request: PageRequest) -> Result<PageView, DashError> {
    let total_rows = count_rows(session, &request.table).await?;
    let total_pages = total_pages(total_rows, request.page_size);
    let frame = load_page(session, &request).await?;
    Ok(PageView {
        request,
        total_rows,
        total_pages,
        frame,
    })
}
