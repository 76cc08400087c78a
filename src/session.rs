//! One interaction cycle: open a connection, run statements, release it.

use std::time::Duration;

use tracing::{debug, warn};

use crate::backend::{Backend, BackendKind, Connection, ResultFrame};
use crate::config::BackendConfig;
use crate::dialect::{Dialect, dialect_for};
use crate::error::DashError;
use crate::verbose::Timer;

/// Owns the connection for the duration of one cycle.
pub struct Session {
    connection: Connection,
    dialect: &'static dyn Dialect,
    timeout_secs: u64,
}

impl Session {
    /// Open a session. `Ok(None)` means the embedded-file backend has no
    /// database selected and every downstream step is skipped.
    pub async fn open(config: &BackendConfig, timeout_secs: u64) -> Result<Option<Self>, DashError> {
        let kind = config.kind();
        debug!(backend = %kind, "opening connection");
        let timer = Timer::start();

        let connect = Connection::open(config, timeout_secs);
        let connection = tokio::time::timeout(Duration::from_secs(timeout_secs), connect)
            .await
            .map_err(|_| DashError::Timeout {
                seconds: timeout_secs,
            })??;

        let Some(connection) = connection else {
            debug!(backend = %kind, "no database selected, skipping connection");
            return Ok(None);
        };

        debug!(backend = %kind, elapsed_ms = timer.elapsed_ms() as u64, "connection open");
        Ok(Some(Self::from_connection(connection, timeout_secs)))
    }

    /// Wrap an already-open connection.
    pub fn from_connection(connection: Connection, timeout_secs: u64) -> Self {
        let dialect = dialect_for(connection.kind());
        Self {
            connection,
            dialect,
            timeout_secs,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.connection.kind()
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        self.dialect
    }

    /// Run one statement and materialize every row.
    pub async fn fetch(&mut self, sql: &str, params: &[String]) -> Result<ResultFrame, DashError> {
        self.fetch_limited(sql, params, None).await
    }

    /// Run one statement, keeping at most `limit` rows.
    pub async fn fetch_limited(
        &mut self,
        sql: &str,
        params: &[String],
        limit: Option<usize>,
    ) -> Result<ResultFrame, DashError> {
        debug!(sql, params = params.len(), "executing statement");
        let timer = Timer::start();

        let seconds = self.timeout_secs;
        let frame = tokio::time::timeout(
            Duration::from_secs(seconds),
            self.connection.execute(sql, params, limit),
        )
        .await
        .map_err(|_| DashError::Timeout { seconds })??;

        debug!(
            rows = frame.rows.len(),
            truncated = frame.truncated,
            elapsed_ms = timer.elapsed_ms() as u64,
            "statement complete"
        );
        Ok(frame)
    }

    /// Release the connection.
    pub async fn close(self) -> Result<(), DashError> {
        let kind = self.kind();
        self.connection.close().await?;
        debug!(backend = %kind, "connection closed");
        Ok(())
    }
}

/// Run `work` inside a session that is closed on every exit path.
///
/// Returns `Ok(None)` when no connection was attempted. The error from
/// `work` wins over a failure to close.
pub async fn scoped<T, F>(
    config: &BackendConfig,
    timeout_secs: u64,
    work: F,
) -> Result<Option<T>, DashError>
where
    F: AsyncFnOnce(&mut Session) -> Result<T, DashError>,
{
    let Some(mut session) = Session::open(config, timeout_secs).await? else {
        return Ok(None);
    };

    let outcome = work(&mut session).await;
    let closed = session.close().await;

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(Some(value)),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(error = %close_err, "failed to close connection after error");
            Err(err)
        }
    }
}
