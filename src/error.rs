use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("connection: {message}")]
    Connection { message: String },

    #[error("schema: {message}")]
    Schema { message: String },

    #[error("query: {message}")]
    Query { message: String },

    #[error("validation: {reason}")]
    Validation { reason: String },

    #[error("timeout: query timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("config: {message}")]
    Config { message: String },

    #[error("filter: {message}")]
    Filter { message: String },

    #[error("format: {message}")]
    Format { message: String },

    #[error("export: {message}")]
    Export { message: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl DashError {
    /// Re-tag a failed statement as a catalog/introspection failure.
    pub fn into_schema(self) -> Self {
        match self {
            DashError::Query { message } => DashError::Schema { message },
            other => other,
        }
    }
}
