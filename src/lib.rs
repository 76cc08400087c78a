pub mod backend;
pub mod cli;
pub mod config;
pub mod dialect;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod format;
pub mod masking;
pub mod output;
pub mod pagination;
pub mod query;
pub mod report;
pub mod schema;
pub mod session;
pub mod validation;
pub mod verbose;
