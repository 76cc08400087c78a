use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::filter::{RangeArg, SetArg, parse_range_arg, parse_set_arg};

#[derive(Parser, Debug)]
#[command(
    name = "dbdash",
    version,
    about = "Browse, page, join, filter and export relational data with TOON output"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short = 'c', long, global = true, env = "DBDASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit diagnostics to stderr
    #[arg(short = 'v', long, global = true, env = "DBDASH_VERBOSE")]
    pub verbose: bool,

    /// Disable credential masking in diagnostics
    #[arg(long, global = true, env = "DBDASH_SHOW_SECRETS")]
    pub show_secrets: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List *.db files in a directory
    Databases(DatabasesArgs),

    /// List the tables of the connected database
    Tables(ConnectArgs),

    /// List the columns of one table
    Columns(ColumnsArgs),

    /// Show one page of a table, optionally filtered
    Page(PageArgs),

    /// Run an INNER JOIN across two or more tables
    Join(JoinArgs),

    /// Export a filtered page to a two-sheet xlsx report
    Report(ReportArgs),
}

#[derive(Args, Debug, Default)]
pub struct ConnectArgs {
    /// Backend type: sqlite, mysql, postgres or sqlserver
    #[arg(short = 'b', long, env = "DBDASH_BACKEND")]
    pub backend: Option<String>,

    /// SQLite database file
    #[arg(long, env = "DBDASH_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// MySQL / PostgreSQL host
    #[arg(long, env = "DBDASH_HOST")]
    pub host: Option<String>,

    /// MySQL / PostgreSQL port
    #[arg(long, env = "DBDASH_PORT")]
    pub port: Option<u16>,

    /// SQL Server hostname
    #[arg(long, env = "DBDASH_SERVER")]
    pub server: Option<String>,

    /// ODBC driver name (SQL Server)
    #[arg(long, env = "DBDASH_DRIVER")]
    pub driver: Option<String>,

    /// Username
    #[arg(short = 'u', long, env = "DBDASH_USER")]
    pub user: Option<String>,

    /// Password
    #[arg(short = 'p', long, env = "DBDASH_PASSWORD")]
    pub password: Option<String>,

    /// Database name
    #[arg(short = 'd', long, env = "DBDASH_DATABASE")]
    pub database: Option<String>,

    /// Use Windows Integrated Auth (SQL Server)
    #[arg(short = 'w', long, env = "DBDASH_WINDOWS_AUTH")]
    pub windows_auth: bool,

    /// Trust SQL Server certificate (for self-signed/dev instances)
    #[arg(long, env = "DBDASH_TRUST_SERVER_CERT")]
    pub trust_server_certificate: bool,

    /// Query timeout in seconds (default: 60)
    #[arg(short = 't', long, env = "DBDASH_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Config file profile name
    #[arg(short = 'P', long, env = "DBDASH_PROFILE")]
    pub profile: Option<String>,
}

#[derive(Args, Debug)]
pub struct DatabasesArgs {
    /// Directory to scan
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Table name
    pub table: String,
}

#[derive(Args, Debug, Default)]
pub struct WindowArgs {
    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    pub page: u64,

    /// Rows per page, 1-500 (default: 50)
    #[arg(long, env = "DBDASH_PAGE_SIZE")]
    pub page_size: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Range filter COL=MIN..MAX (numbers or YYYY-MM-DD; either side may be empty)
    #[arg(long = "range", value_name = "COL=MIN..MAX", value_parser = parse_range_arg)]
    pub ranges: Vec<RangeArg>,

    /// Set-membership filter COL=A,B,C
    #[arg(long = "in", value_name = "COL=A,B", value_parser = parse_set_arg)]
    pub sets: Vec<SetArg>,
}

#[derive(Args, Debug)]
pub struct PageArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Table name
    pub table: String,

    #[command(flatten)]
    pub window: WindowArgs,

    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Args, Debug)]
pub struct JoinArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Table to join, in order (repeat at least twice)
    #[arg(long = "table", value_name = "TABLE")]
    pub tables: Vec<String>,

    /// Join predicate for each table after the first (repeat N-1 times)
    #[arg(long = "on", value_name = "PREDICATE")]
    pub predicates: Vec<String>,

    /// Explicit table.column to select (default: every column, aliased)
    #[arg(long = "select", value_name = "TABLE.COLUMN")]
    pub select: Vec<String>,

    /// Max rows to return (default: 500)
    #[arg(short = 'l', long, env = "DBDASH_ROW_LIMIT")]
    pub limit: Option<usize>,

    /// Disable row limit
    #[arg(long, conflicts_with = "limit")]
    pub no_limit: bool,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Table name
    pub table: String,

    #[command(flatten)]
    pub window: WindowArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Report file (default: relatorio.xlsx)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}
