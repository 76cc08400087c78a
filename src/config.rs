use crate::backend::BackendKind;
use crate::cli::ConnectArgs;
use crate::error::DashError;
use directories::ProjectDirs;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const MAX_PAGE_SIZE: u64 = 500;
pub const DEFAULT_ROW_LIMIT: usize = 500;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_REPORT_PATH: &str = "relatorio.xlsx";
pub const DEFAULT_ODBC_DRIVER: &str = "ODBC Driver 17 for SQL Server";

/// Top-level application configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub page_size: u64,
    pub row_limit: Option<usize>,
    pub query_timeout_secs: u64,
    pub verbose: bool,
    pub show_secrets: bool,
    pub report_path: PathBuf,
}

/// Configured database connection target.
#[derive(Debug)]
pub enum BackendConfig {
    /// Embedded file database; `None` means no database has been selected.
    Sqlite { path: Option<PathBuf> },
    MySql(NetworkParams),
    Postgres(NetworkParams),
    SqlServer(SqlServerParams),
}

impl BackendConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Sqlite { .. } => BackendKind::Sqlite,
            BackendConfig::MySql(_) => BackendKind::MySql,
            BackendConfig::Postgres(_) => BackendKind::Postgres,
            BackendConfig::SqlServer(_) => BackendKind::SqlServer,
        }
    }
}

/// Host/user/password/database parameters for MySQL and PostgreSQL.
#[derive(Debug)]
pub struct NetworkParams {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: SecretString,
    pub database: String,
}

/// ODBC parameters for SQL Server.
#[derive(Debug)]
pub struct SqlServerParams {
    pub driver: String,
    pub server: String,
    pub database: String,
    pub auth: SqlServerAuth,
    pub trust_server_certificate: bool,
}

/// Authentication method for SQL Server.
#[derive(Debug)]
pub enum SqlServerAuth {
    WindowsIntegrated,
    SqlLogin {
        username: String,
        password: SecretString,
    },
}

impl AppConfig {
    /// Apply a `--page-size` override and enforce the 1..=500 window.
    pub fn with_page_size(mut self, page_size: Option<u64>) -> Result<Self, DashError> {
        if let Some(size) = page_size {
            self.page_size = size;
        }
        validate_page_size(self.page_size)?;
        Ok(self)
    }

    /// Apply `--limit` / `--no-limit` to the join materialization cap.
    pub fn with_row_limit(mut self, limit: Option<usize>, no_limit: bool) -> Self {
        if no_limit {
            self.row_limit = None;
        } else if let Some(lim) = limit {
            self.row_limit = Some(lim);
        }
        self
    }

    pub fn with_report_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.report_path = path;
        }
        self
    }
}

pub fn validate_page_size(page_size: u64) -> Result<(), DashError> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(DashError::Config {
            message: format!(
                "page size must be between 1 and {} (got {})",
                MAX_PAGE_SIZE, page_size
            ),
        });
    }
    Ok(())
}

// --- TOML config file structs ---

#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    #[serde(default)]
    defaults: TomlDefaults,
    #[serde(default)]
    profiles: HashMap<String, TomlProfile>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlDefaults {
    page_size: Option<u64>,
    row_limit: Option<usize>,
    timeout: Option<u64>,
    verbose: Option<bool>,
    report_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone)]
struct TomlProfile {
    backend: Option<String>,
    db_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    server: Option<String>,
    driver: Option<String>,
    user: Option<String>,
    password: Option<String>,
    password_env: Option<String>,
    database: Option<String>,
    windows_auth: Option<bool>,
    trust_server_certificate: Option<bool>,
}

/// Config path plus whether the user asked for it explicitly.
struct ResolvedConfigPath {
    path: PathBuf,
    /// true if user explicitly specified via --config or DBDASH_CONFIG
    explicit: bool,
}

/// Resolve the config file path: --config flag > env var > platform default.
fn resolve_config_path(cli_config: Option<&PathBuf>) -> Option<ResolvedConfigPath> {
    if let Some(path) = cli_config {
        return Some(ResolvedConfigPath {
            path: path.clone(),
            explicit: true,
        });
    }
    if let Some(path) = env_non_empty("DBDASH_CONFIG") {
        return Some(ResolvedConfigPath {
            path: PathBuf::from(path),
            explicit: true,
        });
    }
    ProjectDirs::from("", "", "dbdash").map(|dirs| ResolvedConfigPath {
        path: dirs.config_dir().join("config.toml"),
        explicit: false,
    })
}

/// Load and parse the TOML config file (if it exists).
fn load_toml_config(resolved: Option<&ResolvedConfigPath>) -> Result<TomlConfig, DashError> {
    let resolved = match resolved {
        Some(r) => r,
        None => return Ok(TomlConfig::default()),
    };

    if !resolved.path.exists() {
        if resolved.explicit {
            return Err(DashError::Config {
                message: format!("config file not found: {}", resolved.path.display()),
            });
        }
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&resolved.path).map_err(|e| DashError::Config {
        message: format!("cannot read config file {}: {}", resolved.path.display(), e),
    })?;

    toml::from_str(&content).map_err(|e| DashError::Config {
        message: format!("invalid config file {}: {}", resolved.path.display(), e),
    })
}

/// Treat empty strings as absent.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Read an environment variable, treating unset and empty the same.
pub fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Resolve a password from direct value, env indirection, or env var.
fn resolve_secret(
    direct: Option<&str>,
    env_key: Option<&str>,
    fallback_env: &str,
) -> Option<SecretString> {
    if let Some(val) = non_empty(direct) {
        return Some(SecretString::from(val.to_string()));
    }
    // Env indirection (e.g., password_env = "MY_SECRET")
    if let Some(val) = env_key.and_then(env_non_empty) {
        return Some(SecretString::from(val));
    }
    env_non_empty(fallback_env).map(SecretString::from)
}

/// Pick the first non-empty value of CLI argument and profile entry.
fn pick(cli: Option<&str>, profile: Option<&str>) -> Option<String> {
    non_empty(cli).or(non_empty(profile)).map(str::to_string)
}

fn require(value: Option<String>, param: &str, kind: BackendKind) -> Result<String, DashError> {
    value.ok_or_else(|| DashError::Config {
        message: format!("no {} specified for {} backend", param, kind),
    })
}

/// Build AppConfig from connection arguments.
pub fn load_from_connect_args(
    args: &ConnectArgs,
    verbose: bool,
    show_secrets: bool,
    config_path: Option<&PathBuf>,
) -> Result<AppConfig, DashError> {
    let resolved_path = resolve_config_path(config_path);
    let toml_config = load_toml_config(resolved_path.as_ref())?;

    let profile = args
        .profile
        .as_ref()
        .map(|name| {
            toml_config
                .profiles
                .get(name)
                .cloned()
                .ok_or_else(|| DashError::Config {
                    message: format!("profile '{}' not found in config file", name),
                })
        })
        .transpose()?;

    let profile = profile.unwrap_or_default();

    // Resolve backend type: CLI > env > profile > error
    let kind: BackendKind = pick(args.backend.as_deref(), profile.backend.as_deref())
        .ok_or_else(|| DashError::Config {
            message: "no backend specified: use --backend or configure a profile".to_string(),
        })?
        .parse()?;

    let backend = match kind {
        BackendKind::Sqlite => {
            let path = args
                .db_path
                .clone()
                .or(profile.db_path.clone())
                .filter(|p| !p.as_os_str().is_empty());
            BackendConfig::Sqlite { path }
        }
        BackendKind::MySql | BackendKind::Postgres => {
            let params = NetworkParams {
                host: require(pick(args.host.as_deref(), profile.host.as_deref()), "host", kind)?,
                port: args.port.or(profile.port),
                user: require(pick(args.user.as_deref(), profile.user.as_deref()), "user", kind)?,
                password: resolve_secret(
                    args.password.as_deref(),
                    profile.password_env.as_deref(),
                    "DBDASH_PASSWORD",
                )
                .or_else(|| {
                    non_empty(profile.password.as_deref())
                        .map(|p| SecretString::from(p.to_string()))
                })
                .ok_or_else(|| DashError::Config {
                    message: format!("no password specified for {} backend", kind),
                })?,
                database: require(
                    pick(args.database.as_deref(), profile.database.as_deref()),
                    "database",
                    kind,
                )?,
            };
            if kind == BackendKind::MySql {
                BackendConfig::MySql(params)
            } else {
                BackendConfig::Postgres(params)
            }
        }
        BackendKind::SqlServer => {
            let driver = pick(args.driver.as_deref(), profile.driver.as_deref())
                .unwrap_or_else(|| DEFAULT_ODBC_DRIVER.to_string());
            let server = require(
                pick(args.server.as_deref(), profile.server.as_deref()),
                "server",
                kind,
            )?;
            let database = require(
                pick(args.database.as_deref(), profile.database.as_deref()),
                "database",
                kind,
            )?;

            let windows_auth = args.windows_auth || profile.windows_auth.unwrap_or(false);

            let auth = if windows_auth {
                SqlServerAuth::WindowsIntegrated
            } else {
                let username = require(
                    pick(args.user.as_deref(), profile.user.as_deref()),
                    "user",
                    kind,
                )?;

                let password = resolve_secret(
                    args.password.as_deref(),
                    profile.password_env.as_deref(),
                    "DBDASH_PASSWORD",
                )
                .or_else(|| {
                    non_empty(profile.password.as_deref())
                        .map(|p| SecretString::from(p.to_string()))
                })
                .ok_or_else(|| DashError::Config {
                    message: "no password specified for SQL Server SQL Auth".to_string(),
                })?;

                SqlServerAuth::SqlLogin { username, password }
            };

            let trust_server_certificate =
                args.trust_server_certificate || profile.trust_server_certificate.unwrap_or(false);

            BackendConfig::SqlServer(SqlServerParams {
                driver,
                server,
                database,
                auth,
                trust_server_certificate,
            })
        }
    };

    let page_size = toml_config.defaults.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    validate_page_size(page_size)?;

    let row_limit = Some(toml_config.defaults.row_limit.unwrap_or(DEFAULT_ROW_LIMIT));

    // timeout: CLI/ENV > TOML > 60
    let query_timeout_secs = args
        .timeout
        .unwrap_or_else(|| toml_config.defaults.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS));

    let verbose = verbose || toml_config.defaults.verbose.unwrap_or(false);

    let report_path = toml_config
        .defaults
        .report_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_PATH));

    Ok(AppConfig {
        backend,
        page_size,
        row_limit,
        query_timeout_secs,
        verbose,
        show_secrets,
        report_path,
    })
}
