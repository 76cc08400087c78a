use secrecy::{ExposeSecret, SecretString};

use crate::config::{BackendConfig, SqlServerAuth};

/// Format a secret value, respecting the show_secrets flag.
pub fn format_secret(secret: &SecretString, show_secrets: bool) -> String {
    if show_secrets {
        secret.expose_secret().to_string()
    } else {
        "[REDACTED]".to_string()
    }
}

/// One-line description of the connection target for diagnostics.
pub fn describe_backend(config: &BackendConfig, show_secrets: bool) -> String {
    match config {
        BackendConfig::Sqlite { path } => match path {
            Some(path) => format!("sqlite file={}", path.display()),
            None => "sqlite file=(not set)".to_string(),
        },
        BackendConfig::MySql(params) | BackendConfig::Postgres(params) => format!(
            "{} host={} port={} user={} password={} database={}",
            config.kind(),
            params.host,
            params
                .port
                .map_or_else(|| "(default)".to_string(), |p| p.to_string()),
            params.user,
            format_secret(&params.password, show_secrets),
            params.database
        ),
        BackendConfig::SqlServer(params) => {
            let auth = match &params.auth {
                SqlServerAuth::WindowsIntegrated => "windows".to_string(),
                SqlServerAuth::SqlLogin { username, password } => format!(
                    "user={} password={}",
                    username,
                    format_secret(password, show_secrets)
                ),
            };
            format!(
                "sqlserver driver={} server={} database={} auth={}",
                params.driver, params.server, params.database, auth
            )
        }
    }
}
