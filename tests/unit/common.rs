#![allow(dead_code)]

use std::path::{Path, PathBuf};

use dbdash::config::BackendConfig;
use dbdash::session::Session;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;

/// Two small joinable tables: A(id, name) and B(id, a_id, val).
pub const JOIN_FIXTURE: &str = "
CREATE TABLE A (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
CREATE TABLE B (id INTEGER PRIMARY KEY, a_id INTEGER NOT NULL, val REAL);
INSERT INTO A (id, name) VALUES (1, 'alpha'), (2, 'beta'), (3, 'gamma');
INSERT INTO B (id, a_id, val) VALUES (10, 1, 1.5), (11, 1, 2.5), (12, 2, 3.5);
";

/// Create a SQLite file in `dir` and run `script` against it.
pub async fn seed_database(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
    sqlx::raw_sql(script).execute(&mut conn).await.unwrap();
    conn.close().await.unwrap();
    path
}

/// A table `nums(id INTEGER)` holding 1..=count.
pub async fn seed_numbers(dir: &Path, count: u64) -> PathBuf {
    let values = (1..=count)
        .map(|i| format!("({})", i))
        .collect::<Vec<_>>()
        .join(", ");
    let script = format!(
        "CREATE TABLE nums (id INTEGER PRIMARY KEY); INSERT INTO nums (id) VALUES {};",
        values
    );
    seed_database(dir, "nums.db", &script).await
}

pub fn sqlite_config(path: &Path) -> BackendConfig {
    BackendConfig::Sqlite {
        path: Some(path.to_path_buf()),
    }
}

pub async fn open_session(path: &Path) -> Session {
    Session::open(&sqlite_config(path), 30)
        .await
        .unwrap()
        .expect("sqlite path was given, a session should open")
}
