use log::info;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Statement};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::AppConfig;

pub async fn connect_db(config: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    let url = config.database_url();
    ensure_sqlite_dir(&url);

    let db = Database::connect(connect_options(&url, config)).await?;
    init_schema(&db).await?;
    info!("store ready ({:?})", db.get_database_backend());
    Ok(db)
}

// outlasts the pool's default recycling (30 min lifetime, 10 min idle)
const MEMORY_CONN_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 365);

fn connect_options(url: &str, config: &AppConfig) -> ConnectOptions {
    let mut options = ConnectOptions::new(url.to_string());
    options.sqlx_logging(config.db_logging);
    if is_sqlite_memory(url) {
        // an in-memory database lives exactly as long as its one connection
        options
            .max_connections(1)
            .min_connections(1)
            .max_lifetime(MEMORY_CONN_LIFETIME)
            .idle_timeout(MEMORY_CONN_LIFETIME);
    }
    options
}

fn is_sqlite_memory(url: &str) -> bool {
    url.starts_with("sqlite:") && url.contains(":memory:")
}

fn ensure_sqlite_dir(url: &str) {
    if !url.starts_with("sqlite:") || is_sqlite_memory(url) {
        return;
    }
    let raw = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let path = raw.split('?').next().unwrap_or(raw);
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = fs::create_dir_all(parent);
        }
    }
}

pub async fn init_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let sql = match backend {
        DbBackend::MySql => include_str!("../schema-mysql.sql"),
        DbBackend::Sqlite => include_str!("../schema-sqlite.sql"),
        DbBackend::Postgres => {
            return Err(DbErr::Custom("postgres is not supported".to_string()));
        }
    };
    for stmt in split_sql(sql) {
        db.execute(Statement::from_string(backend, stmt)).await?;
    }
    Ok(())
}

fn split_sql(input: &str) -> Vec<String> {
    let mut buf = String::new();
    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") || trimmed.is_empty() {
            continue;
        }
        buf.push_str(line);
        buf.push('\n');
    }
    buf.split(';')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
