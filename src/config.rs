use std::env;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use log::warn;
use rand::RngCore;

#[derive(Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub sqlite_path: String,
    pub database_url: Option<String>,
    pub db_logging: bool,
    pub secret_key: String,
    pub session_cookie: String,
    pub session_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub admin_login: Option<String>,
    pub admin_password: Option<String>,
    pub mail: MailConfig,
}

#[derive(Clone)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub use_ssl: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(5000);

        let sqlite_path = env::var("SQLITE_PATH").unwrap_or_else(|_| "./egm.sqlite".to_string());
        let database_url = env::var("DATABASE_URL")
            .or_else(|_| env::var("EGM_DATABASE_URL"))
            .ok()
            .filter(|v| !v.trim().is_empty());

        let secret_key = match non_empty("SECRET_KEY") {
            Some(key) => key,
            None => {
                warn!("SECRET_KEY is not set, sessions will not survive a restart");
                random_secret()
            }
        };

        let session_cookie = env::var("SESSION_COOKIE").unwrap_or_else(|_| "egm_session".to_string());
        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(24 * 7);
        let bcrypt_cost = env::var("BCRYPT_COST")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let username = non_empty("MAIL_USERNAME");
        let mail = MailConfig {
            server: env::var("MAIL_SERVER").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            port: env::var("MAIL_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            use_tls: flag("MAIL_USE_TLS", true),
            use_ssl: flag("MAIL_USE_SSL", false),
            password: non_empty("MAIL_PASSWORD").or_else(|| non_empty("PASS")),
            recipient: non_empty("CONTACT_RECIPIENT").or_else(|| username.clone()),
            username,
        };

        Self {
            server_port,
            sqlite_path,
            database_url,
            db_logging: flag("DB_LOGGING", false),
            secret_key,
            session_cookie,
            session_ttl_hours,
            bcrypt_cost,
            admin_login: non_empty("EGM_USER"),
            admin_password: non_empty("EGM_PASS"),
            mail,
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let path = self.sqlite_path.trim();
        if path.starts_with("sqlite:") || path.starts_with("file:") {
            return path.to_string();
        }
        format!("sqlite://{}?mode=rwc", path)
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| parse_flag(&v))
        .unwrap_or(default)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
