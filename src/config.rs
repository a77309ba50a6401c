// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

/// Minimum percentage counted as a pass.
pub const PASS_THRESHOLD: u32 = 60;

/// Category used for rows that name none.
pub const DEFAULT_CATEGORY: &str = "Default";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: String,
    pub admin_password: String,
    pub bind_addr: String,
    pub log_dir: String,
    pub static_dir: Option<String>,
    pub intent_ttl_secs: u64,
    pub session_ttl_secs: u64,
    pub seed_default_quiz: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://quizdesk.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let admin_username = env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let admin_password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
        let static_dir = env::var("STATIC_DIR").ok().filter(|d| !d.trim().is_empty());

        let intent_ttl_secs = env::var("INTENT_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        let session_ttl_secs = env::var("SESSION_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1800);

        let seed_default_quiz = env::var("SEED_DEFAULT_QUIZ")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username,
            admin_password,
            bind_addr,
            log_dir,
            static_dir,
            intent_ttl_secs,
            session_ttl_secs,
            seed_default_quiz,
        }
    }
}
