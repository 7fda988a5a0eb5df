// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Upper bound on `correct + incorrect + empty` per subject.
/// Subjects not listed here are uncapped.
pub const SUBJECT_QUESTION_LIMITS: &[(&str, u32)] = &[
    ("Türkçe", 40),
    ("Matematik", 40),
    ("Fen Bilgisi", 20),
    ("Tarih", 5),
    ("Coğrafya", 5),
    ("Felsefe", 5),
    ("Din Kültürü ve Ahlak Bilgisi", 5),
];

pub fn subject_question_limit(subject: &str) -> Option<u32> {
    SUBJECT_QUESTION_LIMITS
        .iter()
        .find(|(name, _)| *name == subject)
        .map(|(_, limit)| *limit)
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means the in-memory store is used.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub rust_log: String,
    pub port: u16,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let log_dir = env::var("LOG_DIR")
            .unwrap_or_else(|_| "logs".to_string());

        Self {
            database_url,
            jwt_secret,
            rust_log,
            port,
            log_dir,
        }
    }
}
