use anyhow::{Context, Result};
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// OpenRouter API key (the variable keeps its historical name).
    pub openai_api_key: String,
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
    pub embeddings_file_path: PathBuf,
    pub chat_daily_limit: u32,
    pub contact_daily_limit: u32,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            email_api_url: require_env("EMAIL_API_URL")?,
            email_api_key: require_env("EMAIL_API_KEY")?,
            email_from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "\"Enrique Lazo\" <noreply@tudominio.com>".to_string()),
            embeddings_file_path: std::env::var("EMBEDDINGS_FILE_PATH")
                .unwrap_or_else(|_| "./data/cv-embeddings.json".to_string())
                .into(),
            chat_daily_limit: parse_env_or("CHAT_DAILY_LIMIT", 30)?,
            contact_daily_limit: parse_env_or("CONTACT_DAILY_LIMIT", 3)?,
            port: parse_env_or("PORT", 3000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("'{key}' must be a valid number")),
        Err(_) => Ok(default),
    }
}
