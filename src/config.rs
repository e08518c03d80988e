use dotenvy::dotenv;
use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Redis logical database holding business state (cache lives in db 0).
    pub database: u8,
}

impl RedisConfig {
    /// Connection URL in the form redis://[user][:password@]host:port/db.
    pub fn url(&self) -> String {
        let auth = match (self.username.is_empty(), self.password.is_empty()) {
            (true, true) => String::new(),
            _ => format!("{}:{}@", self.username, self.password),
        };
        format!(
            "redis://{}{}:{}/{}",
            auth, self.host, self.port, self.database
        )
    }
}

#[derive(Debug, Clone)]
pub struct SseConfig {
    pub host: String,
    pub port: u16,
    /// Pub/sub channel the subscriber binds to.
    pub channel: String,
}

impl SseConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub redis: RedisConfig,
    pub sse: SseConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let redis = RedisConfig {
            host: env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env_parse("REDIS_PORT", 6379)?,
            username: env::var("REDIS_USERNAME").unwrap_or_default(),
            password: env::var("REDIS_PASSWORD").unwrap_or_default(),
            database: env_parse("REDIS_MAIN_DB", 1)?,
        };

        let sse = SseConfig {
            host: env::var("SSE_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("SSE_PORT", 8085)?,
            channel: env::var("SSE_REDIS_CHANNEL").unwrap_or_else(|_| "notifications".into()),
        };

        Ok(Config { redis, sse })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("{key} is not a valid value: {raw}"))),
        Err(_) => Ok(default),
    }
}
