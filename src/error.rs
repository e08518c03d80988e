use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("broker connection failure: {0}")]
    Broker(#[from] redis::RedisError),

    #[error("malformed notification payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("server start failure: {0}")]
    StartServer(#[from] std::io::Error),
}
