use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::AppError;

/// Notification as published on the broker channel.
///
/// `created_at` is informational; dispatch only uses `user_id` and
/// `message`.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    pub user_id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Decode a raw broker payload. A parse failure is recoverable: the
    /// subscription loop logs it and moves on to the next payload.
    pub fn decode(payload: &str) -> Result<Self, AppError> {
        serde_json::from_str(payload).map_err(AppError::from)
    }
}
