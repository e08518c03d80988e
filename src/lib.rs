pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod sse;

pub use config::Config;
pub use error::{AppError, Result};
pub use models::Notification;
pub use sse::{ClientRegistry, MailboxId};
