//! Email delivery configuration and its validation.
//!
//! Raw values arrive from the environment as an [`EmailSettings`]; validation
//! turns them into an [`EmailConfig`] or the first [`ConfigError`](crate::error::ConfigError).

mod secret;
mod types;
mod validation;

pub use secret::SecretString;
pub use types::{ContentType, EmailConfig, EmailSettings, SmtpConfig};
