//! Validation of raw email settings.
//!
//! Checks run in a fixed order and stop at the first failure:
//! host, port, recipient, content type.

use std::path::PathBuf;

use super::types::{ContentType, EmailConfig, EmailSettings, SmtpConfig};
use crate::error::ConfigError;

/// Trim a raw value and drop it entirely when nothing is left.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an SMTP port, accepting only values in `1..=65535`.
pub(crate) fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    let port: i64 = raw
        .parse()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()))?;

    if port <= 0 || port >= 65536 {
        return Err(ConfigError::PortOutOfRange(raw.to_string()));
    }

    // Range checked above.
    Ok(port as u16)
}

/// Resolve the declared content type, defaulting to `text/html` when empty.
///
/// Unlike host and port the value is not trimmed; it must match exactly.
pub(crate) fn parse_content_type(raw: Option<&str>) -> Result<ContentType, ConfigError> {
    match raw {
        None | Some("") => Ok(ContentType::default()),
        Some(value) => ContentType::parse(value)
            .ok_or_else(|| ConfigError::InvalidContentType(value.to_string())),
    }
}

impl EmailSettings {
    /// Validate and normalize the settings.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered. Nothing is sent and no
    /// template is touched when this fails.
    pub fn validate(self) -> Result<EmailConfig, ConfigError> {
        let host = non_blank(self.smtp_host).ok_or(ConfigError::MissingHost)?;
        let raw_port = non_blank(self.smtp_port).ok_or(ConfigError::MissingPort)?;
        let port = parse_port(&raw_port)?;
        let recipient = non_blank(self.recipient).ok_or(ConfigError::MissingRecipient)?;
        let content_type = parse_content_type(self.content_type.as_deref())?;

        Ok(EmailConfig {
            smtp: SmtpConfig {
                host,
                port,
                username: non_blank(self.smtp_username),
                password: self.smtp_password.filter(|p| !p.expose().is_empty()),
            },
            sender: non_blank(self.sender),
            recipient,
            content_type,
            subject_template: non_blank(self.subject_template).map(PathBuf::from),
            body_template: non_blank(self.body_template).map(PathBuf::from),
            attach_file: non_blank(self.attach_file).map(PathBuf::from),
        })
    }
}
