//! Raw and validated email delivery settings.

use std::fmt;
use std::path::PathBuf;

use super::secret::SecretString;
use crate::template::Engine;

/// MIME type declared for the email body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentType {
    /// `text/html` (default).
    #[default]
    Html,
    /// `text/plain`.
    Plain,
}

impl ContentType {
    pub const HTML: &'static str = "text/html";
    pub const PLAIN: &'static str = "text/plain";

    /// Parse one of the two recognized content types. Anything else is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            Self::HTML => Some(ContentType::Html),
            Self::PLAIN => Some(ContentType::Plain),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Html => Self::HTML,
            ContentType::Plain => Self::PLAIN,
        }
    }

    /// Rendering engine for a user-supplied body template of this type.
    pub fn body_engine(&self) -> Engine {
        match self {
            ContentType::Html => Engine::Html,
            ContentType::Plain => Engine::Plain,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated settings as read from the environment.
///
/// Every field is optional; an unset variable and an empty one mean the same
/// thing. Call [`EmailSettings::validate`] to obtain an [`EmailConfig`].
#[derive(Debug, Clone, Default)]
pub struct EmailSettings {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<SecretString>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub content_type: Option<String>,
    pub subject_template: Option<String>,
    pub body_template: Option<String>,
    pub attach_file: Option<String>,
}

/// SMTP connection parameters.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    /// Never exposed through `Debug`.
    pub password: Option<SecretString>,
}

/// Validated delivery configuration for one invocation.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp: SmtpConfig,
    /// Omitted from the message when `None`.
    pub sender: Option<String>,
    pub recipient: String,
    pub content_type: ContentType,
    /// Custom subject template, relative to the working directory unless absolute.
    pub subject_template: Option<PathBuf>,
    /// Custom body template, relative to the working directory unless absolute.
    pub body_template: Option<PathBuf>,
    pub attach_file: Option<PathBuf>,
}
