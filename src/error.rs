//! Centralized error types for pipemail using thiserror.
//!
//! Every stage of an invocation has its own error type. `RunError` wraps
//! them with the stage that failed so the operator sees where it stopped.

use std::path::PathBuf;

use thiserror::Error;

use crate::template::TemplateKind;

/// Errors raised while validating the SMTP/email configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SMTP hostname is missing")]
    MissingHost,
    #[error("SMTP port is missing")]
    MissingPort,
    #[error("SMTP port must hold an integer: {0}")]
    InvalidPort(String),
    #[error("SMTP port is out of range: {0}")]
    PortOutOfRange(String),
    #[error("email recipient can't be empty")]
    MissingRecipient,
    #[error("email content type must be either text/html or text/plain")]
    InvalidContentType(String),
}

/// Errors related to template compilation and rendering.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("failed to read {kind} template '{}': {source}", path.display())]
    Read {
        kind: TemplateKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {kind} template '{origin}': {message}")]
    Syntax {
        kind: TemplateKind,
        origin: String,
        message: String,
    },
    #[error("{kind} template '{origin}' failed to render: {message}")]
    RenderFailed {
        kind: TemplateKind,
        origin: String,
        message: String,
    },
}

impl TemplateError {
    /// Which template (subject or body) the error belongs to.
    pub fn kind(&self) -> TemplateKind {
        match self {
            TemplateError::Read { kind, .. }
            | TemplateError::Syntax { kind, .. }
            | TemplateError::RenderFailed { kind, .. } => *kind,
        }
    }
}

/// Errors raised while assembling the outgoing message.
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("failed to attach file '{}': {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {field} address '{value}': {message}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        message: String,
    },
    #[error("no sender address: set a sender or an SMTP username that is an email address")]
    MissingSender,
    #[error("failed to build email: {0}")]
    Build(String),
}

/// Errors from the SMTP collaborator.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("TLS configuration error: {0}")]
    Tls(String),
    #[error("{0}")]
    SendFailed(String),
}

/// Top-level failure of one invocation, tagged with the stage that failed.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to get work directory: {0}")]
    WorkDir(#[source] std::io::Error),
    #[error("failed to create email body: {0}")]
    Body(#[source] TemplateError),
    #[error("failed to create email subject: {0}")]
    Subject(#[source] TemplateError),
    #[error("failed to prepare email: {0}")]
    Compose(#[from] ComposeError),
    #[error("failed to send email: {0}")]
    Send(#[from] TransportError),
}

impl From<TemplateError> for RunError {
    fn from(err: TemplateError) -> Self {
        match err.kind() {
            TemplateKind::Subject => RunError::Subject(err),
            TemplateKind::Body => RunError::Body(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        assert_eq!(
            ConfigError::MissingHost.to_string(),
            "SMTP hostname is missing"
        );
        assert_eq!(ConfigError::MissingPort.to_string(), "SMTP port is missing");
        assert_eq!(
            ConfigError::InvalidPort("abc".to_string()).to_string(),
            "SMTP port must hold an integer: abc"
        );
        assert_eq!(
            ConfigError::PortOutOfRange("70000".to_string()).to_string(),
            "SMTP port is out of range: 70000"
        );
        assert_eq!(
            ConfigError::MissingRecipient.to_string(),
            "email recipient can't be empty"
        );
    }

    #[test]
    fn template_error_names_kind_and_path() {
        let err = TemplateError::Read {
            kind: TemplateKind::Body,
            path: PathBuf::from("/work/body.tmpl"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("body template"));
        assert!(msg.contains("/work/body.tmpl"));
    }

    #[test]
    fn template_error_routes_to_stage() {
        let err = TemplateError::Syntax {
            kind: TemplateKind::Subject,
            origin: "subject.tmpl".to_string(),
            message: "unexpected end of input".to_string(),
        };
        let run: RunError = err.into();
        assert!(matches!(run, RunError::Subject(_)));
        assert!(
            run.to_string()
                .starts_with("failed to create email subject: invalid subject template")
        );

        let err = TemplateError::RenderFailed {
            kind: TemplateKind::Body,
            origin: "built-in".to_string(),
            message: "undefined value".to_string(),
        };
        let run: RunError = err.into();
        assert!(matches!(run, RunError::Body(_)));
    }

    #[test]
    fn run_error_display_wraps_stage() {
        let err = RunError::Config(ConfigError::MissingHost);
        assert_eq!(
            err.to_string(),
            "invalid configuration: SMTP hostname is missing"
        );

        let err = RunError::Send(TransportError::SendFailed("connection refused".to_string()));
        assert_eq!(err.to_string(), "failed to send email: connection refused");

        let err = RunError::Compose(ComposeError::MissingSender);
        assert!(err.to_string().starts_with("failed to prepare email: "));
    }
}
