//! Orchestration of one notification run.
//!
//! # Architecture
//!
//! ```text
//! main.rs
//!     |
//!     v
//! engine.rs (MailEngine)
//!     |
//!     +-- template.rs (body, then subject)
//!     +-- compose.rs  (headers, body, attachment)
//!     +-- transport.rs (SMTP send)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let registry = TemplateRegistry::new()?;
//! let engine = MailEngine::new(&registry, std::env::current_dir()?);
//! let transport = SmtpTransport::from_config(&config.smtp)?;
//! engine.deliver(&config, &pipeline, &transport).await?;
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::compose::{ComposedMessage, assemble};
use crate::config::EmailConfig;
use crate::error::RunError;
use crate::pipeline::PipelineContext;
use crate::template::{RenderedMessage, TemplateKind, TemplateRegistry};
use crate::transport::EmailTransport;

/// Runs the render, compose and send stages for one pipeline run.
///
/// Borrows the process-wide [`TemplateRegistry`]; custom templates are
/// compiled on every call and never cached.
#[derive(Debug)]
pub struct MailEngine<'r> {
    registry: &'r TemplateRegistry,
    /// Directory that relative template and attachment paths resolve against.
    base_dir: PathBuf,
}

impl<'r> MailEngine<'r> {
    pub fn new(registry: &'r TemplateRegistry, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve and compile both templates without rendering them.
    ///
    /// Used by `--validate` to catch missing or broken template files.
    pub fn check_templates(&self, config: &EmailConfig) -> Result<(), RunError> {
        self.registry.resolve(
            TemplateKind::Body,
            config.body_template.as_deref(),
            config.content_type,
            &self.base_dir,
        )?;
        self.registry.resolve(
            TemplateKind::Subject,
            config.subject_template.as_deref(),
            config.content_type,
            &self.base_dir,
        )?;
        Ok(())
    }

    /// Render body and subject for `pipeline`.
    pub fn render(
        &self,
        config: &EmailConfig,
        pipeline: &PipelineContext,
    ) -> Result<RenderedMessage, RunError> {
        let data = pipeline.template_data();

        let body = self
            .registry
            .resolve(
                TemplateKind::Body,
                config.body_template.as_deref(),
                config.content_type,
                &self.base_dir,
            )?
            .render(&data)?;

        let subject = self
            .registry
            .resolve(
                TemplateKind::Subject,
                config.subject_template.as_deref(),
                config.content_type,
                &self.base_dir,
            )?
            .render(&data)?;

        Ok(RenderedMessage { subject, body })
    }

    /// Render and assemble the message without sending it.
    pub fn compose(
        &self,
        config: &EmailConfig,
        pipeline: &PipelineContext,
    ) -> Result<ComposedMessage, RunError> {
        let RenderedMessage { subject, body } = self.render(config, pipeline)?;

        let composed = assemble(
            config.sender.as_deref(),
            &config.recipient,
            subject,
            body,
            config.content_type,
            &self.base_dir,
            config.attach_file.as_deref(),
        )?;

        debug!(
            subject = %composed.subject,
            content_type = %composed.content_type,
            has_attachment = composed.attachment.is_some(),
            "Email composed"
        );
        Ok(composed)
    }

    /// Compose the message and hand it to `transport`.
    ///
    /// Failures are not retried.
    pub async fn deliver(
        &self,
        config: &EmailConfig,
        pipeline: &PipelineContext,
        transport: &dyn EmailTransport,
    ) -> Result<ComposedMessage, RunError> {
        let composed = self.compose(config, pipeline)?;
        let message = composed.to_message(config.smtp.username.as_deref())?;

        transport.send_email(message).await?;

        info!(
            recipient = %config.recipient,
            event = %pipeline.build.event,
            repo = %pipeline.repo.link,
            "Sent email"
        );
        Ok(composed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContentType, EmailSettings};
    use crate::error::{ComposeError, TemplateError, TransportError};
    use crate::pipeline::{Build, Repo, Stage};
    use async_trait::async_trait;
    use lettre::Message;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    // ===================================================================
    // MockEmailTransport
    // ===================================================================

    /// Records every message and optionally fails.
    struct MockEmailTransport {
        sent: Mutex<Vec<String>>,
        send_count: AtomicU32,
        fail_with: Option<String>,
    }

    impl MockEmailTransport {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                send_count: AtomicU32::new(0),
                fail_with: None,
            }
        }

        fn failing(error: &str) -> Self {
            Self {
                fail_with: Some(error.to_string()),
                ..Self::new()
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EmailTransport for MockEmailTransport {
        async fn send_email(&self, message: Message) -> Result<(), TransportError> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = &self.fail_with {
                return Err(TransportError::SendFailed(error.clone()));
            }
            let raw = String::from_utf8_lossy(&message.formatted()).to_string();
            self.sent.lock().unwrap().push(raw);
            Ok(())
        }
    }

    fn config(content_type: &str) -> EmailConfig {
        EmailSettings {
            smtp_host: Some("smtp.example.com".to_string()),
            smtp_port: Some("587".to_string()),
            sender: Some("ci@example.com".to_string()),
            recipient: Some("ops@example.com".to_string()),
            content_type: Some(content_type.to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    fn pipeline() -> PipelineContext {
        PipelineContext {
            repo: Repo {
                name: "api".to_string(),
                slug: "acme/api".to_string(),
                link: "https://git.example.com/acme/api".to_string(),
                ..Default::default()
            },
            build: Build {
                event: "push".to_string(),
                number: 7,
                ..Default::default()
            },
            stage: Stage {
                name: "default".to_string(),
                number: 1,
                status: "success".to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn render_uses_builtin_templates_by_default() {
        let registry = TemplateRegistry::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let engine = MailEngine::new(&registry, dir.path());

        let rendered = engine.render(&config(""), &pipeline()).unwrap();
        assert_eq!(rendered.subject, "[SUCCESS] acme/api #7 (push)");
        assert!(rendered.body.contains("<!DOCTYPE html>"));
    }

    #[test]
    fn render_custom_plain_body() {
        let registry = TemplateRegistry::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("body.txt"), "{{ Build.Event }}").unwrap();
        let engine = MailEngine::new(&registry, dir.path());

        let mut config = config("text/plain");
        config.body_template = Some(PathBuf::from("body.txt"));

        let rendered = engine.render(&config, &pipeline()).unwrap();
        assert_eq!(rendered.body, "push");
    }

    #[test]
    fn render_body_errors_are_tagged_body() {
        let registry = TemplateRegistry::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let engine = MailEngine::new(&registry, dir.path());

        let mut config = config("");
        config.body_template = Some(PathBuf::from("missing-body.j2"));

        let err = engine.render(&config, &pipeline()).unwrap_err();
        assert!(matches!(err, RunError::Body(TemplateError::Read { .. })));
        assert!(err.to_string().starts_with("failed to create email body"));
    }

    #[test]
    fn render_subject_errors_are_tagged_subject() {
        let registry = TemplateRegistry::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("subject.j2"), "{{ Stage.Colour }}").unwrap();
        let engine = MailEngine::new(&registry, dir.path());

        let mut config = config("");
        config.subject_template = Some(PathBuf::from("subject.j2"));

        let err = engine.render(&config, &pipeline()).unwrap_err();
        assert!(matches!(err, RunError::Subject(TemplateError::RenderFailed { .. })));
    }

    #[test]
    fn check_templates_reports_missing_file() {
        let registry = TemplateRegistry::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let engine = MailEngine::new(&registry, dir.path());

        assert!(engine.check_templates(&config("")).is_ok());

        let mut config = config("");
        config.subject_template = Some(PathBuf::from("nope.j2"));
        assert!(matches!(
            engine.check_templates(&config),
            Err(RunError::Subject(_))
        ));
    }

    #[test]
    fn compose_with_missing_attachment_succeeds() {
        let registry = TemplateRegistry::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let engine = MailEngine::new(&registry, dir.path());

        let mut config = config("");
        config.attach_file = Some(PathBuf::from("missing.txt"));

        let composed = engine.compose(&config, &pipeline()).unwrap();
        assert!(composed.attachment.is_none());
        assert_eq!(composed.content_type, ContentType::Html);
    }

    #[tokio::test]
    async fn deliver_sends_once() {
        let registry = TemplateRegistry::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let engine = MailEngine::new(&registry, dir.path());
        let mock = MockEmailTransport::new();

        let composed = engine.deliver(&config(""), &pipeline(), &mock).await.unwrap();

        assert_eq!(mock.send_count.load(Ordering::SeqCst), 1);
        let sent = mock.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("ops@example.com"));
        assert!(sent[0].contains("ci@example.com"));
        assert_eq!(composed.subject, "[SUCCESS] acme/api #7 (push)");
    }

    #[tokio::test]
    async fn deliver_wraps_transport_error() {
        let registry = TemplateRegistry::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let engine = MailEngine::new(&registry, dir.path());
        let mock = MockEmailTransport::failing("535 authentication failed");

        let err = engine.deliver(&config(""), &pipeline(), &mock).await.unwrap_err();

        assert_eq!(mock.send_count.load(Ordering::SeqCst), 1, "no retry");
        assert_eq!(
            err.to_string(),
            "failed to send email: 535 authentication failed"
        );
    }

    #[tokio::test]
    async fn deliver_without_sender_or_username_fails_before_send() {
        let registry = TemplateRegistry::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let engine = MailEngine::new(&registry, dir.path());
        let mock = MockEmailTransport::new();

        let mut config = config("");
        config.sender = None;

        let err = engine.deliver(&config, &pipeline(), &mock).await.unwrap_err();
        assert!(matches!(err, RunError::Compose(ComposeError::MissingSender)));
        assert_eq!(mock.send_count.load(Ordering::SeqCst), 0);
    }
}
