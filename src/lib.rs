// src/lib.rs
//! pipemail - CI pipeline status notifications over SMTP.

pub mod cli;
pub mod compose;
pub mod config;
pub mod engine;
pub mod error;
pub mod paths;
pub mod pipeline;
pub mod template;
pub mod transport;

// Re-export commonly used types
pub use cli::{LogFormat, LogLevel};
pub use compose::{AttachmentLookup, ComposedMessage, assemble, lookup_attachment};
pub use config::{ContentType, EmailConfig, EmailSettings};
pub use engine::MailEngine;
pub use error::RunError;
pub use pipeline::PipelineContext;
pub use template::{CompiledTemplate, Engine, RenderedMessage, TemplateKind, TemplateRegistry};
pub use transport::{EmailTransport, SmtpTransport};
