//! Command-line interface for pipemail using clap.
//!
//! Every setting can be passed as a flag, but the plugin is normally driven by
//! environment variables: `PLUGIN_*` for the email settings and `DRONE_*` for
//! the pipeline description.

use clap::{Args, Parser, ValueEnum};

use crate::config::{EmailSettings, SecretString};
use crate::pipeline::{Author, Build, Commit, Failed, PipelineContext, Repo, Stage};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format for log aggregation.
    Json,
}

/// Minimum log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[value(alias = "warning")]
    Warn,
    #[value(aliases = ["fatal", "panic"])]
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Send a CI pipeline status email over SMTP.
#[derive(Parser, Debug)]
#[command(name = "pipemail")]
#[command(version)]
#[command(about = "Send a CI pipeline status email over SMTP")]
pub struct Cli {
    #[command(flatten)]
    pub email: EmailArgs,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Validate configuration and templates, then exit without sending.
    #[arg(long = "validate")]
    pub validate: bool,

    /// Compose the email and print it to stdout instead of sending it.
    #[arg(long = "dry-run", conflicts_with = "validate")]
    pub dry_run: bool,

    /// Log level.
    #[arg(long = "log-level", value_enum, ignore_case = true, default_value_t = LogLevel::Info, env = "PLUGIN_LOG_LEVEL")]
    pub log_level: LogLevel,

    /// Log format: text or json.
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, env = "PLUGIN_LOG_FORMAT")]
    pub log_format: LogFormat,
}

/// SMTP and email settings (`PLUGIN_*`).
#[derive(Args, Debug, Clone, Default)]
pub struct EmailArgs {
    #[arg(long = "smtp-host", env = "PLUGIN_SMTP_HOST")]
    pub smtp_host: Option<String>,

    #[arg(long = "smtp-port", env = "PLUGIN_SMTP_PORT")]
    pub smtp_port: Option<String>,

    #[arg(long = "smtp-username", env = "PLUGIN_SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    #[arg(long = "smtp-password", env = "PLUGIN_SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    /// From address; omitted from the message when empty.
    #[arg(long = "email-sender", env = "PLUGIN_EMAIL_SENDER")]
    pub email_sender: Option<String>,

    #[arg(long = "email-recipient", env = "PLUGIN_EMAIL_RECIPIENT")]
    pub email_recipient: Option<String>,

    /// text/html (default) or text/plain.
    #[arg(long = "email-content-type", env = "PLUGIN_EMAIL_CONTENT_TYPE")]
    pub email_content_type: Option<String>,

    /// Custom subject template file.
    #[arg(long = "email-template-subject", env = "PLUGIN_EMAIL_TEMPLATE_SUBJECT")]
    pub email_template_subject: Option<String>,

    /// Custom body template file.
    #[arg(long = "email-template-body", env = "PLUGIN_EMAIL_TEMPLATE_BODY")]
    pub email_template_body: Option<String>,

    /// File to attach; skipped with a warning when it does not exist.
    #[arg(long = "attach-file", env = "PLUGIN_ATTACH_FILE")]
    pub attach_file: Option<String>,
}

impl EmailArgs {
    pub fn settings(&self) -> EmailSettings {
        EmailSettings {
            smtp_host: self.smtp_host.clone(),
            smtp_port: self.smtp_port.clone(),
            smtp_username: self.smtp_username.clone(),
            smtp_password: self.smtp_password.clone().map(SecretString::new),
            sender: self.email_sender.clone(),
            recipient: self.email_recipient.clone(),
            content_type: self.email_content_type.clone(),
            subject_template: self.email_template_subject.clone(),
            body_template: self.email_template_body.clone(),
            attach_file: self.attach_file.clone(),
        }
    }
}

/// Pipeline description exported by the CI runner (`DRONE_*`).
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    #[arg(long = "repo-name", env = "DRONE_REPO_NAME", default_value = "", hide = true)]
    pub repo_name: String,
    #[arg(long = "repo-namespace", env = "DRONE_REPO_NAMESPACE", default_value = "", hide = true)]
    pub repo_namespace: String,
    #[arg(long = "repo", env = "DRONE_REPO", default_value = "", hide = true)]
    pub repo_slug: String,
    #[arg(long = "repo-link", env = "DRONE_REPO_LINK", default_value = "", hide = true)]
    pub repo_link: String,
    #[arg(long = "repo-branch", env = "DRONE_REPO_BRANCH", default_value = "", hide = true)]
    pub repo_branch: String,

    #[arg(long = "commit-sha", env = "DRONE_COMMIT_SHA", default_value = "", hide = true)]
    pub commit_sha: String,
    #[arg(long = "commit-message", env = "DRONE_COMMIT_MESSAGE", default_value = "", hide = true)]
    pub commit_message: String,
    #[arg(long = "commit-branch", env = "DRONE_COMMIT_BRANCH", default_value = "", hide = true)]
    pub commit_branch: String,
    #[arg(long = "commit-ref", env = "DRONE_COMMIT_REF", default_value = "", hide = true)]
    pub commit_ref: String,
    #[arg(long = "commit-link", env = "DRONE_COMMIT_LINK", default_value = "", hide = true)]
    pub commit_link: String,
    #[arg(long = "commit-author", env = "DRONE_COMMIT_AUTHOR", default_value = "", hide = true)]
    pub commit_author: String,
    #[arg(long = "commit-author-name", env = "DRONE_COMMIT_AUTHOR_NAME", default_value = "", hide = true)]
    pub commit_author_name: String,
    #[arg(long = "commit-author-email", env = "DRONE_COMMIT_AUTHOR_EMAIL", default_value = "", hide = true)]
    pub commit_author_email: String,

    #[arg(long = "build-event", env = "DRONE_BUILD_EVENT", default_value = "", hide = true)]
    pub build_event: String,
    #[arg(long = "build-number", env = "DRONE_BUILD_NUMBER", default_value = "", hide = true)]
    pub build_number: String,
    #[arg(long = "build-trigger", env = "DRONE_BUILD_TRIGGER", default_value = "", hide = true)]
    pub build_trigger: String,
    #[arg(long = "build-link", env = "DRONE_BUILD_LINK", default_value = "", hide = true)]
    pub build_link: String,
    #[arg(long = "build-status", env = "DRONE_BUILD_STATUS", default_value = "", hide = true)]
    pub build_status: String,
    #[arg(long = "build-parent", env = "DRONE_BUILD_PARENT", default_value = "", hide = true)]
    pub build_parent: String,

    #[arg(long = "stage-name", env = "DRONE_STAGE_NAME", default_value = "", hide = true)]
    pub stage_name: String,
    #[arg(long = "stage-number", env = "DRONE_STAGE_NUMBER", default_value = "", hide = true)]
    pub stage_number: String,
    #[arg(long = "stage-status", env = "DRONE_STAGE_STATUS", default_value = "", hide = true)]
    pub stage_status: String,

    /// Comma-separated names of failed steps.
    #[arg(long = "failed-steps", env = "DRONE_FAILED_STEPS", default_value = "", hide = true)]
    pub failed_steps: String,
    /// Comma-separated names of failed stages.
    #[arg(long = "failed-stages", env = "DRONE_FAILED_STAGES", default_value = "", hide = true)]
    pub failed_stages: String,
}

/// Numbers the runner leaves blank (or garbles) render as 0.
fn number(field: &'static str, raw: &str) -> u64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!(field, value = raw, "Ignoring non-numeric pipeline value");
        0
    })
}

impl PipelineArgs {
    pub fn to_context(&self) -> PipelineContext {
        PipelineContext {
            repo: Repo {
                name: self.repo_name.clone(),
                namespace: self.repo_namespace.clone(),
                slug: self.repo_slug.clone(),
                link: self.repo_link.clone(),
                branch: self.repo_branch.clone(),
            },
            commit: Commit {
                sha: self.commit_sha.clone(),
                message: self.commit_message.clone(),
                branch: self.commit_branch.clone(),
                git_ref: self.commit_ref.clone(),
                link: self.commit_link.clone(),
                author: Author {
                    username: self.commit_author.clone(),
                    name: self.commit_author_name.clone(),
                    email: self.commit_author_email.clone(),
                },
            },
            build: Build {
                event: self.build_event.clone(),
                number: number("DRONE_BUILD_NUMBER", &self.build_number),
                trigger: self.build_trigger.clone(),
                link: self.build_link.clone(),
                status: self.build_status.clone(),
                parent: number("DRONE_BUILD_PARENT", &self.build_parent),
            },
            stage: Stage {
                name: self.stage_name.clone(),
                number: number("DRONE_STAGE_NUMBER", &self.stage_number),
                status: self.stage_status.clone(),
            },
            failed: Failed::from_lists(&self.failed_steps, &self.failed_stages),
        }
    }
}
