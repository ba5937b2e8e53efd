//! pipemail - CI pipeline status notifications over SMTP.

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use pipemail::cli::{Cli, LogFormat, LogLevel};
use pipemail::error::RunError;
use pipemail::{MailEngine, SmtpTransport, TemplateRegistry};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` directives win over `PLUGIN_LOG_LEVEL` when set.
fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_filter()));

    match format {
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .flatten_event(true)
                .with_env_filter(filter)
                .init();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_format, cli.log_level);

    // Built-in templates ship inside the binary; failing to compile them is a
    // broken build, not bad input.
    let registry = match TemplateRegistry::new() {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Failed to compile built-in templates");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&cli, &registry) {
        error!(error = %e, "pipemail failed");
        std::process::exit(1);
    }

    Ok(())
}

fn run(cli: &Cli, registry: &TemplateRegistry) -> Result<()> {
    let pipeline = cli.pipeline.to_context();
    info!(
        event = %pipeline.build.event,
        repo = %pipeline.repo.link,
        "Processing pipeline notification"
    );

    let config = cli.email.settings().validate().map_err(RunError::from)?;
    let base_dir = std::env::current_dir().map_err(RunError::WorkDir)?;
    let engine = MailEngine::new(registry, base_dir);

    if cli.validate {
        engine.check_templates(&config)?;
        println!("Configuration is valid");
        println!("  SMTP: {}:{}", config.smtp.host, config.smtp.port);
        println!("  Recipient: {}", config.recipient);
        println!("  Content type: {}", config.content_type);
        println!("  Work directory: {}", engine.base_dir().display());
        return Ok(());
    }

    if cli.dry_run {
        let composed = engine.compose(&config, &pipeline)?;
        let message = composed
            .to_message(config.smtp.username.as_deref())
            .map_err(RunError::from)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&message.formatted())?;
        stdout.flush()?;
        return Ok(());
    }

    let transport = SmtpTransport::from_config(&config.smtp).map_err(RunError::from)?;

    // One message, one round trip: a current-thread runtime is enough.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(engine.deliver(&config, &pipeline, &transport))?;
    Ok(())
}
