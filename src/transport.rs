//! SMTP delivery.
//!
//! The `EmailTransport` trait lets tests inject a mock while production uses
//! lettre's `AsyncSmtpTransport<Tokio1Executor>`.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::error::TransportError;

/// Port on which SMTP servers expect an implicit TLS handshake.
pub const SMTPS_PORT: u16 = 465;

/// Async email transport abstraction.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Send one message. Implementations do not retry.
    async fn send_email(&self, message: Message) -> Result<(), TransportError>;
}

/// SMTP transport backed by lettre.
pub struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    /// Build the transport from validated SMTP settings.
    ///
    /// Port 465 uses implicit TLS; any other port upgrades with STARTTLS when
    /// the server offers it. Credentials are only sent when a username is set.
    pub fn from_config(smtp: &SmtpConfig) -> Result<Self, TransportError> {
        let tls_parameters = TlsParameters::new(smtp.host.clone())
            .map_err(|e| TransportError::Tls(e.to_string()))?;

        let tls = if smtp.port == SMTPS_PORT {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Opportunistic(tls_parameters)
        };

        let builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp.host.as_str())
            .port(smtp.port)
            .tls(tls);

        let builder = match &smtp.username {
            Some(username) => {
                let password = smtp
                    .password
                    .as_ref()
                    .map(|p| p.expose().to_string())
                    .unwrap_or_default();
                builder.credentials(Credentials::new(username.clone(), password))
            }
            None => builder,
        };

        tracing::debug!(
            host = %smtp.host,
            port = smtp.port,
            implicit_tls = smtp.port == SMTPS_PORT,
            authenticated = smtp.username.is_some(),
            "SMTP transport configured"
        );

        Ok(Self {
            inner: builder.build(),
        })
    }
}

#[async_trait]
impl EmailTransport for SmtpTransport {
    async fn send_email(&self, message: Message) -> Result<(), TransportError> {
        self.inner
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}

impl std::fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTransport").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecretString;

    fn smtp_config(port: u16) -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port,
            username: None,
            password: None,
        }
    }

    #[test]
    fn from_config_starttls_port() {
        assert!(SmtpTransport::from_config(&smtp_config(587)).is_ok());
    }

    #[test]
    fn from_config_implicit_tls_port() {
        assert!(SmtpTransport::from_config(&smtp_config(SMTPS_PORT)).is_ok());
    }

    #[test]
    fn from_config_with_credentials() {
        let mut config = smtp_config(25);
        config.username = Some("bot".to_string());
        config.password = Some(SecretString::new("s3cret".to_string()));

        let transport = SmtpTransport::from_config(&config).unwrap();
        assert!(!format!("{:?}", transport).contains("s3cret"));
    }

    #[test]
    fn from_config_username_without_password() {
        let mut config = smtp_config(25);
        config.username = Some("bot".to_string());

        assert!(SmtpTransport::from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn transport_is_object_safe() {
        let transport: Box<dyn EmailTransport> =
            Box::new(SmtpTransport::from_config(&smtp_config(587)).unwrap());
        drop(transport);
    }
}
