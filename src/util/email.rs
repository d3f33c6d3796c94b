use std::time::Duration;

use crate::config::{ConfigError, EmailConfig};
use lettre::{
    message::{Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info, instrument};

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("SMTP error: {0}")]
    SmtpError(String),
    #[error("Message building error: {0}")]
    MessageError(String),
    #[error("Address error: {0}")]
    AddressError(String),
}

impl From<ConfigError> for EmailError {
    fn from(err: ConfigError) -> Self {
        EmailError::ConfigError(err.to_string())
    }
}

/// Email message builder
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
}

impl EmailMessage {
    pub fn new(to: String, subject: String) -> Self {
        Self {
            to,
            subject,
            text_body: None,
            html_body: None,
        }
    }

    pub fn with_text_body(mut self, body: String) -> Self {
        self.text_body = Some(body);
        self
    }

    pub fn with_html_body(mut self, body: String) -> Self {
        self.html_body = Some(body);
        self
    }
}

/// Sends mail through a pooled async SMTP transport.
pub struct SmtpEmailService {
    pub config: EmailConfig,
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailService {
    /// Validates the configuration and prepares the transport. No connection
    /// is opened until the first send.
    #[instrument(skip(config), fields(host = %config.smtp_host, port = config.smtp_port))]
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        config.validate()?;

        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid from address: {}", e)))?;

        let tls = if config.use_tls {
            let parameters = TlsParameters::new(config.smtp_host.clone())
                .map_err(|e| EmailError::ConfigError(format!("TLS configuration error: {}", e)))?;
            if config.use_starttls {
                Tls::Required(parameters)
            } else {
                Tls::Wrapper(parameters)
            }
        } else {
            Tls::None
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.connection_timeout_secs)))
            .tls(tls)
            .credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ))
            .build();

        info!("SMTP email service ready");
        Ok(Self { config, from, transport })
    }

    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    pub async fn send_email(&self, message: EmailMessage) -> Result<(), EmailError> {
        let email = self.build_message(message)?;
        self.transport.send(email).await.map_err(|e| {
            error!("Failed to send email: {}", e);
            EmailError::SmtpError(e.to_string())
        })?;
        info!("Email sent");
        Ok(())
    }

    fn build_message(&self, message: EmailMessage) -> Result<Message, EmailError> {
        let to: Mailbox = message
            .to
            .parse::<Address>()
            .map(|address| Mailbox::new(None, address))
            .map_err(|e| EmailError::AddressError(format!("Invalid recipient {}: {}", message.to, e)))?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject);

        let built = match (message.text_body, message.html_body) {
            (Some(text), Some(html)) => builder.multipart(MultiPart::alternative_plain_html(text, html)),
            (Some(text), None) => builder.singlepart(SinglePart::plain(text)),
            (None, Some(html)) => builder.singlepart(SinglePart::html(html)),
            (None, None) => return Err(EmailError::MessageError("No message body provided".to_string())),
        };
        built.map_err(|e| EmailError::MessageError(e.to_string()))
    }
}

/// Wraps an already-escaped HTML fragment in the branded mail layout.
pub fn render_html_layout(brand: &str, heading: &str, body_html: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{heading}</title>
    <style>
        body {{ font-family: Arial, sans-serif; color: #2d2d2d; max-width: 600px; margin: 0 auto; padding: 16px; }}
        .banner {{ background: #0b4f6c; color: #ffffff; padding: 16px; }}
        .content {{ border: 1px solid #d9e2e7; padding: 24px; }}
        .footer {{ font-size: 12px; color: #7a8890; padding: 12px 0; }}
        table.details td {{ padding: 4px 12px 4px 0; }}
    </style>
</head>
<body>
    <div class="banner">
        <strong>{brand}</strong>
        <h2>{heading}</h2>
    </div>
    <div class="content">
{body_html}
    </div>
    <div class="footer">
        <p>Quote updates from {brand}. Replies to this address are not monitored.</p>
    </div>
</body>
</html>"#,
        brand = html_escape::encode_text(brand),
        heading = html_escape::encode_text(heading),
        body_html = body_html
    )
}

/// Renders label/value pairs as an HTML table, escaping both columns.
pub fn render_details_table(rows: &[(&str, String)]) -> String {
    let mut html = String::from("<table class=\"details\">\n");
    for (label, value) in rows {
        html.push_str(&format!(
            "<tr><td><strong>{}</strong></td><td>{}</td></tr>\n",
            html_escape::encode_text(label),
            html_escape::encode_text(value)
        ));
    }
    html.push_str("</table>");
    html
}
