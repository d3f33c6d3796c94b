use movers_backend::config::EmailConfig;
use movers_backend::util::email::{render_details_table, render_html_layout, EmailError, EmailMessage, SmtpEmailService};

/// Initialize tracing for tests
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();
}

fn create_test_config() -> EmailConfig {
    EmailConfig::from_test_env()
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[tokio::test]
    async fn test_email_service_creation() {
        init_tracing();
        // The SMTP pool needs a runtime to start
        let service = SmtpEmailService::new(create_test_config());
        assert!(service.is_ok());
    }

    #[test]
    fn test_email_message_with_bodies() {
        let message = EmailMessage::new("test@example.com".to_string(), "Quote UP25030001".to_string())
            .with_text_body("Text body".to_string())
            .with_html_body("<h1>HTML body</h1>".to_string());

        assert_eq!(message.to, "test@example.com");
        assert_eq!(message.text_body.as_deref(), Some("Text body"));
        assert_eq!(message.html_body.as_deref(), Some("<h1>HTML body</h1>"));
    }

    #[test]
    fn test_layout_wraps_brand_and_body() {
        let body = render_details_table(&[("From", "Delhi".to_string()), ("To", "Mumbai".to_string())]);
        let html = render_html_layout("Movers", "Your quote is ready", &body);
        assert!(html.contains("Movers"));
        assert!(html.contains("Your quote is ready"));
        assert!(html.contains("Delhi"));
        assert!(html.contains("Mumbai"));
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_email_error_display() {
        let errors = vec![
            EmailError::ConfigError("Config error".to_string()),
            EmailError::SmtpError("SMTP error".to_string()),
            EmailError::MessageError("Message error".to_string()),
            EmailError::AddressError("Address error".to_string()),
        ];
        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = create_test_config();
        config.smtp_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_staff_address_is_rejected() {
        let mut config = create_test_config();
        config.notify_staff_email = Some("ops".to_string());
        assert!(config.validate().is_err());
    }
}

/// Needs a local SMTP sink such as MailHog on port 1025.
#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    #[ignore]
    async fn test_send_email_to_local_smtp() {
        init_tracing();
        let service = SmtpEmailService::new(create_test_config()).unwrap();
        let message = EmailMessage::new("customer@example.com".to_string(), "Test".to_string())
            .with_text_body("Hello".to_string());
        assert!(service.send_email(message).await.is_ok());
    }
}
