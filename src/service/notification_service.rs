//! Best-effort delivery of lifecycle events.
//!
//! Events are dispatched after the state change is committed. Delivery runs on
//! its own task; a failing sink is logged and never reaches the caller.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::model::quote::{PaymentMethod, Quote};
use crate::model::quote_status::QuoteStatus;
use crate::util::email::{render_details_table, render_html_layout, EmailError, EmailMessage, SmtpEmailService};

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    QuoteSubmitted { quote: Quote },
    QuotePriced { quote: Quote },
    /// Sent once per acceptance; doubles as the payment request.
    QuoteAccepted { quote: Quote },
    PaymentReceived {
        quote: Quote,
        transaction_id: String,
        method: PaymentMethod,
        amount: f64,
    },
    QuoteStatusChanged { quote: Quote, previous: QuoteStatus },
    QuoteCancelled { quote: Quote },
    QuoteDeleted { snapshot: Quote },
    FeedbackReceived {
        quote_id: String,
        rating: i32,
        comment: Option<String>,
    },
}

impl LifecycleEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::QuoteSubmitted { .. } => "quote_submitted",
            LifecycleEvent::QuotePriced { .. } => "quote_priced",
            LifecycleEvent::QuoteAccepted { .. } => "quote_accepted",
            LifecycleEvent::PaymentReceived { .. } => "payment_received",
            LifecycleEvent::QuoteStatusChanged { .. } => "quote_status_changed",
            LifecycleEvent::QuoteCancelled { .. } => "quote_cancelled",
            LifecycleEvent::QuoteDeleted { .. } => "quote_deleted",
            LifecycleEvent::FeedbackReceived { .. } => "feedback_received",
        }
    }

    pub fn quote_id(&self) -> &str {
        match self {
            LifecycleEvent::QuoteSubmitted { quote }
            | LifecycleEvent::QuotePriced { quote }
            | LifecycleEvent::QuoteAccepted { quote }
            | LifecycleEvent::PaymentReceived { quote, .. }
            | LifecycleEvent::QuoteStatusChanged { quote, .. }
            | LifecycleEvent::QuoteCancelled { quote } => &quote.quote_id,
            LifecycleEvent::QuoteDeleted { snapshot } => &snapshot.quote_id,
            LifecycleEvent::FeedbackReceived { quote_id, .. } => quote_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl From<EmailError> for NotifyError {
    fn from(err: EmailError) -> Self {
        NotifyError::Delivery(err.to_string())
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: &LifecycleEvent) -> Result<(), NotifyError>;
}

/// Fire-and-forget front of a [`NotificationSink`].
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Notifier { sink }
    }

    pub fn dispatch(&self, event: LifecycleEvent) {
        let Ok(handle) = Handle::try_current() else {
            warn!(kind = event.kind(), "No async runtime, dropping notification");
            return;
        };
        let sink = Arc::clone(&self.sink);
        handle.spawn(async move {
            if let Err(err) = sink.notify(&event).await {
                warn!(
                    kind = event.kind(),
                    quote_id = event.quote_id(),
                    "Notification failed: {}",
                    err
                );
            }
        });
    }
}

/// Writes events to the log. Used when no SMTP server is configured.
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(&self, event: &LifecycleEvent) -> Result<(), NotifyError> {
        info!(kind = event.kind(), quote_id = event.quote_id(), "Lifecycle event");
        Ok(())
    }
}

pub struct EmailNotificationSink {
    email: Arc<SmtpEmailService>,
    staff_email: Option<String>,
}

impl EmailNotificationSink {
    pub fn new(email: Arc<SmtpEmailService>, staff_email: Option<String>) -> Self {
        EmailNotificationSink { email, staff_email }
    }
}

#[async_trait]
impl NotificationSink for EmailNotificationSink {
    async fn notify(&self, event: &LifecycleEvent) -> Result<(), NotifyError> {
        let brand = self.email.config.from_name.as_str();
        if let Some(message) = customer_message(event, brand) {
            self.email.send_email(message).await?;
        }
        if let Some(staff_email) = &self.staff_email {
            if let Some(message) = staff_message(event, staff_email, brand) {
                self.email.send_email(message).await?;
            }
        }
        Ok(())
    }
}

fn money(amount: Option<f64>) -> String {
    amount.map(|value| format!("{:.2}", value)).unwrap_or_else(|| "-".to_string())
}

fn quote_rows(quote: &Quote) -> Vec<(&'static str, String)> {
    vec![
        ("Quote", quote.quote_id.clone()),
        ("Status", quote.status.to_string()),
        ("From", quote.details.from_city.clone()),
        ("To", quote.details.to_city.clone()),
        ("Move date", quote.details.move_date.clone()),
        ("Estimated cost", money(quote.estimated_cost)),
        ("Final cost", money(quote.final_cost)),
    ]
}

fn compose(to: &str, brand: &str, subject: String, intro: String, rows: &[(&str, String)]) -> EmailMessage {
    let mut text = format!("{}\n\n", intro);
    for (label, value) in rows {
        text.push_str(&format!("{}: {}\n", label, value));
    }
    text.push_str(&format!("\n{}\n", brand));

    let body_html = format!(
        "<p>{}</p>\n{}",
        html_escape::encode_text(&intro),
        render_details_table(rows)
    );
    EmailMessage::new(to.to_string(), subject.clone())
        .with_text_body(text)
        .with_html_body(render_html_layout(brand, &subject, &body_html))
}

/// Mail to the customer who submitted the quote, if the event concerns them.
pub(crate) fn customer_message(event: &LifecycleEvent, brand: &str) -> Option<EmailMessage> {
    let (quote, subject, intro) = match event {
        LifecycleEvent::QuoteSubmitted { quote } => (
            quote,
            format!("We received your quote request {}", quote.quote_id),
            format!("Hello {}, thank you for your request. Keep your quote id to track it.", quote.full_name),
        ),
        LifecycleEvent::QuotePriced { quote } => (
            quote,
            format!("Your quote {} is ready", quote.quote_id),
            format!("Hello {}, we have priced your move. Review and accept it to proceed.", quote.full_name),
        ),
        LifecycleEvent::QuoteAccepted { quote } => (
            quote,
            format!("Payment request for quote {}", quote.quote_id),
            format!("Hello {}, your quote is accepted. Please complete the payment.", quote.full_name),
        ),
        LifecycleEvent::PaymentReceived { quote, transaction_id, amount, .. } => (
            quote,
            format!("Payment received for quote {}", quote.quote_id),
            format!(
                "Hello {}, we received {:.2}. Your transaction id is {}.",
                quote.full_name, amount, transaction_id
            ),
        ),
        LifecycleEvent::QuoteStatusChanged { quote, .. } => (
            quote,
            format!("Quote {} is now {}", quote.quote_id, quote.status),
            format!("Hello {}, the status of your quote changed.", quote.full_name),
        ),
        LifecycleEvent::QuoteCancelled { quote } => (
            quote,
            format!("Quote {} cancelled", quote.quote_id),
            format!("Hello {}, your quote has been cancelled.", quote.full_name),
        ),
        LifecycleEvent::QuoteDeleted { .. } | LifecycleEvent::FeedbackReceived { .. } => return None,
    };
    Some(compose(&quote.email, brand, subject, intro, &quote_rows(quote)))
}

/// Copy for the operations inbox on events staff act upon.
pub(crate) fn staff_message(event: &LifecycleEvent, staff_email: &str, brand: &str) -> Option<EmailMessage> {
    match event {
        LifecycleEvent::QuoteSubmitted { quote }
        | LifecycleEvent::QuoteAccepted { quote }
        | LifecycleEvent::QuoteCancelled { quote } => {
            let mut rows = quote_rows(quote);
            rows.push(("Customer", quote.full_name.clone()));
            rows.push(("Email", quote.email.clone()));
            rows.push(("Phone", quote.phone.clone()));
            Some(compose(
                staff_email,
                brand,
                format!("[{}] {}", event.kind(), quote.quote_id),
                format!("Quote {} needs attention.", quote.quote_id),
                &rows,
            ))
        }
        LifecycleEvent::PaymentReceived { quote, transaction_id, method, amount } => Some(compose(
            staff_email,
            brand,
            format!("[{}] {}", event.kind(), quote.quote_id),
            format!("Payment recorded for quote {}.", quote.quote_id),
            &[
                ("Transaction", transaction_id.clone()),
                ("Method", method.as_str().to_string()),
                ("Amount", format!("{:.2}", amount)),
            ],
        )),
        LifecycleEvent::QuoteDeleted { snapshot } => Some(compose(
            staff_email,
            brand,
            format!("[{}] {}", event.kind(), snapshot.quote_id),
            format!("Customer deleted quote {}.", snapshot.quote_id),
            &quote_rows(snapshot),
        )),
        LifecycleEvent::FeedbackReceived { quote_id, rating, comment } => Some(compose(
            staff_email,
            brand,
            format!("[{}] {}", event.kind(), quote_id),
            format!("New feedback on quote {}.", quote_id),
            &[
                ("Rating", rating.to_string()),
                ("Comment", comment.clone().unwrap_or_default()),
            ],
        )),
        LifecycleEvent::QuotePriced { .. } | LifecycleEvent::QuoteStatusChanged { .. } => None,
    }
}
