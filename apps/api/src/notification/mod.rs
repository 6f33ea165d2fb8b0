use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info};

pub mod template;

const SUBJECT: &str = "Confirmación de Contacto - Enrique Lazo (Senior Full Stack Developer)";

/// Data required for the confirmation email, decoupled from the DB row.
#[derive(Debug, Clone)]
pub struct ContactNotificationPayload {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub contact_date: String,
    pub message: Option<String>,
}

/// Outbound notification seam. Implementations must never error: delivery
/// failure collapses to `false` so the contact flow cannot be blocked by it.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_confirmation(&self, payload: &ContactNotificationPayload) -> bool;
}

/// Sends confirmation emails through a transactional-email HTTP API.
pub struct HttpEmailSender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpEmailSender {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .expect("Failed to build HTTP client"),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl NotificationSender for HttpEmailSender {
    async fn send_confirmation(&self, payload: &ContactNotificationPayload) -> bool {
        info!("Preparing confirmation email for: {}", payload.email);

        let body = json!({
            "from": self.from,
            "to": payload.email,
            "subject": SUBJECT,
            "html": template::confirmation_template(payload),
        });

        let result = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!("Email sent successfully to: {}", payload.email);
                true
            }
            Ok(response) => {
                error!(
                    "Failed to send email to {}. Status: {}",
                    payload.email,
                    response.status()
                );
                false
            }
            Err(e) => {
                error!("Failed to send email to {}. Reason: {e}", payload.email);
                false
            }
        }
    }
}
