//! Outbound mail relay for emergency notifications.
//!
//! Wraps the `EmailJS` REST API (`POST /api/v1.0/email/send`). The relay
//! identifies itself with a service id, a template id, and a public key;
//! the template itself holds the recipient list, so the client only fills
//! in the per-incident parameters.

use std::time::Duration;

use lifeline_core::{EmergencyNotice, EmergencySink, NotifyStatus, PortError};
use reqwest::{Client, Url};
use serde::Serialize;

use crate::error::RelayError;

const DEFAULT_BASE_URL: &str = "https://api.emailjs.com/";
const SEND_PATH: &str = "api/v1.0/email/send";

/// Client for the `EmailJS` send endpoint.
///
/// Use [`MailerClient::new`] for production or
/// [`MailerClient::with_base_url`] to point at a mock server in tests.
pub struct MailerClient {
    client: Client,
    endpoint: Url,
    service_id: String,
    template_id: String,
    public_key: String,
}

#[derive(Serialize)]
struct SendPayload<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: TemplateParams,
}

#[derive(Debug, Serialize)]
struct TemplateParams {
    emergency_type: String,
    latitude: String,
    longitude: String,
    location_link: String,
}

impl MailerClient {
    /// Creates a client pointed at the production `EmailJS` API.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        service_id: &str,
        template_id: &str,
        public_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, RelayError> {
        Self::with_base_url(service_id, template_id, public_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`RelayError::Config`] if `base_url` is
    /// not a valid URL.
    pub fn with_base_url(
        service_id: &str,
        template_id: &str,
        public_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("lifeline/0.1 (emergency-dispatch)")
            .build()?;

        // Normalise: exactly one trailing slash so `join` appends the send
        // path instead of replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join(SEND_PATH))
            .map_err(|e| RelayError::Config(format!("invalid base URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            endpoint,
            service_id: service_id.to_owned(),
            template_id: template_id.to_owned(),
            public_key: public_key.to_owned(),
        })
    }

    /// Sends one emergency notification through the mail template.
    ///
    /// # Errors
    ///
    /// - [`RelayError::Http`] on network failure.
    /// - [`RelayError::UnexpectedStatus`] when the API answers with a
    ///   non-2xx status.
    pub async fn send_alert(&self, notice: &EmergencyNotice) -> Result<(), RelayError> {
        let payload = SendPayload {
            service_id: &self.service_id,
            template_id: &self.template_id,
            user_id: &self.public_key,
            template_params: template_params(notice),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::UnexpectedStatus {
                status,
                context: "email send".to_owned(),
            });
        }

        tracing::debug!(category = %notice.category, "emergency mail accepted by relay");
        Ok(())
    }
}

/// Per-incident template parameters: the category, the coordinates as
/// fixed six-decimal strings, and a maps link built from the same strings.
fn template_params(notice: &EmergencyNotice) -> TemplateParams {
    let latitude = format!("{:.6}", notice.location.latitude());
    let longitude = format!("{:.6}", notice.location.longitude());
    TemplateParams {
        emergency_type: notice.category.as_str().to_owned(),
        location_link: format!("https://www.google.com/maps?q={latitude},{longitude}"),
        latitude,
        longitude,
    }
}

#[async_trait::async_trait]
impl EmergencySink for MailerClient {
    async fn notify(&self, notice: &EmergencyNotice) -> Result<NotifyStatus, PortError> {
        self.send_alert(notice)
            .await
            .map_err(|e| PortError::new(e.to_string()))?;
        Ok(NotifyStatus::Sent)
    }
}

/// Sink used when no mail relay is configured. Dispatch proceeds and the
/// notification step reports [`NotifyStatus::Skipped`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

#[async_trait::async_trait]
impl EmergencySink for NoopSink {
    async fn notify(&self, notice: &EmergencyNotice) -> Result<NotifyStatus, PortError> {
        tracing::debug!(
            category = %notice.category,
            "mail relay not configured, skipping notification"
        );
        Ok(NotifyStatus::Skipped)
    }
}
