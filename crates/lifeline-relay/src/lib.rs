//! Outbound relay clients for the Lifeline emergency network.
//!
//! Two best-effort services hang off a dispatch: a mail relay that tells a
//! monitored inbox about the incident, and a completion model that rewrites
//! the caller's note into a readable description. Both are optional; the
//! `from_config` helpers return `None` when the relevant settings are
//! absent, and the no-op implementations ([`NoopSink`], [`EchoEnhancer`])
//! keep the dispatcher running without them.

use lifeline_core::AppConfig;

mod enhancer;
mod error;
mod mailer;

pub use enhancer::{EchoEnhancer, EnhancerClient};
pub use error::RelayError;
pub use mailer::{MailerClient, NoopSink};

/// Builds the mail relay client from app configuration, or `None` when the
/// mailer settings are incomplete.
///
/// # Errors
///
/// Returns [`RelayError::Http`] if the HTTP client cannot be constructed
/// and [`RelayError::Config`] if the configured base URL is invalid.
pub fn mailer_from_config(config: &AppConfig) -> Result<Option<MailerClient>, RelayError> {
    let (Some(service_id), Some(template_id), Some(public_key)) = (
        config.mailer_service_id.as_deref(),
        config.mailer_template_id.as_deref(),
        config.mailer_public_key.as_deref(),
    ) else {
        return Ok(None);
    };

    let client = match config.mailer_base_url.as_deref() {
        Some(base) => MailerClient::with_base_url(
            service_id,
            template_id,
            public_key,
            config.relay_timeout_secs,
            base,
        )?,
        None => MailerClient::new(service_id, template_id, public_key, config.relay_timeout_secs)?,
    };
    Ok(Some(client))
}

/// Builds the description enhancer from app configuration, or `None` when
/// no API key is set.
///
/// # Errors
///
/// Returns [`RelayError::Http`] if the HTTP client cannot be constructed
/// and [`RelayError::Config`] if the base URL or model name is invalid.
pub fn enhancer_from_config(config: &AppConfig) -> Result<Option<EnhancerClient>, RelayError> {
    let Some(api_key) = config.enhancer_api_key.as_deref() else {
        return Ok(None);
    };

    let client = match config.enhancer_base_url.as_deref() {
        Some(base) => EnhancerClient::with_base_url(
            api_key,
            &config.enhancer_model,
            config.relay_timeout_secs,
            base,
        )?,
        None => EnhancerClient::new(api_key, &config.enhancer_model, config.relay_timeout_secs)?,
    };
    Ok(Some(client))
}
