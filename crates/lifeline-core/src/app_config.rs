use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl Environment {
    /// Case-insensitive label parse; anything unrecognised is treated as
    /// development so a typo can never silently harden a dev box.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "production" => Self::Production,
            "test" => Self::Test,
            _ => Self::Development,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub hospitals_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub relay_timeout_secs: u64,
    pub mailer_base_url: Option<String>,
    pub mailer_service_id: Option<String>,
    pub mailer_template_id: Option<String>,
    pub mailer_public_key: Option<String>,
    pub enhancer_api_key: Option<String>,
    pub enhancer_base_url: Option<String>,
    pub enhancer_model: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("hospitals_path", &self.hospitals_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("relay_timeout_secs", &self.relay_timeout_secs)
            .field("mailer_base_url", &self.mailer_base_url)
            .field("mailer_service_id", &self.mailer_service_id)
            .field("mailer_template_id", &self.mailer_template_id)
            .field(
                "mailer_public_key",
                &self.mailer_public_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "enhancer_api_key",
                &self.enhancer_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("enhancer_base_url", &self.enhancer_base_url)
            .field("enhancer_model", &self.enhancer_model)
            .finish()
    }
}
