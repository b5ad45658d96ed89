//! Wires the dispatch resolver onto its production adapters.

use std::sync::Arc;

use lifeline_core::{AppConfig, DescriptionEnhancer, Dispatcher, EmergencySink};
use lifeline_db::{PgDispatchStore, PgProviderDirectory};
use lifeline_relay::{
    enhancer_from_config, mailer_from_config, EchoEnhancer, NoopSink, RelayError,
};
use sqlx::PgPool;

/// Builds the production dispatcher: Postgres directory and store, plus
/// the relay clients when configured and the no-op stand-ins when not.
///
/// # Errors
///
/// Returns [`RelayError`] if a relay client is configured but cannot be
/// constructed. Missing relay configuration is not an error.
pub fn build_dispatcher(pool: &PgPool, config: &AppConfig) -> Result<Arc<Dispatcher>, RelayError> {
    let directory = Arc::new(PgProviderDirectory::new(pool.clone()));
    let store = Arc::new(PgDispatchStore::new(pool.clone()));

    let enhancer: Arc<dyn DescriptionEnhancer> = match enhancer_from_config(config)? {
        Some(client) => Arc::new(client),
        None => {
            tracing::warn!("description enhancer not configured; dispatch uses raw seed text");
            Arc::new(EchoEnhancer)
        }
    };

    let sink: Arc<dyn EmergencySink> = match mailer_from_config(config)? {
        Some(client) => Arc::new(client),
        None => {
            tracing::warn!("mail relay not configured; emergency notifications will be skipped");
            Arc::new(NoopSink)
        }
    };

    Ok(Arc::new(Dispatcher::new(directory, store, enhancer, sink)))
}
