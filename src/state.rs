use crate::domain::error::AppError;
use crate::domain::model::LeadListPage;
use crate::domain::traits::{LeadStore, WebhookSink};
use crate::infrastructure::config::Config;
use crate::infrastructure::gate::ListingGate;
use crate::infrastructure::network::client::HttpWebhook;
use crate::infrastructure::network::http::create_client;
use crate::infrastructure::storage::cache::ResultCache;
use crate::infrastructure::storage::db::SqliteLeadStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_rusqlite::Connection;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LeadStore>,
    pub gate: Arc<ListingGate>,
    pub cache: Arc<ResultCache<LeadListPage>>,
    pub webhook: Arc<dyn WebhookSink>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Connection, config: Config) -> Result<Self, AppError> {
        let client = create_client(Duration::from_secs(config.webhook.timeout_secs))?;
        let webhook = HttpWebhook::new(client, &config.webhook);
        Ok(Self::with_parts(
            Arc::new(SqliteLeadStore::new(db)),
            Arc::new(webhook),
            config,
        ))
    }

    /// Wires explicit store and webhook implementations; every call builds a
    /// fresh gate and cache.
    pub fn with_parts(
        store: Arc<dyn LeadStore>,
        webhook: Arc<dyn WebhookSink>,
        config: Config,
    ) -> Self {
        Self {
            store,
            gate: Arc::new(ListingGate::new()),
            cache: Arc::new(ResultCache::new(config.cache.ttl())),
            webhook,
            config: Arc::new(config),
        }
    }
}
