// HTTP client utilities
use crate::domain::error::AppError;
use reqwest::Client;
use std::time::Duration;

/// Shared outbound client, built once per process.
pub fn create_client(timeout: Duration) -> Result<Client, AppError> {
    Ok(Client::builder()
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(30))
        .timeout(timeout)
        .user_agent(concat!("leadboard/", env!("CARGO_PKG_VERSION")))
        .build()?)
}
