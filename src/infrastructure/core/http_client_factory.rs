use anyhow::{Context, Result};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("stockscan/", env!("CARGO_PKG_VERSION"));

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Client with exponential-backoff retries (max 3) on transient failures.
    pub fn create_client() -> ClientWithMiddleware {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(5)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }
}

/// Appends `params` to `base_url` as an encoded query string.
///
/// reqwest-middleware does not expose `.query()`, so URLs are built up front.
pub fn build_url_with_query<K, V>(base_url: &str, params: &[(K, V)]) -> Result<String>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut url = Url::parse(base_url).with_context(|| format!("Invalid URL: {}", base_url))?;
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in params {
            pairs.append_pair(k.as_ref(), v.as_ref());
        }
    }
    Ok(url.into())
}
