use crate::cache::CacheManager;
use crate::error::{DsuError, Result};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CACHE_NAMESPACE: &str = "api";

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    retries: u32,
    backoff_base: Duration,
    cache: Option<CacheManager>,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dsu/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| DsuError::Registry {
                registry: "http client".to_string(),
                source,
            })?;

        Ok(Self {
            client,
            retries: DEFAULT_RETRIES,
            backoff_base: Duration::from_secs(1),
            cache: None,
        })
    }

    pub fn with_cache(mut self, cache: CacheManager) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    async fn backoff(&self, attempt: u32) {
        tokio::time::sleep(self.backoff_base * 2u32.pow(attempt)).await;
    }

    /// POSTs `body` as JSON. 429 fails immediately with `RateLimited`; other
    /// failures are retried with exponential backoff.
    async fn fetch_post<T, B>(&self, url: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut attempt = 0;
        loop {
            let failure = match self.client.post(url).json(body).send().await {
                Ok(response) if response.status().is_success() => {
                    return response.json().await.map_err(|source| DsuError::Registry {
                        registry: url.to_string(),
                        source,
                    });
                }
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    return Err(DsuError::RateLimited {
                        service: service_name(url),
                    });
                }
                Ok(response) => DsuError::Lookup {
                    coordinate: url.to_string(),
                    reason: format!("HTTP {}", response.status()),
                },
                Err(source) => DsuError::Registry {
                    registry: url.to_string(),
                    source,
                },
            };

            if attempt >= self.retries {
                return Err(failure);
            }
            debug!(url, attempt, error = %failure, "request failed, retrying");
            self.backoff(attempt).await;
            attempt += 1;
        }
    }

    /// Like [`HttpClient::fetch_post`], answered from the cache when `cache_key`
    /// has an unexpired entry.
    pub async fn post<T, B>(&self, url: &str, body: &B, cache_key: &str) -> Result<T>
    where
        T: DeserializeOwned + Serialize,
        B: Serialize + ?Sized,
    {
        let Some(cache) = &self.cache else {
            return self.fetch_post(url, body).await;
        };

        match cache.get::<T>(CACHE_NAMESPACE, cache_key) {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "ignoring unreadable cache entry"),
        }

        let result = self.fetch_post::<T, B>(url, body).await?;
        if let Err(err) = cache.set(CACHE_NAMESPACE, cache_key, &result) {
            warn!(error = %err, "failed to cache API response");
        }
        Ok(result)
    }
}

fn service_name(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}
