//! Session initializer - bounded-retry platform client construction
//!
//! The first attempt may use cached player/session data. Stale cached data is
//! the usual reason the first attempt fails, so every retry disables caching.
//! Independently of retries, every request for a player script carries a fresh
//! `t=<n>` parameter so a forwarding cache can never serve an old script.

use crate::{
    platform::{ClientFactory, ClientOptions, PlatformClient},
    transport::{set_query_param, HttpRequest, HttpResponse, HttpTransport},
    Error, Result,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Default number of client construction attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Query parameter carrying the cache-busting value
const CACHE_BUST_PARAM: &str = "t";

/// Monotonic cache-busting value source
///
/// Values follow the millisecond wall clock but never repeat or go backwards.
#[derive(Debug, Default)]
pub struct CacheBuster {
    last: AtomicI64,
}

impl CacheBuster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

/// Returns true for requests that fetch the player or its core script
pub fn is_player_script(url: &url::Url) -> bool {
    let url = url.as_str();
    url.contains("player") || url.contains("base.js")
}

/// Fetch path handed to the platform client
pub struct CacheBustingFetcher {
    inner: Arc<dyn HttpTransport>,
    buster: Arc<CacheBuster>,
}

impl CacheBustingFetcher {
    pub fn new(inner: Arc<dyn HttpTransport>, buster: Arc<CacheBuster>) -> Self {
        Self { inner, buster }
    }
}

#[async_trait]
impl HttpTransport for CacheBustingFetcher {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        if is_player_script(&request.url) {
            let value = self.buster.next().to_string();
            set_query_param(&mut request.url, CACHE_BUST_PARAM, &value);
        }
        self.inner.send(request).await
    }
}

/// Builds the platform client with bounded retries
pub struct SessionInitializer {
    factory: Arc<dyn ClientFactory>,
    transport: Arc<dyn HttpTransport>,
    buster: Arc<CacheBuster>,
}

impl SessionInitializer {
    pub fn new(factory: Arc<dyn ClientFactory>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            factory,
            transport,
            buster: Arc::new(CacheBuster::new()),
        }
    }

    fn fetcher(&self) -> Arc<dyn HttpTransport> {
        Arc::new(CacheBustingFetcher::new(
            self.transport.clone(),
            self.buster.clone(),
        ))
    }

    /// Construct a client, retrying up to `max_retries` attempts in total.
    ///
    /// The error of the final attempt is returned unchanged.
    #[instrument(skip(self))]
    pub async fn initialize(&self, max_retries: u32) -> Result<Arc<dyn PlatformClient>> {
        if max_retries == 0 {
            return Err(Error::InvalidConfig(
                "max_retries must be at least 1".to_string(),
            ));
        }

        let mut attempt = 0;
        loop {
            let options = ClientOptions {
                cache_enabled: attempt == 0,
                fetch: self.fetcher(),
            };

            match self.factory.create(options).await {
                Ok(client) => {
                    info!(attempts = attempt + 1, "Platform client initialized");
                    return Ok(client);
                }
                Err(e) => {
                    error!(attempt = attempt + 1, error = %e, "Platform client init failed");
                    attempt += 1;
                    if attempt >= max_retries {
                        return Err(e);
                    }
                    info!(attempt = attempt + 1, "Retrying platform client init");
                }
            }
        }
    }
}
