//! HTTP transport layer
//!
//! Every request the platform client issues goes through an [`HttpTransport`].
//! [`ReqwestTransport`] talks to the network; [`ProxyTransport`] wraps another
//! transport and reshapes requests for the forwarding proxy:
//!
//! ```text
//! https://<proxy>/<path>?<query>&__host=<host>&__headers=<json>&session=<id>
//! ```

use crate::{config::ProxyConfig, Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Field projection applied to player-info requests
pub const PLAYER_FIELDS: &str = "playerConfig,storyboards,captions,playabilityStatus,streamingData,responseContext.mainAppWebResponseContext.datasyncId,videoDetails.isLive,videoDetails.isLiveContent,videoDetails.title,videoDetails.author,videoDetails.thumbnail";

/// Path fragment identifying the player-info endpoint
const PLAYER_ENDPOINT: &str = "v1/player";

/// Max characters of an HTML error body kept in the error message
const HTML_ERROR_PREVIEW: usize = 100;

/// Outbound HTTP request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }
}

/// Inbound HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Something that can execute an HTTP request
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Direct network transport backed by reqwest
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Transport that forwards requests through the proxy
pub struct ProxyTransport {
    inner: Arc<dyn HttpTransport>,
    config: ProxyConfig,
}

impl ProxyTransport {
    pub fn new(inner: Arc<dyn HttpTransport>, config: ProxyConfig) -> Self {
        Self { inner, config }
    }

    /// Build the proxy URL for a target URL and its headers
    pub fn proxied_url(&self, target: &Url, headers: &HeaderMap) -> Result<Url> {
        proxied_url(&self.config, target, headers)
    }
}

/// Rewrite `target` onto the proxy origin, carrying host, headers and session
pub fn proxied_url(config: &ProxyConfig, target: &Url, headers: &HeaderMap) -> Result<Url> {
    let host = target
        .host_str()
        .ok_or_else(|| Error::InvalidConfig(format!("request URL has no host: {}", target)))?;
    let host = match target.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let mut proxy_url = config.origin.join(target.path())?;
    proxy_url.set_query(target.query());

    let headers_json = serde_json::to_string(&headers_to_map(headers))?;
    {
        let mut pairs = proxy_url.query_pairs_mut();
        pairs.append_pair("__host", &host);
        pairs.append_pair("__headers", &headers_json);
        if let Some(session_id) = &config.session_id {
            pairs.append_pair("session", session_id);
        }
    }

    Ok(proxy_url)
}

#[async_trait]
impl HttpTransport for ProxyTransport {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        apply_field_projection(&mut request.url);

        if self.config.bypass {
            debug!(url = %request.url, "Proxy bypassed");
            return self.inner.send(request).await;
        }

        request.url = self.proxied_url(&request.url, &request.headers)?;
        debug!(url = %request.url, "Proxying request");

        let response = self.inner.send(request).await?;
        check_html_failure(&response)?;
        Ok(response)
    }
}

/// Set the `$fields` projection on player-info requests
pub fn apply_field_projection(url: &mut Url) {
    if url.path().contains(PLAYER_ENDPOINT) {
        set_query_param(url, "$fields", PLAYER_FIELDS);
    }
}

/// Replace (or add) a single query parameter, keeping the others in order
pub fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    pairs.extend_pairs(retained);
    pairs.append_pair(key, value);
}

/// Reject HTML bodies carrying a failure status
fn check_html_failure(response: &HttpResponse) -> Result<()> {
    let is_html = response
        .content_type()
        .map(|ct| ct.contains("text/html"))
        .unwrap_or(false);

    if is_html && !response.is_success() {
        let message: String = response.text().chars().take(HTML_ERROR_PREVIEW).collect();
        warn!(status = response.status.as_u16(), "Proxy returned an HTML error page");
        return Err(Error::ProxyTransport {
            status: response.status.as_u16(),
            message,
        });
    }

    Ok(())
}

/// Flatten a header map, joining repeated headers with ", "
fn headers_to_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        map.entry(name.as_str().trim().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    map
}
