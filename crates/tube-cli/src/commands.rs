//! CLI command implementations

use crate::output::{self, OutputFormat};
use anyhow::Context;
use async_trait::async_trait;
use console::style;
use indicatif::ProgressBar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tabled::Tabled;
use tracing::debug;
use tube_core::{
    config::SESSION_ID_ENV,
    transport::{apply_field_projection, proxied_url},
    CacheBuster, CacheBustingFetcher, DashOptions, DeliveryMode, Error, HttpRequest, HttpTransport,
    PlaybackResolver, PlayerConfig, ProxyConfig, ProxyTransport, ReqwestTransport, SabrFormat,
    VideoClassification, VideoInfo, VideoMetadata,
};
use url::Url;

fn base_transport(config: &PlayerConfig) -> anyhow::Result<Arc<dyn HttpTransport>> {
    Ok(Arc::new(ReqwestTransport::new(Duration::from_millis(
        config.request_timeout_ms,
    ))?))
}

fn parse_headers(headers: &[String]) -> anyhow::Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("header must be `name: value`, got {:?}", header))?;
        map.append(
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        );
    }
    Ok(map)
}

#[derive(Serialize)]
struct ProxyUrlReport {
    target: String,
    proxied: String,
    bypass: bool,
}

/// Show the proxy URL for a target request
pub fn proxy_url(target: &str, session: Option<String>, headers: &[String], format: &str) -> anyhow::Result<()> {
    let config = PlayerConfig::from_env();
    let mut proxy = config.proxy.clone();
    if session.is_some() {
        proxy.session_id = ProxyConfig::resolve_session_id(std::env::var(SESSION_ID_ENV).ok(), session);
    }

    let mut url = Url::parse(target)?;
    apply_field_projection(&mut url);
    let headers = parse_headers(headers)?;

    let bypass = proxy.bypass;
    let proxied = if bypass {
        url.clone()
    } else {
        proxied_url(&proxy, &url, &headers)?
    };

    let report = ProxyUrlReport {
        target: target.to_string(),
        proxied: proxied.to_string(),
        bypass,
    };

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", output::to_json(&report)),
        OutputFormat::Text | OutputFormat::Table => {
            if bypass {
                println!("{} proxy bypassed (SKIP_PROXY=true)", style("note:").yellow());
            }
            println!("{}", report.proxied);
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct FetchReport {
    url: String,
    status: u16,
    content_type: Option<String>,
    bytes: usize,
}

/// Fetch a URL through the cache-busting and proxy stack
pub async fn fetch(target: &str, direct: bool, print_body: bool, format: &str) -> anyhow::Result<()> {
    let config = PlayerConfig::from_env();
    let url = Url::parse(target)?;

    let base = base_transport(&config)?;
    let inner: Arc<dyn HttpTransport> = if direct {
        base
    } else {
        Arc::new(ProxyTransport::new(base, config.proxy.clone()))
    };
    let fetcher = CacheBustingFetcher::new(inner, Arc::new(CacheBuster::new()));

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Fetching {}", url));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = fetcher.send(HttpRequest::get(url.clone())).await;
    spinner.finish_and_clear();

    let response = result.with_context(|| format!("fetching {}", url))?;
    let report = FetchReport {
        url: url.to_string(),
        status: response.status.as_u16(),
        content_type: response.content_type().map(str::to_string),
        bytes: response.body.len(),
    };

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", output::to_json(&report)),
        OutputFormat::Text | OutputFormat::Table => {
            let status = if response.is_success() {
                style(report.status.to_string()).green()
            } else {
                style(report.status.to_string()).red()
            };
            println!("Status: {}", status);
            println!("Content-Type: {}", report.content_type.as_deref().unwrap_or("-"));
            println!("Bytes: {}", report.bytes);
        }
    }

    if print_body {
        println!("{}", response.text());
    }

    Ok(())
}

/// Captured player metadata, as written by a host application
#[derive(Debug, Deserialize)]
struct Snapshot {
    info: VideoInfo,
    /// DASH document the platform library rendered for this video
    #[serde(default)]
    dash_manifest: Option<String>,
}

/// Metadata backed by a snapshot file
struct StaticMetadata {
    info: VideoInfo,
    dash_manifest: Option<String>,
}

#[async_trait]
impl VideoMetadata for StaticMetadata {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    async fn to_dash(&self, options: DashOptions) -> tube_core::Result<String> {
        debug!(?options, "Rendering DASH from snapshot");
        self.dash_manifest
            .clone()
            .ok_or_else(|| Error::ManifestResolution("snapshot carries no DASH manifest".to_string()))
    }
}

#[derive(Tabled)]
struct FormatRow {
    itag: u32,
    mime_type: String,
    bitrate: u64,
    resolution: String,
    audio_track: String,
}

impl From<&SabrFormat> for FormatRow {
    fn from(format: &SabrFormat) -> Self {
        let resolution = match (format.width, format.height) {
            (Some(w), Some(h)) => format!("{}x{}", w, h),
            _ => "-".to_string(),
        };
        Self {
            itag: format.itag,
            mime_type: format.mime_type.clone(),
            bitrate: format.bitrate,
            resolution,
            audio_track: format.audio_track_id.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[derive(Serialize)]
struct ResolveReport {
    id: String,
    title: Option<String>,
    classification: VideoClassification,
    delivery_mode: DeliveryMode,
    manifest: String,
    manifest_uri: String,
    has_server_abr_url: bool,
    formats: Vec<SabrFormat>,
}

/// Resolve the manifest for a snapshot without touching the network
pub async fn resolve(path: &Path, format: &str) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&raw).context("parsing snapshot")?;

    let metadata = StaticMetadata {
        info: snapshot.info,
        dash_manifest: snapshot.dash_manifest,
    };

    let manifest = PlaybackResolver::new().resolve(&metadata).await?;
    let info = metadata.info();
    let classification = VideoClassification::classify(info);

    let streaming = info.streaming_data.as_ref();
    let formats: Vec<SabrFormat> = streaming
        .map(|s| s.adaptive_formats.iter().map(SabrFormat::from).collect())
        .unwrap_or_default();

    let report = ResolveReport {
        id: info.basic_info.id.clone(),
        title: info.basic_info.title.clone(),
        classification,
        delivery_mode: classification.delivery_mode(),
        manifest: manifest.to_string(),
        manifest_uri: manifest.uri(),
        has_server_abr_url: streaming
            .and_then(|s| s.server_abr_streaming_url.as_deref())
            .is_some_and(|u| !u.is_empty()),
        formats,
    };

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", output::to_json(&report)),
        OutputFormat::Table => {
            println!("{}", output::table(report.formats.iter().map(FormatRow::from)));
        }
        OutputFormat::Text => {
            println!("Video: {} {}", report.id, report.title.as_deref().unwrap_or(""));
            println!("  Delivery: {}", style(report.delivery_mode).cyan());
            println!("  Manifest: {}", report.manifest);
            if !manifest.is_inline() {
                println!("  URI: {}", report.manifest_uri);
            }
            println!("  Server ABR URL: {}", report.has_server_abr_url);
            println!("  Formats: {}", report.formats.len());
        }
    }

    Ok(())
}
