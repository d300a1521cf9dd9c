//! Playback resolver - delivery mode classification and manifest selection
//!
//! | Mode          | First choice                    | Fallback                        |
//! |---------------|---------------------------------|---------------------------------|
//! | Live          | DASH URL + `/mpd_version/7`     | HLS URL                         |
//! | Post-live DVR | HLS URL                         | DASH URL + `/mpd_version/7`     |
//! | On demand     | inline SABR DASH (base64 data URI) | -                            |

use crate::{
    platform::{PlatformClient, VideoMetadata},
    types::{DashOptions, SabrFormat, StreamingConfig, StreamingData, VideoInfo},
    Error, Result,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Suffix appended to DASH manifest URLs of live-originated streams
pub const LIVE_MPD_SUFFIX: &str = "/mpd_version/7";

/// MIME type of inline DASH manifests
pub const DASH_MIME_TYPE: &str = "application/dash+xml";

/// Live/DVR flags derived from platform metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoClassification {
    pub is_live: bool,
    pub is_post_live_dvr: bool,
}

impl VideoClassification {
    pub fn classify(info: &VideoInfo) -> Self {
        let basic = &info.basic_info;
        let has_manifest_url = info
            .streaming_data
            .as_ref()
            .is_some_and(StreamingData::has_manifest_url);

        Self {
            is_live: basic.is_live,
            is_post_live_dvr: basic.is_post_live_dvr || (basic.is_live_content && has_manifest_url),
        }
    }

    /// Live wins over post-live DVR when both flags are set
    pub fn delivery_mode(&self) -> DeliveryMode {
        if self.is_live {
            DeliveryMode::Live
        } else if self.is_post_live_dvr {
            DeliveryMode::PostLiveDvr
        } else {
            DeliveryMode::OnDemand
        }
    }
}

/// Mutually exclusive delivery modes used for branch selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryMode {
    Live,
    PostLiveDvr,
    OnDemand,
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMode::Live => write!(f, "live"),
            DeliveryMode::PostLiveDvr => write!(f, "post-live DVR"),
            DeliveryMode::OnDemand => write!(f, "on-demand"),
        }
    }
}

/// Resolved playable target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManifestDescriptor {
    DashManifestUrl(String),
    HlsManifestUrl(String),
    /// Base64-encoded MPD document
    InlineDashManifest(String),
}

impl ManifestDescriptor {
    /// URI handed to the video engine
    pub fn uri(&self) -> String {
        match self {
            ManifestDescriptor::DashManifestUrl(url) | ManifestDescriptor::HlsManifestUrl(url) => url.clone(),
            ManifestDescriptor::InlineDashManifest(payload) => {
                format!("data:{};base64,{}", DASH_MIME_TYPE, payload)
            }
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, ManifestDescriptor::InlineDashManifest(_))
    }
}

impl std::fmt::Display for ManifestDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestDescriptor::DashManifestUrl(url) => write!(f, "DASH {}", url),
            ManifestDescriptor::HlsManifestUrl(url) => write!(f, "HLS {}", url),
            ManifestDescriptor::InlineDashManifest(payload) => {
                write!(f, "inline DASH ({} base64 bytes)", payload.len())
            }
        }
    }
}

/// Everything needed to start playback of one load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlayback {
    pub classification: VideoClassification,
    pub manifest: ManifestDescriptor,
    /// Applied to the adapter before load; `None` defers to the reload handshake
    pub streaming: Option<StreamingConfig>,
}

/// Resolves video metadata into a manifest descriptor
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackResolver;

impl PlaybackResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the manifest for a video
    pub async fn resolve(&self, metadata: &dyn VideoMetadata) -> Result<ManifestDescriptor> {
        let info = metadata.info();
        check_playability(info)?;
        let classification = VideoClassification::classify(info);
        self.resolve_classified(metadata, classification).await
    }

    /// Resolve the manifest plus the pre-load streaming configuration
    #[instrument(skip_all, fields(video_id = %metadata.info().basic_info.id))]
    pub async fn resolve_playback(
        &self,
        metadata: &dyn VideoMetadata,
        client: &dyn PlatformClient,
    ) -> Result<ResolvedPlayback> {
        let info = metadata.info();
        check_playability(info)?;

        let classification = VideoClassification::classify(info);
        let manifest = self.resolve_classified(metadata, classification).await?;

        let streaming = match classification.delivery_mode() {
            DeliveryMode::OnDemand => Some(streaming_config(info, client).await?.ok_or_else(|| {
                Error::ManifestResolution("on-demand video has no server ABR streaming URL".to_string())
            })?),
            DeliveryMode::PostLiveDvr => streaming_config(info, client).await?,
            DeliveryMode::Live => None,
        };

        debug!(
            mode = %classification.delivery_mode(),
            manifest = %manifest,
            has_streaming_config = streaming.is_some(),
            "Playback resolved"
        );

        Ok(ResolvedPlayback {
            classification,
            manifest,
            streaming,
        })
    }

    async fn resolve_classified(
        &self,
        metadata: &dyn VideoMetadata,
        classification: VideoClassification,
    ) -> Result<ManifestDescriptor> {
        let mode = classification.delivery_mode();
        let streaming = metadata
            .info()
            .streaming_data
            .as_ref()
            .ok_or_else(|| Error::ManifestResolution("video has no streaming data".to_string()))?;

        let descriptor = match mode {
            DeliveryMode::Live => live_dash(streaming).or_else(|| hls(streaming)),
            DeliveryMode::PostLiveDvr => hls(streaming).or_else(|| live_dash(streaming)),
            DeliveryMode::OnDemand => {
                let mpd = metadata.to_dash(DashOptions::sabr()).await?;
                (!mpd.is_empty()).then(|| ManifestDescriptor::InlineDashManifest(BASE64.encode(mpd)))
            }
        };

        descriptor.ok_or_else(|| {
            Error::ManifestResolution(format!("no manifest available for {} content", mode))
        })
    }
}

/// Reject anything the platform did not report as playable
pub fn check_playability(info: &VideoInfo) -> Result<()> {
    let status = &info.playability_status;
    if status.is_ok() {
        return Ok(());
    }
    Err(Error::playability(
        status.status.clone(),
        status.reason.clone().unwrap_or_else(|| "no reason given".to_string()),
    ))
}

/// Decipher the server ABR URL and collect the adapter configuration
pub async fn streaming_config(
    info: &VideoInfo,
    client: &dyn PlatformClient,
) -> Result<Option<StreamingConfig>> {
    let Some(streaming) = info.streaming_data.as_ref() else {
        return Ok(None);
    };
    let Some(url) = non_empty(&streaming.server_abr_streaming_url) else {
        return Ok(None);
    };

    let streaming_url = client.decipher(url).await?;
    Ok(Some(StreamingConfig {
        streaming_url,
        ustreamer_config: info.ustreamer_config.clone(),
        formats: streaming.adaptive_formats.iter().map(SabrFormat::from).collect(),
    }))
}

fn live_dash(streaming: &StreamingData) -> Option<ManifestDescriptor> {
    non_empty(&streaming.dash_manifest_url)
        .map(|url| ManifestDescriptor::DashManifestUrl(format!("{}{}", url, LIVE_MPD_SUFFIX)))
}

fn hls(streaming: &StreamingData) -> Option<ManifestDescriptor> {
    non_empty(&streaming.hls_manifest_url).map(|url| ManifestDescriptor::HlsManifestUrl(url.to_string()))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        platform::PlayerRequest,
        types::{AdaptiveFormat, BasicInfo, ClientInfo, PlayabilityStatus},
    };
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct Metadata {
        info: VideoInfo,
        dash: String,
        requested: Mutex<Vec<DashOptions>>,
    }

    impl Metadata {
        fn new(info: VideoInfo) -> Self {
            Self {
                info,
                dash: "<MPD/>".to_string(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VideoMetadata for Metadata {
        fn info(&self) -> &VideoInfo {
            &self.info
        }

        async fn to_dash(&self, options: DashOptions) -> Result<String> {
            self.requested.lock().unwrap().push(options);
            Ok(self.dash.clone())
        }
    }

    struct Decipher;

    #[async_trait]
    impl PlatformClient for Decipher {
        async fn player(&self, _request: &PlayerRequest) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }

        fn parse_video_info(&self, _response: serde_json::Value, _cpn: &str) -> Result<Arc<dyn VideoMetadata>> {
            Err(Error::Platform("unused".into()))
        }

        async fn decipher(&self, url: &str) -> Result<String> {
            Ok(format!("{}&n=deciphered", url))
        }

        fn signature_timestamp(&self) -> Option<u64> {
            None
        }

        fn client_info(&self) -> ClientInfo {
            ClientInfo::default()
        }
    }

    fn info(live: bool, dvr: bool, live_content: bool, dash: Option<&str>, hls: Option<&str>) -> VideoInfo {
        VideoInfo {
            basic_info: BasicInfo {
                id: "vid".into(),
                is_live: live,
                is_post_live_dvr: dvr,
                is_live_content: live_content,
                ..Default::default()
            },
            playability_status: PlayabilityStatus::ok(),
            streaming_data: Some(StreamingData {
                dash_manifest_url: dash.map(str::to_string),
                hls_manifest_url: hls.map(str::to_string),
                server_abr_streaming_url: Some("https://rr1.googlevideo.com/videoplayback?s=1".into()),
                adaptive_formats: vec![AdaptiveFormat {
                    itag: 248,
                    mime_type: "video/webm".into(),
                    ..Default::default()
                }],
            }),
            ustreamer_config: Some("CgYI".into()),
        }
    }

    #[test]
    fn test_classification() {
        let c = VideoClassification::classify(&info(true, false, true, Some("d"), None));
        assert_eq!(c, VideoClassification { is_live: true, is_post_live_dvr: true });
        assert_eq!(c.delivery_mode(), DeliveryMode::Live);

        let c = VideoClassification::classify(&info(false, false, true, None, Some("h")));
        assert_eq!(c.delivery_mode(), DeliveryMode::PostLiveDvr);

        let c = VideoClassification::classify(&info(false, true, false, None, None));
        assert_eq!(c.delivery_mode(), DeliveryMode::PostLiveDvr);

        let c = VideoClassification::classify(&info(false, false, true, None, None));
        assert_eq!(c.delivery_mode(), DeliveryMode::OnDemand);

        let c = VideoClassification::classify(&info(false, false, false, Some("d"), Some("h")));
        assert_eq!(c.delivery_mode(), DeliveryMode::OnDemand);
    }

    #[tokio::test]
    async fn test_live_prefers_versioned_dash() {
        let metadata = Metadata::new(info(true, false, true, Some("https://m/dash"), Some("https://m/hls")));
        let descriptor = PlaybackResolver::new().resolve(&metadata).await.unwrap();
        assert_eq!(descriptor, ManifestDescriptor::DashManifestUrl("https://m/dash/mpd_version/7".into()));
        assert!(descriptor.uri().ends_with(LIVE_MPD_SUFFIX));
    }

    #[tokio::test]
    async fn test_live_falls_back_to_plain_hls() {
        let metadata = Metadata::new(info(true, false, true, None, Some("https://m/hls.m3u8")));
        let descriptor = PlaybackResolver::new().resolve(&metadata).await.unwrap();
        assert_eq!(descriptor, ManifestDescriptor::HlsManifestUrl("https://m/hls.m3u8".into()));
    }

    #[tokio::test]
    async fn test_post_live_dvr_prefers_hls() {
        let metadata = Metadata::new(info(false, true, true, Some("https://m/dash"), Some("https://m/hls")));
        let descriptor = PlaybackResolver::new().resolve(&metadata).await.unwrap();
        assert_eq!(descriptor, ManifestDescriptor::HlsManifestUrl("https://m/hls".into()));

        let metadata = Metadata::new(info(false, true, true, Some("https://m/dash"), None));
        let descriptor = PlaybackResolver::new().resolve(&metadata).await.unwrap();
        assert_eq!(descriptor, ManifestDescriptor::DashManifestUrl("https://m/dash/mpd_version/7".into()));
    }

    #[tokio::test]
    async fn test_on_demand_is_inline_sabr() {
        let metadata = Metadata::new(info(false, false, false, Some("https://m/dash"), None));
        let descriptor = PlaybackResolver::new().resolve(&metadata).await.unwrap();

        assert_eq!(descriptor, ManifestDescriptor::InlineDashManifest(BASE64.encode("<MPD/>")));
        assert_eq!(descriptor.uri(), "data:application/dash+xml;base64,PE1QRC8+");

        let requested = metadata.requested.lock().unwrap();
        assert_eq!(requested.as_slice(), [DashOptions::sabr()]);
        assert!(requested[0].is_sabr);
        assert!(!requested[0].include_thumbnails);
    }

    #[tokio::test]
    async fn test_missing_manifest_fails() {
        let metadata = Metadata::new(info(true, false, true, None, None));
        let err = PlaybackResolver::new().resolve(&metadata).await.unwrap_err();
        assert!(matches!(err, Error::ManifestResolution(_)));

        let mut bare = info(false, false, false, None, None);
        bare.streaming_data = None;
        let err = PlaybackResolver::new().resolve(&Metadata::new(bare)).await.unwrap_err();
        assert!(matches!(err, Error::ManifestResolution(_)));

        let mut empty = Metadata::new(info(false, false, false, None, None));
        empty.dash = String::new();
        let err = PlaybackResolver::new().resolve(&empty).await.unwrap_err();
        assert!(matches!(err, Error::ManifestResolution(_)));
    }

    #[tokio::test]
    async fn test_unplayable_status() {
        let mut unplayable = info(false, false, false, None, None);
        unplayable.playability_status = PlayabilityStatus {
            status: "UNPLAYABLE".into(),
            reason: Some("Video unavailable".into()),
        };
        let metadata = Metadata::new(unplayable);
        let err = PlaybackResolver::new().resolve(&metadata).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot play video: UNPLAYABLE (Video unavailable)");
        assert!(metadata.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_playback_streaming_config() {
        let resolver = PlaybackResolver::new();

        let vod = Metadata::new(info(false, false, false, None, None));
        let resolved = resolver.resolve_playback(&vod, &Decipher).await.unwrap();
        let streaming = resolved.streaming.unwrap();
        assert_eq!(streaming.streaming_url, "https://rr1.googlevideo.com/videoplayback?s=1&n=deciphered");
        assert_eq!(streaming.ustreamer_config.as_deref(), Some("CgYI"));
        assert_eq!(streaming.formats.len(), 1);

        let live = Metadata::new(info(true, false, true, Some("https://m/dash"), None));
        let resolved = resolver.resolve_playback(&live, &Decipher).await.unwrap();
        assert!(resolved.streaming.is_none());

        let dvr = Metadata::new(info(false, true, true, None, Some("https://m/hls")));
        let resolved = resolver.resolve_playback(&dvr, &Decipher).await.unwrap();
        assert!(resolved.streaming.is_some());
    }

    #[tokio::test]
    async fn test_on_demand_requires_streaming_url() {
        let mut vod = info(false, false, false, None, None);
        if let Some(s) = vod.streaming_data.as_mut() {
            s.server_abr_streaming_url = None;
        }
        let err = PlaybackResolver::new()
            .resolve_playback(&Metadata::new(vod), &Decipher)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ManifestResolution(_)));
    }
}
