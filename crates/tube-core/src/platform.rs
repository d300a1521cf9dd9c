//! Platform API client boundary
//!
//! Response parsing and signature deciphering live behind [`PlatformClient`];
//! this crate only shapes the requests and consumes the parsed metadata.

use crate::{
    transport::HttpTransport,
    types::{ClientInfo, DashOptions, VideoInfo},
    Result,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Opaque context the streaming adapter hands back when it needs fresh data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReloadContext(pub serde_json::Value);

/// Body of a `/player` request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    pub video_id: String,
    pub content_check_ok: bool,
    pub racy_check_ok: bool,
    pub playback_context: PlaybackContext,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackContext {
    pub ad_playback_context: AdPlaybackContext,
    pub content_playback_context: ContentPlaybackContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload_playback_context: Option<ReloadContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdPlaybackContext {
    pub pyv: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPlaybackContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_timestamp: Option<u64>,
}

impl PlayerRequest {
    /// Request used for the initial load of a video
    pub fn new(video_id: impl Into<String>, signature_timestamp: Option<u64>) -> Self {
        Self {
            video_id: video_id.into(),
            content_check_ok: true,
            racy_check_ok: true,
            playback_context: PlaybackContext {
                ad_playback_context: AdPlaybackContext { pyv: true },
                content_playback_context: ContentPlaybackContext {
                    signature_timestamp,
                },
                reload_playback_context: None,
            },
        }
    }

    /// Same request shape, carrying the adapter's reload context
    pub fn with_reload_context(mut self, context: ReloadContext) -> Self {
        self.playback_context.reload_playback_context = Some(context);
        self
    }
}

/// Parsed video metadata with its own DASH generation
#[async_trait]
pub trait VideoMetadata: Send + Sync {
    fn info(&self) -> &VideoInfo;

    /// Render a DASH MPD document for this video
    async fn to_dash(&self, options: DashOptions) -> Result<String>;
}

/// Handle to a constructed platform API client
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Execute a `/player` request and return the raw response
    async fn player(&self, request: &PlayerRequest) -> Result<serde_json::Value>;

    /// Parse a raw player response; `cpn` is the client playback nonce
    fn parse_video_info(&self, response: serde_json::Value, cpn: &str) -> Result<Arc<dyn VideoMetadata>>;

    /// Decipher a streaming URL using the player script
    async fn decipher(&self, url: &str) -> Result<String>;

    /// Signature timestamp of the loaded player script
    fn signature_timestamp(&self) -> Option<u64>;

    /// Identity of the session context
    fn client_info(&self) -> ClientInfo;
}

/// Options for one client construction attempt
#[derive(Clone)]
pub struct ClientOptions {
    /// Whether the client may reuse cached player/session data
    pub cache_enabled: bool,
    /// Transport used for every request the client issues
    pub fetch: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("cache_enabled", &self.cache_enabled)
            .finish_non_exhaustive()
    }
}

/// Constructs platform clients
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create(&self, options: ClientOptions) -> Result<Arc<dyn PlatformClient>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_player_request_shape() {
        let request = PlayerRequest::new("dQw4w9WgXcQ", Some(20_000));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "videoId": "dQw4w9WgXcQ",
                "contentCheckOk": true,
                "racyCheckOk": true,
                "playbackContext": {
                    "adPlaybackContext": { "pyv": true },
                    "contentPlaybackContext": { "signatureTimestamp": 20000 }
                }
            })
        );
    }

    #[test]
    fn test_reload_request_carries_context() {
        let context = ReloadContext(json!({ "scrubbedReloadPlaybackParams": { "token": "xyz" } }));
        let request = PlayerRequest::new("abc", None).with_reload_context(context);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value["playbackContext"]["reloadPlaybackContext"],
            json!({ "scrubbedReloadPlaybackParams": { "token": "xyz" } })
        );
        assert!(value["playbackContext"]["contentPlaybackContext"]
            .get("signatureTimestamp")
            .is_none());
    }
}
