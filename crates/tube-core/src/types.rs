//! Core types for Tube Player

use serde::{Deserialize, Serialize};

/// Player lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    /// Platform client not yet constructed
    Uninitialized,
    /// Client ready, nothing loaded
    Ready,
    /// Resolving and attaching a video
    Loading,
    /// Manifest handed to the video engine
    Playing,
    /// Last load was rejected, nothing is playing
    Failed,
    /// Player torn down
    Destroyed,
}

impl PlayerState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: PlayerState) -> bool {
        use PlayerState::*;
        matches!(
            (self, target),
            (Uninitialized, Ready) |
            (Ready, Loading) |
            (Loading, Playing) | (Loading, Failed) |
            (Playing, Loading) |
            (Failed, Loading) |
            (_, Destroyed)
        )
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerState::Uninitialized => write!(f, "uninitialized"),
            PlayerState::Ready => write!(f, "ready"),
            PlayerState::Loading => write!(f, "loading"),
            PlayerState::Playing => write!(f, "playing"),
            PlayerState::Failed => write!(f, "failed"),
            PlayerState::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Client identity reported to the streaming adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    /// Numeric client name id (e.g. 1 for WEB)
    pub client_name: u32,
    pub client_version: String,
}

/// Parsed video metadata, as produced by the platform client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoInfo {
    pub basic_info: BasicInfo,
    pub playability_status: PlayabilityStatus,
    pub streaming_data: Option<StreamingData>,
    /// `player_config.media_common_config.media_ustreamer_request_config.video_playback_ustreamer_config`
    pub ustreamer_config: Option<String>,
}

/// Basic video details returned to the host application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInfo {
    pub id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    /// Duration in seconds
    pub duration: Option<u64>,
    pub is_live: bool,
    pub is_post_live_dvr: bool,
    pub is_live_content: bool,
}

/// Playability block of a player response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayabilityStatus {
    pub status: String,
    pub reason: Option<String>,
}

impl Default for PlayabilityStatus {
    fn default() -> Self {
        Self {
            status: "UNKNOWN".to_string(),
            reason: None,
        }
    }
}

impl PlayabilityStatus {
    pub const OK: &'static str = "OK";

    pub fn ok() -> Self {
        Self {
            status: Self::OK.to_string(),
            reason: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Self::OK
    }
}

/// Streaming section of a player response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingData {
    pub dash_manifest_url: Option<String>,
    pub hls_manifest_url: Option<String>,
    /// Still ciphered; must go through `PlatformClient::decipher`
    pub server_abr_streaming_url: Option<String>,
    pub adaptive_formats: Vec<AdaptiveFormat>,
}

impl StreamingData {
    /// True when either a DASH or an HLS manifest URL is present and non-empty
    pub fn has_manifest_url(&self) -> bool {
        let present = |url: &Option<String>| url.as_deref().is_some_and(|u| !u.is_empty());
        present(&self.dash_manifest_url) || present(&self.hls_manifest_url)
    }
}

/// One adaptive format entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveFormat {
    pub itag: u32,
    pub mime_type: String,
    pub bitrate: u64,
    /// Microsecond timestamp, serialized by the platform as a string
    pub last_modified: Option<String>,
    pub xtags: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub content_length: Option<u64>,
    pub approx_duration_ms: Option<u64>,
    pub audio_track_id: Option<String>,
    pub is_drc: bool,
}

/// Format description the SABR adapter negotiates with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SabrFormat {
    pub itag: u32,
    pub last_modified: u64,
    pub xtags: Option<String>,
    pub mime_type: String,
    pub bitrate: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub content_length: Option<u64>,
    pub approx_duration_ms: Option<u64>,
    pub audio_track_id: Option<String>,
    pub is_drc: bool,
}

impl SabrFormat {
    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }
}

impl From<&AdaptiveFormat> for SabrFormat {
    fn from(format: &AdaptiveFormat) -> Self {
        Self {
            itag: format.itag,
            last_modified: format
                .last_modified
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            xtags: format.xtags.clone(),
            mime_type: format.mime_type.clone(),
            bitrate: format.bitrate,
            width: format.width,
            height: format.height,
            content_length: format.content_length,
            approx_duration_ms: format.approx_duration_ms,
            audio_track_id: format.audio_track_id.clone(),
            is_drc: format.is_drc,
        }
    }
}

/// Caption format requested from DASH generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionsFormat {
    Vtt,
    Ttml,
}

/// Options for `VideoMetadata::to_dash`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashOptions {
    pub is_sabr: bool,
    pub captions_format: CaptionsFormat,
    pub include_thumbnails: bool,
}

impl DashOptions {
    /// Options used for on-demand playback through the SABR adapter
    pub fn sabr() -> Self {
        Self {
            is_sabr: true,
            captions_format: CaptionsFormat::Vtt,
            include_thumbnails: false,
        }
    }
}

/// Deciphered streaming configuration pushed onto the adapter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingConfig {
    pub streaming_url: String,
    pub ustreamer_config: Option<String>,
    pub formats: Vec<SabrFormat>,
}
