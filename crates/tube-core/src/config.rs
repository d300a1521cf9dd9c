//! Player configuration
//!
//! Values come from `PlayerConfig::default()` and can be overridden from the
//! environment with `PlayerConfig::from_env()`:
//! - `PROXY_SESSION_ID`: proxy session id, wins over a persisted id
//! - `SKIP_PROXY=true`: send requests straight to the platform

use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable carrying the proxy session id
pub const SESSION_ID_ENV: &str = "PROXY_SESSION_ID";

/// Environment variable that bypasses the proxy when set to `true`
pub const SKIP_PROXY_ENV: &str = "SKIP_PROXY";

/// Default forwarding proxy origin
pub const DEFAULT_PROXY_ORIGIN: &str = "https://vps.jonathanburnhams.com/";

/// Forwarding proxy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Origin every request is rewritten onto
    pub origin: Url,
    /// Session id forwarded as the `session` query parameter
    pub session_id: Option<String>,
    /// Send requests directly instead of through the proxy
    pub bypass: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse(DEFAULT_PROXY_ORIGIN).expect("default proxy origin is a valid URL"),
            session_id: None,
            bypass: false,
        }
    }
}

impl ProxyConfig {
    /// Pick the session id: environment override first, then the persisted id
    pub fn resolve_session_id(env_value: Option<String>, persisted: Option<String>) -> Option<String> {
        env_value
            .filter(|s| !s.is_empty())
            .or_else(|| persisted.filter(|s| !s.is_empty()))
    }

    /// Apply environment overrides on top of this configuration
    pub fn with_env(mut self) -> Self {
        self.session_id =
            Self::resolve_session_id(std::env::var(SESSION_ID_ENV).ok(), self.session_id.take());
        if std::env::var(SKIP_PROXY_ENV).map(|v| v == "true").unwrap_or(false) {
            self.bypass = true;
        }
        self
    }
}

/// Video engine tuning applied during initialize
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Enable adaptive bitrate switching
    pub abr_enabled: bool,
    /// Seconds of media to buffer ahead
    pub buffering_goal: f64,
    /// Seconds required before resuming after a stall
    pub rebuffering_goal: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            abr_enabled: true,
            buffering_goal: 120.0,
            rebuffering_goal: 2.0,
        }
    }
}

/// UI overlay settings passed to the player surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub add_big_play_button: bool,
    pub overflow_menu_buttons: Vec<String>,
    pub custom_context_menu: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        let buttons = [
            "captions",
            "quality",
            "language",
            "chapter",
            "picture_in_picture",
            "playback_rate",
            "loop",
            "recenter_vr",
            "toggle_stereoscopic",
            "save_video_frame",
        ];
        Self {
            add_big_play_button: false,
            overflow_menu_buttons: buttons.iter().map(|b| b.to_string()).collect(),
            custom_context_menu: true,
        }
    }
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Client construction attempts before giving up
    pub max_retries: u32,
    /// Route platform traffic through the forwarding proxy
    pub use_proxy: bool,
    /// Proxy settings
    pub proxy: ProxyConfig,
    /// Video engine settings
    pub engine: EngineConfig,
    /// UI overlay settings
    pub overlay: OverlayConfig,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            use_proxy: true,
            proxy: ProxyConfig::default(),
            engine: EngineConfig::default(),
            overlay: OverlayConfig::default(),
            request_timeout_ms: 30_000,
        }
    }
}

impl PlayerConfig {
    /// Default configuration with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.proxy = config.proxy.with_env();
        config
    }

    /// Set a persisted proxy session id (environment still wins)
    pub fn with_persisted_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.proxy.session_id = ProxyConfig::resolve_session_id(
            std::env::var(SESSION_ID_ENV).ok(),
            Some(session_id.into()),
        );
        self
    }
}

/// Options accepted by `TubePlayer::initialize`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeOptions {
    /// Overrides `PlayerConfig::use_proxy`
    pub use_proxy: Option<bool>,
    /// Overrides `PlayerConfig::max_retries`
    pub max_retries: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.max_retries, 3);
        assert!(config.use_proxy);
        assert!(!config.proxy.bypass);
        assert_eq!(config.proxy.origin.as_str(), DEFAULT_PROXY_ORIGIN);
        assert_eq!(config.engine.buffering_goal, 120.0);
        assert_eq!(config.engine.rebuffering_goal, 2.0);
    }

    #[test]
    fn test_env_session_id_wins() {
        let id = ProxyConfig::resolve_session_id(Some("env".into()), Some("stored".into()));
        assert_eq!(id.as_deref(), Some("env"));
    }

    #[test]
    fn test_persisted_session_id_fallback() {
        let id = ProxyConfig::resolve_session_id(None, Some("stored".into()));
        assert_eq!(id.as_deref(), Some("stored"));

        let id = ProxyConfig::resolve_session_id(Some(String::new()), Some("stored".into()));
        assert_eq!(id.as_deref(), Some("stored"));

        assert_eq!(ProxyConfig::resolve_session_id(None, None), None);
    }

    #[test]
    fn test_with_persisted_session_id() {
        let config = PlayerConfig::default().with_persisted_session_id("stored");
        let expected = std::env::var(SESSION_ID_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "stored".to_string());
        assert_eq!(config.proxy.session_id, Some(expected));
    }
}
