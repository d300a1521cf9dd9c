//! Streaming adapter and video engine boundary
//!
//! The SABR streaming adapter asks for playback data through a
//! [`PlaybackDataProvider`] instead of registered closures. The orchestrator
//! hands it one provider per load.

use crate::{
    config::{EngineConfig, OverlayConfig},
    platform::ReloadContext,
    types::{ClientInfo, SabrFormat},
    Result,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Capability the adapter calls back into
#[async_trait]
pub trait PlaybackDataProvider: Send + Sync {
    /// Best proof-of-origin token available; never fails
    async fn mint_token(&self) -> String;

    /// Fetch fresh playback data and push it onto the adapter
    async fn reload_playback_data(&self, context: ReloadContext) -> Result<()>;
}

/// SABR streaming adapter
pub trait StreamingAdapter: Send + Sync {
    fn set_provider(&self, provider: Arc<dyn PlaybackDataProvider>);

    /// Hook into the video engine's networking
    fn attach(&self, engine: Arc<dyn VideoEngine>) -> Result<()>;

    fn set_streaming_url(&self, url: String);

    fn set_ustreamer_config(&self, config: Option<String>);

    fn set_server_abr_formats(&self, formats: Vec<SabrFormat>);

    /// Release network listeners; the adapter is unusable afterwards
    fn dispose(&self);
}

/// Builds one adapter per load
pub trait AdapterFactory: Send + Sync {
    fn create(&self, client_info: ClientInfo) -> Arc<dyn StreamingAdapter>;
}

/// Adaptive-bitrate video engine
#[async_trait]
pub trait VideoEngine: Send + Sync {
    fn configure(&self, config: &EngineConfig);

    /// Attach to the video surface
    async fn attach(&self) -> Result<()>;

    async fn load(&self, manifest_uri: &str) -> Result<()>;

    async fn unload(&self) -> Result<()>;

    fn destroy(&self);
}

/// Host video surface and its UI overlay
pub trait PlayerSurface: Send + Sync {
    fn configure_overlay(&self, config: &OverlayConfig);

    fn destroy_overlay(&self);

    /// Remove the video element from its container
    fn remove(&self);
}
