//! Streaming bridge - wires one load's playback data into the SABR adapter
//!
//! The bridge is the adapter's [`PlaybackDataProvider`]:
//! - `mint_token` runs the token minter (awaited for live streams, spawned
//!   otherwise) and returns the best token available
//! - `reload_playback_data` re-requests player info with the adapter's reload
//!   context and pushes the fresh streaming URL and ustreamer config
//!
//! Reloads may interleave with an in-flight mint. Every adapter update is a
//! whole-value replacement.

use crate::{
    adapter::{PlaybackDataProvider, StreamingAdapter, VideoEngine},
    platform::{PlatformClient, PlayerRequest, ReloadContext, VideoMetadata},
    resolver::{check_playability, streaming_config, VideoClassification},
    token::TokenMinter,
    types::StreamingConfig,
    Error, Result,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument, warn};

/// Per-load collaborators the bridge needs
#[derive(Clone)]
pub struct BridgeContext {
    /// Content id the load was requested with
    pub video_id: String,
    /// Client playback nonce shared by the initial parse and every reload
    pub cpn: String,
    pub client: Arc<dyn PlatformClient>,
    pub minter: Arc<TokenMinter>,
    pub engine: Arc<dyn VideoEngine>,
}

/// Playback data provider attached to one adapter instance
pub struct StreamingBridge {
    video_id: String,
    cpn: String,
    classification: VideoClassification,
    client: Arc<dyn PlatformClient>,
    minter: Arc<TokenMinter>,
    adapter: Weak<dyn StreamingAdapter>,
    detached: AtomicBool,
    reloads: AtomicUsize,
}

impl StreamingBridge {
    /// Register the bridge on `adapter` and attach the adapter to the engine.
    ///
    /// Wiring is synchronous; the provider methods run later, driven by the
    /// adapter.
    pub fn attach(
        context: BridgeContext,
        adapter: &Arc<dyn StreamingAdapter>,
        metadata: &dyn VideoMetadata,
        classification: VideoClassification,
    ) -> Result<Arc<Self>> {
        let bridge = Arc::new(Self {
            video_id: context.video_id,
            cpn: context.cpn,
            classification,
            client: context.client,
            minter: context.minter,
            adapter: Arc::downgrade(adapter),
            detached: AtomicBool::new(false),
            reloads: AtomicUsize::new(0),
        });

        adapter.set_provider(bridge.clone());
        adapter.attach(context.engine)?;

        debug!(
            video_id = %bridge.video_id,
            title = ?metadata.info().basic_info.title,
            is_live = classification.is_live,
            is_post_live_dvr = classification.is_post_live_dvr,
            "Streaming adapter attached"
        );

        Ok(bridge)
    }

    /// Push a streaming configuration onto the adapter
    pub fn apply(&self, config: StreamingConfig) -> Result<()> {
        let adapter = self.adapter()?;
        adapter.set_streaming_url(config.streaming_url);
        adapter.set_ustreamer_config(config.ustreamer_config);
        adapter.set_server_abr_formats(config.formats);
        Ok(())
    }

    /// Stop serving the adapter; later reloads fail with `AdapterDisposed`
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    /// Number of completed reload handshakes
    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::Acquire)
    }

    async fn is_current_binding(&self) -> bool {
        self.minter.state().await.binding.as_deref() == Some(self.video_id.as_str())
    }

    fn adapter(&self) -> Result<Arc<dyn StreamingAdapter>> {
        if self.detached.load(Ordering::Acquire) {
            return Err(Error::AdapterDisposed);
        }
        self.adapter.upgrade().ok_or(Error::AdapterDisposed)
    }
}

#[async_trait]
impl PlaybackDataProvider for StreamingBridge {
    async fn mint_token(&self) -> String {
        if self.detached.load(Ordering::Acquire) || !self.is_current_binding().await {
            debug!(video_id = %self.video_id, "Token requested by a stale adapter");
            return String::new();
        }

        if !self.minter.has_minted().await {
            if self.classification.is_live {
                self.minter.mint_for_binding(&self.video_id).await;
            } else {
                let minter = self.minter.clone();
                let binding = self.video_id.clone();
                tokio::spawn(async move {
                    minter.mint_for_binding(&binding).await;
                });
            }
        }

        let state = self.minter.state().await;
        if state.binding.as_deref() == Some(self.video_id.as_str()) {
            state.best()
        } else {
            String::new()
        }
    }

    #[instrument(skip(self, context), fields(video_id = %self.video_id))]
    async fn reload_playback_data(&self, context: ReloadContext) -> Result<()> {
        if self.detached.load(Ordering::Acquire) {
            return Err(Error::AdapterDisposed);
        }

        let request = PlayerRequest::new(self.video_id.clone(), self.client.signature_timestamp())
            .with_reload_context(context);
        let response = self.client.player(&request).await?;
        let metadata = self.client.parse_video_info(response, &self.cpn)?;
        let info = metadata.info();
        check_playability(info)?;

        let config = streaming_config(info, self.client.as_ref())
            .await?
            .ok_or_else(|| {
                warn!("Reloaded player response carries no server ABR streaming URL");
                Error::ManifestResolution("reloaded player response has no streaming URL".to_string())
            })?;

        let adapter = self.adapter()?;
        adapter.set_streaming_url(config.streaming_url);
        adapter.set_ustreamer_config(config.ustreamer_config);

        self.reloads.fetch_add(1, Ordering::AcqRel);
        info!("Playback data reloaded");
        Ok(())
    }
}
