//! Tube Player - playback session orchestrator
//!
//! Coordinates:
//! - Platform client bootstrap (direct or through the forwarding proxy)
//! - Proof-of-origin token lifecycle
//! - Manifest resolution per delivery mode
//! - Streaming adapter wiring and the reload handshake
//! - State machine transitions

use crate::{
    adapter::{AdapterFactory, PlayerSurface, StreamingAdapter, VideoEngine},
    bridge::{BridgeContext, StreamingBridge},
    client::SessionInitializer,
    config::{InitializeOptions, PlayerConfig},
    platform::{ClientFactory, PlatformClient, PlayerRequest},
    resolver::{ManifestDescriptor, PlaybackResolver},
    token::{PoTokenEngine, TokenMinter},
    transport::{HttpTransport, ProxyTransport, ReqwestTransport},
    types::{BasicInfo, PlayerState},
    Error, Result,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// External collaborators the player drives
#[derive(Clone)]
pub struct PlayerComponents {
    pub client_factory: Arc<dyn ClientFactory>,
    pub token_engine: Arc<dyn PoTokenEngine>,
    pub adapter_factory: Arc<dyn AdapterFactory>,
    pub engine: Arc<dyn VideoEngine>,
    pub surface: Arc<dyn PlayerSurface>,
    /// Base transport; `None` builds a `ReqwestTransport` from the config
    pub transport: Option<Arc<dyn HttpTransport>>,
}

impl PlayerComponents {
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

/// State of the current load
struct PlaybackSession {
    content_id: String,
    adapter: Arc<dyn StreamingAdapter>,
    bridge: Arc<StreamingBridge>,
    manifest: ManifestDescriptor,
}

/// Playback orchestrator for one video surface
pub struct TubePlayer {
    /// Unique player ID
    id: Uuid,
    config: PlayerConfig,
    components: PlayerComponents,
    resolver: PlaybackResolver,
    minter: Arc<TokenMinter>,
    /// Installed platform client, set once setup has fully succeeded
    client: RwLock<Option<Arc<dyn PlatformClient>>>,
    session: RwLock<Option<PlaybackSession>>,
    /// Serializes initializes
    init_lock: Mutex<()>,
    /// Serializes loads
    load_lock: Mutex<()>,
    destroyed: AtomicBool,
    state: RwLock<PlayerState>,
    state_tx: watch::Sender<PlayerState>,
}

impl TubePlayer {
    pub fn new(config: PlayerConfig, components: PlayerComponents) -> Self {
        let (state_tx, _) = watch::channel(PlayerState::Uninitialized);
        let minter = Arc::new(TokenMinter::new(components.token_engine.clone()));

        Self {
            id: Uuid::new_v4(),
            config,
            components,
            resolver: PlaybackResolver::new(),
            minter,
            client: RwLock::new(None),
            session: RwLock::new(None),
            init_lock: Mutex::new(()),
            load_lock: Mutex::new(()),
            destroyed: AtomicBool::new(false),
            state: RwLock::new(PlayerState::Uninitialized),
            state_tx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Get current state
    pub async fn state(&self) -> PlayerState {
        *self.state.read().await
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<PlayerState> {
        self.state_tx.subscribe()
    }

    pub fn token_minter(&self) -> &Arc<TokenMinter> {
        &self.minter
    }

    pub async fn is_initialized(&self) -> bool {
        self.client.read().await.is_some()
    }

    /// Content id of the current load
    pub async fn current_content_id(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.content_id.clone())
    }

    /// Manifest handed to the video engine for the current load
    pub async fn current_manifest(&self) -> Option<ManifestDescriptor> {
        self.session.read().await.as_ref().map(|s| s.manifest.clone())
    }

    /// Transition to new state
    async fn set_state(&self, new_state: PlayerState) -> Result<()> {
        let mut state = self.state.write().await;
        let current = *state;

        if !current.can_transition_to(new_state) {
            return Err(Error::InvalidStateTransition {
                from: current.to_string(),
                to: new_state.to_string(),
            });
        }

        *state = new_state;
        let _ = self.state_tx.send(new_state);

        info!(from = %current, to = %new_state, "State transition");

        Ok(())
    }

    fn transport(&self, use_proxy: bool) -> Result<Arc<dyn HttpTransport>> {
        let base: Arc<dyn HttpTransport> = match &self.components.transport {
            Some(transport) => transport.clone(),
            None => Arc::new(ReqwestTransport::new(Duration::from_millis(
                self.config.request_timeout_ms,
            ))?),
        };

        if use_proxy {
            Ok(Arc::new(ProxyTransport::new(base, self.config.proxy.clone())))
        } else {
            Ok(base)
        }
    }

    /// Build the platform client and prepare the engine and surface
    #[instrument(skip(self), fields(player_id = %self.id))]
    pub async fn initialize(&self, options: InitializeOptions) -> Result<()> {
        let _init = self.init_lock.lock().await;

        if self.destroyed.load(Ordering::Acquire) {
            return Err(Error::InvalidStateTransition {
                from: PlayerState::Destroyed.to_string(),
                to: PlayerState::Ready.to_string(),
            });
        }
        if self.is_initialized().await {
            debug!("Platform client already installed");
            return Ok(());
        }

        let use_proxy = options.use_proxy.unwrap_or(self.config.use_proxy);
        let max_retries = options.max_retries.unwrap_or(self.config.max_retries);
        info!(use_proxy, max_retries, "Initializing player");

        let transport = self.transport(use_proxy)?;
        let initializer = SessionInitializer::new(self.components.client_factory.clone(), transport);
        let client = initializer.initialize(max_retries).await?;

        if let Err(e) = self.minter.engine().init().await {
            warn!(error = %e, "Token engine init failed, continuing without it");
        }

        self.components.engine.configure(&self.config.engine);
        self.components.engine.attach().await?;
        self.components.surface.configure_overlay(&self.config.overlay);

        let mut slot = self.client.write().await;
        if self.destroyed.load(Ordering::Acquire) {
            return Err(Error::InvalidStateTransition {
                from: PlayerState::Destroyed.to_string(),
                to: PlayerState::Ready.to_string(),
            });
        }
        *slot = Some(client);
        drop(slot);

        self.set_state(PlayerState::Ready).await
    }

    async fn client(&self) -> Result<Arc<dyn PlatformClient>> {
        self.client.read().await.clone().ok_or(Error::NotInitialized)
    }

    /// Resolve `content_id` and start playback.
    ///
    /// On failure the adapter is released and the state moves to `Failed`.
    #[instrument(skip(self), fields(player_id = %self.id))]
    pub async fn load_video(&self, content_id: &str) -> Result<BasicInfo> {
        let _load = self.load_lock.lock().await;

        let client = self.client().await?;
        validate_content_id(content_id)?;

        self.set_state(PlayerState::Loading).await?;

        match self.run_load(client, content_id).await {
            Ok(info) => {
                self.set_state(PlayerState::Playing).await?;
                info!(video_id = %content_id, title = ?info.title, "Video loaded");
                Ok(info)
            }
            Err(e) => {
                error!(video_id = %content_id, error = %e, code = e.error_code(), "Error loading video");
                self.release_session().await;
                if let Err(state_err) = self.set_state(PlayerState::Failed).await {
                    warn!(error = %state_err, "Could not mark load as failed");
                }
                Err(e)
            }
        }
    }

    async fn run_load(&self, client: Arc<dyn PlatformClient>, content_id: &str) -> Result<BasicInfo> {
        self.minter.reset(content_id).await;
        self.components.engine.unload().await?;
        self.release_session().await;

        let cpn = Uuid::new_v4().simple().to_string();
        let request = PlayerRequest::new(content_id, client.signature_timestamp());
        let response = client.player(&request).await?;
        let metadata = client.parse_video_info(response, &cpn)?;

        let resolved = self
            .resolver
            .resolve_playback(metadata.as_ref(), client.as_ref())
            .await?;

        let adapter = self.components.adapter_factory.create(client.client_info());
        let context = BridgeContext {
            video_id: content_id.to_string(),
            cpn,
            client,
            minter: self.minter.clone(),
            engine: self.components.engine.clone(),
        };
        let bridge = match StreamingBridge::attach(context, &adapter, metadata.as_ref(), resolved.classification) {
            Ok(bridge) => bridge,
            Err(e) => {
                adapter.dispose();
                return Err(e);
            }
        };

        {
            let mut slot = self.session.write().await;
            if self.destroyed.load(Ordering::Acquire) {
                bridge.detach();
                adapter.dispose();
                debug!(video_id = %content_id, "Player destroyed mid-load, adapter disposed");
                return Err(Error::InvalidStateTransition {
                    from: PlayerState::Destroyed.to_string(),
                    to: PlayerState::Playing.to_string(),
                });
            }
            *slot = Some(PlaybackSession {
                content_id: content_id.to_string(),
                adapter,
                bridge: bridge.clone(),
                manifest: resolved.manifest.clone(),
            });
        }

        if let Some(streaming) = resolved.streaming {
            bridge.apply(streaming)?;
        }

        let uri = resolved.manifest.uri();
        debug!(manifest = %resolved.manifest, "Loading manifest into video engine");
        self.components.engine.load(&uri).await?;

        Ok(metadata.info().basic_info.clone())
    }

    async fn release_session(&self) {
        if let Some(session) = self.session.write().await.take() {
            session.bridge.detach();
            session.adapter.dispose();
            debug!(content_id = %session.content_id, "Streaming adapter disposed");
        }
    }

    /// Tear down the engine, adapter, token engine and surface
    #[instrument(skip(self), fields(player_id = %self.id))]
    pub async fn destroy(&self) -> Result<()> {
        self.destroyed.store(true, Ordering::Release);
        self.components.engine.destroy();
        self.release_session().await;
        self.minter.engine().dispose();
        self.minter.clear().await;
        self.components.surface.destroy_overlay();
        self.components.surface.remove();
        self.client.write().await.take();

        self.set_state(PlayerState::Destroyed).await
    }
}

fn validate_content_id(content_id: &str) -> Result<()> {
    if content_id.is_empty() {
        return Err(Error::InvalidContentId(content_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_validation() {
        assert!(validate_content_id("dQw4w9WgXcQ").is_ok());
        assert!(validate_content_id("a-b_c").is_ok());
        assert!(validate_content_id("abc%3D%3D").is_ok());
        assert!(matches!(validate_content_id(""), Err(Error::InvalidContentId(_))));
    }
}
