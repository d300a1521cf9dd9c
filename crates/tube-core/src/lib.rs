//! Tube Core - playback session orchestration for Tube Player
//!
//! This crate turns a raw content id into a playable adaptive-streaming
//! session:
//! - Platform client bootstrap with bounded retries and cache busting
//! - Forwarding-proxy URL shaping
//! - Proof-of-origin token minting under a single-flight lock
//! - Delivery-mode classification and manifest resolution
//! - SABR adapter wiring with a reload handshake
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          TubePlayer                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Session    │  │    Token     │  │   Playback   │           │
//! │  │ Initializer  │  │    Minter    │  │   Resolver   │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         │          ┌──────┴──────┐          │                   │
//! │         │          │  Streaming  │──────────┘                   │
//! │         │          │   Bridge    │                              │
//! │         │          └──────┬──────┘                              │
//! │  ┌──────┴───────┐  ┌──────┴──────┐  ┌──────────────┐            │
//! │  │    Proxy     │  │  Streaming  │  │    Video     │            │
//! │  │  Transport   │  │   Adapter   │  │    Engine    │            │
//! │  └──────────────┘  └─────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapter;
pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod platform;
pub mod resolver;
pub mod session;
pub mod token;
pub mod transport;
pub mod types;

pub use adapter::{AdapterFactory, PlaybackDataProvider, PlayerSurface, StreamingAdapter, VideoEngine};
pub use bridge::{BridgeContext, StreamingBridge};
pub use client::{CacheBuster, CacheBustingFetcher, SessionInitializer};
pub use config::{EngineConfig, InitializeOptions, OverlayConfig, PlayerConfig, ProxyConfig};
pub use error::{Error, Result};
pub use platform::{ClientFactory, ClientOptions, PlatformClient, PlayerRequest, ReloadContext, VideoMetadata};
pub use resolver::{DeliveryMode, ManifestDescriptor, PlaybackResolver, ResolvedPlayback, VideoClassification};
pub use session::{PlayerComponents, TubePlayer};
pub use token::{PoTokenEngine, TokenMinter, TokenPhase, TokenState};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ProxyTransport, ReqwestTransport};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library startup
pub fn init() {
    tracing::info!(version = VERSION, "Tube Core initialized");
}
