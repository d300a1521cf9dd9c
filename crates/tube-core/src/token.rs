//! Proof-of-origin token lifecycle
//!
//! ```text
//!   Empty ──mint──▶ ColdStart ──engine mint──▶ Minted
//!     ▲                                          │
//!     └──────────── reset(new binding) ──────────┘
//! ```
//!
//! Only one mint runs at a time. A call that finds the lock taken returns the
//! best token available right now instead of waiting.

use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Proof-of-origin minting engine
#[async_trait]
pub trait PoTokenEngine: Send + Sync {
    /// Bring the engine up
    async fn init(&self) -> Result<()>;

    /// Rebuild the engine after it lost its state
    async fn reinit(&self) -> Result<()>;

    fn is_initialized(&self) -> bool;

    /// Cheap placeholder-grade token for a content binding
    fn mint_cold_start_token(&self, binding: &str) -> String;

    /// High-quality token; `None` when no integrity minter is available
    async fn mint(&self, binding: &str) -> Result<Option<String>>;

    fn dispose(&self);
}

/// Token lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPhase {
    Empty,
    ColdStart,
    Minted,
}

/// Tokens for the current content binding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenState {
    pub binding: Option<String>,
    pub cold_start: Option<String>,
    pub minted: Option<String>,
}

impl TokenState {
    pub fn phase(&self) -> TokenPhase {
        if self.minted.is_some() {
            TokenPhase::Minted
        } else if self.cold_start.is_some() {
            TokenPhase::ColdStart
        } else {
            TokenPhase::Empty
        }
    }

    /// Minted token, then cold-start token, then empty string
    pub fn best(&self) -> String {
        self.minted
            .clone()
            .or_else(|| self.cold_start.clone())
            .unwrap_or_default()
    }
}

/// Releases the mint lock when dropped
struct MintGuard<'a>(&'a AtomicBool);

impl Drop for MintGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the token state of one playback session
pub struct TokenMinter {
    engine: Arc<dyn PoTokenEngine>,
    state: RwLock<TokenState>,
    lock: AtomicBool,
    completed: AtomicUsize,
}

impl TokenMinter {
    pub fn new(engine: Arc<dyn PoTokenEngine>) -> Self {
        Self {
            engine,
            state: RwLock::new(TokenState::default()),
            lock: AtomicBool::new(false),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn engine(&self) -> &Arc<dyn PoTokenEngine> {
        &self.engine
    }

    /// Start a new binding, dropping tokens minted for the previous one
    pub async fn reset(&self, binding: impl Into<String>) {
        let binding = binding.into();
        debug!(binding = %binding, "Token state reset");
        *self.state.write().await = TokenState {
            binding: Some(binding),
            ..Default::default()
        };
    }

    /// Drop the binding and every token
    pub async fn clear(&self) {
        *self.state.write().await = TokenState::default();
    }

    pub async fn state(&self) -> TokenState {
        self.state.read().await.clone()
    }

    pub async fn phase(&self) -> TokenPhase {
        self.state.read().await.phase()
    }

    pub async fn has_minted(&self) -> bool {
        self.state.read().await.minted.is_some()
    }

    /// Best token available for playback
    pub async fn token(&self) -> String {
        self.state.read().await.best()
    }

    pub fn is_locked(&self) -> bool {
        self.lock.load(Ordering::Acquire)
    }

    /// Number of mint sequences that ran to completion
    pub fn completed_mints(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    /// Mint for the current binding, if any
    pub async fn mint(&self) -> String {
        let binding = self.state.read().await.binding.clone();
        match binding {
            Some(binding) => self.mint_for_binding(&binding).await,
            None => String::new(),
        }
    }

    /// Run the mint sequence for `binding` and return the best token.
    ///
    /// Never fails: engine errors are logged and the best available token is
    /// returned. When another mint holds the lock this returns immediately.
    pub async fn mint_for_binding(&self, binding: &str) -> String {
        if binding.is_empty() {
            return self.token().await;
        }

        if self
            .lock
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(binding = %binding, "Token mint already in flight");
            return self.token().await;
        }
        let _guard = MintGuard(&self.lock);

        if let Err(e) = self.run_sequence(binding).await {
            error!(binding = %binding, error = %e, "Error minting proof-of-origin token");
        }
        self.completed.fetch_add(1, Ordering::AcqRel);

        self.token().await
    }

    async fn run_sequence(&self, binding: &str) -> Result<()> {
        let cold_start = self.engine.mint_cold_start_token(binding);
        if !self.store(binding, |state| state.cold_start = Some(cold_start)).await {
            return Ok(());
        }

        if !self.engine.is_initialized() {
            info!("Token engine not initialized, reinitializing");
            self.engine.reinit().await?;
        }

        let decoded = decode_binding(binding)?;
        match self.engine.mint(&decoded).await? {
            Some(token) => {
                if self.store(binding, |state| state.minted = Some(token)).await {
                    info!(binding = %binding, "Proof-of-origin token minted");
                }
            }
            None => warn!("No integrity token minter available, keeping cold-start token"),
        }

        Ok(())
    }

    /// Apply `update` only while `binding` is still current
    async fn store(&self, binding: &str, update: impl FnOnce(&mut TokenState)) -> bool {
        let mut state = self.state.write().await;
        if state.binding.as_deref() != Some(binding) {
            debug!(binding = %binding, "Binding changed during mint, discarding result");
            return false;
        }
        update(&mut state);
        true
    }
}

/// Percent-decode a content binding
fn decode_binding(binding: &str) -> Result<String> {
    urlencoding::decode(binding)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| Error::TokenMinting(format!("invalid binding: {}", e)))
}
