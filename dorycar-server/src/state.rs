//! Application state shared across all request handlers.

use crate::config::{LoadedConfig, SharedConfig};
use dorycar_core::auth::{Authenticator, TokenValidator};
use dorycar_core::config::RealtimeConfig;
use dorycar_core::lifecycle::RideEngine;
use dorycar_core::notify::{FanOut, Hub};
use dorycar_core::store::{RideStore, UserStore};
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RideEngine>,
    pub authenticator: Authenticator,
    pub hub: Arc<Hub>,
    /// Reloadable configuration sections (SIGHUP).
    pub config: SharedConfig,
    /// Hub capacities the server was started with.
    pub realtime: RealtimeConfig,
}

impl AppState {
    /// Wire the engine, hub and authenticator on top of the given stores.
    pub fn new(
        rides: Arc<dyn RideStore>,
        users: Arc<dyn UserStore>,
        config: LoadedConfig,
    ) -> Self {
        let realtime = config.realtime;
        let hub = Arc::new(Hub::new(realtime));
        let shared = config.into_shared();
        let engine = Arc::new(RideEngine::new(
            rides,
            Arc::clone(&users),
            FanOut::new(hub.clone()),
            shared.engine.clone(),
        ));
        let authenticator = Authenticator::new(
            TokenValidator::new(shared.auth.clone()),
            users,
            Arc::clone(&hub),
            shared.engine.clone(),
        );
        Self {
            engine,
            authenticator,
            hub,
            config: shared,
            realtime,
        }
    }

    /// Apply a freshly loaded configuration (used during SIGHUP reload).
    pub async fn update_config(&self, loaded: LoadedConfig) {
        self.config.auth.update(loaded.auth).await;
        self.config.engine.update(loaded.engine).await;
    }
}
