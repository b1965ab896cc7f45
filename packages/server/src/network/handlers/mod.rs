//! HTTP handler definitions for the `memkv` server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod health;
pub mod kv;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use kv::{
    delete_handler, get_handler, set_handler, update_bulk_handler, update_handler, ValueResponse,
};

use std::sync::Arc;
use std::time::Instant;

use memkv_core::Store;

use super::{NetworkConfig, ShutdownController};

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// The one backend this process serves. Owned here, not global.
    pub store: Arc<dyn Store>,
    /// Graceful shutdown controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Network configuration (bind address, timeouts, body limit).
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Bundles a store with fresh shutdown state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: NetworkConfig) -> Self {
        Self {
            store,
            shutdown: Arc::new(ShutdownController::new()),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}
