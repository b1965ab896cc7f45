//! Network module with deferred startup lifecycle.
//!
//! `new()` takes the store and allocates shared state, `start()` binds the
//! TCP listener, and `serve()` accepts connections until shutdown. Binding
//! before serving lets callers learn the OS-assigned port first.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::{delete, get, patch, post};
use axum::Router;
use memkv_core::Store;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    delete_handler, get_handler, health_handler, liveness_handler, readiness_handler,
    set_handler, update_bulk_handler, update_handler, AppState,
};
use super::middleware::{body_limit, build_http_layers};
use super::shutdown::ShutdownController;

/// How long `serve()` waits for in-flight requests after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Manages the HTTP server lifecycle around one store.
///
/// 1. `new()` -- takes the store, allocates the shutdown controller
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    store: Arc<dyn Store>,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
    start_time: Instant,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, store: Arc<dyn Store>) -> Self {
        Self {
            config,
            store,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
            start_time: Instant::now(),
        }
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /get?key=K` -- read one value
    /// - `POST /set` -- insert or overwrite one pair
    /// - `PATCH /update` -- overwrite one existing key
    /// - `PATCH /updateBulk` -- batch update existing keys
    /// - `DELETE /delete?key=K` -- remove one key
    /// - `GET /health`, `/health/live`, `/health/ready` -- probes
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/get", get(get_handler))
            .route("/set", post(set_handler))
            .route("/update", patch(update_handler))
            .route("/updateBulk", patch(update_bulk_handler))
            .route("/delete", delete(delete_handler))
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .layer(body_limit(&self.config))
            .layer(build_http_layers(&self.config))
            .with_state(self.app_state())
    }

    /// Handler state sharing this module's store, shutdown controller, and
    /// start time, so uptime counts from construction.
    fn app_state(&self) -> AppState {
        AppState {
            store: Arc::clone(&self.store),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::new(self.config.clone()),
            start_time: self.start_time,
        }
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which differs from the configured
    /// one when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!(
            host = %self.config.host,
            port,
            store = self.store.name(),
            "TCP listener bound"
        );

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves, then drains.
    ///
    /// After the signal the health state moves to `Draining` and the
    /// module waits up to 30 seconds for in-flight requests before
    /// reporting `Stopped`.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server
    /// hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();
        let shutdown_ctrl = self.shutdown;

        shutdown_ctrl.set_ready();
        info!("serving HTTP");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        shutdown_ctrl.trigger_shutdown();
        if shutdown_ctrl.wait_for_drain(DRAIN_TIMEOUT).await {
            info!("all requests drained");
        } else {
            warn!(
                in_flight = shutdown_ctrl.in_flight_count(),
                "drain timeout expired with requests remaining"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use memkv_core::{ShardedStore, WriteOptimizedStore};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::network::HealthState;

    fn module() -> NetworkModule {
        NetworkModule::new(
            NetworkConfig {
                host: "127.0.0.1".to_string(),
                ..NetworkConfig::default()
            },
            Arc::new(WriteOptimizedStore::new()),
        )
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn new_creates_module_without_binding() {
        let module = module();
        assert!(module.listener.is_none());
    }

    #[test]
    fn shutdown_controller_returns_shared_arc() {
        let module = module();
        assert!(Arc::ptr_eq(
            &module.shutdown_controller(),
            &module.shutdown_controller()
        ));
    }

    #[test]
    fn app_state_shares_module_resources() {
        let module = module();
        let first = module.app_state();
        std::thread::sleep(Duration::from_millis(5));
        let second = module.app_state();
        assert_eq!(first.start_time, module.start_time);
        assert_eq!(second.start_time, module.start_time);
        assert!(Arc::ptr_eq(&first.shutdown, &module.shutdown_controller()));
        assert!(Arc::ptr_eq(&first.store, &second.store));
    }

    #[tokio::test]
    async fn set_accepts_body_above_axum_default_limit() {
        let router = module().build_router();
        let big = "x".repeat(3 * 1024 * 1024);
        let (status, _) = send(
            &router,
            json_request("POST", "/set", &json!({"Key": "big", "Value": big})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn set_rejects_body_above_configured_limit() {
        let module = NetworkModule::new(
            NetworkConfig {
                max_body_bytes: 64,
                ..NetworkConfig::default()
            },
            Arc::new(WriteOptimizedStore::new()),
        );
        let router = module.build_router();
        let (status, _) = send(
            &router,
            json_request("POST", "/set", &json!({"Key": "k", "Value": "y".repeat(128)})),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn start_binds_to_os_assigned_port() {
        let mut module = module();
        let port = module.start().await.unwrap();
        assert!(port > 0);
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    async fn serve_without_start_is_an_error() {
        let err = module()
            .serve(std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("start()"));
    }

    #[tokio::test]
    async fn full_key_lifecycle_over_http() {
        let router = module().build_router();

        let (status, _) = send(
            &router,
            json_request("POST", "/set", &json!({"Key": "user:1", "Value": {"name": "ada"}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&router, empty_request("GET", "/get?key=user:1")).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({"value": {"name": "ada"}}));

        let (status, _) = send(
            &router,
            json_request("PATCH", "/update", &json!({"Key": "user:1", "Value": 7})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&router, empty_request("DELETE", "/delete?key=user:1")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&router, empty_request("GET", "/get?key=user:1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, b"key not found: user:1");
    }

    #[tokio::test]
    async fn bulk_update_over_http_reports_partial_content() {
        let router = module().build_router();
        send(
            &router,
            json_request("POST", "/set", &json!({"Key": "a", "Value": 1})),
        )
        .await;

        let (status, body) = send(
            &router,
            json_request(
                "PATCH",
                "/updateBulk",
                &json!([{"Key": "a", "Value": 2}, {"Key": "b", "Value": 3}]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({"value": [{"Key": "a", "Value": 2}]}));
    }

    #[tokio::test]
    async fn malformed_set_body_is_bad_request() {
        let router = module().build_router();
        let request = Request::builder()
            .method("POST")
            .uri("/set")
            .body(Body::from("not json"))
            .unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"Bad request");
    }

    #[tokio::test]
    async fn wrong_method_is_rejected() {
        let router = module().build_router();
        let (status, _) = send(&router, empty_request("GET", "/set")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn health_reports_backend_name() {
        let module = NetworkModule::new(NetworkConfig::default(), Arc::new(ShardedStore::new()));
        let router = module.build_router();
        let (status, body) = send(&router, empty_request("GET", "/health")).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["store"], "sharded");
    }

    #[tokio::test]
    async fn serve_drains_and_stops_after_signal() {
        let mut module = module();
        let port = module.start().await.unwrap();
        assert!(port > 0);
        let controller = module.shutdown_controller();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(module.serve(async move {
            let _ = rx.await;
        }));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(controller.health_state(), HealthState::Ready);

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }
}
