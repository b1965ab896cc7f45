//! Tower layers shared by every route.
//!
//! The stack is listed outermost first: a request passes through the layers
//! top to bottom and the response comes back bottom to top.

use axum::extract::DefaultBodyLimit;
use axum::http::header::HeaderName;
use axum::http::{Method, StatusCode};
use tower::layer::util::{Identity, Stack};
use tower::ServiceBuilder;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;

const REQUEST_ID_HEADER: &str = "x-request-id";

type HttpTrace = TraceLayer<SharedClassifier<ServerErrorsAsFailures>>;

/// Layers produced by [`build_http_layers`], innermost first in the nesting.
type HttpLayers = Stack<
    PropagateRequestIdLayer,
    Stack<
        TimeoutLayer,
        Stack<
            CorsLayer,
            Stack<
                CompressionLayer,
                Stack<HttpTrace, Stack<SetRequestIdLayer<MakeRequestUuid>, Identity>>,
            >,
        >,
    >,
>;

/// Transport layers, outermost first:
///
/// 1. assign an `x-request-id`
/// 2. trace the request
/// 3. gzip responses
/// 4. CORS for the configured origins
/// 5. answer 408 after `request_timeout`
/// 6. echo `x-request-id` on the response
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_for(&config.cors_origins))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(request_id))
        .into_inner()
}

/// Caps buffered request bodies at `max_body_bytes`; larger bodies get 413.
///
/// Replaces axum's built-in 2 MB default for the body extractors.
#[must_use]
pub fn body_limit(config: &NetworkConfig) -> DefaultBodyLimit {
    DefaultBodyLimit::max(config.max_body_bytes)
}

/// `"*"` anywhere in `origins` allows every origin; otherwise only the
/// origins that parse as header values are allowed.
fn cors_for(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| o.parse().ok()))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
}
