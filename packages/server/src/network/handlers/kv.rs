//! Key-value handlers: translate HTTP requests into single [`Store`] calls.
//!
//! Store calls are synchronous and may block on the backend lock, so every
//! call runs on the blocking pool via [`spawn_blocking`](tokio::task::spawn_blocking).
//! Bodies are decoded from raw bytes so a missing `Content-Type` is not an
//! error; any decode failure is reported as 400.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use memkv_core::{BatchContext, Pair, Store, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AppState;
use crate::network::error::ApiError;

/// `?key=K` query string. A missing key is the empty key.
#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    #[serde(default)]
    pub key: String,
}

/// JSON body `{"value": V}` returned by reads and bulk updates.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ValueResponse<T> {
    pub value: T,
}

/// Runs a store call on the blocking pool.
async fn run_blocking<T, F>(store: &Arc<dyn Store>, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn Store) -> memkv_core::Result<T> + Send + 'static,
{
    let store = Arc::clone(store);
    let result = tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| anyhow::anyhow!("store task failed: {e}"))?;
    Ok(result?)
}

/// Routes that never answer 404 report every backend failure as 500.
fn store_failure_is_internal(err: ApiError) -> ApiError {
    match err {
        ApiError::Store(inner) => ApiError::Internal(inner.into()),
        other => other,
    }
}

/// `GET /get?key=K` -- 200 with the value, 404 if absent.
pub async fn get_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<ValueResponse<Value>>, ApiError> {
    let _in_flight = state.shutdown.in_flight_guard();
    let key = query.key;
    let value = run_blocking(&state.store, move |store| store.get(&key)).await?;
    Ok(Json(ValueResponse { value }))
}

/// `POST /set` with `{"Key","Value"}` -- 201 once stored.
pub async fn set_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let _in_flight = state.shutdown.in_flight_guard();
    let pair: Pair = serde_json::from_slice(&body)?;
    run_blocking(&state.store, move |store| store.put(&pair.key, pair.value))
        .await
        .map_err(store_failure_is_internal)?;
    Ok(StatusCode::CREATED)
}

/// `PATCH /update` with `{"Key","Value"}` -- 200, or 404 if the key is absent.
pub async fn update_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let _in_flight = state.shutdown.in_flight_guard();
    let pair: Pair = serde_json::from_slice(&body)?;
    run_blocking(&state.store, move |store| store.update(&pair.key, pair.value)).await?;
    Ok(StatusCode::OK)
}

/// `PATCH /updateBulk` with a JSON array of pairs.
///
/// The batch gets a deadline of `batch_timeout`, and its token is cancelled
/// if the client goes away (this future is dropped) before it finishes.
/// Responds 200 when every pair was applied and 206 when some keys were
/// absent; both carry the applied pairs. Any batch failure, cancellation
/// included, is 500.
pub async fn update_bulk_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let _in_flight = state.shutdown.in_flight_guard();
    let pairs: Vec<Pair> = serde_json::from_slice(&body)?;
    let requested = pairs.len();

    let ctx = BatchContext::with_timeout(state.config.batch_timeout);
    let _cancel_on_disconnect = ctx.token().clone().drop_guard();

    let applied = run_blocking(&state.store, move |store| store.batch_update(&ctx, pairs))
        .await
        .map_err(store_failure_is_internal)?;

    let status = if applied.len() == requested {
        StatusCode::OK
    } else {
        debug!(requested, applied = applied.len(), "partial bulk update");
        StatusCode::PARTIAL_CONTENT
    };
    Ok((status, Json(ValueResponse { value: applied })).into_response())
}

/// `DELETE /delete?key=K` -- 200; backend errors are 500.
pub async fn delete_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<StatusCode, ApiError> {
    let _in_flight = state.shutdown.in_flight_guard();
    let key = query.key;
    run_blocking(&state.store, move |store| store.delete(&key))
        .await
        .map_err(store_failure_is_internal)?;
    Ok(StatusCode::OK)
}
