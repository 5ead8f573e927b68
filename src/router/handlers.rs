use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::core::{FetchResult, ShardOutcome, ShardRouter};
use super::protocol::{
    CompareResponse, DistributionEntry, ErrorBody, FetchResponse, SetStrategyRequest,
    ShardStatus, ShardStatusEntry, StrategyResponse, ToggleResponse,
};
use crate::error::RouterError;
use crate::resolver::{Key, ShardId, Strategy};

/// Builds the client-facing HTTP surface around a router instance.
///
/// Shared by the binary and by tests, so both always speak the same routes.
pub fn api_router(router: Arc<ShardRouter>) -> Router {
    Router::new()
        .route("/get/:key", get(handle_get_record))
        .route("/distribution", get(handle_distribution))
        .route("/shards/status", get(handle_shards_status))
        .route("/strategy", post(handle_set_strategy).get(handle_get_strategy))
        .route("/shard/:id/disable", post(handle_disable_shard))
        .route("/shard/:id/enable", post(handle_enable_shard))
        .route("/compare/:key", get(handle_compare))
        .layer(Extension(router))
}

fn error_response(error: RouterError) -> (StatusCode, Json<ErrorBody>) {
    (
        error.status_code(),
        Json(ErrorBody {
            detail: error.to_string(),
        }),
    )
}

fn fetch_response(result: FetchResult) -> FetchResponse {
    FetchResponse {
        data: result.data,
        shard: result.shard,
        time_ms: result.time_ms,
    }
}

pub async fn handle_get_record(
    Extension(router): Extension<Arc<ShardRouter>>,
    Path(key): Path<Key>,
) -> Result<Json<FetchResponse>, (StatusCode, Json<ErrorBody>)> {
    match router.fetch_one(key).await {
        Ok(result) => Ok(Json(fetch_response(result))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn handle_distribution(
    Extension(router): Extension<Arc<ShardRouter>>,
) -> Json<HashMap<ShardId, DistributionEntry>> {
    let entries = router
        .distribution()
        .await
        .into_iter()
        .map(|(shard, outcome)| {
            let entry = match outcome {
                ShardOutcome::Active(count) => DistributionEntry {
                    count: Some(count),
                    error: None,
                    status: ShardStatus::Active,
                },
                ShardOutcome::Disabled => DistributionEntry {
                    count: None,
                    error: Some("disabled".to_string()),
                    status: ShardStatus::Disabled,
                },
                ShardOutcome::Unreachable(cause) => DistributionEntry {
                    count: None,
                    error: Some(cause),
                    status: ShardStatus::Error,
                },
            };
            (shard, entry)
        })
        .collect();

    Json(entries)
}

pub async fn handle_shards_status(
    Extension(router): Extension<Arc<ShardRouter>>,
) -> Json<HashMap<ShardId, ShardStatusEntry>> {
    let outcomes = router.shards_status().await;

    let entries = outcomes
        .into_iter()
        .map(|(shard, outcome)| {
            let status = match outcome {
                ShardOutcome::Active(()) => ShardStatus::Active,
                ShardOutcome::Disabled => ShardStatus::Disabled,
                ShardOutcome::Unreachable(_) => ShardStatus::Error,
            };
            let url = router
                .topology()
                .endpoint(shard)
                .unwrap_or_default()
                .to_string();
            (shard, ShardStatusEntry { status, url })
        })
        .collect();

    Json(entries)
}

pub async fn handle_set_strategy(
    Extension(router): Extension<Arc<ShardRouter>>,
    Json(req): Json<SetStrategyRequest>,
) -> Result<Json<StrategyResponse>, (StatusCode, Json<ErrorBody>)> {
    let strategy = Strategy::from_str(&req.strategy).map_err(error_response)?;
    router.set_strategy(strategy).await;

    Ok(Json(StrategyResponse {
        strategy: strategy.to_string(),
    }))
}

pub async fn handle_get_strategy(
    Extension(router): Extension<Arc<ShardRouter>>,
) -> Json<StrategyResponse> {
    Json(StrategyResponse {
        strategy: router.current_strategy().await.to_string(),
    })
}

pub async fn handle_disable_shard(
    Extension(router): Extension<Arc<ShardRouter>>,
    Path(shard): Path<ShardId>,
) -> Result<Json<ToggleResponse>, (StatusCode, Json<ErrorBody>)> {
    match router.disable(shard) {
        Ok(disabled_shards) => Ok(Json(ToggleResponse {
            message: format!("Shard {} disabled", shard),
            disabled_shards,
        })),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn handle_enable_shard(
    Extension(router): Extension<Arc<ShardRouter>>,
    Path(shard): Path<ShardId>,
) -> Result<Json<ToggleResponse>, (StatusCode, Json<ErrorBody>)> {
    match router.enable(shard) {
        Ok(disabled_shards) => Ok(Json(ToggleResponse {
            message: format!("Shard {} enabled", shard),
            disabled_shards,
        })),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn handle_compare(
    Extension(router): Extension<Arc<ShardRouter>>,
    Path(key): Path<Key>,
) -> Json<CompareResponse> {
    let comparison = router.compare_with_baseline(key).await;

    // The sharded leg serializes either as the normal fetch payload or as the
    // error detail, so one comparison shows both outcomes side by side.
    let sharded = match comparison.sharded {
        Ok(result) => serde_json::json!({
            "data": result.data,
            "shard": result.shard,
            "time_ms": result.time_ms,
        }),
        Err(e) => serde_json::json!({ "detail": e.to_string() }),
    };

    Json(CompareResponse {
        sharded,
        full_time_ms: comparison.full_time_ms,
        full_error: comparison.full_error,
    })
}
