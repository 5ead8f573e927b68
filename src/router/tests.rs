//! Router Module Tests
//!
//! Exercises the single-key path, the concurrent fan-out aggregation and the
//! admin toggles against real shard backends: each mock shard is a small axum
//! app bound to an ephemeral port, so timeouts, refused connections and 404s
//! behave exactly as they do in production.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::Arc;

    use crate::config::ShardTopology;
    use crate::error::RouterError;
    use crate::resolver::{ShardId, Strategy};
    use crate::router::core::{RouterTimeouts, ShardOutcome, ShardRouter};
    use crate::router::handlers::api_router;

    // ============================================================
    // MOCK BACKENDS
    // ============================================================

    async fn spawn_app(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// A healthy shard backend: serves records, a fixed count and health.
    async fn live_shard(label: &'static str, count: u64) -> String {
        let app = Router::new()
            .route(
                "/get/:key",
                get(move |Path(key): Path<u64>| async move {
                    Json(json!({ "book_id": key, "served_by": label }))
                }),
            )
            .route(
                "/count",
                get(move || async move { Json(json!({ "count": count })) }),
            )
            .route("/health", get(|| async { StatusCode::OK }));
        spawn_app(app).await
    }

    /// A shard that accepts connections but never answers within the test
    /// timeouts.
    async fn slow_shard() -> String {
        let stall = || async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "count": 0 }))
        };
        let app = Router::new()
            .route("/get/:key", get(move |_: Path<u64>| stall()))
            .route("/count", get(stall))
            .route("/health", get(stall));
        spawn_app(app).await
    }

    /// A shard that holds no records: every /get is a 404.
    async fn empty_shard() -> String {
        let app = Router::new()
            .route(
                "/get/:key",
                get(|_: Path<u64>| async { StatusCode::NOT_FOUND }),
            )
            .route("/count", get(|| async { Json(json!({ "count": 0 })) }))
            .route("/health", get(|| async { StatusCode::OK }));
        spawn_app(app).await
    }

    /// An endpoint nothing listens on; connections are refused immediately.
    async fn refused_endpoint() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn topology_of(endpoints: Vec<(ShardId, String)>) -> ShardTopology {
        ShardTopology::new(endpoints.into_iter().collect::<BTreeMap<_, _>>())
    }

    fn short_timeouts() -> RouterTimeouts {
        RouterTimeouts {
            data: Duration::from_millis(300),
            count: Duration::from_millis(300),
            health: Duration::from_millis(200),
        }
    }

    fn test_router(topology: ShardTopology, reference: String) -> ShardRouter {
        ShardRouter::new(topology, reference, Strategy::Hash).with_timeouts(short_timeouts())
    }

    // ============================================================
    // SINGLE-KEY PATH
    // ============================================================

    #[tokio::test]
    async fn fetch_one_routes_to_owning_shard() {
        // sha1(42) % 3 == 1, so shard 1 must serve the request.
        let topology = topology_of(vec![
            (0, live_shard("shard-0", 10).await),
            (1, live_shard("shard-1", 10).await),
            (2, live_shard("shard-2", 10).await),
        ]);
        let router = test_router(topology, refused_endpoint().await);

        let result = router.fetch_one(42).await.unwrap();

        assert_eq!(result.shard, 1);
        assert_eq!(result.data["served_by"], "shard-1");
        assert_eq!(result.data["book_id"], 42);
        assert!(result.time_ms >= 0.0);
    }

    #[tokio::test]
    async fn fetch_one_translates_backend_404_to_key_not_found() {
        let topology = topology_of(vec![(0, empty_shard().await)]);
        let router = test_router(topology, refused_endpoint().await);

        match router.fetch_one(42).await {
            Err(RouterError::KeyNotFound(42)) => {}
            other => panic!("expected KeyNotFound, got {:?}", other.map(|r| r.shard)),
        }
    }

    #[tokio::test]
    async fn fetch_one_reports_unreachable_shard() {
        let topology = topology_of(vec![(0, refused_endpoint().await)]);
        let router = test_router(topology, refused_endpoint().await);

        match router.fetch_one(7).await {
            Err(RouterError::ShardUnavailable { shard: 0, .. }) => {}
            other => panic!("expected ShardUnavailable, got {:?}", other.map(|r| r.shard)),
        }
    }

    #[tokio::test]
    async fn fetch_one_times_out_on_stalled_shard() {
        let topology = topology_of(vec![(0, slow_shard().await)]);
        let router = test_router(topology, refused_endpoint().await);

        match router.fetch_one(7).await {
            Err(RouterError::ShardUnavailable { shard: 0, .. }) => {}
            other => panic!("expected timeout, got {:?}", other.map(|r| r.shard)),
        }
    }

    #[tokio::test]
    async fn disabled_shard_fails_fast_without_network_attempt() {
        // The owning shard's endpoint refuses connections; getting
        // ShardDisabled instead of ShardUnavailable proves no call was made.
        let topology = topology_of(vec![
            (0, live_shard("shard-0", 1).await),
            (1, refused_endpoint().await),
            (2, live_shard("shard-2", 1).await),
        ]);
        let router = test_router(topology, refused_endpoint().await);

        router.disable(1).unwrap();
        match router.fetch_one(42).await {
            Err(RouterError::ShardDisabled(1)) => {}
            other => panic!("expected ShardDisabled, got {:?}", other.map(|r| r.shard)),
        }

        // Enabling restores normal behavior, which for this endpoint is a
        // real (failed) network attempt.
        router.enable(1).unwrap();
        match router.fetch_one(42).await {
            Err(RouterError::ShardUnavailable { shard: 1, .. }) => {}
            other => panic!("expected ShardUnavailable, got {:?}", other.map(|r| r.shard)),
        }
    }

    #[tokio::test]
    async fn strategy_switch_changes_routing_decisions() {
        let topology = topology_of(vec![
            (0, live_shard("shard-0", 1).await),
            (1, live_shard("shard-1", 1).await),
            (2, live_shard("shard-2", 1).await),
        ]);
        let router = test_router(topology, refused_endpoint().await);

        // Hash: sha1(42) % 3 == 1.
        assert_eq!(router.fetch_one(42).await.unwrap().shard, 1);

        // Range: bucket size 3333, key 42 lands in the first bucket.
        router.set_strategy(Strategy::Range).await;
        assert_eq!(router.fetch_one(42).await.unwrap().shard, 0);
    }

    #[tokio::test]
    async fn lookup_strategy_resolves_only_assigned_keys() {
        let topology = topology_of(vec![
            (0, live_shard("shard-0", 1).await),
            (1, live_shard("shard-1", 1).await),
            (2, live_shard("shard-2", 1).await),
        ]);
        let router = test_router(topology, refused_endpoint().await);
        router.set_strategy(Strategy::Lookup).await;

        match router.fetch_one(42).await {
            Err(RouterError::KeyNotFound(42)) => {}
            other => panic!("expected KeyNotFound, got {:?}", other.map(|r| r.shard)),
        }

        router.lookup_table().assign(42, 2);
        let result = router.fetch_one(42).await.unwrap();
        assert_eq!(result.shard, 2);
        assert_eq!(result.data["served_by"], "shard-2");
    }

    #[tokio::test]
    async fn sparse_topology_surfaces_shard_not_found() {
        // Two shards but ids {0, 2}: hash placement over a count of 2 can
        // produce id 1, which the topology does not know.
        let topology = topology_of(vec![
            (0, live_shard("shard-0", 1).await),
            (2, live_shard("shard-2", 1).await),
        ]);
        let router = test_router(topology, refused_endpoint().await);

        // sha1(1) % 2 == 1.
        match router.fetch_one(1).await {
            Err(RouterError::ShardNotFound(1)) => {}
            other => panic!("expected ShardNotFound, got {:?}", other.map(|r| r.shard)),
        }
    }

    // ============================================================
    // ADMIN TOGGLES
    // ============================================================

    #[tokio::test]
    async fn disable_and_enable_are_idempotent() {
        let topology = topology_of(vec![
            (0, live_shard("shard-0", 1).await),
            (1, live_shard("shard-1", 1).await),
        ]);
        let router = test_router(topology, refused_endpoint().await);

        assert_eq!(router.disable(0).unwrap(), vec![0]);
        assert_eq!(router.disable(0).unwrap(), vec![0], "second disable is a no-op");
        assert_eq!(router.disable(1).unwrap(), vec![0, 1]);

        assert_eq!(router.enable(0).unwrap(), vec![1]);
        assert_eq!(router.enable(0).unwrap(), vec![1], "second enable is a no-op");
    }

    #[tokio::test]
    async fn toggling_unknown_shard_is_not_found() {
        let topology = topology_of(vec![(0, live_shard("shard-0", 1).await)]);
        let router = test_router(topology, refused_endpoint().await);

        assert!(matches!(router.disable(9), Err(RouterError::ShardNotFound(9))));
        assert!(matches!(router.enable(9), Err(RouterError::ShardNotFound(9))));
        assert!(router.disabled_shards().is_empty());
    }

    // ============================================================
    // FAN-OUT AGGREGATION
    // ============================================================

    #[tokio::test]
    async fn aggregate_covers_every_shard_despite_mixed_outcomes() {
        let topology = topology_of(vec![
            (0, live_shard("shard-0", 7).await),
            (1, slow_shard().await),
            (2, live_shard("shard-2", 3).await),
            (3, refused_endpoint().await),
        ]);
        let router = test_router(topology, refused_endpoint().await);
        router.disable(2).unwrap();

        let outcomes = router.distribution().await;

        assert_eq!(outcomes.len(), 4, "one outcome per configured shard");
        assert_eq!(outcomes[&0], ShardOutcome::Active(7));
        assert!(matches!(outcomes[&1], ShardOutcome::Unreachable(_)));
        assert_eq!(outcomes[&2], ShardOutcome::Disabled);
        assert!(matches!(outcomes[&3], ShardOutcome::Unreachable(_)));
    }

    #[tokio::test]
    async fn slow_shard_does_not_delay_siblings() {
        let topology = topology_of(vec![
            (0, live_shard("shard-0", 7).await),
            (1, slow_shard().await),
        ]);
        let router = test_router(topology, refused_endpoint().await);

        let started = std::time::Instant::now();
        let outcomes = router.distribution().await;

        // Bounded by the slowest single probe (the 300ms timeout), not the
        // 2s the stalled backend would take to answer.
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(outcomes[&0], ShardOutcome::Active(7));
        assert!(matches!(outcomes[&1], ShardOutcome::Unreachable(_)));
    }

    #[tokio::test]
    async fn shards_status_classifies_each_shard() {
        let topology = topology_of(vec![
            (0, live_shard("shard-0", 1).await),
            (1, refused_endpoint().await),
            (2, live_shard("shard-2", 1).await),
        ]);
        let router = test_router(topology, refused_endpoint().await);
        router.disable(2).unwrap();

        let outcomes = router.shards_status().await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[&0], ShardOutcome::Active(()));
        assert!(matches!(outcomes[&1], ShardOutcome::Unreachable(_)));
        assert_eq!(outcomes[&2], ShardOutcome::Disabled);
    }

    // ============================================================
    // BASELINE COMPARISON
    // ============================================================

    #[tokio::test]
    async fn compare_times_reference_alongside_sharded_fetch() {
        let reference = live_shard("full-db", 100).await;
        let topology = topology_of(vec![
            (0, live_shard("shard-0", 1).await),
            (1, live_shard("shard-1", 1).await),
            (2, live_shard("shard-2", 1).await),
        ]);
        let router = test_router(topology, reference);

        let comparison = router.compare_with_baseline(42).await;

        assert!(comparison.full_error.is_none());
        assert!(comparison.full_time_ms >= 0.0);
        let sharded = comparison.sharded.unwrap();
        assert_eq!(sharded.shard, 1);
    }

    #[tokio::test]
    async fn reference_failure_does_not_suppress_sharded_result() {
        let topology = topology_of(vec![
            (0, live_shard("shard-0", 1).await),
            (1, live_shard("shard-1", 1).await),
            (2, live_shard("shard-2", 1).await),
        ]);
        let router = test_router(topology, refused_endpoint().await);

        let comparison = router.compare_with_baseline(42).await;

        assert!(comparison.full_error.is_some());
        assert_eq!(comparison.sharded.unwrap().shard, 1);
    }

    // ============================================================
    // HTTP SURFACE
    // ============================================================

    #[tokio::test]
    async fn http_surface_end_to_end() {
        let topology = topology_of(vec![
            (0, live_shard("shard-0", 5).await),
            (1, live_shard("shard-1", 6).await),
            (2, live_shard("shard-2", 7).await),
        ]);
        let reference = live_shard("full-db", 18).await;
        let router = Arc::new(test_router(topology, reference));
        let base = spawn_app(api_router(router)).await;
        let client = reqwest::Client::new();

        // Single-key fetch lands on the hash-owner of the key.
        let body: Value = client
            .get(format!("{}/get/42", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["shard"], 1);
        assert_eq!(body["data"]["served_by"], "shard-1");

        // Unknown strategy values are rejected and leave the old one active.
        let response = client
            .post(format!("{}/strategy", base))
            .json(&json!({ "strategy": "roundrobin" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = client
            .get(format!("{}/strategy", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["strategy"], "hash");

        // Accepted strategies are echoed and take effect.
        let body: Value = client
            .post(format!("{}/strategy", base))
            .json(&json!({ "strategy": "range" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["strategy"], "range");
        let body: Value = client
            .get(format!("{}/get/42", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["shard"], 0);

        // Toggling an unknown shard is a 404.
        let response = client
            .post(format!("{}/shard/9/disable", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Disable shard 0 and watch it surface across the admin views.
        let body: Value = client
            .post(format!("{}/shard/0/disable", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["disabled_shards"], json!([0]));

        let response = client.get(format!("{}/get/42", base)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: Value = client
            .get(format!("{}/shards/status", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["0"]["status"], "disabled");
        assert_eq!(body["1"]["status"], "active");
        assert!(body["0"]["url"].as_str().unwrap().starts_with("http://"));

        let body: Value = client
            .get(format!("{}/distribution", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["0"]["status"], "disabled");
        assert_eq!(body["1"]["count"], 6);
        assert_eq!(body["1"]["status"], "active");

        // Comparison reports both legs plus the reference latency.
        let body: Value = client
            .get(format!("{}/compare/7000", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(body["full_time_ms"].as_f64().unwrap() >= 0.0);
        assert_eq!(body["sharded"]["shard"], 2);
    }
}
