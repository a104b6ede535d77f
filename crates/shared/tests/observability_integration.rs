//! 可观测性模块集成测试
//!
//! 测试 metrics 和 middleware 模块的核心功能。

// ============================================================================
// 指标记录测试
// ============================================================================

mod metrics_tests {
    use rules_shared::observability::metrics::{
        record_http_request, record_rule_evaluation, record_rule_mutation,
    };

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/api/rules", 200, 0.05);
        record_http_request("POST", "/api/rules", 200, 0.12);
        record_http_request("POST", "/api/rules/combine", 200, 0.08);
        record_http_request("DELETE", "/api/rules/rules/1", 204, 0.03);
        record_http_request("DELETE", "/api/rules/rules/999", 404, 0.01);
        record_http_request("POST", "/api/rules/evaluate", 500, 0.25);
    }

    #[test]
    fn test_record_rule_evaluation() {
        record_rule_evaluation(true, 1, 0.01);
        record_rule_evaluation(false, 0, 0.001);
        record_rule_evaluation(false, 1000, 0.5);
    }

    #[test]
    fn test_record_rule_mutation() {
        record_rule_mutation("create", "success");
        record_rule_mutation("create", "rejected");
        record_rule_mutation("combine", "success");
        record_rule_mutation("delete", "not_found");
        record_rule_mutation("delete", "error");
    }

    #[test]
    fn test_metrics_with_edge_cases() {
        record_http_request("", "", 0, 0.0);

        let long_path = "/api/".to_string() + &"x".repeat(1000);
        record_http_request("GET", &long_path, 200, 0.01);

        record_http_request("GET", "/api/rules?id=123&name=test", 200, 0.01);
        record_http_request("GET", "/api/slow", 200, 999.99);
    }
}

// ============================================================================
// 中间件测试
// ============================================================================

mod middleware_tests {
    use axum::{
        Extension, Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
    };
    use rules_shared::observability::middleware::{
        REQUEST_ID_HEADER, RequestId, http_tracing, request_id,
    };
    use tower::ServiceExt;

    async fn echo_request_id(Extension(id): Extension<RequestId>) -> String {
        id.0
    }

    fn create_test_app() -> Router {
        Router::new()
            .route("/echo", get(echo_request_id))
            .layer(middleware::from_fn(http_tracing))
            .layer(middleware::from_fn(request_id))
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = create_test_app()
            .oneshot(
                Request::builder()
                    .uri("/echo")
                    .header(REQUEST_ID_HEADER, "req-abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            "req-abc"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"req-abc");
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(uuid_like(&header));
    }

    #[tokio::test]
    async fn test_tracing_passes_through_not_found() {
        let response = create_test_app()
            .oneshot(
                Request::builder()
                    .uri("/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    fn uuid_like(value: &str) -> bool {
        value.len() == 36 && value.chars().filter(|c| *c == '-').count() == 4
    }
}

// ============================================================================
// 路由模板标签测试
// ============================================================================

mod route_label_tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::delete,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use rules_shared::observability::middleware::{UNMATCHED_PATH, http_tracing};
    use tower::ServiceExt;

    async fn remove() -> StatusCode {
        StatusCode::NO_CONTENT
    }

    fn app() -> Router {
        Router::new()
            .route("/api/rules/rules/{id}", delete(remove))
            .layer(middleware::from_fn(http_tracing))
    }

    async fn send(method: &str, uri: &str) -> StatusCode {
        app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    /// 在线程局部 recorder 下跑完请求，返回 Prometheus 文本
    fn render_with_requests(requests: &[(&'static str, &'static str)]) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                for (method, uri) in requests {
                    send(method, uri).await;
                }
            });
        });

        handle.render()
    }

    #[test]
    fn test_path_label_uses_route_template() {
        let output = render_with_requests(&[
            ("DELETE", "/api/rules/rules/1"),
            ("DELETE", "/api/rules/rules/2"),
        ]);

        let counter_line = output
            .lines()
            .find(|line| {
                line.starts_with("http_requests_total")
                    && line.contains(r#"path="/api/rules/rules/{id}""#)
            })
            .expect("缺少按路由模板记录的计数器");
        assert!(counter_line.ends_with(" 2"), "两次请求应落在同一标签下: {counter_line}");

        assert!(!output.contains(r#"path="/api/rules/rules/1""#));
        assert!(!output.contains(r#"path="/api/rules/rules/2""#));
    }

    #[test]
    fn test_unrouted_requests_share_one_label() {
        let output = render_with_requests(&[("GET", "/scan/a"), ("GET", "/scan/b")]);

        assert!(output.contains(&format!(r#"path="{}""#, UNMATCHED_PATH)));
        assert!(!output.contains(r#"path="/scan/a""#));
    }
}
