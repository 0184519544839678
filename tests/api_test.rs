//! Endpoint behaviour driven through the full middleware stack.

use axum::http::StatusCode;
use serde_json::json;

use cloud_demo_api::backends::NewActivityLog;

mod common;

use common::{get, post_form, post_json, router, send, Backends};

#[tokio::test]
async fn test_home_reports_identity() {
    let app = router(Backends::default().state());
    let (status, body) = send(&app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["data"]["version"], "9.9.9");
    assert_eq!(body["data"]["environment"], "test");
    assert!(!body["data"]["hostname"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_info_counts_previous_requests() {
    let app = router(Backends::default().state());
    for _ in 0..3 {
        send(&app, get("/api/echo")).await;
    }

    let (status, body) = send(&app, get("/api/info")).await;
    assert_eq!(status, StatusCode::OK);
    let info = &body["data"];
    assert_eq!(info["totalRequests"], 3);
    assert_eq!(info["name"], "cloud-demo-api");
    assert_eq!(info["memoryMaxMB"], 256);
    assert!(info["processorsAvailable"].as_u64().unwrap() >= 1);
    assert!(info.get("uptimeSeconds").is_some());
    assert!(info.get("ipAddress").is_some());
}

#[tokio::test]
async fn test_echo_get_reflects_query() {
    let app = router(Backends::default().state());
    let (status, body) = send(&app, get("/api/echo?test=value&foo=bar")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["method"], "GET");
    assert_eq!(body["data"]["params"], json!({"test": "value", "foo": "bar"}));
}

#[tokio::test]
async fn test_echo_post_reflects_body() {
    let app = router(Backends::default().state());
    let (status, body) = send(
        &app,
        post_json("/api/echo", r#"{"message":"test","data":{"key":"value"}}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!({"message": "test", "data": {"key": "value"}}));
}

#[tokio::test]
async fn test_echo_post_malformed_body_is_bad_request() {
    let app = router(Backends::default().state());
    let (status, body) = send(&app, post_json("/api/echo", "{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["data"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_error_endpoint_always_500() {
    let app = router(Backends::default().state());
    let (status, body) = send(&app, get("/api/error")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 500);
    assert_eq!(body["data"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_cloudsql_logs_newest_first_and_capped() {
    let backends = Backends::default();
    for i in 0..12 {
        backends
            .activity_logs
            .insert(NewActivityLog::new(format!("/seed/{i}"), "GET", 200))
            .await
            .unwrap();
    }
    let app = router(backends.state());

    let (status, body) = send(&app, get("/api/cloudsql/logs")).await;
    assert_eq!(status, StatusCode::OK);

    let logs = body["data"].as_array().unwrap();
    assert_eq!(logs.len(), 10);
    assert_eq!(logs[0]["endpoint"], "/seed/11");
    let created: Vec<&str> = logs
        .iter()
        .map(|log| log["createdAt"].as_str().unwrap())
        .collect();
    let parsed: Vec<chrono::DateTime<chrono::Utc>> =
        created.iter().map(|s| s.parse().unwrap()).collect();
    assert!(parsed.windows(2).all(|w| w[0] > w[1]));

    // the query is itself recorded as an event
    assert_eq!(backends.documents.len("application_events"), 1);
}

#[tokio::test]
async fn test_cloudsql_stats() {
    let backends = Backends::default();
    for ms in [10, 30] {
        backends
            .activity_logs
            .insert(NewActivityLog::new("/api/session/create", "POST", 200).execution_time_ms(ms))
            .await
            .unwrap();
    }
    let app = router(backends.state());

    let (status, body) = send(&app, get("/api/cloudsql/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["requests_last_24h"],
        json!([{"endpoint": "/api/session/create", "requests": 2}])
    );
    assert_eq!(
        body["data"]["average_execution_ms"],
        json!([{"endpoint": "/api/session/create", "average_ms": 20.0}])
    );
}

#[tokio::test]
async fn test_storage_round_trip() {
    let backends = Backends::default();
    let app = router(backends.state());

    let (status, body) = send(
        &app,
        post_form("/api/storage/upload", "fileName=notes.txt&content=hello%20there"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["path"], "uploads/notes.txt");
    assert_eq!(body["data"]["folder"], "uploads");
    assert_eq!(body["data"]["size"], 11);
    assert_eq!(backends.documents.len("application_events"), 1);

    let (_, body) = send(&app, get("/api/storage/list")).await;
    assert_eq!(body["data"]["files"], json!(["notes.txt"]));
    assert_eq!(body["data"]["count"], 1);

    let (status, body) = send(&app, get("/api/storage/download?fileName=notes.txt")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "hello there");

    let delete = axum::http::Request::builder()
        .method("DELETE")
        .uri("/api/storage/delete?fileName=notes.txt")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);

    let (status, body) = send(&app, get("/api/storage/download?fileName=notes.txt")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["statusCode"], 404);
}

#[tokio::test]
async fn test_upload_custom_folder_via_query() {
    let app = router(Backends::default().state());
    let (status, body) = send(
        &app,
        post_form("/api/storage/upload?folder=reports", "fileName=q1.txt&content=x"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["path"], "reports/q1.txt");

    let (_, body) = send(&app, get("/api/storage/list?folder=uploads")).await;
    assert_eq!(body["data"]["count"], 0);
}

#[tokio::test]
async fn test_upload_missing_parameter_is_bad_request() {
    let app = router(Backends::default().state());
    let (status, body) = send(&app, post_form("/api/storage/upload", "content=x")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("fileName"));
}

#[tokio::test]
async fn test_metrics_save_and_query() {
    let backends = Backends::default();
    let app = router(backends.state());

    let (status, body) = send(
        &app,
        post_form("/api/firestore/metrics", "metricName=cpu&value=0.75&host=web-1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["metric_name"], "cpu");
    assert_eq!(body["data"]["value"], "0.75");
    assert_eq!(body["data"]["tags"], json!({"host": "web-1"}));

    let (status, body) = send(&app, get("/api/firestore/metrics?metricName=cpu")).await;
    assert_eq!(status, StatusCode::OK);
    let docs = body["data"].as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["tags"]["host"], "web-1");
    assert_eq!(docs[0]["environment"], "test");
}

#[tokio::test]
async fn test_metrics_missing_value_is_bad_request() {
    let app = router(Backends::default().state());
    let (status, body) = send(&app, post_form("/api/firestore/metrics", "metricName=cpu")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required parameter 'value'");
}

#[tokio::test]
async fn test_session_create_writes_both_stores() {
    let backends = Backends::default();
    let app = router(backends.state());

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/session/create")
        .header("user-agent", "integration-test")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let session_id = body["data"]["session_id"].as_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&session_id).is_ok());
    assert_eq!(body["data"]["user_agent"], "integration-test");
    assert_eq!(body["data"]["remote_ip"], "unknown");

    let logs = backends.activity_logs.recent(10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].endpoint, "/api/session/create");
    assert_eq!(logs[0].method, "POST");
    assert_eq!(logs[0].response_status, 200);
    assert_eq!(logs[0].execution_time_ms, Some(0));

    let session = backends.documents.get("user_sessions", &session_id).unwrap();
    assert_eq!(session["active"], true);

    let (status, body) = send(&app, get("/api/firestore/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stats"]["active_sessions"], 1);

    let close = post_form(&format!("/api/session/{session_id}/close"), "");
    let (status, body) = send(&app, close).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], false);

    let (_, body) = send(&app, get("/api/firestore/stats")).await;
    assert_eq!(body["data"]["stats"]["active_sessions"], 0);
}

#[tokio::test]
async fn test_close_unknown_session_is_not_found() {
    let app = router(Backends::default().state());
    let (status, body) = send(&app, post_form("/api/session/nope/close", "")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_firestore_stats_lists_recent_events() {
    let backends = Backends::default();
    let app = router(backends.state());
    for i in 0..7 {
        send(
            &app,
            post_form("/api/storage/upload", &format!("fileName=f{i}.txt&content=x")),
        )
        .await;
    }

    let (status, body) = send(&app, get("/api/firestore/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["recent_events"].as_array().unwrap().len(), 5);
    assert_eq!(body["data"]["stats"]["today_events"], 7);
}

#[tokio::test]
async fn test_unknown_route_is_enveloped_404() {
    let app = router(Backends::default().state());
    let (status, body) = send(&app, get("/api/nothing-here")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 404);
}

#[tokio::test]
async fn test_response_carries_request_id() {
    use tower::ServiceExt;

    let app = router(Backends::default().state());
    let response = app.oneshot(get("/api/echo")).await.unwrap();
    let id = response.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_concurrent_requests_counted_exactly() {
    let state = Backends::default().state();
    let info = state.info.clone();
    let app = router(state);

    let n = 200;
    let tasks: Vec<_> = (0..n)
        .map(|i| {
            let app = app.clone();
            let uri = if i % 2 == 0 { "/api/echo" } else { "/api/error" };
            tokio::spawn(async move { send(&app, get(uri)).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(info.request_count(), n);
}
