//! HttpGateway against an in-process axum worker.

use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use taskdeck_gateway::{Gateway, HttpGateway};
use taskdeck_protocol::{validate_launch, GatewayError, OutputKind, TaskStatus};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn worker() -> Router {
    Router::new()
        .route("/", get(|| async { (StatusCode::NOT_FOUND, "no index") }))
        .route(
            "/api/tasks",
            get(|| async {
                Json(json!({
                    "tasks": [
                        {"task_id": "t1", "status": "running", "start_time": 1700000000.0,
                         "end_time": null, "has_error": false}
                    ],
                    "total": 1
                }))
            }),
        )
        .route(
            "/api/run",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "status": "success",
                    "task_id": format!("run-{}", body["list_id"].as_str().unwrap_or("")),
                }))
            }),
        )
        .route(
            "/api/status/:id",
            get(|Path(id): Path<String>| async move {
                if id == "t1" {
                    Json(json!({"running": true, "start_time": 1700000000.0, "output": []}))
                        .into_response()
                } else {
                    (
                        StatusCode::NOT_FOUND,
                        Json(json!({"status": "error", "message": "task id not found"})),
                    )
                        .into_response()
                }
            }),
        )
        .route(
            "/api/output/:id",
            get(|Path(id): Path<String>| async move {
                Json(json!({
                    "task_id": id,
                    "output": ["[09:15:02] login ok", "错误: cookie expired"],
                    "line_count": 2
                }))
            }),
        )
        .route(
            "/api/cleanup",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "<html>boom</html>") }),
        )
}

fn gateway() -> HttpGateway {
    HttpGateway::new(Duration::from_secs(2), Duration::from_secs(1)).unwrap()
}

#[tokio::test]
async fn test_list_tasks_decodes_snapshot() {
    let base = serve(worker()).await;
    let list = gateway().list_tasks(&base).await.unwrap();
    assert_eq!(list.total, 1);
    assert_eq!(list.tasks[0].task_id, "t1");
    assert_eq!(list.tasks[0].status, TaskStatus::Running);
}

#[tokio::test]
async fn test_launch_posts_literal_values() {
    let base = serve(worker()).await;
    let req = validate_launch("13812345678", "pw", "101,102,103").unwrap();
    let resp = gateway().launch(&base, &req).await.unwrap();
    assert_eq!(resp.task_id, "run-101,102,103");
}

#[tokio::test]
async fn test_non_2xx_uses_json_message() {
    let base = serve(worker()).await;
    let err = gateway().task_status(&base, "missing").await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Http { code: 404, message: "task id not found".to_string() }
    );
}

#[tokio::test]
async fn test_non_json_error_body_falls_back_to_status_text() {
    let base = serve(worker()).await;
    let err = gateway().cleanup(&base).await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Http { code: 500, message: "Internal Server Error".to_string() }
    );
}

#[tokio::test]
async fn test_output_accepts_flattened_strings() {
    let base = serve(worker()).await;
    let out = gateway().task_output(&base, "t1").await.unwrap();
    assert_eq!(out.output.len(), 2);
    assert_eq!(out.output[0].kind, OutputKind::Stdout);
    assert_eq!(out.output[1].kind, OutputKind::Stderr);
}

#[tokio::test]
async fn test_probe_reports_any_http_status() {
    let base = serve(worker()).await;
    let reply = gateway().probe(&base).await.unwrap();
    assert_eq!(reply.status, 404);
}

#[tokio::test]
async fn test_slow_server_yields_timeout() {
    let app = Router::new().route(
        "/api/tasks",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"tasks": [], "total": 0}))
        }),
    );
    let base = serve(app).await;
    let gw = HttpGateway::new(Duration::from_millis(200), Duration::from_millis(200)).unwrap();
    assert_eq!(gw.list_tasks(&base).await.unwrap_err(), GatewayError::Timeout);
}

#[tokio::test]
async fn test_refused_connection_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = format!("http://{addr}");
    let err = gateway().list_tasks(&base).await.unwrap_err();
    assert!(matches!(err, GatewayError::Network(_)), "got {err:?}");
    assert!(err.is_connectivity());

    let err = gateway().probe(&base).await.unwrap_err();
    assert!(err.is_connectivity());
}
