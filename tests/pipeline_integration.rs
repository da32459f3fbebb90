use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use chunkrelay::{
    api,
    config::Config,
    pipeline::{IntakeApi, PipelineService},
};
use httpmock::{Method::GET, Method::POST, MockServer};
use serde_json::{Value, json};
use tower::ServiceExt;

const BOUNDARY: &str = "relay-test-boundary";

fn harness(batch_size: usize) -> (PipelineService, Router) {
    let config = Config {
        batch_size,
        page_token_budget: 0,
        ..Config::default()
    };
    let service = PipelineService::from_config(&config).expect("service");
    let router = api::create_router(Arc::new(service.clone()), &config.intake_path);
    (service, router)
}

fn submission(callback_url: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/extract")
        .header("x-trace-id", "trace-it")
        .header("x-callback-url", callback_url)
        .header("content-type", content_type)
        .body(body.into())
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn json_submission_is_delivered_to_callback() {
    let callback = MockServer::start_async().await;
    let mock = callback
        .mock_async(|when, then| {
            when.method(POST).path("/hook").json_body_partial(
                json!({
                    "traceId": "trace-it",
                    "docId": "doc-it",
                    "strategiesBatchId": "sb-it",
                    "batchIndex": 0,
                    "totalBatches": 1,
                    "lastBatch": true,
                    "chunkData": [
                        { "chunkTitle": "Release notes", "chunkText": "Version 2 ships today.", "pageNumber": 1 }
                    ]
                })
                .to_string(),
            );
            then.status(200);
        })
        .await;

    let (service, app) = harness(50);
    let response = app
        .oneshot(submission(
            &callback.url("/hook"),
            "application/json",
            json!({
                "contentType": "data",
                "docId": "doc-it",
                "strategyBatchId": "sb-it",
                "title": "Release notes",
                "text": "Version 2 ships today."
            })
            .to_string(),
        ))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    service.wait_idle().await;

    mock.assert();
    let snapshot = service.metrics_snapshot();
    assert_eq!(snapshot.submissions_accepted, 1);
    assert_eq!(snapshot.pipelines_succeeded, 1);
    assert_eq!(snapshot.chunks_delivered, 1);
}

#[tokio::test]
async fn uploaded_file_is_extracted_and_delivered() {
    let callback = MockServer::start_async().await;
    let mock = callback
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hook")
                .body_contains("Quarterly report body")
                .body_contains("\"extractionStrategy\":\"file\"");
            then.status(200);
        })
        .await;

    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"docId\"\r\n\r\ndoc-file\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"upload\"; filename=\"report.txt\"\r\nContent-Type: text/plain\r\n\r\nQuarterly report body\r\n\
         --{b}--\r\n",
        b = BOUNDARY
    );
    let (service, app) = harness(50);
    let response = app
        .oneshot(submission(
            &callback.url("/hook"),
            &format!("multipart/form-data; boundary={BOUNDARY}"),
            body,
        ))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    service.wait_idle().await;
    mock.assert();
}

#[tokio::test]
async fn connector_records_arrive_in_ordered_batches() {
    let callback = MockServer::start_async().await;
    let mut mocks = Vec::new();
    for (index, last) in [(0, false), (1, false), (2, true)] {
        let mock = callback
            .mock_async(|when, then| {
                when.method(POST).path("/hook").json_body_partial(
                    json!({ "batchIndex": index, "totalBatches": 3, "lastBatch": last }).to_string(),
                );
                then.status(200);
            })
            .await;
        mocks.push(mock);
    }

    let records: Vec<Value> = (1..=12)
        .map(|index| json!({ "id": format!("r{index}"), "content": format!("Record {index}") }))
        .collect();
    let (service, app) = harness(5);
    let response = app
        .oneshot(submission(
            &callback.url("/hook"),
            "application/json",
            json!({ "contentType": "zendesk", "docId": "tickets", "records": records }).to_string(),
        ))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    service.wait_idle().await;
    for mock in &mocks {
        mock.assert();
    }
}

#[tokio::test]
async fn web_page_is_fetched_and_delivered() {
    let html = "<html><body><h1>Reset</h1><p>Hold the power button.</p></body></html>";
    let source = MockServer::start_async().await;
    let page = source
        .mock_async(|when, then| {
            when.method(GET).path("/kb/article");
            then.status(200)
                .header("content-type", "text/html")
                .body(html);
        })
        .await;
    let callback = MockServer::start_async().await;
    let url = source.url("/kb/article");
    let delivered = callback
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hook")
                .body_contains("Reset Hold the power button.")
                .body_contains(url.as_str());
            then.status(200);
        })
        .await;

    let (service, app) = harness(50);
    let response = app
        .oneshot(submission(
            &callback.url("/hook"),
            "application/json",
            json!({ "contentType": "web", "url": url }).to_string(),
        ))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    service.wait_idle().await;
    page.assert();
    delivered.assert();
}

#[tokio::test]
async fn missing_callback_header_never_schedules_work() {
    let callback = MockServer::start_async().await;
    let mock = callback
        .mock_async(|when, then| {
            when.any_request();
            then.status(200);
        })
        .await;

    let (service, app) = harness(50);
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/extract")
                .header("x-trace-id", "trace-it")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "contentType": "data", "text": "hi" }).to_string()))
                .expect("request"),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(service.in_flight(), 0);
    service.wait_idle().await;
    mock.assert_hits(0);
}

#[tokio::test]
async fn failed_batch_is_reported_only_through_failures_endpoint() {
    let callback = MockServer::start_async().await;
    let first = callback
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hook")
                .json_body_partial(r#"{"batchIndex":0}"#);
            then.status(200);
        })
        .await;
    let failing = callback
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hook")
                .json_body_partial(r#"{"batchIndex":1}"#);
            then.status(500);
        })
        .await;
    let never = callback
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hook")
                .json_body_partial(r#"{"batchIndex":2}"#);
            then.status(200);
        })
        .await;

    let chunks: Vec<Value> = (0..3).map(|index| json!({ "text": format!("part {index}") })).collect();
    let (service, app) = harness(1);
    let response = app
        .clone()
        .oneshot(submission(
            &callback.url("/hook"),
            "application/json",
            json!({ "contentType": "data", "docId": "doc-d", "extractedChunks": chunks }).to_string(),
        ))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await["status"], "acknowledged");
    service.wait_idle().await;

    first.assert();
    failing.assert();
    never.assert_hits(0);

    let response = app
        .oneshot(
            Request::get("/failures")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    let failures = json_body(response).await;
    assert_eq!(failures["failures"][0]["docId"], "doc-d");
    assert_eq!(failures["failures"][0]["stage"], "delivery");
    assert_eq!(failures["failures"][0]["batchIndex"], 1);
}
