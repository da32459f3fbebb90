//! HTTP surface for chunkrelay.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST {intake_path}` (default `/extract`) – Accept a submission as JSON or multipart form
//!   data. The trace id and callback URL headers are checked first, then the content type and
//!   body. Accepted submissions get `202 {"status":"acknowledged", ...}` and run in the
//!   background; results go to the callback URL, never back to this response.
//! - `GET /health` – Liveness check.
//! - `GET /metrics` – Intake and pipeline counters.
//! - `GET /failures` – Recent failures from background runs (bounded).

use crate::metrics::MetricsSnapshot;
use crate::pipeline::{FailureRecord, IntakeApi};
use crate::request::{RawRequest, RequestError, UploadedFile};
use axum::{
    Json, Router,
    body::to_bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Build the HTTP router exposing the intake surface at `intake_path`.
pub fn create_router<S>(service: Arc<S>, intake_path: &str) -> Router
where
    S: IntakeApi + 'static,
{
    Router::new()
        .route(intake_path, post(submit::<S>))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics::<S>))
        .route("/failures", get(get_failures::<S>))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(service)
}

/// Acknowledgment returned for every accepted submission.
#[derive(Serialize)]
struct Acknowledgment {
    status: &'static str,
    message: &'static str,
}

/// Accept a submission and schedule it.
///
/// Order matters: a submission without the trace id or callback URL headers is refused
/// before its body is read, so nothing is ever scheduled for it.
async fn submit<S>(
    State(service): State<Arc<S>>,
    request: Request,
) -> Result<(StatusCode, Json<Acknowledgment>), AppError>
where
    S: IntakeApi,
{
    let result = accept(service.as_ref(), request).await;
    if let Err(error) = &result {
        service.record_rejected();
        tracing::warn!(error = %error.0, "Submission rejected");
    }
    result?;

    Ok((
        StatusCode::ACCEPTED,
        Json(Acknowledgment {
            status: "acknowledged",
            message: "Your request is being processed",
        }),
    ))
}

async fn accept<S>(service: &S, request: Request) -> Result<(), AppError>
where
    S: IntakeApi,
{
    let mut raw = RawRequest {
        headers: header_map(request.headers()),
        ..RawRequest::default()
    };
    service.validate(&raw)?;

    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        raw.body = read_json(request).await?;
    } else if content_type.starts_with("multipart/form-data") {
        let (body, files) = read_multipart(request).await?;
        raw.body = body;
        raw.files = files;
    } else {
        return Err(RequestError::UnsupportedMediaType.into());
    }

    service.schedule(raw)?;
    Ok(())
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

async fn read_json(request: Request) -> Result<Map<String, Value>, RequestError> {
    let bytes = to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|error| RequestError::InvalidJson(error.to_string()))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(body)) => Ok(body),
        Ok(_) => Err(RequestError::InvalidJson(
            "body must be a JSON object".to_string(),
        )),
        Err(error) => Err(RequestError::InvalidJson(error.to_string())),
    }
}

type MultipartParts = (Map<String, Value>, HashMap<String, Vec<UploadedFile>>);

/// Split multipart fields into body values and uploaded files.
///
/// Text fields holding JSON objects or arrays are parsed; repeated field names become arrays.
async fn read_multipart(request: Request) -> Result<MultipartParts, RequestError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| RequestError::InvalidMultipart(rejection.body_text()))?;

    let mut body = Map::new();
    let mut files: HashMap<String, Vec<UploadedFile>> = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| RequestError::InvalidMultipart(error.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|error| RequestError::InvalidMultipart(error.to_string()))?;
            let file_name = if file_name.trim().is_empty() {
                format!("upload_{}.bin", uuid::Uuid::new_v4())
            } else {
                file_name
            };
            tracing::debug!(
                field = %name,
                file = %file_name,
                bytes = bytes.len(),
                "Received file part"
            );
            files.entry(name).or_default().push(UploadedFile {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let text = field
                .text()
                .await
                .map_err(|error| RequestError::InvalidMultipart(error.to_string()))?;
            insert_field(&mut body, name, form_value(text));
        }
    }
    Ok((body, files))
}

fn form_value(text: String) -> Value {
    let trimmed = text.trim_start();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && let Ok(value) = serde_json::from_str(&text)
    {
        return value;
    }
    Value::String(text)
}

fn insert_field(body: &mut Map<String, Value>, name: String, value: Value) {
    match body.get_mut(&name) {
        None => {
            body.insert(name, value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Return the intake and pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: IntakeApi,
{
    Json(service.metrics_snapshot())
}

/// Response body for `GET /failures`.
#[derive(Serialize)]
struct FailuresResponse {
    failures: Vec<FailureRecord>,
}

async fn get_failures<S>(State(service): State<Arc<S>>) -> Json<FailuresResponse>
where
    S: IntakeApi,
{
    Json(FailuresResponse {
        failures: service.recent_failures(),
    })
}

struct AppError(RequestError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            RequestError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RequestError::MissingHeaders(_)
            | RequestError::InvalidJson(_)
            | RequestError::InvalidMultipart(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<RequestError> for AppError {
    fn from(inner: RequestError) -> Self {
        Self(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::metrics::MetricsSnapshot;
    use crate::pipeline::{FailureRecord, IntakeApi, PipelineStage};
    use crate::request::{RawRequest, RequestError, RequestNormalizer};
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    const BOUNDARY: &str = "chunkrelay-boundary";

    #[derive(Default)]
    struct StubIntake {
        scheduled: Mutex<Vec<RawRequest>>,
        rejected: Mutex<u64>,
        normalizer: RequestNormalizer,
    }

    impl StubIntake {
        fn scheduled(&self) -> Vec<RawRequest> {
            self.scheduled.lock().expect("lock").clone()
        }
    }

    impl IntakeApi for StubIntake {
        fn validate(&self, request: &RawRequest) -> Result<(), RequestError> {
            self.normalizer.validate(request)
        }

        fn schedule(&self, request: RawRequest) -> Result<(), RequestError> {
            self.normalizer.validate(&request)?;
            self.scheduled.lock().expect("lock").push(request);
            Ok(())
        }

        fn record_rejected(&self) {
            *self.rejected.lock().expect("lock") += 1;
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                submissions_accepted: self.scheduled.lock().expect("lock").len() as u64,
                submissions_rejected: *self.rejected.lock().expect("lock"),
                ..MetricsSnapshot::default()
            }
        }

        fn recent_failures(&self) -> Vec<FailureRecord> {
            vec![FailureRecord::new(
                "trace-f",
                "doc-f",
                "http://cb",
                PipelineStage::Delivery,
                "Callback batch 1 rejected",
            )]
        }
    }

    fn app() -> (Arc<StubIntake>, Router) {
        let service = Arc::new(StubIntake::default());
        let router = create_router(service.clone(), "/extract");
        (service, router)
    }

    fn intake(content_type: Option<&str>, body: impl Into<Body>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/extract")
            .header("x-trace-id", "trace-1")
            .header("x-callback-url", "http://callback.test/hook");
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        builder.body(body.into()).expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).expect("request")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn json_submission_is_acknowledged_and_scheduled() {
        let (service, app) = app();
        let response = app
            .oneshot(intake(
                Some("application/json"),
                json!({ "docId": "doc-1", "contentType": "data" }).to_string(),
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "acknowledged");
        assert_eq!(body["message"], "Your request is being processed");

        let scheduled = service.scheduled();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].body["docId"], "doc-1");
        assert_eq!(scheduled[0].headers["x-trace-id"], "trace-1");
    }

    #[tokio::test]
    async fn missing_callback_header_is_rejected_before_scheduling() {
        let (service, app) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/extract")
                    .header("x-trace-id", "trace-1")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"docId":"doc-1"}"#))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Missing required headers (x-callback-url)");
        assert!(service.scheduled().is_empty());
        assert_eq!(service.metrics_snapshot().submissions_rejected, 1);
    }

    #[tokio::test]
    async fn header_check_precedes_content_type_check() {
        let (service, app) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/extract")
                    .header("content-type", "text/plain")
                    .body(Body::from("hello"))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(service.scheduled().is_empty());
    }

    #[tokio::test]
    async fn unsupported_content_type_is_415() {
        let (service, app) = app();
        let response = app
            .oneshot(intake(Some("text/plain"), "hello"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let body = json_body(response).await;
        assert_eq!(
            body["error"],
            "Content-Type must be application/json or multipart/form-data"
        );
        assert!(service.scheduled().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let (service, app) = app();
        for payload in ["{not json", "[1, 2]"] {
            let response = app
                .clone()
                .oneshot(intake(Some("application/json"), payload))
                .await
                .expect("router response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = json_body(response).await;
            let message = body["error"].as_str().unwrap_or_default();
            assert!(message.starts_with("Invalid JSON data"));
        }
        assert!(service.scheduled().is_empty());
    }

    #[tokio::test]
    async fn multipart_fields_and_files_are_split() {
        let (service, app) = app();
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"docId\"\r\n\r\ndoc-7\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"tags\"\r\n\r\nalpha\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"tags\"\r\n\r\nbeta\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"document_meta\"\r\n\r\n{{\"title\":\"Notes\"}}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"upload\"; filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\nfile body\r\n\
             --{b}--\r\n",
            b = BOUNDARY
        );
        let response = app
            .oneshot(intake(
                Some(format!("multipart/form-data; boundary={BOUNDARY}").as_str()),
                body,
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let scheduled = service.scheduled();
        let raw = &scheduled[0];
        assert_eq!(raw.body["docId"], "doc-7");
        assert_eq!(raw.body["tags"], json!(["alpha", "beta"]));
        assert_eq!(raw.body["document_meta"]["title"], "Notes");
        let upload = &raw.files["upload"][0];
        assert_eq!(upload.file_name, "notes.txt");
        assert_eq!(upload.content_type.as_deref(), Some("text/plain"));
        assert_eq!(upload.bytes, b"file body");
    }

    #[tokio::test]
    async fn broken_multipart_is_400() {
        let (service, app) = app();
        let response = app
            .oneshot(intake(
                Some("multipart/form-data; boundary=missing"),
                "this is not multipart",
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(
            body["error"]
                .as_str()
                .unwrap_or_default()
                .starts_with("Error parsing form data")
        );
        assert!(service.scheduled().is_empty());
    }

    #[tokio::test]
    async fn health_metrics_and_failures_routes() {
        let (_, app) = app();

        let response = app
            .clone()
            .oneshot(get("/health"))
            .await
            .expect("router response");
        assert_eq!(json_body(response).await, json!({ "status": "ok" }));

        let response = app
            .clone()
            .oneshot(get("/metrics"))
            .await
            .expect("router response");
        let metrics = json_body(response).await;
        assert_eq!(metrics["submissionsAccepted"], 0);

        let response = app
            .oneshot(get("/failures"))
            .await
            .expect("router response");
        let failures = json_body(response).await;
        assert_eq!(failures["failures"][0]["traceId"], "trace-f");
        assert_eq!(failures["failures"][0]["stage"], "delivery");
    }
}
