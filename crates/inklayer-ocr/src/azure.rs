// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async client for Azure Document Intelligence (formerly Form Recognizer).
//
// Analysis is a long-running operation:
//   1. POST {endpoint}/formrecognizer/documentModels/{model}:analyze?api-version={v}
//      with the raw document bytes; the service answers 202 with an
//      `Operation-Location` header.
//   2. GET that URL until `status` is `succeeded` or `failed`, waiting
//      `Retry-After` (or the configured interval) between polls.

use std::time::Duration;

use inklayer_core::error::{InklayerError, Result};
use inklayer_core::{InputFormat, OcrDocument, Settings};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info, instrument, warn};

use crate::models::{AnalyzeOperation, AnalyzeResult, OperationStatus, describe_error_body};
use crate::retry::{self, RetryConfig, RetryDecision};
use crate::service::OcrService;

/// Subscription key header.
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Response header carrying the result URL of a submitted analysis.
const OPERATION_LOCATION: &str = "operation-location";

/// Connect timeout for each HTTP request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client bound to one Document Intelligence resource.
///
/// The overall analysis deadline is applied by
/// [`analyze_with_timeout`](crate::service::analyze_with_timeout); this client
/// polls for as long as the service reports progress.
pub struct DocumentIntelligenceClient {
    http: Client,
    /// Endpoint without trailing slash.
    endpoint: String,
    key: String,
    model_id: String,
    api_version: String,
    poll_interval: Duration,
    retry: RetryConfig,
}

impl DocumentIntelligenceClient {
    /// Create a client from validated settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| InklayerError::OcrService(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.trim().trim_end_matches('/').to_string(),
            key: settings.key.clone(),
            model_id: settings.ocr.model_id.clone(),
            api_version: settings.ocr.api_version.clone(),
            poll_interval: Duration::from_millis(settings.ocr.poll_interval_ms),
            retry: RetryConfig::from_settings(&settings.ocr),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// URL of the analyze request.
    pub fn analyze_url(&self) -> String {
        format!(
            "{}/formrecognizer/documentModels/{}:analyze?api-version={}",
            self.endpoint, self.model_id, self.api_version
        )
    }

    /// Submit a document and return the URL of its analysis operation.
    #[instrument(skip(self, document), fields(model = %self.model_id, bytes = document.len()))]
    pub async fn submit(&self, document: &[u8], format: InputFormat) -> Result<String> {
        let url = self.analyze_url();
        info!(mime = format.mime_type(), "Submitting document for analysis");

        let response = self
            .send_with_retry("analyze request", || {
                self.http
                    .post(&url)
                    .header(KEY_HEADER, &self.key)
                    .header(CONTENT_TYPE, format.mime_type())
                    .body(document.to_vec())
            })
            .await?;

        let location = response
            .headers()
            .get(OPERATION_LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                InklayerError::OcrService(format!(
                    "analyze request returned {} without an Operation-Location header",
                    response.status()
                ))
            })?;

        debug!(operation = %location, "Analysis accepted");
        Ok(location)
    }

    /// Poll an analysis operation until it finishes.
    #[instrument(skip(self))]
    pub async fn poll(&self, operation_url: &str) -> Result<AnalyzeResult> {
        let mut polls: u32 = 0;
        loop {
            let response = self
                .send_with_retry("analyze result poll", || {
                    self.http.get(operation_url).header(KEY_HEADER, &self.key)
                })
                .await?;
            let wait = retry::retry_after(response.headers()).unwrap_or(self.poll_interval);
            let body = response.bytes().await.map_err(|e| {
                InklayerError::OcrService(format!("reading analyze result failed: {e}"))
            })?;
            let operation: AnalyzeOperation = serde_json::from_slice(&body).map_err(|e| {
                InklayerError::OcrService(format!("malformed analyze result: {e}"))
            })?;

            polls += 1;
            if !operation.status.is_terminal() {
                debug!(polls, status = ?operation.status, wait_ms = wait.as_millis(), "Analysis in progress");
                tokio::time::sleep(wait).await;
                continue;
            }
            if operation.status != OperationStatus::Succeeded {
                let reason = operation
                    .error
                    .map(|err| err.to_string())
                    .unwrap_or_else(|| "no error details".into());
                return Err(InklayerError::OcrService(format!(
                    "analysis {:?}: {reason}",
                    operation.status
                )));
            }
            debug!(polls, "Analysis succeeded");
            return operation.analyze_result.ok_or_else(|| {
                InklayerError::OcrService("analysis succeeded without an analyzeResult".into())
            });
        }
    }

    /// Send a request, retrying transient failures per the retry policy.
    ///
    /// `build` is called once per attempt. Returns the first 2xx response.
    async fn send_with_retry<F>(&self, what: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            let (class, detail, requested_wait) = match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let requested_wait = retry::retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    (
                        retry::classify_status(status),
                        format!("{what} returned {status}: {}", describe_error_body(&body)),
                        requested_wait,
                    )
                }
                Err(err) => (
                    retry::classify_transport(&err),
                    format!("{what} failed: {err}"),
                    None,
                ),
            };

            match retry::should_retry(class, attempt, &self.retry, requested_wait) {
                RetryDecision::RetryAfter(delay) => {
                    warn!(
                        attempt = attempt + 1,
                        max = self.retry.max_retries,
                        delay_ms = delay.as_millis(),
                        %detail,
                        "Transient OCR service failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp(_) | RetryDecision::Exhausted => {
                    return Err(InklayerError::OcrService(detail));
                }
            }
        }
    }
}

impl OcrService for DocumentIntelligenceClient {
    async fn analyze(&self, document: &[u8], format: InputFormat) -> Result<OcrDocument> {
        let operation_url = self.submit(document, format).await?;
        let result = self.poll(&operation_url).await?;
        OcrDocument::try_from(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::analyze_with_timeout;
    use axum::Router;
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Scripted stand-in for the Document Intelligence service.
    #[derive(Default)]
    struct Script {
        /// Statuses returned by the analyze POST before it is accepted.
        submit_failures: Vec<u16>,
        /// `running` responses before the terminal one.
        running_polls: usize,
        /// Terminal operation body; `None` keeps reporting `running` forever.
        terminal: Option<serde_json::Value>,
    }

    #[derive(Default)]
    struct Recorded {
        submits: usize,
        polls: usize,
        path_and_query: String,
        key: String,
        content_type: String,
        body_len: usize,
    }

    struct Fake {
        base: String,
        script: Mutex<Script>,
        recorded: Mutex<Recorded>,
    }

    async fn handle(
        State(fake): State<Arc<Fake>>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> AxumResponse {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let mut script = fake.script.lock().unwrap();
        let mut recorded = fake.recorded.lock().unwrap();

        if method == Method::POST {
            recorded.submits += 1;
            recorded.path_and_query = uri.path_and_query().map(|p| p.to_string()).unwrap_or_default();
            recorded.key = header(KEY_HEADER);
            recorded.content_type = header("content-type");
            recorded.body_len = body.len();

            if !script.submit_failures.is_empty() {
                let status = StatusCode::from_u16(script.submit_failures.remove(0)).unwrap();
                let error = json!({"error": {"code": status.as_u16().to_string(), "message": "scripted failure"}});
                return (status, axum::Json(error)).into_response();
            }
            let mut response = StatusCode::ACCEPTED.into_response();
            let location = format!(
                "{}/formrecognizer/documentModels/prebuilt-read/analyzeResults/op-1?api-version=2023-07-31",
                fake.base
            );
            response
                .headers_mut()
                .insert(OPERATION_LOCATION, HeaderValue::from_str(&location).unwrap());
            return response;
        }

        recorded.polls += 1;
        if script.running_polls > 0 {
            script.running_polls -= 1;
            let mut response = axum::Json(json!({"status": "running"})).into_response();
            response
                .headers_mut()
                .insert("retry-after", HeaderValue::from_static("0"));
            return response;
        }
        if script.terminal.is_none() {
            return axum::Json(json!({"status": "running"})).into_response();
        }
        axum::Json(script.terminal.clone().unwrap_or_default()).into_response()
    }

    async fn spawn_fake(script: Script) -> (Arc<Fake>, Settings) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let fake = Arc::new(Fake {
            base: base.clone(),
            script: Mutex::new(script),
            recorded: Mutex::new(Recorded::default()),
        });
        let app = Router::new().fallback(handle).with_state(fake.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut settings = Settings::new(format!("{base}/"), "test-key");
        settings.ocr.poll_interval_ms = 5;
        (fake, settings)
    }

    fn fast_retries(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
        }
    }

    fn hello_result() -> serde_json::Value {
        json!({
            "status": "succeeded",
            "analyzeResult": {
                "modelId": "prebuilt-read",
                "content": "Hello",
                "pages": [{
                    "pageNumber": 1,
                    "width": 1000,
                    "height": 1400,
                    "unit": "pixel",
                    "words": [{"content": "Hello", "polygon": [100,100,300,100,300,160,100,160], "confidence": 0.99}]
                }]
            }
        })
    }

    #[test]
    fn analyze_url_layout() {
        let settings = Settings::new("https://example.cognitiveservices.azure.com/", "k");
        let client = DocumentIntelligenceClient::new(&settings).unwrap();
        assert_eq!(
            client.analyze_url(),
            "https://example.cognitiveservices.azure.com/formrecognizer/documentModels/prebuilt-read:analyze?api-version=2023-07-31"
        );
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = Settings::new("ftp://example.com", "k");
        assert!(matches!(
            DocumentIntelligenceClient::new(&settings),
            Err(InklayerError::ConfigLoad(_))
        ));
    }

    #[tokio::test]
    async fn submit_then_poll_until_succeeded() {
        let (fake, settings) = spawn_fake(Script {
            running_polls: 2,
            terminal: Some(hello_result()),
            ..Script::default()
        })
        .await;
        let client = DocumentIntelligenceClient::new(&settings).unwrap();

        let doc = client.analyze(b"\x89PNG fake", InputFormat::Png).await.unwrap();
        assert_eq!(doc.content, "Hello");
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.pages[0].words[0].content, "Hello");
        assert_eq!(doc.pages[0].words[0].polygon[3].y, 160.0);

        let recorded = fake.recorded.lock().unwrap();
        assert_eq!(recorded.submits, 1);
        assert_eq!(recorded.polls, 3);
        assert_eq!(
            recorded.path_and_query,
            "/formrecognizer/documentModels/prebuilt-read:analyze?api-version=2023-07-31"
        );
        assert_eq!(recorded.key, "test-key");
        assert_eq!(recorded.content_type, "image/png");
        assert_eq!(recorded.body_len, 9);
    }

    #[tokio::test]
    async fn transient_submit_failures_are_retried() {
        let (fake, settings) = spawn_fake(Script {
            submit_failures: vec![503, 429],
            terminal: Some(hello_result()),
            ..Script::default()
        })
        .await;
        let client = DocumentIntelligenceClient::new(&settings)
            .unwrap()
            .with_retry_config(fast_retries(3));

        let doc = client.analyze(b"%PDF-1.4", InputFormat::Pdf).await.unwrap();
        assert_eq!(doc.word_count(), 1);
        assert_eq!(fake.recorded.lock().unwrap().submits, 3);
    }

    #[tokio::test]
    async fn bad_key_fails_without_retry() {
        let (fake, settings) = spawn_fake(Script {
            submit_failures: vec![401],
            terminal: Some(hello_result()),
            ..Script::default()
        })
        .await;
        let client = DocumentIntelligenceClient::new(&settings)
            .unwrap()
            .with_retry_config(fast_retries(3));

        let err = client.analyze(b"x", InputFormat::Jpeg).await.unwrap_err();
        match err {
            InklayerError::OcrService(detail) => {
                assert!(detail.contains("401"), "{detail}");
                assert!(detail.contains("scripted failure"), "{detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let recorded = fake.recorded.lock().unwrap();
        assert_eq!(recorded.submits, 1);
        assert_eq!(recorded.polls, 0);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let (fake, settings) = spawn_fake(Script {
            submit_failures: vec![500; 10],
            terminal: Some(hello_result()),
            ..Script::default()
        })
        .await;
        let client = DocumentIntelligenceClient::new(&settings)
            .unwrap()
            .with_retry_config(fast_retries(2));

        assert!(client.analyze(b"x", InputFormat::Tiff).await.is_err());
        assert_eq!(fake.recorded.lock().unwrap().submits, 3);
    }

    #[tokio::test]
    async fn failed_operation_is_an_error() {
        let (_fake, settings) = spawn_fake(Script {
            terminal: Some(json!({
                "status": "failed",
                "error": {"code": "InvalidContent", "message": "The file is corrupted or format is unsupported."}
            })),
            ..Script::default()
        })
        .await;
        let client = DocumentIntelligenceClient::new(&settings).unwrap();

        let err = client.analyze(b"x", InputFormat::Bmp).await.unwrap_err();
        assert!(matches!(err, InklayerError::OcrService(detail) if detail.contains("InvalidContent")));
    }

    #[tokio::test]
    async fn malformed_polygon_is_an_error() {
        let (_fake, settings) = spawn_fake(Script {
            terminal: Some(json!({
                "status": "succeeded",
                "analyzeResult": {
                    "content": "odd",
                    "pages": [{"pageNumber": 1, "width": 10, "height": 10, "words": [{"content": "odd", "polygon": [1, 2, 3]}]}]
                }
            })),
            ..Script::default()
        })
        .await;
        let client = DocumentIntelligenceClient::new(&settings).unwrap();
        assert!(matches!(
            client.analyze(b"x", InputFormat::Png).await,
            Err(InklayerError::OcrService(_))
        ));
    }

    #[tokio::test]
    async fn endless_analysis_hits_the_deadline() {
        let (fake, settings) = spawn_fake(Script::default()).await;
        let client = DocumentIntelligenceClient::new(&settings).unwrap();

        let err = analyze_with_timeout(&client, b"x", InputFormat::Png, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, InklayerError::OcrService(detail) if detail.contains("timed out")));
        assert!(fake.recorded.lock().unwrap().polls >= 1);
    }
}
