//! HTTP client abstraction for the recognition service.
//!
//! This module defines the `ExtractionClient` trait to abstract the single multipart
//! upload the workflow makes, enabling testability with mock implementations.

use crate::domain::{Batch, BatchId};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Response from the recognition service, buffered in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as a string
    pub body: String,
}

/// One file in the multipart body.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadPart {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadPart")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Everything needed to upload one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// The batch being uploaded
    pub batch_id: BatchId,
    /// The base URL of the service (e.g., <http://localhost:5000>)
    pub endpoint: String,
    /// The path portion of the URL (e.g., "/extract")
    pub path: String,
    /// Multipart field name shared by every part
    pub field_name: String,
    /// One part per image, in batch order
    pub parts: Vec<UploadPart>,
    /// Optional request timeout; None uses the client default
    pub timeout_ms: Option<u64>,
}

impl ExtractionRequest {
    /// Package every file of `batch` under `field_name`.
    pub fn from_batch(
        batch: &Batch,
        endpoint: &str,
        path: &str,
        field_name: &str,
        timeout_ms: Option<u64>,
    ) -> Self {
        Self {
            batch_id: batch.id,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            path: format!("/{}", path.trim_start_matches('/')),
            field_name: field_name.to_string(),
            parts: batch
                .files()
                .iter()
                .map(|file| UploadPart {
                    file_name: file.name.clone(),
                    media_type: file.media_type.clone(),
                    bytes: file.bytes.clone(),
                })
                .collect(),
            timeout_ms,
        }
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.endpoint, self.path)
    }
}

/// Trait for uploading a batch to the recognition service.
///
/// This abstraction allows for different implementations (production vs. testing)
/// and makes the workflow testable without making real HTTP calls.
///
/// # Example
/// ```ignore
/// let client = ReqwestExtractionClient::new();
/// let response = client.execute(&request).await?;
/// println!("Status: {}, Body: {}", response.status, response.body);
/// ```
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// Send one multipart POST and buffer the response.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The request fails due to network issues
    /// - The request times out
    /// - A part declares an unparsable media type
    ///
    /// Non-2xx statuses are not errors here; they are returned as responses.
    async fn execute(&self, request: &ExtractionRequest) -> Result<HttpResponse>;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Production client using reqwest.
#[derive(Clone, Default)]
pub struct ReqwestExtractionClient {
    client: reqwest::Client,
}

impl ReqwestExtractionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured reqwest client (proxies, TLS roots, default timeout).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build_form(request: &ExtractionRequest) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for part in &request.parts {
            let file_part = reqwest::multipart::Part::bytes(part.bytes.clone())
                .file_name(part.file_name.clone())
                .mime_str(&part.media_type)?;
            form = form.part(request.field_name.clone(), file_part);
        }
        Ok(form)
    }
}

#[async_trait]
impl ExtractionClient for ReqwestExtractionClient {
    #[tracing::instrument(skip(self, request), fields(batch_id = %request.batch_id, parts = request.parts.len()))]
    async fn execute(&self, request: &ExtractionRequest) -> Result<HttpResponse> {
        let url = request.url();

        tracing::debug!(
            url = %url,
            timeout_ms = request.timeout_ms,
            "Uploading batch"
        );

        let form = Self::build_form(request).map_err(|e| {
            tracing::error!(error = %e, "Failed to build multipart body");
            e
        })?;

        let mut req = self.client.post(&url).multipart(form);
        if let Some(timeout_ms) = request.timeout_ms {
            req = req.timeout(Duration::from_millis(timeout_ms));
        }

        let response = req.send().await.map_err(|e| {
            tracing::error!(
                batch_id = %request.batch_id,
                url = %url,
                error = %e,
                "Upload failed"
            );
            e
        })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::info!(
            batch_id = %request.batch_id,
            status = status,
            response_len = body.len(),
            "Upload completed"
        );

        Ok(HttpResponse { status, body })
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

/// Mock client for testing.
///
/// Allows configuring predetermined responses without making actual HTTP calls.
///
/// # Example
/// ```ignore
/// let mock = MockExtractionClient::new();
/// mock.add_response(
///     "POST /extract",
///     Ok(HttpResponse {
///         status: 200,
///         body: r#"{"codes": ["1234567890123456"]}"#.to_string(),
///     }),
/// );
/// ```
#[derive(Clone, Default)]
pub struct MockExtractionClient {
    responses: Arc<Mutex<HashMap<String, Vec<MockResponse>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    in_flight: Arc<AtomicUsize>,
}

/// A mock response that can optionally wait for a trigger before completing.
enum MockResponse {
    /// Immediate response
    Immediate(Result<HttpResponse>),
    /// Response that waits for a trigger signal before completing
    Triggered {
        response: Result<HttpResponse>,
        trigger: oneshot::Receiver<()>,
    },
}

/// Record of a call made to the mock client.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub batch_id: BatchId,
    pub endpoint: String,
    pub path: String,
    pub field_name: String,
    pub file_names: Vec<String>,
    pub media_types: Vec<String>,
    pub timeout_ms: Option<u64>,
}

impl MockExtractionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predetermined response for a method and path.
    ///
    /// The key is formatted as "POST {path}". Multiple responses can be
    /// added for the same key - they will be returned in FIFO order.
    pub fn add_response(&self, key: &str, response: Result<HttpResponse>) {
        self.responses
            .lock()
            .entry(key.to_string())
            .or_default()
            .push(MockResponse::Immediate(response));
    }

    /// Shorthand for a response with the given status and body.
    pub fn add_json_response(&self, key: &str, status: u16, body: &str) {
        self.add_response(
            key,
            Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    /// Add a response that will wait for a manual trigger before completing.
    ///
    /// Returns a sender that when triggered (by sending `()` or dropping) will
    /// cause the upload to complete with the given response.
    pub fn add_response_with_trigger(
        &self,
        key: &str,
        response: Result<HttpResponse>,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.responses
            .lock()
            .entry(key.to_string())
            .or_default()
            .push(MockResponse::Triggered {
                response,
                trigger: rx,
            });
        tx
    }

    /// Get all calls that have been made to this mock client.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Get the number of uploads currently executing.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionClient for MockExtractionClient {
    async fn execute(&self, request: &ExtractionRequest) -> Result<HttpResponse> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        // Guard to ensure we decrement even if cancelled/panicked
        let _guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
        };

        self.calls.lock().push(MockCall {
            batch_id: request.batch_id,
            endpoint: request.endpoint.clone(),
            path: request.path.clone(),
            field_name: request.field_name.clone(),
            file_names: request.parts.iter().map(|p| p.file_name.clone()).collect(),
            media_types: request.parts.iter().map(|p| p.media_type.clone()).collect(),
            timeout_ms: request.timeout_ms,
        });

        let key = format!("POST {}", request.path);
        let mock_response = {
            let mut responses = self.responses.lock();
            responses
                .get_mut(&key)
                .filter(|queue| !queue.is_empty())
                .map(|queue| queue.remove(0))
        };

        match mock_response {
            Some(MockResponse::Immediate(response)) => response,
            Some(MockResponse::Triggered { response, trigger }) => {
                // Proceed on send or on sender drop
                let _ = trigger.await;
                response
            }
            None => Err(crate::error::ExtractorError::Other(anyhow::anyhow!(
                "No mock response configured for {}",
                key
            ))),
        }
    }
}

/// Guard that decrements the in-flight counter when dropped.
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
