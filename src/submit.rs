//! Batch submission: one upload, one response, one outcome.

use metrics::counter;
use serde_json::Value;

use crate::domain::ExtractionResult;
use crate::error::SubmissionError;
use crate::http::{ExtractionClient, ExtractionRequest, HttpResponse};

/// Used when a failed response carries no `error` message.
pub const GENERIC_FAILURE: &str = "An error occurred while processing the images.";

/// Upload `request` and map the response into an extraction result.
///
/// Exactly one call is made on `client`. Transport failures are normalized into
/// [`SubmissionError::Transport`]; nothing is retried.
pub async fn submit_batch<C: ExtractionClient + ?Sized>(
    client: &C,
    request: &ExtractionRequest,
) -> Result<ExtractionResult, SubmissionError> {
    let outcome = match client.execute(request).await {
        Ok(response) => interpret_response(&response),
        Err(e) => Err(e.into_submission_error()),
    };

    match &outcome {
        Ok(result) => {
            counter!("code_extractor_submissions_total", "outcome" => "completed").increment(1);
            counter!("code_extractor_codes_extracted_total").increment(result.len() as u64);
            tracing::info!(
                batch_id = %request.batch_id,
                images = request.parts.len(),
                codes = result.len(),
                "Extraction completed"
            );
        }
        Err(e) => {
            let outcome = match e {
                SubmissionError::ServerRejected(_) => "rejected",
                SubmissionError::Transport(_) => "transport_error",
            };
            counter!("code_extractor_submissions_total", "outcome" => outcome).increment(1);
            tracing::warn!(batch_id = %request.batch_id, error = %e, "Extraction failed");
        }
    }

    outcome
}

/// Map a buffered response into an extraction result.
///
/// - 2xx with a `codes` array of strings: success (an empty array included).
/// - Anything else that parses as JSON: rejected with the `error` string if the
///   service sent one, else [`GENERIC_FAILURE`].
/// - 2xx whose body is not JSON: transport error.
/// - Non-2xx whose body is not JSON: rejected with a message naming the status.
pub fn interpret_response(response: &HttpResponse) -> Result<ExtractionResult, SubmissionError> {
    let success = (200..300).contains(&response.status);

    let body: Value = match serde_json::from_str(&response.body) {
        Ok(body) => body,
        Err(e) if success => {
            return Err(SubmissionError::Transport(format!(
                "malformed response body: {}",
                e
            )));
        }
        Err(_) => {
            return Err(SubmissionError::ServerRejected(format!(
                "Service responded with HTTP {}",
                response.status
            )));
        }
    };

    if success && let Some(codes) = parse_codes(&body) {
        return Ok(ExtractionResult::new(codes));
    }

    let message = body
        .get("error")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(GENERIC_FAILURE);

    Err(SubmissionError::ServerRejected(message.to_string()))
}

fn parse_codes(body: &Value) -> Option<Vec<String>> {
    body.get("codes")?
        .as_array()?
        .iter()
        .map(|code| code.as_str().map(str::to_string))
        .collect()
}
