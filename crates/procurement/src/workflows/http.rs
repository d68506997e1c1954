//! Helpers shared by the workflow routers: caller headers, blocking dispatch and
//! base64 document payloads.

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::documents::{DocumentKind, DocumentUpload};
use super::error::{BiddingError, ValidationError};
use super::identity::{Caller, Role};

pub const CALLER_ID_HEADER: &str = "x-caller-id";
pub const CALLER_ROLE_HEADER: &str = "x-caller-role";

fn header_value(headers: &HeaderMap, name: &str) -> Result<String, BiddingError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| BiddingError::Forbidden(format!("missing {name} header")))
}

/// Resolve the caller asserted by the session gateway.
pub(crate) fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, BiddingError> {
    let id = header_value(headers, CALLER_ID_HEADER)?;
    let role: Role = header_value(headers, CALLER_ROLE_HEADER)?.parse()?;
    Ok(Caller { id, role })
}

/// Resolve the caller, then run the engine call on the blocking pool.
pub(crate) async fn with_caller<T, F>(headers: &HeaderMap, task: F) -> Result<T, BiddingError>
where
    T: Send + 'static,
    F: FnOnce(Caller) -> Result<T, BiddingError> + Send + 'static,
{
    let caller = caller_from_headers(headers)?;
    tokio::task::spawn_blocking(move || task(caller))
        .await
        .map_err(|err| BiddingError::Internal(format!("engine task failed: {err}")))?
}

pub(crate) fn respond<T: Serialize>(
    status: StatusCode,
    result: Result<T, BiddingError>,
) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// File content as carried in JSON request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPayload {
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub content_base64: String,
}

impl DocumentPayload {
    pub fn encode(file_name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            content_base64: STANDARD.encode(bytes),
        }
    }

    /// Decode the content; a missing content type is guessed from the file name.
    pub fn decode(self, kind: DocumentKind) -> Result<DocumentUpload, ValidationError> {
        let bytes = STANDARD
            .decode(self.content_base64.trim())
            .map_err(|_| ValidationError::InvalidEncoding(kind))?;
        let content_type = self
            .content_type
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&self.file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });
        Ok(DocumentUpload::new(self.file_name, content_type, bytes))
    }
}

pub(crate) fn decode_optional(
    payload: Option<DocumentPayload>,
    kind: DocumentKind,
) -> Result<Option<DocumentUpload>, ValidationError> {
    payload.map(|payload| payload.decode(kind)).transpose()
}
