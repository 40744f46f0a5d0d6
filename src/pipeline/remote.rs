//! Remote conversion service client.
//!
//! Document kinds can be delegated to an HTTP service instead of being
//! converted locally. The service takes a `multipart/form-data` POST with a
//! `file` part and a `type` field carrying the kind's wire tag, and answers
//! with the converted bytes on 2xx or a JSON `{"error": "..."}` body
//! otherwise.
//!
//! The pipeline only sees the [`RemoteConverter`] trait, so tests and
//! embedders can substitute any backend.

use crate::error::ConvertError;
use crate::format::{extension_of, mime_type, ConversionKind, OCTET_STREAM};
use futures::future::BoxFuture;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// External conversion capability.
pub trait RemoteConverter: Send + Sync {
    /// Convert `bytes` (originally named `file_name`) according to `kind`.
    fn convert_document(
        &self,
        bytes: Arc<[u8]>,
        file_name: String,
        kind: ConversionKind,
    ) -> BoxFuture<'_, Result<Vec<u8>, ConvertError>>;
}

/// [`RemoteConverter`] that POSTs to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpRemoteConverter {
    client: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpRemoteConverter {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, ConvertError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ConvertError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(
        &self,
        bytes: Arc<[u8]>,
        file_name: String,
        kind: ConversionKind,
    ) -> Result<Vec<u8>, ConvertError> {
        info!("Delegating {} of '{}' to {}", kind, file_name, self.endpoint);

        let mime = extension_of(&file_name)
            .map(|ext| mime_type(&ext))
            .unwrap_or(OCTET_STREAM);
        let part = Part::bytes(bytes.to_vec())
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| ConvertError::Unknown(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("type", kind.wire_tag());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("unexpected response")
                        .to_string()
                });
            return Err(ConvertError::RemoteConversion {
                status: Some(status.as_u16()),
                detail,
            });
        }

        debug!("Remote returned {} bytes", body.len());
        Ok(body.to_vec())
    }

    fn transport_error(&self, e: reqwest::Error) -> ConvertError {
        if e.is_timeout() {
            ConvertError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            ConvertError::RemoteConversion {
                status: e.status().map(|s| s.as_u16()),
                detail: e.to_string(),
            }
        }
    }
}

impl RemoteConverter for HttpRemoteConverter {
    fn convert_document(
        &self,
        bytes: Arc<[u8]>,
        file_name: String,
        kind: ConversionKind,
    ) -> BoxFuture<'_, Result<Vec<u8>, ConvertError>> {
        Box::pin(self.post(bytes, file_name, kind))
    }
}
