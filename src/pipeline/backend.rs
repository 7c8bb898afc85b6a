//! Backend transport: send one multipart upload, return the raw reply.
//!
//! [`ExtractionBackend`] is the seam between the workflow and the network.
//! [`HttpBackend`] is the production implementation; tests substitute an
//! in-process fake. Implementations must not interpret the reply — status
//! handling and body parsing belong to [`crate::pipeline::response`].

use crate::config::{OutputMode, WorkflowConfig};
use crate::error::WorkflowError;
use crate::pipeline::input::StagedFile;
use crate::pipeline::response::BackendReply;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use std::future::Future;
use tracing::debug;

/// Anything that can turn a staged PDF into a backend reply.
///
/// A non-2xx status is still `Ok`: only failures to obtain a reply at all
/// (connection refused, broken body stream) are `Err`.
pub trait ExtractionBackend: Send + Sync {
    fn upload(
        &self,
        file: &StagedFile,
        mode: OutputMode,
    ) -> impl Future<Output = Result<BackendReply, WorkflowError>> + Send;
}

/// Multipart-over-HTTP backend client.
///
/// Sends `POST <endpoint>` with form fields `file` (the PDF, as
/// `application/pdf`) and `output_format` (`markdown` or `excel`).
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, WorkflowError> {
        let endpoint = endpoint.into();
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| transport_error(&endpoint, e))?;
        Ok(Self { client, endpoint })
    }

    /// Client pointed at `config.endpoint`.
    pub fn from_config(config: &WorkflowConfig) -> Result<Self, WorkflowError> {
        Self::new(config.endpoint.clone())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ExtractionBackend for HttpBackend {
    async fn upload(
        &self,
        file: &StagedFile,
        mode: OutputMode,
    ) -> Result<BackendReply, WorkflowError> {
        let part = Part::bytes(file.bytes().to_vec())
            .file_name(file.name().to_string())
            .mime_str("application/pdf")
            .map_err(|e| transport_error(&self.endpoint, e))?;

        let form = Form::new()
            .part("file", part)
            .text("output_format", mode.wire_format());

        debug!(
            "POST {} ({} bytes, output_format={})",
            self.endpoint,
            file.len(),
            mode.wire_format()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(&self.endpoint, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&self.endpoint, e))?
            .to_vec();

        debug!(
            "Backend replied {} ({:?}, {} bytes)",
            status,
            content_type,
            body.len()
        );

        Ok(BackendReply {
            status,
            content_type,
            body,
        })
    }
}

fn transport_error(endpoint: &str, err: reqwest::Error) -> WorkflowError {
    WorkflowError::Transport {
        endpoint: endpoint.to_string(),
        reason: err.to_string(),
    }
}
