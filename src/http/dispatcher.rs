use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, multipart};
use tracing::debug;

use crate::error::{AppError, AppResult, HttpError};

use super::spec::{CallKind, MANIFEST_FIELD, RequestSpec};

/// Issues one call for a spec and reports the HTTP status.
///
/// Any status, 5xx included, is a successful dispatch. Only failures to get a
/// response at all are errors. Implementations never retry.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// # Errors
    ///
    /// Returns [`HttpError::Transport`] when no response could be obtained and
    /// [`HttpError::ReadManifest`] when the attached file cannot be read.
    async fn dispatch(&self, spec: &RequestSpec) -> AppResult<u16>;
}

/// Dispatcher backed by a caller-supplied `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestDispatcher {
    client: Client,
}

impl ReqwestDispatcher {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Dispatch for ReqwestDispatcher {
    async fn dispatch(&self, spec: &RequestSpec) -> AppResult<u16> {
        let mut request = match spec.kind() {
            CallKind::Get => self.client.get(spec.url()),
            CallKind::PostManifest { path } => {
                let form = manifest_form(path).await?;
                self.client.post(spec.url()).multipart(form)
            }
        };
        request = request.query(&spec.query_pairs());
        if let Some(token) = spec.bearer() {
            request = request.bearer_auth(token.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|err| transport_error(spec.url(), err))?;
        let status = response.status().as_u16();
        let bytes = drain_response_body(response)
            .await
            .map_err(|err| transport_error(spec.url(), err))?;
        debug!(url = spec.url(), status, bytes, "Dispatch completed");
        Ok(status)
    }
}

fn transport_error(url: &str, source: reqwest::Error) -> AppError {
    AppError::http(HttpError::Transport {
        url: url.to_owned(),
        source,
    })
}

/// Reads the manifest into a fresh multipart form. The file handle lives only
/// for the duration of the read.
async fn manifest_form(path: &Path) -> AppResult<multipart::Form> {
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        AppError::http(HttpError::ReadManifest {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    let file_name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("manifest.csv")
        .to_owned();
    let part = multipart::Part::bytes(bytes).file_name(file_name);
    Ok(multipart::Form::new().part(MANIFEST_FIELD, part))
}

async fn drain_response_body(response: reqwest::Response) -> Result<u64, reqwest::Error> {
    let mut stream = response.bytes_stream();
    let mut total_bytes: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        total_bytes = total_bytes.saturating_add(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
    }
    Ok(total_bytes)
}
