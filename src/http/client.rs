use std::time::Duration;

use reqwest::Client;
use tracing::error;

use crate::args::DEFAULT_USER_AGENT;
use crate::error::{AppError, AppResult, HttpError};

/// Builds the one client shared by every dispatch of a run.
///
/// Without `timeout` a hung call blocks its batch indefinitely.
///
/// # Errors
///
/// Returns an error when the TLS backend cannot be initialized.
pub fn build_client(timeout: Option<Duration>) -> AppResult<Client> {
    let mut builder = Client::builder().user_agent(DEFAULT_USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(|err| {
        error!("Failed to build HTTP client: {}", err);
        AppError::http(HttpError::BuildClientFailed { source: err })
    })
}
