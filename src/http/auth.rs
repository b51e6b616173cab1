use std::fmt;
use std::sync::Arc;

use reqwest::header::HeaderValue;
use tracing::warn;

use crate::error::{AppError, AppResult, HttpError};

/// Environment variables checked for the access token, in order.
pub(crate) const TOKEN_ENV_VARS: [&str; 2] = ["SYNAPSE_ACCESS_TOKEN", "TOKEN"];

/// Access token sent as `Authorization: Bearer <token>`.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(Arc<str>);

impl BearerToken {
    /// # Errors
    ///
    /// Returns an error when the token cannot be carried in an HTTP header.
    pub fn new(token: &str) -> AppResult<Self> {
        let token = token.trim();
        HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|err| AppError::http(HttpError::InvalidToken { source: err }))?;
        Ok(Self(Arc::from(token)))
    }

    /// Looks the token up in `SYNAPSE_ACCESS_TOKEN`, then `TOKEN`.
    ///
    /// A missing or blank token is not fatal: authenticated scenarios are sent
    /// without the header and the API answers for itself.
    ///
    /// # Errors
    ///
    /// Returns an error when a token is present but not a valid header value.
    pub fn from_env() -> AppResult<Option<Self>> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> AppResult<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let found = TOKEN_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty());
        found.map_or_else(
            || {
                warn!(
                    "No access token found in {}; authenticated calls go out without one.",
                    TOKEN_ENV_VARS.join(" or ")
                );
                Ok(None)
            },
            |value| Self::new(&value).map(Some),
        )
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}
