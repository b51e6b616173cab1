use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::auth::BearerToken;

/// Multipart field the manifest upload endpoints read the file from.
pub const MANIFEST_FIELD: &str = "file_name";

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Flag(bool),
    List(Vec<String>),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallKind {
    Get,
    /// POST with the manifest at `path` attached as multipart form data.
    PostManifest { path: PathBuf },
}

/// Immutable description of one logical call. Shared read-only by every
/// dispatch of a batch.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    url: String,
    params: BTreeMap<String, ParamValue>,
    kind: CallKind,
    bearer: Option<BearerToken>,
}

impl RequestSpec {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url.into(), CallKind::Get)
    }

    #[must_use]
    pub fn post_manifest(url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(url.into(), CallKind::PostManifest { path: path.into() })
    }

    const fn new(url: String, kind: CallKind) -> Self {
        Self {
            url,
            params: BTreeMap::new(),
            kind,
            bearer: None,
        }
    }

    /// Sets `key`, replacing any earlier value for it.
    #[must_use]
    pub fn with_param(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn with_bearer(mut self, token: Option<BearerToken>) -> Self {
        self.bearer = token;
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub const fn kind(&self) -> &CallKind {
        &self.kind
    }

    #[must_use]
    pub fn manifest_path(&self) -> Option<&Path> {
        match &self.kind {
            CallKind::Get => None,
            CallKind::PostManifest { path } => Some(path.as_path()),
        }
    }

    #[must_use]
    pub const fn bearer(&self) -> Option<&BearerToken> {
        self.bearer.as_ref()
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Flattens the parameters into query pairs.
    ///
    /// Flags are sent as `True`/`False`, which is what the API's query parser
    /// has always received. Lists repeat the key once per value.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.params.len());
        for (key, value) in &self.params {
            match value {
                ParamValue::Text(text) => pairs.push((key.clone(), text.clone())),
                ParamValue::Flag(flag) => pairs.push((key.clone(), flag_text(*flag).to_owned())),
                ParamValue::List(items) => {
                    pairs.extend(items.iter().map(|item| (key.clone(), item.clone())));
                }
            }
        }
        pairs
    }
}

/// Capitalized boolean the API expects in query strings and reports.
pub(crate) const fn flag_text(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}
