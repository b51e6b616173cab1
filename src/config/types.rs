use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::args::parsers::parse_duration;
use crate::args::{OutputFormat, StoreKind};
use crate::error::ValidationError;
use crate::scenarios::{SchemaUrls, Suite};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub concurrency: Option<usize>,
    pub suites: Option<Vec<Suite>>,
    pub manifest_dir: Option<PathBuf>,
    pub timeout: Option<DurationValue>,
    pub submit_pause: Option<DurationValue>,
    pub output: Option<OutputFormat>,
    pub store: Option<StoreConfig>,
    pub schemas: Option<SchemaUrls>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub kind: Option<StoreKind>,
    pub path: Option<PathBuf>,
}

/// Either whole seconds or a string with a unit suffix (`500ms`, `2m`).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => parse_duration(text),
        }
    }
}
