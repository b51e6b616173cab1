use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::batch::{BatchResult, Latency, StatusHistogram};

/// Descriptive fields a scenario attaches to its measurement.
///
/// Optional fields left unset are stored as NULL, never as `""` or `0`. An
/// empty string given to a `with_*` builder counts as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioMetadata {
    pub endpoint: String,
    pub description: String,
    pub data_schema: Option<String>,
    pub num_rows: Option<u64>,
    pub data_type: Option<String>,
    pub output_format: Option<String>,
    pub restrict_rules: Option<bool>,
    pub manifest_record_type: Option<String>,
    pub asset_view: Option<String>,
}

impl ScenarioMetadata {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_data_schema(mut self, value: impl Into<String>) -> Self {
        self.data_schema = non_empty(value);
        self
    }

    #[must_use]
    pub const fn with_num_rows(mut self, value: u64) -> Self {
        self.num_rows = Some(value);
        self
    }

    #[must_use]
    pub fn with_data_type(mut self, value: impl Into<String>) -> Self {
        self.data_type = non_empty(value);
        self
    }

    #[must_use]
    pub fn with_output_format(mut self, value: impl Into<String>) -> Self {
        self.output_format = non_empty(value);
        self
    }

    #[must_use]
    pub const fn with_restrict_rules(mut self, value: bool) -> Self {
        self.restrict_rules = Some(value);
        self
    }

    #[must_use]
    pub fn with_manifest_record_type(mut self, value: impl Into<String>) -> Self {
        self.manifest_record_type = non_empty(value);
        self
    }

    #[must_use]
    pub fn with_asset_view(mut self, value: impl Into<String>) -> Self {
        self.asset_view = non_empty(value);
        self
    }
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    Some(value.into()).filter(|text| !text.is_empty())
}

/// One persisted measurement: a batch plus its scenario metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    #[serde(flatten)]
    pub metadata: ScenarioMetadata,
    pub started_at: DateTime<FixedOffset>,
    pub concurrency: u64,
    pub latency: Latency,
    #[serde(flatten)]
    pub histogram: StatusHistogram,
}

impl ResultRow {
    #[must_use]
    pub fn from_batch(batch: &BatchResult, metadata: ScenarioMetadata) -> Self {
        Self {
            metadata,
            started_at: batch.started_at(),
            concurrency: u64::try_from(batch.concurrency().get()).unwrap_or(u64::MAX),
            latency: batch.elapsed(),
            histogram: *batch.histogram(),
        }
    }

    /// Start time in the `dd/mm/YYYY HH:MM:SS` form used on dashboards.
    #[must_use]
    pub fn display_start_time(&self) -> String {
        self.started_at.format("%d/%m/%Y %H:%M:%S").to_string()
    }
}
