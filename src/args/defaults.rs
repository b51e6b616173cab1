use std::path::PathBuf;

use super::StoreKind;

pub(crate) const DEFAULT_USER_AGENT: &str = concat!("apimon/", env!("CARGO_PKG_VERSION"));

/// Deployment the monitor targets when no base URL is configured.
pub(crate) const DEFAULT_BASE_URL: &str = "https://schematic-dev.api.sagebionetworks.org/v1";

pub(crate) const DEFAULT_MANIFEST_DIR: &str = "test_manifests";

pub(crate) const DEFAULT_SUBMIT_PAUSE: &str = "2s";

/// Results file used when `--store-path` is not given.
pub(crate) fn default_store_path(kind: StoreKind) -> PathBuf {
    match kind {
        StoreKind::Sqlite => PathBuf::from("latency.db"),
        StoreKind::Csv => PathBuf::from("latency.csv"),
    }
}
