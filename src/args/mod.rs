//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;
mod types;

#[cfg(test)]
mod test_support;

pub use cli::{ApimonArgs, Command, ListArgs, RowsArgs, RunArgs, StoreArgs};
pub use types::{OutputFormat, PositiveUsize, StoreKind};

pub(crate) use defaults::{DEFAULT_BASE_URL, DEFAULT_MANIFEST_DIR, DEFAULT_USER_AGENT};
#[cfg(test)]
pub(crate) use test_support::parse_test_args;
