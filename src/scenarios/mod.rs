//! Scenario catalog and the suite orchestration that drives it.
mod catalog;
mod run;


pub use catalog::{CatalogContext, Scenario, SchemaUrls, Suite, suite_scenarios};
pub use run::{Monitor, ScenarioFailure, SuiteReport};
