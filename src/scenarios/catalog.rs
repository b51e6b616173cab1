use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::http::{BearerToken, RequestSpec, flag_text};
use crate::store::ScenarioMetadata;

const PATIENT_MANIFEST: &str = "synapse_storage_manifest_patient.csv";
const HTAN_HMS_MANIFEST: &str = "synapse_storage_manifest_HTAN_HMS.csv";
const DATA_FLOW_MANIFEST: &str = "synapse_storage_manifest_dataflow.csv";

const EXAMPLE_SCHEMA: &str = "example data schema";
const HTAN_SCHEMA: &str = "HTAN data schema";
const DATA_FLOW_SCHEMA: &str = "Data flow schema";

const EXISTING_DATASET: &str = "syn51078367";
const EXAMPLE_ASSET_VIEW: &str = "syn23643253";
const SUBMIT_DATASET: &str = "syn51376664";
const SUBMIT_ASSET_VIEW: &str = "syn51376649";

/// Endpoint family monitored as one unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Suite {
    Generate,
    Validate,
    Submit,
    Storage,
}

impl Suite {
    pub const ALL: [Self; 4] = [Self::Generate, Self::Validate, Self::Submit, Self::Storage];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Suite::Generate => "generate",
            Suite::Validate => "validate",
            Suite::Submit => "submit",
            Suite::Storage => "storage",
        }
    }
}

/// Data model locations the generate/validate/submit suites point the API at.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaUrls {
    pub example: String,
    pub htan: String,
    pub data_flow: String,
}

impl Default for SchemaUrls {
    fn default() -> Self {
        Self {
            example: "https://raw.githubusercontent.com/Sage-Bionetworks/schematic/develop/tests/data/example.model.jsonld".to_owned(),
            htan: "https://raw.githubusercontent.com/ncihtan/data-models/main/HTAN.model.jsonld"
                .to_owned(),
            data_flow: "https://raw.githubusercontent.com/Sage-Bionetworks/data_flow/main/inst/data_flow_component.jsonld".to_owned(),
        }
    }
}

/// Everything the catalog needs to turn scenario templates into requests.
#[derive(Debug, Clone)]
pub struct CatalogContext {
    pub base_url: String,
    pub manifest_dir: PathBuf,
    pub schemas: SchemaUrls,
    pub token: Option<BearerToken>,
    pub submit_pause: Duration,
}

impl CatalogContext {
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn manifest(&self, file: &str) -> PathBuf {
        self.manifest_dir.join(file)
    }
}

/// One named call measured per run: the request to repeat and the metadata
/// recorded with its row.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub suite: Suite,
    pub name: &'static str,
    pub spec: Arc<RequestSpec>,
    pub metadata: ScenarioMetadata,
    pub pause_after: Option<Duration>,
    /// Sends the access token when one is configured.
    pub authenticated: bool,
}

impl Scenario {
    fn new(suite: Suite, name: &'static str, spec: RequestSpec, metadata: ScenarioMetadata) -> Self {
        Self {
            suite,
            name,
            spec: Arc::new(spec),
            metadata,
            pause_after: None,
            authenticated: false,
        }
    }

    const fn requiring_auth(mut self) -> Self {
        self.authenticated = true;
        self
    }

    const fn pausing(mut self, pause: Duration) -> Self {
        self.pause_after = Some(pause);
        self
    }
}

/// Scenarios of `suite` in the order they are run.
#[must_use]
pub fn suite_scenarios(suite: Suite, ctx: &CatalogContext) -> Vec<Scenario> {
    match suite {
        Suite::Generate => generate(ctx),
        Suite::Validate => validate(ctx),
        Suite::Submit => submit(ctx),
        Suite::Storage => storage(ctx),
    }
}

fn generate(ctx: &CatalogContext) -> Vec<Scenario> {
    const ENDPOINT: &str = "manifest/generate";
    let base = |schema_url: &str| {
        RequestSpec::get(ctx.url(ENDPOINT))
            .with_param("schema_url", schema_url)
            .with_param("title", "example")
            .with_param("data_type", "Patient")
            .with_param("use_annotations", false)
    };
    let meta = |description: &str, schema: &str, output: &str| {
        ScenarioMetadata::new(ENDPOINT, description)
            .with_data_schema(schema)
            .with_data_type("Patient")
            .with_output_format(output)
    };

    vec![
        Scenario::new(
            Suite::Generate,
            "example-google-sheet",
            base(&ctx.schemas.example),
            meta(
                "Generating a manifest as a google sheet by using the example data model",
                EXAMPLE_SCHEMA,
                "google sheet",
            ),
        ),
        Scenario::new(
            Suite::Generate,
            "example-excel",
            base(&ctx.schemas.example).with_param("output", "excel"),
            meta(
                "Generating a manifest as an excel spreadsheet by using the example data model",
                EXAMPLE_SCHEMA,
                "excel",
            ),
        ),
        Scenario::new(
            Suite::Generate,
            "existing-manifest-google-sheet",
            base(&ctx.schemas.example)
                .with_param("dataset_id", EXISTING_DATASET)
                .with_param("asset_view", EXAMPLE_ASSET_VIEW)
                .with_bearer(ctx.token.clone()),
            meta(
                "Generating an existing manifest as a google sheet by using the example data model",
                EXAMPLE_SCHEMA,
                "google sheet",
            )
            .with_num_rows(542),
        )
        .requiring_auth(),
        Scenario::new(
            Suite::Generate,
            "htan-google-sheet",
            base(&ctx.schemas.htan),
            meta(
                "Generating a manifest as a google spreadsheet by using the HTAN data model",
                HTAN_SCHEMA,
                "google sheet",
            ),
        ),
    ]
}

fn validate(ctx: &CatalogContext) -> Vec<Scenario> {
    const ENDPOINT: &str = "model/validate";
    let patient = |restrict_rules: bool, name: &'static str| {
        Scenario::new(
            Suite::Validate,
            name,
            RequestSpec::post_manifest(ctx.url(ENDPOINT), ctx.manifest(PATIENT_MANIFEST))
                .with_param("schema_url", ctx.schemas.example.as_str())
                .with_param("data_type", "Patient")
                .with_param("restrict_rules", restrict_rules),
            ScenarioMetadata::new(
                ENDPOINT,
                format!(
                    "Validate an example data model using the patient component with restrict_rules set to {}. The manifest has 600 rows.",
                    flag_text(restrict_rules)
                ),
            )
            .with_data_schema(EXAMPLE_SCHEMA)
            .with_num_rows(600)
            .with_data_type("Patient")
            .with_restrict_rules(restrict_rules),
        )
    };

    vec![
        patient(true, "patient-restrict-rules-true"),
        patient(false, "patient-restrict-rules-false"),
        Scenario::new(
            Suite::Validate,
            "htan-biospecimen",
            RequestSpec::post_manifest(ctx.url(ENDPOINT), ctx.manifest(HTAN_HMS_MANIFEST))
                .with_param("schema_url", ctx.schemas.htan.as_str())
                .with_param("data_type", "Biospecimen"),
            ScenarioMetadata::new(
                ENDPOINT,
                "Validate a HTAN data model using the biospecimen component with restrict_rules set to False. The manifest has around 700 rows.",
            )
            .with_data_schema(HTAN_SCHEMA)
            .with_num_rows(773)
            .with_data_type("Biospecimen")
            .with_restrict_rules(false),
        ),
    ]
}

fn submit(ctx: &CatalogContext) -> Vec<Scenario> {
    const ENDPOINT: &str = "model/submit";
    let submission = |name: &'static str,
                      schema_url: &str,
                      manifest: &str,
                      record_type: &str,
                      description: &str,
                      schema: &str,
                      rows: u64| {
        let spec = RequestSpec::post_manifest(ctx.url(ENDPOINT), ctx.manifest(manifest))
            .with_param("schema_url", schema_url)
            .with_param("dataset_id", SUBMIT_DATASET)
            .with_param("asset_view", SUBMIT_ASSET_VIEW)
            .with_param("restrict_rules", false)
            .with_param("use_schema_label", true)
            .with_param("data_model_labels", "class_label")
            .with_param("table_manipulation", "replace")
            .with_param("manifest_record_type", record_type)
            .with_bearer(ctx.token.clone());
        let metadata = ScenarioMetadata::new(
            ENDPOINT,
            format!(
                "{} {} with validation set to False. The manifest has {} rows.",
                description, record_type, rows
            ),
        )
        .with_data_schema(schema)
        .with_num_rows(rows)
        .with_restrict_rules(false)
        .with_manifest_record_type(record_type);
        Scenario::new(Suite::Submit, name, spec, metadata)
            .pausing(ctx.submit_pause)
            .requiring_auth()
    };

    let example = "Submitting an example manifest as";
    vec![
        submission(
            "example-table-and-file",
            &ctx.schemas.example,
            PATIENT_MANIFEST,
            "table_and_file",
            example,
            EXAMPLE_SCHEMA,
            600,
        ),
        submission(
            "example-file-only",
            &ctx.schemas.example,
            PATIENT_MANIFEST,
            "file_only",
            example,
            EXAMPLE_SCHEMA,
            600,
        ),
        submission(
            "dataflow-file-only",
            &ctx.schemas.data_flow,
            DATA_FLOW_MANIFEST,
            "file_only",
            "Submitting a dataflow manifest for HTAN as",
            DATA_FLOW_SCHEMA,
            30,
        ),
    ]
}

fn storage(ctx: &CatalogContext) -> Vec<Scenario> {
    const TABLES: &str = "storage/assets/tables";
    const DATASETS: &str = "storage/project/datasets";
    let project_datasets = |name: &'static str, project_id: &str, asset_view: &str| {
        Scenario::new(
            Suite::Storage,
            name,
            RequestSpec::get(ctx.url(DATASETS))
                .with_param("asset_view", asset_view)
                .with_param("project_id", project_id)
                .with_bearer(ctx.token.clone()),
            ScenarioMetadata::new(
                DATASETS,
                format!(
                    "Retrieve all datasets under project {} in asset view {} as a json",
                    project_id, asset_view
                ),
            )
            .with_asset_view(asset_view),
        )
        .requiring_auth()
    };

    vec![
        Scenario::new(
            Suite::Storage,
            "asset-view-json",
            RequestSpec::get(ctx.url(TABLES))
                .with_param("asset_view", EXAMPLE_ASSET_VIEW)
                .with_param("return_type", "json")
                .with_bearer(ctx.token.clone()),
            ScenarioMetadata::new(
                TABLES,
                format!("Retrieve asset view {} as a json", EXAMPLE_ASSET_VIEW),
            )
            .with_asset_view(EXAMPLE_ASSET_VIEW),
        )
        .requiring_auth(),
        project_datasets("project-datasets-example", "syn26251192", EXAMPLE_ASSET_VIEW),
        project_datasets("project-datasets-htan", "syn32596076", "syn20446927"),
    ]
}
