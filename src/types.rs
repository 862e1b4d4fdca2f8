use crate::filter::MalformedPolicy;
use serde::{Deserialize, Serialize};

/// Query parameters for `POST /filter/:id`
#[derive(Debug, Deserialize, Default)]
pub struct FilterQuery {
    pub on_malformed: Option<MalformedPolicy>,
    pub check_sorted: Option<bool>,
}

/// Filtering strategies a dataset can be served with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Uncompressed VCF, streaming merge-join
    Plain,
    /// BGZF VCF with tabix index, per-region queries
    Indexed,
}

/// Service info response
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub varsieve: Capabilities,
}

#[derive(Debug, Serialize)]
pub struct Capabilities {
    pub strategies: Vec<Strategy>,
    #[serde(rename = "outputSuffix")]
    pub output_suffix: String,
    #[serde(rename = "maxPayload")]
    pub max_payload: usize,
    #[serde(rename = "regionTimeoutSecs")]
    pub region_timeout_secs: Option<u64>,
    #[serde(rename = "queryConcurrency")]
    pub query_concurrency: usize,
}
