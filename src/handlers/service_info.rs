use super::AppState;
use crate::sink::OUTPUT_SUFFIX;
use crate::types::{Capabilities, ServiceInfo, Strategy};
use axum::{Json, extract::State};

pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        id: "org.example.varsieve".to_string(),
        name: "varsieve".to_string(),
        description: Some("VCF filtering against genomic interval lists".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        varsieve: Capabilities {
            strategies: vec![Strategy::Plain, Strategy::Indexed],
            output_suffix: OUTPUT_SUFFIX.to_string(),
            max_payload: state.max_payload,
            region_timeout_secs: state.options.region_timeout.map(|t| t.as_secs()),
            query_concurrency: state.options.query_concurrency,
        },
    })
}
