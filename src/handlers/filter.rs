use super::AppState;
use crate::filter::filter_input;
use crate::intervals::IntervalList;
use crate::sink::{ResultSink, output_name};
use crate::types::FilterQuery;
use crate::{Error, Result};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use std::sync::Arc;

pub const EMITTED_HEADER: &str = "x-varsieve-emitted";
pub const WARNINGS_HEADER: &str = "x-varsieve-warnings";

/// Filter dataset `id` against the interval list in the request body and
/// return the result as a download.
pub async fn post_filter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<FilterQuery>,
    body: Bytes,
) -> Result<Response> {
    let input = state.storage.resolve(&id).await?;

    let mut options = state.options.clone();
    if let Some(policy) = query.on_malformed {
        options.on_malformed = policy;
    }
    if let Some(check_sorted) = query.check_sorted {
        options.check_sorted = check_sorted;
    }

    let text = std::str::from_utf8(&body)
        .map_err(|e| Error::InvalidInput(format!("interval list is not UTF-8: {}", e)))?;
    let intervals = Arc::new(IntervalList::parse(text));
    tracing::info!(
        id = %id,
        indexed = input.is_indexed(),
        intervals = intervals.len(),
        "filter request"
    );

    // Dropping this future (client gone) aborts outstanding region queries.
    let sink = ResultSink::with_limit(Vec::new(), state.max_payload as u64);
    let (report, sink) = filter_input(&input, intervals, &options, None, sink).await?;
    let bytes = sink.finish()?;

    for warning in &report.warnings {
        tracing::warn!(id = %id, %warning, "filter warning");
    }

    let name = output_name(&input.display_name());
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", name),
        )
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(EMITTED_HEADER, report.emitted)
        .header(WARNINGS_HEADER, report.warnings.len())
        .body(Body::from(bytes))
        .map_err(|e| Error::Internal(format!("failed to build response: {}", e)))
}
