//! Endpoints for legacy `report-uri` violation reports.

use axum::extract::State;
use axum::response::IntoResponse;
use bytes::Bytes;
use csp_schema::ReportFormat;

use crate::endpoints::common::{self, BadReportRequest};
use crate::extractors::RequestContext;
use crate::service::ServiceState;

/// Handles a single violation report.
pub async fn handle(
    State(state): State<ServiceState>,
    context: RequestContext,
    body: Bytes,
) -> Result<impl IntoResponse, BadReportRequest> {
    let format = ReportFormat::Legacy { report_only: false };
    common::handle_report(&state, &context, &body, format)
}

/// Handles a single violation report of a `Content-Security-Policy-Report-Only` policy.
pub async fn handle_report_only(
    State(state): State<ServiceState>,
    context: RequestContext,
    body: Bytes,
) -> Result<impl IntoResponse, BadReportRequest> {
    let format = ReportFormat::Legacy { report_only: true };
    common::handle_report(&state, &context, &body, format)
}
