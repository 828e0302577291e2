//! Endpoints for batched Reporting API violation reports.

use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use bytes::Bytes;
use csp_schema::ReportFormat;

use crate::endpoints::common::{self, BadReportRequest};
use crate::extractors::RequestContext;
use crate::service::ServiceState;

/// Value of `Access-Control-Max-Age` on preflight responses, in seconds.
const PREFLIGHT_MAX_AGE: &str = "60";

/// Request headers that the preflight response depends on.
const PREFLIGHT_VARY: &str = "Origin, Access-Control-Request-Method, Access-Control-Request-Headers";

/// Handles a batch of reports. Envelopes other than CSP violations are ignored.
pub async fn handle(
    State(state): State<ServiceState>,
    context: RequestContext,
    body: Bytes,
) -> Result<impl IntoResponse, BadReportRequest> {
    common::handle_report(&state, &context, &body, ReportFormat::ReportingApi)
}

/// Answers the CORS preflight that browsers send before posting reports cross-origin.
///
/// The requested origin, method and headers are reflected back, each falling back to `*` when
/// the request does not carry it.
pub async fn preflight(headers: HeaderMap) -> impl IntoResponse {
    let reflect = |name: HeaderName| {
        headers
            .get(name)
            .filter(|value| !value.is_empty())
            .cloned()
            .unwrap_or(HeaderValue::from_static("*"))
    };

    (
        StatusCode::OK,
        [
            (
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                reflect(header::ORIGIN),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                reflect(header::ACCESS_CONTROL_REQUEST_METHOD),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                reflect(header::ACCESS_CONTROL_REQUEST_HEADERS),
            ),
            (
                header::ACCESS_CONTROL_MAX_AGE,
                HeaderValue::from_static(PREFLIGHT_MAX_AGE),
            ),
            (header::VARY, HeaderValue::from_static(PREFLIGHT_VARY)),
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain;charset=UTF-8"),
            ),
        ],
        "OK",
    )
}
