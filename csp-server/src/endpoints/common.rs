//! Common facilities for the report endpoints.

use std::error::Error;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use csp_filter::ValidationError;
use csp_schema::{DecodeError, ReportFormat};

use crate::extractors::RequestContext;
use crate::service::ServiceState;

/// A report request that was rejected.
#[derive(Debug, thiserror::Error)]
pub enum BadReportRequest {
    /// The payload is not valid JSON of the expected format.
    #[error(transparent)]
    InvalidJson(#[from] DecodeError),

    /// A violation of the report failed validation.
    #[error(transparent)]
    InvalidReport(#[from] ValidationError),
}

impl IntoResponse for BadReportRequest {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidJson(_) => StatusCode::UNPROCESSABLE_ENTITY.into_response(),
            Self::InvalidReport(error) => (
                StatusCode::BAD_REQUEST,
                [(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                )],
                format!("{error}\n"),
            )
                .into_response(),
        }
    }
}

/// Runs a report payload through normalization, validation and emission.
///
/// Nothing is emitted unless every violation of the payload passes validation.
pub fn handle_report(
    state: &ServiceState,
    context: &RequestContext,
    payload: &[u8],
    format: ReportFormat,
) -> Result<(), BadReportRequest> {
    let records = csp_schema::normalize(payload, format).inspect_err(|error| {
        csp_log::debug!(
            error = error as &dyn Error,
            "unable to decode invalid JSON payload"
        );
    })?;

    csp_filter::validate(&records, state.blocklist()).inspect_err(|error| {
        csp_log::debug!(error = error as &dyn Error, "received invalid payload");
    })?;

    state.emitter().emit_all(records, context);
    Ok(())
}
