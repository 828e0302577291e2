//! Web server endpoints.
//!
//! | Route                | Method  | Format                  |
//! |----------------------|---------|-------------------------|
//! | `/csp`               | POST    | legacy `report-uri`     |
//! | `/csp/report-only`   | POST    | legacy, report-only     |
//! | `/reporting-api/csp` | POST    | Reporting API batch     |
//! | `/reporting-api/csp` | OPTIONS | CORS preflight          |
//! | health check path    | GET     | none                    |
//! | any other path       | POST    | legacy `report-uri`     |

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use csp_config::Config;

use crate::service::ServiceState;

mod common;
mod csp_report;
mod health_check;
mod reporting_api;

/// Builds the router with all report endpoints.
pub fn routes(config: &Config) -> Router<ServiceState> {
    // Legacy reports are accepted on any path, so the report URI can carry information in its
    // path that ends up in the logged `path` field.
    Router::new()
        .route(config.health_check_path(), get(health_check::handle))
        .route("/csp/report-only", post(csp_report::handle_report_only))
        .route(
            "/reporting-api/csp",
            post(reporting_api::handle).options(reporting_api::preflight),
        )
        .route("/csp", post(csp_report::handle))
        .route("/", post(csp_report::handle))
        .route("/{*path}", post(csp_report::handle))
        .layer(DefaultBodyLimit::max(config.max_payload_size()))
}
