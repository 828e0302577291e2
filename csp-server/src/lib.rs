//! The HTTP server of the CSP report collector.
//!
//! Browsers post violation reports to the endpoints in [`endpoints`]. Each request runs through
//! the same pipeline:
//!
//!  1. The payload is decoded and normalized into violation records, using the format of the
//!     endpoint it was posted to.
//!  2. All records are validated against the [`Blocklist`](csp_filter::Blocklist). A single
//!     failing record rejects the entire request.
//!  3. Every record is written to the [`ReportSink`] of the [`ReportEmitter`], together with the
//!     request path, metadata from the query string and optionally the client address.
//!
//! The server is started with [`HttpServer`]. For tests, [`make_app`] builds the same router
//! without binding a socket.
#![warn(missing_docs)]

mod constants;
mod endpoints;
mod middlewares;
mod service;

pub mod extractors;
pub mod services;

pub use self::extractors::{AddressParseError, RequestContext};
pub use self::service::*;
pub use self::services::emitter::*;
pub use self::services::server::*;

use std::sync::Arc;

use csp_config::Config;
use csp_filter::Blocklist;

/// Runs the collector with reports logged through [`TracingSink`] until it is shut down.
///
/// This starts a multi-threaded tokio runtime and blocks the current thread until the server
/// stops after `SIGINT` or `SIGTERM`.
pub fn run(config: Config, blocklist: Blocklist) -> Result<(), ServerError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("csp-worker")
        .enable_all()
        .build()
        .map_err(ServerError::RuntimeFailed)?;

    let state = ServiceState::new(Arc::new(config), blocklist, Arc::new(TracingSink));

    runtime.block_on(async move {
        let server = HttpServer::new(state)?;
        server.run().await
    })
}
