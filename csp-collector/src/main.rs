//! Collector for Content Security Policy violation reports.
//!
//! Browsers send a report to the collector whenever a page violates its Content Security Policy.
//! The collector accepts both the legacy `application/csp-report` format and batches from the
//! Reporting API, drops reports for resources that are known to be noise (browser extensions,
//! injected scripts) and writes every remaining violation as one structured log line.
//!
//! # Usage
//!
//! ```text
//! csp-collector run --port 8080 --filter-file blocklist.txt --json
//! ```
//!
//! Configuration can also be read from a `config.yml` in a folder passed with `--config`. Flags
//! and `CSP_COLLECTOR_*` environment variables take precedence over the file.
//!
//! # Workspace Crates
//!
//!  - `csp-collector`: Main entry point and command line interface.
//!  - [`csp-config`]: Static configuration for the CLI and server.
//!  - [`csp-filter`]: Blocklist and validation of violation reports.
//!  - [`csp-log`]: Logging setup and report output.
//!  - [`csp-schema`]: Report payloads and their normalized form.
//!  - [`csp-server`]: Endpoints and the HTTP server.
//!
//! [`csp-config`]: ../csp_config/index.html
//! [`csp-filter`]: ../csp_filter/index.html
//! [`csp-log`]: ../csp_log/index.html
//! [`csp-schema`]: ../csp_schema/index.html
//! [`csp-server`]: ../csp_server/index.html

mod cli;
mod cliapp;
mod healthcheck;
mod setup;

use std::process;

pub fn main() {
    let exit_code = match cli::execute() {
        Ok(()) => 0,
        Err(err) => {
            csp_log::ensure_error(&err);
            1
        }
    };

    process::exit(exit_code);
}
