//! Configuration for the CSP report collector.
//!
//! The configuration is loaded from `config.yml` in a config folder. All values are optional and
//! fall back to defaults, so the collector runs without any configuration at all. Individual
//! values can be overridden from the command line or the environment with [`OverridableConfig`].
//!
//! ```yaml
//! http:
//!   host: 0.0.0.0
//!   port: 8080
//!   health_check_path: /_healthcheck
//! reports:
//!   filter_file: blocklist.txt
//!   truncate_query_fragment: true
//!   client_ip: truncated
//! logging:
//!   level: info
//!   format: json
//! ```
#![warn(missing_docs)]

mod config;

pub use self::config::*;
