//! Logging facade for the CSP collector.
//!
//! # Setup
//!
//! To enable logging, invoke the [`init`] function with a [`LogConfig`]. The configuration
//! implements `serde` traits, so it can be obtained from configuration files.
//!
//! ```ignore
//! use csp_log::{LogConfig, LogFormat};
//!
//! let log_config = LogConfig {
//!     format: LogFormat::Json,
//!     ..LogConfig::default()
//! };
//!
//! csp_log::init(&log_config);
//! ```
//!
//! # Logging
//!
//! The basic use is through the five logging macros: [`error!`], [`warn!`], [`info!`],
//! [`debug!`] and [`trace!`] where `error!` represents the highest-priority log messages and
//! `trace!` the lowest. Each of these macros accept format strings similarly to [`println!`] and
//! structured fields as defined by [`tracing`].
//!
//! ## Conventions
//!
//! Log messages should start lowercase and end without punctuation. Prefer short and precise log
//! messages over verbose text. Choose the log level according to these rules:
//!
//! - [`error!`] for bugs and invalid behavior.
//! - [`warn!`] for undesirable behavior, such as a client address that cannot be parsed.
//! - [`info!`] for messages relevant to the average user.
//! - [`debug!`] for messages usually relevant to debugging, such as rejected reports.
//! - [`trace!`] for full auxiliary information.
//!
//! Violation reports are not diagnostics. They are written at `INFO` level with the dedicated
//! [`REPORT_TARGET`] so that they stay visible independently of the configured log level.
//!
//! # Testing
//!
//! For unit testing, there is a separate initialization macro [`init_test!`] that should be called
//! at the beginning of test method. It enables test mode of the logger and customizes log levels
//! for the current crate.
//!
//! ```ignore
//! #[test]
//! fn test_something() {
//!     csp_log::init_test!();
//! }
//! ```

#![warn(missing_docs)]

#[cfg(feature = "init")]
mod setup;
#[cfg(feature = "init")]
pub use setup::*;

#[cfg(feature = "test")]
pub use test::*;

mod utils;
pub use utils::*;

// Expose the minimal log facade.
#[doc(inline)]
pub use tracing::{Level, debug, error, info, trace, warn};
pub use tracing::field;
pub use tracing::level_filters::LevelFilter;

/// The log target under which accepted violation reports are written.
pub const REPORT_TARGET: &str = "csp_report";
