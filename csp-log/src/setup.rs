use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::REPORT_TARGET;

/// Crates of the collector that log at the configured level.
const WORKSPACE_CRATES: &[&str] = &[
    "csp_collector",
    "csp_config",
    "csp_filter",
    "csp_log",
    "csp_schema",
    "csp_server",
];

/// Third-party crates that are too chatty on `INFO` and below.
const NOISY_CRATES: &[&str] = &["hyper", "hyper_util", "h2", "reqwest"];

/// Controls the log format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    ///
    /// ```text
    ///  INFO csp_collector::setup: collector listening on 0.0.0.0:8080
    /// ```
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2024-12-04T12:10:32.123Z  INFO csp_report: document_uri=http://example.com ...
    /// ```
    Simplified,

    /// Dump out JSON lines.
    ///
    /// ```text
    /// {"timestamp":"2024-12-04T12:11:08.729716Z","level":"INFO","document_uri":"http://example.com","target":"csp_report"}
    /// ```
    Json,
}

/// Controls the logging system.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// The log level for the collector.
    #[serde(with = "level_serde")]
    pub level: LevelFilter,

    /// Controls the log output format.
    ///
    /// Defaults to [`LogFormat::Auto`], which detects the best format based on the TTY.
    pub format: LogFormat,

    /// When set to `true`, backtraces are forced on.
    ///
    /// Otherwise, backtraces can be enabled by setting the `RUST_BACKTRACE` variable to `full`.
    pub enable_backtraces: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
            enable_backtraces: false,
        }
    }
}

/// Builds the filter directives used when `RUST_LOG` is not set.
///
/// The configured level applies to the collector's own crates, all other crates log at `INFO`.
/// Violation reports are always let through at `INFO`, regardless of the configured level.
fn default_directives(level: LevelFilter) -> String {
    let mut directives = vec!["info".to_owned()];
    for name in WORKSPACE_CRATES {
        directives.push(format!("{name}={level}"));
    }
    directives.push(format!("{REPORT_TARGET}=info"));
    for name in NOISY_CRATES {
        directives.push(format!("{name}=warn"));
    }

    directives.join(",")
}

/// Initialize the logging system.
///
/// Must be called before any threads are spawned, since it may modify the process environment.
///
/// # Example
///
/// ```ignore
/// let log_config = csp_log::LogConfig {
///     format: csp_log::LogFormat::Json,
///     ..Default::default()
/// };
///
/// csp_log::init(&log_config);
/// ```
pub fn init(config: &LogConfig) {
    if config.enable_backtraces {
        // SAFETY: called once during startup, before the runtime spawns worker threads.
        unsafe { std::env::set_var("RUST_BACKTRACE", "full") };
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.level)));

    let subscriber = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let format = match (config.format, console::user_attended()) {
        (LogFormat::Auto, true) | (LogFormat::Pretty, _) => {
            subscriber.compact().without_time().with_ansi(true).boxed()
        }
        (LogFormat::Auto, false) | (LogFormat::Simplified, _) => {
            subscriber.with_ansi(false).boxed()
        }
        (LogFormat::Json, _) => subscriber
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(format.with_filter(filter))
        .try_init()
        .ok();
}

mod level_serde {
    use std::fmt;

    use serde::de::{Error, Unexpected, Visitor};
    use serde::{Deserializer, Serializer};
    use tracing::level_filters::LevelFilter;

    pub fn serialize<S>(filter: &LevelFilter, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(filter)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<LevelFilter, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct V;

        impl Visitor<'_> for V {
            type Value = LevelFilter;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a log level")
            }

            fn visit_str<E>(self, value: &str) -> Result<LevelFilter, E>
            where
                E: Error,
            {
                value
                    .parse()
                    .map_err(|_| Error::invalid_value(Unexpected::Str(value), &self))
            }
        }

        deserializer.deserialize_str(V)
    }
}
