//! This module implements the definition of the command line app.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::builder::{BoolishValueParser, PossibleValuesParser};
use clap::{Arg, ArgAction, Command, value_parser};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const ABOUT: &str = "The CSP violation report collector.";

pub fn make_app() -> Command {
    Command::new("csp-collector")
        .disable_help_subcommand(true)
        .subcommand_required(true)
        .propagate_version(true)
        .max_term_width(79)
        .version(VERSION)
        .about(ABOUT)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_name("CONFIG")
                .value_parser(value_parser!(PathBuf))
                .env("CSP_COLLECTOR_CONFIG")
                .help("The path to the config folder."),
        )
        .subcommand(
            Command::new("run")
                .about("Run the collector")
                .after_help(
                    "This runs the collector in the foreground until it's shut down. It will \
                     bind to the port and network interface configured in the config file \
                     or given with --host and --port.",
                )
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("HOST")
                        .env("CSP_COLLECTOR_HOST")
                        .help("The address the collector binds to."),
                )
                .arg(
                    Arg::new("port")
                        .long("port")
                        .short('p')
                        .value_name("PORT")
                        .env("CSP_COLLECTOR_PORT")
                        .help("The port the collector listens on."),
                )
                .arg(
                    Arg::new("filter_file")
                        .long("filter-file")
                        .value_name("PATH")
                        .env("CSP_COLLECTOR_FILTER_FILE")
                        .help(
                            "Blocked URI prefixes, one per line. Replaces the built-in list \
                             when given.",
                        ),
                )
                .arg(
                    Arg::new("health_check_path")
                        .long("health-check-path")
                        .value_name("PATH")
                        .env("CSP_COLLECTOR_HEALTH_CHECK_PATH")
                        .help("The path of the health check endpoint."),
                )
                .arg(
                    Arg::new("truncate_query_fragment")
                        .long("truncate-query-fragment")
                        .action(ArgAction::SetTrue)
                        .value_parser(BoolishValueParser::new())
                        .env("CSP_COLLECTOR_TRUNCATE_QUERY_FRAGMENT")
                        .help("Remove the query string and fragment from logged URIs."),
                )
                .arg(
                    Arg::new("log_client_ip")
                        .long("log-client-ip")
                        .action(ArgAction::SetTrue)
                        .value_parser(BoolishValueParser::new())
                        .env("CSP_COLLECTOR_LOG_CLIENT_IP")
                        .help("Log the address of the client that sent the report."),
                )
                .arg(
                    Arg::new("log_truncated_client_ip")
                        .long("log-truncated-client-ip")
                        .action(ArgAction::SetTrue)
                        .value_parser(BoolishValueParser::new())
                        .env("CSP_COLLECTOR_LOG_TRUNCATED_CLIENT_IP")
                        .help(
                            "Log the network of the client, /24 for IPv4 and /64 for IPv6. \
                             Takes precedence over --log-client-ip.",
                        ),
                )
                .arg(
                    Arg::new("query_params_metadata")
                        .long("query-params-metadata")
                        .action(ArgAction::SetTrue)
                        .value_parser(BoolishValueParser::new())
                        .env("CSP_COLLECTOR_QUERY_PARAMS_METADATA")
                        .help(
                            "Log all query parameters of the report URI as a metadata object \
                             instead of only the `metadata` parameter.",
                        ),
                )
                .arg(
                    Arg::new("debug")
                        .long("debug")
                        .action(ArgAction::SetTrue)
                        .value_parser(BoolishValueParser::new())
                        .env("CSP_COLLECTOR_DEBUG")
                        .help("Log at debug level."),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .value_parser(BoolishValueParser::new())
                        .env("CSP_COLLECTOR_JSON")
                        .help("Write logs as JSON lines."),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Manage the collector config")
                .after_help(
                    "This command provides basic config management. It can be \
                     used primarily to inspect the config the collector starts with.",
                )
                .subcommand_required(true)
                .subcommand(
                    Command::new("show")
                        .about("Show the entire config out for debugging purposes")
                        .arg(
                            Arg::new("format")
                                .short('f')
                                .long("format")
                                .value_name("FORMAT")
                                .value_parser(PossibleValuesParser::new(["debug", "yaml"]))
                                .default_value("yaml")
                                .help("The output format"),
                        ),
                ),
        )
        .subcommand(
            Command::new("healthcheck")
                .about("Check the health of a running collector")
                .after_help(
                    "This requests the health check endpoint of a running collector and exits \
                     with a non-zero status if it does not answer with a success status.",
                )
                .arg(
                    Arg::new("addr")
                        .long("addr")
                        .value_name("ADDR")
                        .value_parser(value_parser!(SocketAddr))
                        .help(
                            "The address of the collector, e.g. 127.0.0.1:8080. Defaults to \
                             the configured listen address.",
                        ),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .value_name("SECONDS")
                        .value_parser(value_parser!(u64))
                        .default_value("5")
                        .help("Request timeout in seconds."),
                ),
        )
}
