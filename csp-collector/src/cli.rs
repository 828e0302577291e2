use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;
use csp_config::{Config, OverridableConfig};
use csp_filter::Blocklist;

use crate::cliapp::make_app;
use crate::{healthcheck, setup};

/// Runs the command line application.
pub fn execute() -> Result<()> {
    let app = make_app();
    let matches = app.get_matches();

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    if let Some(run_matches) = matches.subcommand_matches("run") {
        config.apply_override(extract_config_args(run_matches))?;
    }

    csp_log::init(config.logging());

    if let Some(matches) = matches.subcommand_matches("config") {
        manage_config(&config, matches)
    } else if let Some(matches) = matches.subcommand_matches("healthcheck") {
        healthcheck::healthcheck(&config, matches)
    } else if matches.subcommand_matches("run").is_some() {
        run(config)
    } else {
        anyhow::bail!("no subcommand given")
    }
}

/// Extracts config overrides from the arguments of the `run` subcommand.
///
/// Flags that are not set leave the configured value untouched.
pub fn extract_config_args(matches: &ArgMatches) -> OverridableConfig {
    let flag = |name: &str| matches.get_flag(name).then(|| "true".to_owned());

    let client_ip = if matches.get_flag("log_truncated_client_ip") {
        Some("truncated".to_owned())
    } else if matches.get_flag("log_client_ip") {
        Some("full".to_owned())
    } else {
        None
    };

    OverridableConfig {
        host: matches.get_one("host").cloned(),
        port: matches.get_one("port").cloned(),
        health_check_path: matches.get_one("health_check_path").cloned(),
        max_payload_size: None,
        filter_file: matches.get_one("filter_file").cloned(),
        truncate_query_fragment: flag("truncate_query_fragment"),
        client_ip,
        metadata_object: flag("query_params_metadata"),
        log_level: matches.get_flag("debug").then(|| "debug".to_owned()),
        log_format: matches.get_flag("json").then(|| "json".to_owned()),
    }
}

#[allow(clippy::print_stdout)]
pub fn manage_config(config: &Config, matches: &ArgMatches) -> Result<()> {
    let Some(matches) = matches.subcommand_matches("show") else {
        anyhow::bail!("unknown config subcommand");
    };

    let format = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("yaml");

    match format {
        "debug" => println!("{config:#?}"),
        "yaml" => println!("{}", config.to_yaml_string()?),
        other => anyhow::bail!("unsupported format '{other}'"),
    }

    Ok(())
}

pub fn run(config: Config) -> Result<()> {
    let blocklist =
        Blocklist::load(config.filter_file()).context("failed to load the blocklist")?;

    setup::dump_spawn_infos(&config, &blocklist);
    csp_server::run(config, blocklist)?;

    Ok(())
}
