use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use anyhow::{Result, format_err};
use clap::ArgMatches;
use csp_config::Config;
use reqwest::blocking::Client;

/// Returns the address to probe, replacing an unspecified listen address with loopback.
fn probe_addr(config: &Config, matches: &ArgMatches) -> SocketAddr {
    let mut addr = matches
        .get_one::<SocketAddr>("addr")
        .copied()
        .unwrap_or(config.listen_addr());

    if addr.ip().is_unspecified() {
        match addr {
            SocketAddr::V4(_) => addr.set_ip(Ipv4Addr::LOCALHOST.into()),
            SocketAddr::V6(_) => addr.set_ip(Ipv6Addr::LOCALHOST.into()),
        }
    }

    addr
}

pub fn healthcheck(config: &Config, matches: &ArgMatches) -> Result<()> {
    let timeout = matches.get_one::<u64>("timeout").copied().unwrap_or(5);
    let addr = probe_addr(config, matches);

    let client = Client::builder()
        .timeout(Some(Duration::from_secs(timeout)))
        .build()
        .unwrap_or_default();

    let response = client
        .get(format!("http://{addr}{}", config.health_check_path()))
        .send();

    match response {
        Ok(response) if response.status().is_success() => Ok(()),
        Ok(response) => {
            csp_log::error!("collector is unhealthy. Status code: {}", response.status());
            Err(format_err!(
                "collector is unhealthy. Status code: {}",
                response.status()
            ))
        }
        Err(err) => {
            csp_log::error!("collector is unhealthy. Error: {err}");
            Err(err.into())
        }
    }
}
