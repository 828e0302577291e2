use csp_config::{ClientIpLogging, Config};
use csp_filter::Blocklist;

/// Print spawn infos to the log.
pub fn dump_spawn_infos(config: &Config, blocklist: &Blocklist) {
    if config.path().as_os_str().is_empty() {
        csp_log::info!("launching collector without config folder");
    } else {
        csp_log::info!(
            "launching collector from config folder {}",
            config.path().display()
        );
    }

    match config.filter_file() {
        Some(path) => csp_log::info!(
            "  blocklist: {} prefixes from {}",
            blocklist.len(),
            path.display()
        ),
        None => csp_log::info!("  blocklist: {} built-in prefixes", blocklist.len()),
    }

    let client_ip = match config.client_ip_logging() {
        ClientIpLogging::Disabled => "disabled",
        ClientIpLogging::Full => "full",
        ClientIpLogging::Truncated => "truncated",
    };
    csp_log::info!("  client ip: {client_ip}");
    csp_log::info!("  health check: {}", config.health_check_path());
    csp_log::info!("  log level: {}", config.logging().level);
}
