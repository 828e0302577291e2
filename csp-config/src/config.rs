use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csp_log::{LogConfig, LogFormat};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The file name of the configuration file within the config folder.
const CONFIG_FILE_NAME: &str = "config.yml";

/// Defines the source of a config error
#[derive(Debug, Default)]
enum ConfigErrorSource {
    /// An error occurring independently.
    #[default]
    None,
    /// An error originating from a configuration file.
    File(PathBuf),
    /// An error originating in a field override (an env var, or a CLI parameter).
    FieldOverride(String),
}

/// Indicates config related errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ConfigErrorKind {
    /// Failed to open the file.
    #[error("could not open config file")]
    CouldNotOpenFile,
    /// Failed to serialize the configuration.
    #[error("could not write config file")]
    CouldNotWriteFile,
    /// Parsing YAML failed.
    #[error("could not parse yaml config file")]
    BadYaml,
    /// Parsing JSON failed.
    #[error("could not parse json config file")]
    BadJson,
    /// Invalid config value
    #[error("invalid config value")]
    InvalidValue,
}

/// Indicates config related errors.
#[derive(Debug)]
pub struct ConfigError {
    source: ConfigErrorSource,
    kind: ConfigErrorKind,
    cause: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl ConfigError {
    #[inline]
    fn new(kind: ConfigErrorKind) -> Self {
        Self {
            source: ConfigErrorSource::None,
            kind,
            cause: None,
        }
    }

    #[inline]
    fn wrap<E>(inner: E, kind: ConfigErrorKind) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            cause: Some(Box::new(inner)),
            ..Self::new(kind)
        }
    }

    #[inline]
    fn for_field<E>(inner: E, field: &'static str) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::wrap(inner, ConfigErrorKind::InvalidValue).field(field)
    }

    #[inline]
    fn file<P: AsRef<Path>>(mut self, p: P) -> Self {
        self.source = ConfigErrorSource::File(p.as_ref().to_path_buf());
        self
    }

    #[inline]
    fn field(mut self, name: &'static str) -> Self {
        self.source = ConfigErrorSource::FieldOverride(name.to_owned());
        self
    }

    /// Returns the error kind of the error.
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            ConfigErrorSource::None => self.kind.fmt(f),
            ConfigErrorSource::File(file_name) => {
                write!(f, "{} (file {})", self.kind, file_name.display())
            }
            ConfigErrorSource::FieldOverride(name) => write!(f, "{} (field {})", self.kind, name),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}

/// A configuration value that could not be interpreted.
#[derive(Debug, thiserror::Error)]
#[error("unsupported value {0:?}")]
pub struct UnsupportedValue(String);

/// Loads a configuration file from disk.
trait ConfigObject: DeserializeOwned + Serialize {
    /// The full filename of the config file within the config folder.
    fn path(base: &Path) -> PathBuf {
        base.join(CONFIG_FILE_NAME)
    }

    /// Loads the config file from a file within the given directory location.
    fn load(base: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(base);

        let f = fs::File::open(&path)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::CouldNotOpenFile).file(&path))?;

        serde_yaml::from_reader(io::BufReader::new(f))
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadYaml).file(&path))
    }
}

/// Structure used to hold information about configuration overrides via
/// CLI parameters or environment variables
#[derive(Debug, Default)]
pub struct OverridableConfig {
    /// The host the collector should bind to (network interface).
    pub host: Option<String>,
    /// The port to bind for the HTTP server.
    pub port: Option<String>,
    /// The path of the health check endpoint.
    pub health_check_path: Option<String>,
    /// The maximum size of a report payload in bytes.
    pub max_payload_size: Option<String>,
    /// Path to a file with blocked URI prefixes.
    pub filter_file: Option<String>,
    /// "true" if query strings and fragments are stripped from reported URIs.
    pub truncate_query_fragment: Option<String>,
    /// How client addresses are logged: "disabled", "full" or "truncated".
    pub client_ip: Option<String>,
    /// "true" if all query parameters are logged as metadata.
    pub metadata_object: Option<String>,
    /// The log level.
    pub log_level: Option<String>,
    /// The log format.
    pub log_format: Option<String>,
}

/// Controls whether and how client addresses are added to logged reports.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientIpLogging {
    /// Client addresses are not logged.
    #[default]
    Disabled,
    /// The full client address is logged.
    Full,
    /// Only the network of the client is logged: `/24` for IPv4 and `/64` for IPv6.
    Truncated,
}

impl FromStr for ClientIpLogging {
    type Err = UnsupportedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(Self::Disabled),
            "full" => Ok(Self::Full),
            "truncated" => Ok(Self::Truncated),
            _ => Err(UnsupportedValue(s.to_owned())),
        }
    }
}

/// Controls the HTTP server.
#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
struct Http {
    /// The host to which the server should bind.
    host: IpAddr,
    /// The port to which the server should bind.
    port: u16,
    /// The path of the health check endpoint.
    health_check_path: String,
    /// The maximum size of a report payload in bytes.
    max_payload_size: usize,
}

impl Default for Http {
    fn default() -> Self {
        Http {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            health_check_path: "/_healthcheck".to_owned(),
            max_payload_size: 1024 * 1024,
        }
    }
}

/// Controls how violation reports are filtered and logged.
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
struct Reports {
    /// Path to a newline-delimited file with blocked URI prefixes.
    #[serde(skip_serializing_if = "Option::is_none")]
    filter_file: Option<PathBuf>,
    /// Strips query strings and fragments from reported URIs.
    truncate_query_fragment: bool,
    /// Whether and how client addresses are logged.
    client_ip: ClientIpLogging,
    /// Logs all query parameters as metadata instead of only `metadata`.
    metadata_object: bool,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct ConfigValues {
    #[serde(default)]
    http: Http,
    #[serde(default)]
    reports: Reports,
    #[serde(default)]
    logging: LogConfig,
}

impl ConfigObject for ConfigValues {}

impl ConfigValues {
    fn validate(&self) -> Result<(), ConfigError> {
        check_route_path(&self.http.health_check_path)
            .map_err(|err| ConfigError::for_field(err, "health_check_path"))
    }
}

/// Config struct.
#[derive(Default)]
pub struct Config {
    values: ConfigValues,
    path: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("path", &self.path)
            .field("values", &self.values)
            .finish()
    }
}

impl Config {
    /// Loads a config from a given config folder.
    ///
    /// A relative `filter_file` in the configuration is resolved against the config folder.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = std::env::current_dir()
            .map(|x| x.join(path.as_ref()))
            .unwrap_or_else(|_| path.as_ref().to_path_buf());

        let mut values = ConfigValues::load(&path)?;
        values
            .validate()
            .map_err(|e| e.file(ConfigValues::path(&path)))?;

        if let Some(filter_file) = values.reports.filter_file.take() {
            values.reports.filter_file = Some(path.join(filter_file));
        }

        Ok(Config { values, path })
    }

    /// Creates a config from a JSON value.
    ///
    /// This is mostly useful for tests.
    pub fn from_json_value(value: serde_json::Value) -> Result<Config, ConfigError> {
        let values: ConfigValues = serde_json::from_value(value)
            .map_err(|err| ConfigError::wrap(err, ConfigErrorKind::BadJson))?;
        values.validate()?;

        Ok(Config {
            values,
            path: PathBuf::new(),
        })
    }

    /// Override configuration with values coming from other sources (e.g. env variables or
    /// command line parameters)
    pub fn apply_override(
        &mut self,
        overrides: OverridableConfig,
    ) -> Result<&mut Self, ConfigError> {
        let http = &mut self.values.http;

        if let Some(host) = overrides.host {
            http.host = host
                .parse::<IpAddr>()
                .map_err(|err| ConfigError::for_field(err, "host"))?;
        }

        if let Some(port) = overrides.port {
            http.port = port
                .as_str()
                .parse()
                .map_err(|err| ConfigError::for_field(err, "port"))?;
        }

        if let Some(path) = overrides.health_check_path {
            check_route_path(&path)
                .map_err(|err| ConfigError::for_field(err, "health_check_path"))?;
            http.health_check_path = path;
        }

        if let Some(size) = overrides.max_payload_size {
            http.max_payload_size = size
                .parse()
                .map_err(|err| ConfigError::for_field(err, "max_payload_size"))?;
        }

        let reports = &mut self.values.reports;

        if let Some(filter_file) = overrides.filter_file {
            reports.filter_file = match filter_file.as_str() {
                "" => None,
                _ => Some(PathBuf::from(filter_file)),
            };
        }

        if let Some(truncate) = overrides.truncate_query_fragment {
            reports.truncate_query_fragment = parse_bool(&truncate)
                .map_err(|err| ConfigError::for_field(err, "truncate_query_fragment"))?;
        }

        if let Some(client_ip) = overrides.client_ip {
            reports.client_ip = client_ip
                .to_lowercase()
                .parse()
                .map_err(|err| ConfigError::for_field(err, "client_ip"))?;
        }

        if let Some(metadata_object) = overrides.metadata_object {
            reports.metadata_object = parse_bool(&metadata_object)
                .map_err(|err| ConfigError::for_field(err, "metadata_object"))?;
        }

        let logging = &mut self.values.logging;

        if let Some(level) = overrides.log_level {
            logging.level = level
                .parse()
                .map_err(|err| ConfigError::for_field(err, "log_level"))?;
        }

        if let Some(format) = overrides.log_format {
            logging.format = match format.to_lowercase().as_str() {
                "auto" => LogFormat::Auto,
                "pretty" => LogFormat::Pretty,
                "simplified" => LogFormat::Simplified,
                "json" => LogFormat::Json,
                _ => return Err(ConfigError::for_field(UnsupportedValue(format), "log_format")),
            };
        }

        Ok(self)
    }

    /// Returns the config folder, or an empty path if the defaults are used.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Dumps out a YAML string of the values.
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(&self.values)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::CouldNotWriteFile))
    }

    /// Returns the socket address the HTTP server binds to.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.values.http.host, self.values.http.port)
    }

    /// Returns the path of the health check endpoint.
    pub fn health_check_path(&self) -> &str {
        &self.values.http.health_check_path
    }

    /// Returns the maximum size of a report payload in bytes.
    pub fn max_payload_size(&self) -> usize {
        self.values.http.max_payload_size
    }

    /// Returns the path of the blocklist file, if one is configured.
    pub fn filter_file(&self) -> Option<&Path> {
        self.values.reports.filter_file.as_deref()
    }

    /// Returns `true` if query strings and fragments are stripped from reported URIs.
    pub fn truncate_query_fragment(&self) -> bool {
        self.values.reports.truncate_query_fragment
    }

    /// Returns whether and how client addresses are logged.
    pub fn client_ip_logging(&self) -> ClientIpLogging {
        self.values.reports.client_ip
    }

    /// Returns `true` if all query parameters are logged as metadata.
    pub fn metadata_object(&self) -> bool {
        self.values.reports.metadata_object
    }

    /// Returns the logging configuration.
    pub fn logging(&self) -> &LogConfig {
        &self.values.logging
    }
}

fn parse_bool(value: &str) -> Result<bool, UnsupportedValue> {
    match value.to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        _ => Err(UnsupportedValue(value.to_owned())),
    }
}

/// Checks that `path` can be registered as a static route.
///
/// Segments starting with `:` or `*` are rejected by the router, as are captures in braces.
fn check_route_path(path: &str) -> Result<(), UnsupportedValue> {
    let valid = path.starts_with('/')
        && !path.contains(['{', '}', '?', '#'])
        && !path
            .split('/')
            .any(|segment| segment.starts_with([':', '*']));

    if valid {
        Ok(())
    } else {
        Err(UnsupportedValue(path.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use csp_log::LevelFilter;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.listen_addr(), "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.health_check_path(), "/_healthcheck");
        assert_eq!(config.max_payload_size(), 1024 * 1024);
        assert_eq!(config.filter_file(), None);
        assert!(!config.truncate_query_fragment());
        assert_eq!(config.client_ip_logging(), ClientIpLogging::Disabled);
        assert!(!config.metadata_object());
        assert_eq!(config.logging().level, LevelFilter::INFO);
    }

    #[test]
    fn test_from_json_value() {
        let config = Config::from_json_value(serde_json::json!({
            "http": {"port": 9000},
            "reports": {"client_ip": "truncated", "metadata_object": true},
        }))
        .unwrap();

        assert_eq!(config.listen_addr(), "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.client_ip_logging(), ClientIpLogging::Truncated);
        assert!(config.metadata_object());
    }

    #[test]
    fn test_from_json_value_invalid() {
        let error = Config::from_json_value(serde_json::json!({
            "reports": {"client_ip": "sometimes"},
        }))
        .unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::BadJson);

        let error = Config::from_json_value(serde_json::json!({
            "http": {"health_check_path": "health"},
        }))
        .unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::InvalidValue);
        assert_eq!(error.to_string(), "invalid config value (field health_check_path)");

        for path in ["/:status", "/health/*rest", "/{id}", "/ping?x=1"] {
            let error = Config::from_json_value(serde_json::json!({
                "http": {"health_check_path": path},
            }))
            .unwrap_err();
            assert_eq!(error.kind(), ConfigErrorKind::InvalidValue, "{path}");
        }

        let config = Config::from_json_value(serde_json::json!({
            "http": {"health_check_path": "/status:ok/a*b"},
        }))
        .unwrap();
        assert_eq!(config.health_check_path(), "/status:ok/a*b");
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("config.yml")).unwrap();
        writeln!(file, "http:\n  host: 127.0.0.1\n  port: 3000").unwrap();
        writeln!(file, "reports:\n  filter_file: blocklist.txt").unwrap();
        writeln!(file, "logging:\n  level: debug").unwrap();

        let config = Config::from_path(dir.path()).unwrap();

        assert_eq!(config.listen_addr(), "127.0.0.1:3000".parse().unwrap());
        assert_eq!(
            config.filter_file(),
            Some(dir.path().join("blocklist.txt").as_path())
        );
        assert_eq!(config.logging().level, LevelFilter::DEBUG);
    }

    #[test]
    fn test_from_path_missing() {
        let dir = tempfile::tempdir().unwrap();
        let error = Config::from_path(dir.path()).unwrap_err();

        assert_eq!(error.kind(), ConfigErrorKind::CouldNotOpenFile);
        assert!(error.source().is_some());
    }

    #[test]
    fn test_from_path_bad_yaml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yml"), "http: [").unwrap();

        let error = Config::from_path(dir.path()).unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::BadYaml);
        assert!(error.to_string().ends_with("config.yml)"));
    }

    #[test]
    fn test_apply_override() {
        let mut config = Config::default();
        config
            .apply_override(OverridableConfig {
                port: Some("8181".to_owned()),
                filter_file: Some("/etc/csp/blocklist.txt".to_owned()),
                truncate_query_fragment: Some("true".to_owned()),
                client_ip: Some("full".to_owned()),
                metadata_object: Some("1".to_owned()),
                health_check_path: Some("/healthz".to_owned()),
                log_level: Some("debug".to_owned()),
                log_format: Some("json".to_owned()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.listen_addr().port(), 8181);
        assert_eq!(
            config.filter_file(),
            Some(Path::new("/etc/csp/blocklist.txt"))
        );
        assert!(config.truncate_query_fragment());
        assert_eq!(config.client_ip_logging(), ClientIpLogging::Full);
        assert!(config.metadata_object());
        assert_eq!(config.health_check_path(), "/healthz");
        assert_eq!(config.logging().level, LevelFilter::DEBUG);
        assert_eq!(config.logging().format, LogFormat::Json);
    }

    #[test]
    fn test_apply_override_invalid() {
        let cases = [
            (
                OverridableConfig {
                    port: Some("http".to_owned()),
                    ..Default::default()
                },
                "port",
            ),
            (
                OverridableConfig {
                    host: Some("localhost".to_owned()),
                    ..Default::default()
                },
                "host",
            ),
            (
                OverridableConfig {
                    truncate_query_fragment: Some("maybe".to_owned()),
                    ..Default::default()
                },
                "truncate_query_fragment",
            ),
            (
                OverridableConfig {
                    client_ip: Some("partial".to_owned()),
                    ..Default::default()
                },
                "client_ip",
            ),
            (
                OverridableConfig {
                    health_check_path: Some("/:status".to_owned()),
                    ..Default::default()
                },
                "health_check_path",
            ),
            (
                OverridableConfig {
                    health_check_path: Some("/*rest".to_owned()),
                    ..Default::default()
                },
                "health_check_path",
            ),
            (
                OverridableConfig {
                    log_format: Some("xml".to_owned()),
                    ..Default::default()
                },
                "log_format",
            ),
        ];

        for (overrides, field) in cases {
            let error = Config::default().apply_override(overrides).unwrap_err();
            assert_eq!(error.kind(), ConfigErrorKind::InvalidValue);
            assert_eq!(
                error.to_string(),
                format!("invalid config value (field {field})")
            );
        }
    }

    #[test]
    fn test_to_yaml_string() {
        let config = Config::default();
        insta::assert_snapshot!(config.to_yaml_string().unwrap(), @r###"
        http:
          host: 0.0.0.0
          port: 8080
          health_check_path: /_healthcheck
          max_payload_size: 1048576
        reports:
          truncate_query_fragment: false
          client_ip: disabled
          metadata_object: false
        logging:
          level: info
          format: auto
          enable_backtraces: false
        "###);
    }
}
