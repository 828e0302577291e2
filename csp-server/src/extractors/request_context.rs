use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderName;
use axum::http::request::Parts;

use crate::extractors::{AddressParseError, resolve};
use crate::services::emitter::Metadata;
use crate::service::ServiceState;

/// The name of the query parameter logged as metadata.
const METADATA_PARAM: &str = "metadata";

/// Header set by proxies with the address of the original client.
const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Request-level information that is logged with every violation of a request.
#[derive(Clone, Debug)]
pub struct RequestContext {
    path: String,
    metadata: Option<Metadata>,
    client_addr: Result<IpAddr, AddressParseError>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(
        path: impl Into<String>,
        metadata: Option<Metadata>,
        client_addr: Result<IpAddr, AddressParseError>,
    ) -> Self {
        Self {
            path: path.into(),
            metadata,
            client_addr,
        }
    }

    /// The path of the request URI.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Metadata taken from the query string, if any.
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// The resolved address of the client.
    pub fn client_addr(&self) -> Result<IpAddr, &AddressParseError> {
        self.client_addr.as_ref().copied()
    }
}

/// Extracts metadata from a query string.
///
/// By default, this is the first value of the `metadata` parameter. With `as_object`, all query
/// parameters are collected into a map, keeping the first value of every parameter. The map is
/// empty if there is no query string.
pub fn extract_metadata(query: Option<&str>, as_object: bool) -> Option<Metadata> {
    let pairs = url::form_urlencoded::parse(query.unwrap_or_default().as_bytes());

    if as_object {
        let mut map = BTreeMap::new();
        for (key, value) in pairs {
            map.entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        return Some(Metadata::Object(map));
    }

    pairs
        .into_iter()
        .find(|(key, _)| *key == METADATA_PARAM)
        .map(|(_, value)| Metadata::Value(value.into_owned()))
}

impl FromRequestParts<ServiceState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        let metadata = extract_metadata(parts.uri.query(), state.config().metadata_object());

        let forwarded_for = parts
            .headers
            .get(X_FORWARDED_FOR)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        let remote_addr = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_default();

        Ok(Self {
            path: parts.uri.path().to_owned(),
            metadata,
            client_addr: resolve(forwarded_for.as_deref(), &remote_addr),
        })
    }
}
