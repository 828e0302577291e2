/// Value of the `Server` header of all responses.
pub const SERVER: &str = concat!("csp-collector/", env!("CARGO_PKG_VERSION"));
