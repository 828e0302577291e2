//! Extractors for request data used by the report endpoints.

mod client_address;
mod request_context;

pub use self::client_address::*;
pub use self::request_context::*;
