//! Services backing the HTTP endpoints.

pub mod emitter;
pub mod server;
