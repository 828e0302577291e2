//! Middlewares for the HTTP server.
//!
//! This module exposes tower [layers](tower::Layer) and related utilities to configure the
//! axum/hyper HTTP server. They are registered on the router in
//! [`make_app`](crate::services::server::make_app).

mod handle_panic;
mod trace;

pub use self::handle_panic::*;
pub use self::trace::*;
