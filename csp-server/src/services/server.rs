//! The HTTP server hosting all endpoints.

use std::error::Error;
use std::io;
use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue, header};
use tokio::net::{TcpListener, TcpSocket};
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::constants;
use crate::middlewares::{self, CatchPanicLayer};
use crate::service::ServiceState;

/// Maximum number of pending connections on the listen socket.
const LISTEN_BACKLOG: u32 = 1024;

/// Indicates the type of failure of the server.
#[allow(clippy::enum_variant_names)]
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding failed.
    #[error("bind to interface failed")]
    BindFailed(#[from] io::Error),

    /// The async runtime could not be started.
    #[error("could not start the async runtime")]
    RuntimeFailed(#[source] io::Error),

    /// Accepting or serving connections failed.
    #[error("http server failed")]
    ServeFailed(#[source] io::Error),
}

/// Build the axum application with all routes and middleware.
pub fn make_app(service: ServiceState) -> axum::Router {
    // Service builder order defines layers added first will be called first. This means:
    //  - Requests go from top to bottom
    //  - Responses go from bottom to top
    let middleware = ServiceBuilder::new()
        .layer(CatchPanicLayer::custom(middlewares::handle_panic))
        .layer(SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static(constants::SERVER),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("cross-origin"),
        ))
        .layer(middlewares::trace_http_layer());

    crate::endpoints::routes(service.config())
        .layer(middleware)
        .with_state(service)
}

fn listen(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }?;

    #[cfg(unix)]
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    Ok(socket.listen(LISTEN_BACKLOG)?)
}

/// Resolves once the process receives `SIGINT` or `SIGTERM`.
async fn shutdown_signal() {
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => csp_log::info!("received SIGINT"),
            Err(error) => {
                csp_log::error!(
                    error = &error as &dyn Error,
                    "failed to listen for SIGINT"
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                csp_log::info!("received SIGTERM");
            }
            Err(error) => {
                csp_log::error!(
                    error = &error as &dyn Error,
                    "failed to listen for SIGTERM"
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => (),
        _ = terminate => (),
    }

    csp_log::info!("shutting down HTTP server");
}

/// HTTP server service.
///
/// This is the main HTTP server of the collector which hosts all endpoints. The server stops
/// accepting connections on `SIGINT` or `SIGTERM` and finishes requests in flight before
/// [`run`](Self::run) returns.
pub struct HttpServer {
    service: ServiceState,
    listener: TcpListener,
}

impl HttpServer {
    /// Binds the listen socket configured in `http.host` and `http.port`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(service: ServiceState) -> Result<Self, ServerError> {
        let listener = listen(service.config().listen_addr())?;
        Ok(Self { service, listener })
    }

    /// Returns the address the server is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until a shutdown signal is received.
    pub async fn run(self) -> Result<(), ServerError> {
        let Self { service, listener } = self;

        let listen_addr = listener.local_addr()?;
        csp_log::info!("spawning http server");
        csp_log::info!("  listening on http://{listen_addr}/");

        let app = make_app(service);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::ServeFailed)
    }
}
