pub mod api;
pub mod cli;
pub mod gate;
pub mod pages;
pub mod rate_limit;
pub mod session;
pub mod table;

use std::net::SocketAddr;

use api::{ApiClient, AuthService, PaymentsService};
use axum::{Router, middleware};
use gate::{GateState, session_gate};
use pages::PagesState;
use rate_limit::LoginRateLimit;
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct ServerConfig {
    /// Client for the backend API
    pub api: ApiClient,
    /// Whether to set Secure flag on cookies (true in production)
    pub secure_cookies: bool,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    create_app_with_limit(config, LoginRateLimit::new())
}

/// Same as [`create_app`] with a custom login rate limit.
pub fn create_app_with_limit(config: &ServerConfig, login_limit: LoginRateLimit) -> Router {
    let auth = AuthService::new(config.api.clone());

    let pages = PagesState {
        auth: auth.clone(),
        payments: PaymentsService::new(config.api.clone()),
        secure_cookies: config.secure_cookies,
    };
    let gate = GateState {
        auth,
        secure_cookies: config.secure_cookies,
    };

    pages::router(pages, login_limit).layer(middleware::from_fn_with_state(gate, session_gate))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> std::io::Result<(tokio::task::JoinHandle<()>, SocketAddr)> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    Ok((handle, local_addr))
}
