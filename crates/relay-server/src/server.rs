use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::header::USER_AGENT;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{any, get, post};
use axum::Router;
use relay_auth::Authenticator;
use tokio::net::TcpListener;
use tracing::info;

use crate::handlers;
use crate::{ClientAddr, KnownModels, OpenAiUpstream, RelayConfig};

pub struct AppState {
    pub config: RelayConfig,
    pub upstream: OpenAiUpstream,
    pub auth: Authenticator,
    pub models: KnownModels,
}

/// Inbound HTTP surface. Built only from already-initialized services, so the
/// models table is loaded before any handler can run.
pub struct RelayServer {
    state: Arc<AppState>,
}

impl RelayServer {
    pub fn new(
        config: RelayConfig,
        upstream: OpenAiUpstream,
        auth: Authenticator,
        models: KnownModels,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                config,
                upstream,
                auth,
                models,
            }),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn router(&self) -> Router {
        let routes = Router::new()
            .route("/ping", get(handlers::ping).post(handlers::ping))
            .route("/login", post(handlers::login))
            .route("/v1/models", any(handlers::models))
            .route("/v1/chat/completions", post(handlers::completions))
            .with_state(self.state.clone());

        let alias = self.state.config.server.route_prefix_alias.trim_matches('/');
        let router = if alias.is_empty() {
            routes
        } else {
            Router::new()
                .merge(routes.clone())
                .nest(&format!("/{alias}"), routes)
        };
        router.layer(middleware::from_fn(access_log))
    }

    /// Serves until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        info!(addr = ?listener.local_addr().ok(), "Relay listening");
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
    }
}

async fn access_log(client: ClientAddr, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        client = %client.as_string(),
        agent = %agent,
        "HTTP request"
    );
    response
}
