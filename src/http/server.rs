//! HTTP server for the LDP API

use super::handler::{constraints_handler, resource_handler, AppState};
use crate::config::{ConfigResult, ServerConfig};
use crate::ldp::LdpService;
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the router: the constraints document plus the resource fallback
pub fn router(config: &ServerConfig, service: LdpService) -> ConfigResult<Router> {
    let state = AppState {
        service,
        app_base: config.app_base()?.into(),
        context: config.context_path()?.into(),
    };

    Ok(Router::new()
        .route(&config.constraints_path, get(constraints_handler))
        .fallback(resource_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state))
}

/// HTTP server exposing one LDP service
pub struct LdpServer {
    config: ServerConfig,
    service: LdpService,
}

impl LdpServer {
    /// Create a new HTTP server
    pub fn new(config: ServerConfig, service: LdpService) -> Self {
        Self { config, service }
    }

    /// Serve until Ctrl+C
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = router(&self.config, self.service)?;

        let addr = self.config.listen_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("Listening on {}", addr);
        info!("Root container at {}", self.config.ldp_base()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutting down");
            })
            .await?;

        Ok(())
    }
}
