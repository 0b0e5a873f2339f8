//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Collect flow routes into an Axum Router
//! - Wire up middleware (request ID, tracing, timeout, request logging)
//! - Answer unmatched routes with a logged 404
//! - Serve on a listener until shutdown is signalled

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use axum::extract::Request;
use axum::handler::Handler;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::Response;
use axum::routing::on;
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::reply::error_response;
use crate::http::request::{log_requests, RequestLogging};
use crate::observability::Logger;
use crate::routing::{self, HttpMethod, RouteError};

/// HTTP server hosting flow routes.
pub struct HttpServer {
    router: Router,
    routes: HashSet<(HttpMethod, String)>,
    /// Pattern shape → the pattern registered under it.
    shapes: HashMap<String, String>,
    config: ServerConfig,
    log: Logger,
}

impl HttpServer {
    /// Create a server logging through `tracing`.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_logger(config, Logger::tracing())
    }

    /// Create a server with its own instance logger.
    pub fn with_logger(config: ServerConfig, log: Logger) -> Self {
        Self {
            router: Router::new(),
            routes: HashSet::new(),
            shapes: HashMap::new(),
            config,
            log,
        }
    }

    /// Instance-level logger, used when no request is in scope.
    pub fn log(&self) -> &Logger {
        &self.log
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Register `handler` for `method` requests on `path`.
    ///
    /// Fails without touching the router when the pattern is invalid, the
    /// route already exists, or it overlaps a registered pattern.
    pub fn route<H, T>(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: H,
    ) -> Result<&mut Self, RouteError>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let pattern = routing::normalize(path)?;
        if self.routes.contains(&(method, pattern.clone())) {
            return Err(RouteError::Duplicate {
                method,
                path: path.to_string(),
            });
        }

        let conflict = || RouteError::Conflict {
            method,
            path: path.to_string(),
        };

        let shape = routing::shape(&pattern);
        if self.shapes.get(&shape).is_some_and(|existing| *existing != pattern) {
            return Err(conflict());
        }

        // axum panics on routes matchit refuses; try them on a copy first
        let candidate = self.router.clone();
        let router = panic::catch_unwind(AssertUnwindSafe(|| {
            candidate.route(&pattern, on(method.filter(), handler))
        }))
        .map_err(|_| conflict())?;

        tracing::debug!(method = %method, path = %pattern, "Route registered");
        self.router = router;
        self.routes.insert((method, pattern.clone()));
        self.shapes.insert(shape, pattern);
        Ok(self)
    }

    pub fn get<H, T>(&mut self, path: &str, handler: H) -> Result<&mut Self, RouteError>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.route(HttpMethod::Get, path, handler)
    }

    pub fn post<H, T>(&mut self, path: &str, handler: H) -> Result<&mut Self, RouteError>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.route(HttpMethod::Post, path, handler)
    }

    pub fn put<H, T>(&mut self, path: &str, handler: H) -> Result<&mut Self, RouteError>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.route(HttpMethod::Put, path, handler)
    }

    pub fn patch<H, T>(&mut self, path: &str, handler: H) -> Result<&mut Self, RouteError>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.route(HttpMethod::Patch, path, handler)
    }

    pub fn delete<H, T>(&mut self, path: &str, handler: H) -> Result<&mut Self, RouteError>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.route(HttpMethod::Delete, path, handler)
    }

    /// Finish the router with the fallback and all middleware layers.
    #[allow(deprecated)]
    pub fn into_router(self) -> Router {
        let logging = RequestLogging {
            log: self.log.clone(),
            enabled: self.config.logging.request_logging,
        };
        let instance = self.log;
        let wrong_method = instance.clone();

        // a known path with an unregistered method is still a 404
        self.router
            .fallback(move |request: Request| {
                let instance = instance.clone();
                async move { not_found(&instance, request) }
            })
            .method_not_allowed_fallback(move |request: Request| {
                let instance = wrong_method.clone();
                async move { not_found(&instance, request) }
            })
            .layer(TimeoutLayer::new(Duration::from_secs(self.config.timeouts.request_secs)))
            .layer(middleware::from_fn_with_state(logging, log_requests))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.len(),
            "HTTP server starting"
        );

        let app = self.into_router();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn not_found(instance: &Logger, request: Request) -> Response {
    let log = request
        .extensions()
        .get::<Logger>()
        .cloned()
        .unwrap_or_else(|| instance.clone());

    let url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let message = format!("Route {}:{} not found", request.method(), url);

    log.info(Value::Null, &message);
    error_response(StatusCode::NOT_FOUND, &message)
}
