use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod api;
pub mod dashboard;
pub mod optimizer;
pub mod recipients;
pub mod settings;
pub mod startup_checks;
pub mod store;
pub mod templates;

use optimizer::{ContentOptimizer, OptimizerConfig};
use store::{SharedStore, Store, StoreError};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub optimizer: Option<OptimizerConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    pub data_directory: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::from("data"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            app: AppConfig {
                name: "MailPilot".to_string(),
                log_level: "info".to_string(),
            },
            store: StoreConfig::default(),
            optimizer: None,
        }
    }
}

use axum::Router;
use axum::routing::{delete, get, post, put};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub optimizer: Option<Arc<ContentOptimizer>>,
    pub config: Config,
}

impl AppState {
    /// Opens the store and builds the configured optimizer.
    ///
    /// An optimizer that cannot be built is logged and left disabled.
    pub async fn new(config: Config) -> Result<Self, StoreError> {
        let store = Arc::new(Store::open(&config.store.data_directory).await?);

        let optimizer = match &config.optimizer {
            Some(optimizer_config) => match optimizer::create_provider(optimizer_config) {
                Ok(provider) => {
                    tracing::info!("Content optimizer using {}", provider.name());
                    Some(Arc::new(ContentOptimizer::new(provider)))
                }
                Err(e) => {
                    tracing::warn!("Content optimizer disabled: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            store,
            optimizer,
            config,
        })
    }

    pub fn with_optimizer(mut self, optimizer: ContentOptimizer) -> Self {
        self.optimizer = Some(Arc::new(optimizer));
        self
    }
}

pub async fn create_app(config: Config) -> Result<Router, StoreError> {
    Ok(create_router(AppState::new(config).await?))
}

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health_handler))
        .route("/api/dashboard", get(dashboard::dashboard_handler))
        .route(
            "/api/recipients",
            get(recipients::handlers::list_recipients_handler)
                .post(recipients::handlers::add_recipient_handler),
        )
        .route(
            "/api/recipients/import",
            post(recipients::handlers::import_recipients_handler),
        )
        .route(
            "/api/recipients/{id}",
            delete(recipients::handlers::delete_recipient_handler),
        )
        .route(
            "/api/templates",
            get(templates::handlers::list_templates_handler)
                .post(templates::handlers::create_template_handler),
        )
        .route(
            "/api/templates/{id}",
            put(templates::handlers::update_template_handler)
                .delete(templates::handlers::delete_template_handler),
        )
        .route("/api/preview", post(templates::handlers::preview_handler))
        .route("/api/optimize", post(optimizer::handlers::optimize_handler))
        .route(
            "/api/settings",
            get(settings::get_settings_handler).put(settings::update_settings_handler),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    tracing::info!(
                        target: "access_log",
                        method = %request.method(),
                        path = %request.uri().path(),
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}
