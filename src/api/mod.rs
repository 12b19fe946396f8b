use axum::{
    Json, Router,
    extract::State,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
mod categorias;
mod dispositivos;
mod error;
pub mod validation;

pub use error::ApiError;

use crate::config::Config;
use crate::db::Store;

pub struct AppState {
    config: Config,
    store: Store,
}

impl AppState {
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }
}

pub async fn create_app_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    Ok(Arc::new(AppState { config, store }))
}

/// Health check: probes the database before reporting the service up.
async fn index(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    state.store().ping().await?;

    Ok(Json(json!({
        "message": "API de Gerenciamento de Dispositivos iniciada com sucesso!"
    })))
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route(
            "/categorias",
            post(categorias::create_categoria).get(categorias::list_categorias),
        )
        .route(
            "/categorias/{id}",
            get(categorias::get_categoria)
                .put(categorias::update_categoria)
                .patch(categorias::update_categoria)
                .delete(categorias::delete_categoria),
        )
        .route(
            "/dispositivos",
            post(dispositivos::create_dispositivo).get(dispositivos::list_dispositivos),
        )
        .route(
            "/dispositivos/{id}",
            get(dispositivos::get_dispositivo)
                .put(dispositivos::update_dispositivo)
                .patch(dispositivos::update_dispositivo)
                .delete(dispositivos::delete_dispositivo),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let cors_origins = &state.config().server.cors_allowed_origins;
    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/", get(index))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .merge(protected)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
