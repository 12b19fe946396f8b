use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::validation::{self, Mode};
use super::{ApiError, AppState};
use crate::db::repositories::dispositivo::{DEFAULT_LIMIT, DEFAULT_PAGE};
use crate::db::{DeviceListQuery, DeviceUpdate};
use crate::entities::{categorias, dispositivos};

#[derive(Debug, Serialize)]
pub struct DispositivoDto {
    pub id: i32,
    pub nome: String,
    pub serial: String,
    pub status: String,
    pub categoria_id: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
    pub categoria_nome: Option<String>,
}

impl From<(dispositivos::Model, Option<categorias::Model>)> for DispositivoDto {
    fn from((model, categoria): (dispositivos::Model, Option<categorias::Model>)) -> Self {
        Self {
            id: model.id,
            nome: model.nome,
            serial: model.serial,
            status: model.status,
            categoria_id: model.categoria_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
            categoria_nome: categoria.map(|c| c.nome),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationDto {
    pub total_records: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub limit: u64,
}

#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    pub items: Vec<DispositivoDto>,
    pub pagination: PaginationDto,
}

/// Raw query-string parameters. Everything is taken as a string and
/// coerced leniently: unparseable numbers fall back to their defaults
/// instead of erroring.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub status: Option<String>,
    pub categoria_id: Option<String>,
    pub busca: Option<String>,
}

impl ListParams {
    fn into_query(self) -> DeviceListQuery {
        DeviceListQuery {
            page: self
                .page
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PAGE),
            limit: self
                .limit
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LIMIT),
            sort: self.sort.unwrap_or_else(|| "id".to_string()),
            order: self.order.unwrap_or_else(|| "asc".to_string()),
            status: self.status,
            categoria_id: self.categoria_id.and_then(|s| s.parse().ok()),
            busca: self.busca,
        }
    }
}

/// POST /dispositivos
pub async fn create_dispositivo(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let valid = validation::validate(&payload, validation::DISPOSITIVO_SCHEMA, Mode::Strict)?;

    let nome = valid
        .str("nome")
        .ok_or_else(|| ApiError::internal("validated payload missing nome"))?;
    let serial = valid
        .str("serial")
        .ok_or_else(|| ApiError::internal("validated payload missing serial"))?;
    let categoria_id = valid.opt_int("categoria_id").flatten();
    let status = valid.str("status");

    let created = state
        .store()
        .create_dispositivo(nome, serial, categoria_id, status)
        .await?;

    Ok((StatusCode::CREATED, Json(DispositivoDto::from(created))))
}

/// GET /dispositivos
pub async fn list_dispositivos(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<DeviceListResponse>, ApiError> {
    let page = state.store().list_dispositivos(params.into_query()).await?;

    Ok(Json(DeviceListResponse {
        items: page.items.into_iter().map(DispositivoDto::from).collect(),
        pagination: PaginationDto {
            total_records: page.total_records,
            total_pages: page.total_pages,
            current_page: page.current_page,
            limit: page.limit,
        },
    }))
}

/// GET /dispositivos/{id}
pub async fn get_dispositivo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<DispositivoDto>, ApiError> {
    let record = state.store().get_dispositivo(id).await?;
    Ok(Json(DispositivoDto::from(record)))
}

/// PUT|PATCH /dispositivos/{id}
///
/// Partial semantics: `categoria_id` supplied as null clears the link;
/// omitting the key leaves it unchanged.
pub async fn update_dispositivo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<Value>,
) -> Result<Json<DispositivoDto>, ApiError> {
    let valid = validation::validate(&payload, validation::DISPOSITIVO_SCHEMA, Mode::Partial)?;

    let update = DeviceUpdate {
        nome: valid.str("nome"),
        serial: valid.str("serial"),
        status: valid.str("status"),
        categoria_id: valid.opt_int("categoria_id"),
    };

    let updated = state.store().update_dispositivo(id, update).await?;

    Ok(Json(DispositivoDto::from(updated)))
}

/// DELETE /dispositivos/{id}
pub async fn delete_dispositivo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.store().delete_dispositivo(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
