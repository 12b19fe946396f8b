use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::validation::{self, Mode};
use super::{ApiError, AppState};
use crate::entities::categorias;

#[derive(Debug, Serialize)]
pub struct CategoriaDto {
    pub id: i32,
    pub nome: String,
    pub descricao: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<categorias::Model> for CategoriaDto {
    fn from(model: categorias::Model) -> Self {
        Self {
            id: model.id,
            nome: model.nome,
            descricao: model.descricao,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// POST /categorias
pub async fn create_categoria(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let valid = validation::validate(&payload, validation::CATEGORIA_SCHEMA, Mode::Strict)?;

    let nome = valid
        .str("nome")
        .ok_or_else(|| ApiError::internal("validated payload missing nome"))?;
    let descricao = valid.opt_str("descricao").flatten();

    let created = state.store().create_categoria(nome, descricao).await?;

    Ok((StatusCode::CREATED, Json(CategoriaDto::from(created))))
}

/// GET /categorias
pub async fn list_categorias(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoriaDto>>, ApiError> {
    let all = state.store().list_categorias().await?;
    Ok(Json(all.into_iter().map(CategoriaDto::from).collect()))
}

/// GET /categorias/{id}
pub async fn get_categoria(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<CategoriaDto>, ApiError> {
    let categoria = state.store().get_categoria(id).await?;
    Ok(Json(CategoriaDto::from(categoria)))
}

/// PUT|PATCH /categorias/{id}
///
/// Partial semantics: only supplied keys are applied; `descricao` supplied
/// as null clears the field.
pub async fn update_categoria(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<Value>,
) -> Result<Json<CategoriaDto>, ApiError> {
    let valid = validation::validate(&payload, validation::CATEGORIA_SCHEMA, Mode::Partial)?;

    let nome = valid.str("nome");
    let descricao = valid.opt_str("descricao");

    let updated = state.store().update_categoria(id, nome, descricao).await?;

    Ok(Json(CategoriaDto::from(updated)))
}

/// DELETE /categorias/{id}
pub async fn delete_categoria(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.store().delete_categoria(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
