// src/handlers/location_types.rs

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
};

// POST /api/location-types/import
#[utoipa::path(
    post,
    path = "/api/location-types/import",
    tag = "Location Types",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Lote importado"),
        (status = 400, description = "Erros de linha ou de negócio")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_location_types(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let imported = app_state
        .location_type_service
        .import_location_types(&user.0.sub, &body)
        .await?;

    Ok((StatusCode::OK, Json(json!({ "imported": imported }))))
}

// GET /api/location-types/export
#[utoipa::path(
    get,
    path = "/api/location-types/export",
    tag = "Location Types",
    responses(
        (status = 200, description = "CSV com todos os tipos", content_type = "text/csv")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_location_types(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let csv = app_state.location_type_service.export_location_types().await?;
    Ok(([(header::CONTENT_TYPE, "text/csv")], csv))
}

// GET /api/location-types
#[utoipa::path(
    get,
    path = "/api/location-types",
    tag = "Location Types",
    responses(
        (status = 200, description = "A taxonomia completa, do nível 0 para baixo")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_location_types(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let types = app_state.location_type_service.get_all_location_types().await?;
    Ok(Json(types))
}

// ---
// Payloads dos endpoints avulsos
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocationTypePayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "center")]
    pub name: String,

    #[validate(length(min = 1, message = "O nome de exibição é obrigatório."))]
    #[schema(example = "Centro")]
    pub display_name: String,

    #[validate(range(min = 1, message = "O nível deve ser maior que zero."))]
    #[schema(example = 2)]
    pub level: i32,
}

// POST /api/location-types
#[utoipa::path(
    post,
    path = "/api/location-types",
    tag = "Location Types",
    request_body = CreateLocationTypePayload,
    responses(
        (status = 201, description = "Tipo criado no fim da cadeia"),
        (status = 400, description = "levelAlreadyExisted / nível fora de sequência")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_location_type(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateLocationTypePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let location_type = app_state
        .location_type_service
        .create_location_type(&user.0.sub, &payload.name, &payload.display_name, payload.level)
        .await?;

    Ok((StatusCode::CREATED, Json(location_type)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationTypePayload {
    #[validate(length(min = 1, message = "O nome de exibição é obrigatório."))]
    pub display_name: Option<String>,

    #[validate(range(min = 1, message = "O nível deve ser maior que zero."))]
    pub level: Option<i32>,
}

// PUT /api/location-types/{id}
#[utoipa::path(
    put,
    path = "/api/location-types/{id}",
    tag = "Location Types",
    request_body = UpdateLocationTypePayload,
    params(("id" = String, Path, description = "ID do tipo")),
    responses(
        (status = 200, description = "Tipo atualizado"),
        (status = 400, description = "levelAlreadyExisted / levelSwapped"),
        (status = 404, description = "Tipo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_location_type(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateLocationTypePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let location_type = app_state
        .location_type_service
        .update_location_type(&id, payload.display_name.as_deref(), payload.level)
        .await?;

    Ok(Json(location_type))
}
