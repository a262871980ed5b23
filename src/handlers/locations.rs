// src/handlers/locations.rs

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::{
    common::error::AppError,
    config::AppState,
    db::LowestLevelParams,
    middleware::auth::AuthenticatedUser,
};

// POST /api/locations/import
#[utoipa::path(
    post,
    path = "/api/locations/import",
    tag = "Locations",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Lote importado"),
        (status = 400, description = "Erros de linha ou de negócio")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_locations(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let imported = app_state
        .location_service
        .import_locations(&user.0.sub, &body)
        .await?;

    Ok((StatusCode::OK, Json(json!({ "imported": imported }))))
}

// GET /api/locations/export
#[utoipa::path(
    get,
    path = "/api/locations/export",
    tag = "Locations",
    responses(
        (status = 200, description = "CSV com todas as localizações", content_type = "text/csv")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_locations(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let csv = app_state.location_service.export_locations().await?;
    Ok(([(header::CONTENT_TYPE, "text/csv")], csv))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListLocationsQuery {
    #[serde(default)]
    pub include_archived: bool,
}

// GET /api/locations
#[utoipa::path(
    get,
    path = "/api/locations",
    tag = "Locations",
    params(ListLocationsQuery),
    responses(
        (status = 200, description = "Lista plana, completada com ancestrais UnAuthorized")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_locations(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListLocationsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let locations = app_state
        .location_reader_service
        .list_locations(&user.0.locations, query.include_archived)
        .await?;

    Ok(Json(locations))
}

// GET /api/locations/tree
#[utoipa::path(
    get,
    path = "/api/locations/tree",
    tag = "Locations",
    responses(
        (status = 200, description = "A árvore autorizada do chamador")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_location_tree(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let tree = app_state
        .location_reader_service
        .get_location_tree(&user.0.sub, &user.0.locations)
        .await?;

    Ok(Json(tree))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct LowestLevelQuery {
    #[serde(default)]
    pub name: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// GET /api/locations/lowest
#[utoipa::path(
    get,
    path = "/api/locations/lowest",
    tag = "Locations",
    params(LowestLevelQuery),
    responses(
        (status = 200, description = "Localizações do nível mais profundo")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_lowest_level_locations(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<LowestLevelQuery>,
) -> Result<impl IntoResponse, AppError> {
    let params = LowestLevelParams {
        name: query.name,
        limit: query.limit.unwrap_or(10),
        offset: query.offset.unwrap_or(0),
        location_ids: user.0.locations.clone(),
    };
    let locations = app_state
        .location_reader_service
        .retrieve_lowest_level_locations(&params)
        .await?;

    Ok(Json(locations))
}
