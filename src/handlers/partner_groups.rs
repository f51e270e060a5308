// src/handlers/partner_groups.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{GlobalAdminOnly, RequireRole},
    },
    models::auth::AuthResponse,
    models::partner_group::{
        CreatePartnerGroupPayload, PartnerGroup, PartnerGroupSummary, UpdatePartnerGroupPayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/partner-groups/public",
    tag = "Partner Groups",
    responses(
        (status = 200, description = "Grupos para o seletor de login", body = Vec<PartnerGroupSummary>)
    )
)]
pub async fn list_public(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<Json<Vec<PartnerGroupSummary>>, ApiError> {
    let groups = app_state
        .partner_group_service
        .list_public()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(groups))
}

#[utoipa::path(
    get,
    path = "/api/admin/partner-groups",
    tag = "Partner Groups",
    responses(
        (status = 200, description = "Todos os grupos", body = Vec<PartnerGroup>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_partner_groups(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<GlobalAdminOnly>,
) -> Result<Json<Vec<PartnerGroup>>, ApiError> {
    let groups = app_state
        .partner_group_service
        .list()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(groups))
}

#[utoipa::path(
    post,
    path = "/api/admin/partner-groups",
    tag = "Partner Groups",
    request_body = CreatePartnerGroupPayload,
    responses(
        (status = 201, description = "Grupo criado", body = PartnerGroup),
        (status = 409, description = "Nome, login ou número de registro duplicado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_partner_group(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<GlobalAdminOnly>,
    Json(payload): Json<CreatePartnerGroupPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let group = app_state
        .partner_group_service
        .create(&principal, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    get,
    path = "/api/admin/partner-groups/{id}",
    tag = "Partner Groups",
    params(("id" = Uuid, Path, description = "ID do grupo")),
    responses(
        (status = 200, description = "Grupo", body = PartnerGroup),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_partner_group(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<GlobalAdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<Json<PartnerGroup>, ApiError> {
    let group = app_state
        .partner_group_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(group))
}

#[utoipa::path(
    put,
    path = "/api/admin/partner-groups/{id}",
    tag = "Partner Groups",
    params(("id" = Uuid, Path, description = "ID do grupo")),
    request_body = UpdatePartnerGroupPayload,
    responses(
        (status = 200, description = "Grupo atualizado", body = PartnerGroup)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_partner_group(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<GlobalAdminOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePartnerGroupPayload>,
) -> Result<Json<PartnerGroup>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let group = app_state
        .partner_group_service
        .update(&principal, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(group))
}

#[utoipa::path(
    delete,
    path = "/api/admin/partner-groups/{id}",
    tag = "Partner Groups",
    params(("id" = Uuid, Path, description = "ID do grupo")),
    responses(
        (status = 204, description = "Grupo excluído"),
        (status = 409, description = "Ainda há membros ou pedidos no grupo")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_partner_group(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<GlobalAdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .partner_group_service
        .delete(&principal, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/admin/partner-groups/{id}/select",
    tag = "Partner Groups",
    params(("id" = Uuid, Path, description = "ID do grupo")),
    responses(
        (status = 200, description = "Novo token atuando no grupo", body = AuthResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn select_partner_group(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<GlobalAdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<Json<AuthResponse>, ApiError> {
    let response = app_state
        .auth_service
        .select_partner_group(&principal, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/admin/partner-groups/deselect",
    tag = "Partner Groups",
    responses(
        (status = 200, description = "Novo token sem grupo selecionado", body = AuthResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn deselect_partner_group(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<GlobalAdminOnly>,
) -> Result<Json<AuthResponse>, ApiError> {
    let response = app_state
        .auth_service
        .deselect_partner_group(&principal)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(response))
}
