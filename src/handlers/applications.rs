// src/handlers/applications.rs

use axum::{
    extract::{Path, Query, State},
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
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminTier, GroupScoped, RequireRole},
        tenancy::PartnerGroupContext,
    },
    models::application::{
        ApplicationChanges, ApplicationFilter, AttachPolicyPayload, BulkApprovalResponse,
        CreateApplicationPayload, ForceDeletePayload, ForceUpdatePayload, InsuranceApplication,
    },
};

// =============================================================================
//  1. CONSULTA
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/applications",
    tag = "Applications",
    params(ApplicationFilter),
    responses(
        (status = 200, description = "Pedidos visíveis para a sessão, com status recalculado", body = Vec<InsuranceApplication>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_applications(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(filter): Query<ApplicationFilter>,
) -> Result<Json<Vec<InsuranceApplication>>, ApiError> {
    let apps = app_state
        .application_service
        .list(&principal, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(apps))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    tag = "Applications",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Pedido", body = InsuranceApplication),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_application(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<InsuranceApplication>, ApiError> {
    let app = app_state
        .application_service
        .get(&principal, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(app))
}

// =============================================================================
//  2. CRIAÇÃO E EDIÇÃO
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/applications",
    tag = "Applications",
    request_body = CreateApplicationPayload,
    responses(
        (status = 201, description = "Pedido criado em APPLIED", body = InsuranceApplication),
        (status = 400, description = "Campos obrigatórios ausentes")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_application(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<GroupScoped>,
    Json(payload): Json<CreateApplicationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let app = app_state
        .application_service
        .create(&principal, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(app)))
}

#[utoipa::path(
    put,
    path = "/api/applications/{id}",
    tag = "Applications",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = ApplicationChanges,
    responses(
        (status = 200, description = "Pedido atualizado", body = InsuranceApplication),
        (status = 409, description = "Pedido já aprovado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_application(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApplicationChanges>,
) -> Result<Json<InsuranceApplication>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let app = app_state
        .application_service
        .update(&principal, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(app))
}

#[utoipa::path(
    delete,
    path = "/api/applications/{id}",
    tag = "Applications",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 204, description = "Pedido excluído"),
        (status = 409, description = "Pedido já aprovado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_application(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .application_service
        .delete(&principal, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  3. APROVAÇÃO
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/applications/{id}/approve",
    tag = "Applications",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Pedido aprovado (idempotente)", body = InsuranceApplication),
        (status = 409, description = "Saldo de pontos do membro insuficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_application(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: PartnerGroupContext,
    Path(id): Path<Uuid>,
) -> Result<Json<InsuranceApplication>, ApiError> {
    let app = app_state
        .application_service
        .approve(&ctx.principal, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(app))
}

#[utoipa::path(
    post,
    path = "/api/applications/approve-all",
    tag = "Applications",
    responses(
        (status = 200, description = "Pedidos pendentes do grupo aprovados; os sem pontos ficam em skippedIds", body = BulkApprovalResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_all_applications(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: PartnerGroupContext,
) -> Result<Json<BulkApprovalResponse>, ApiError> {
    let response = app_state
        .application_service
        .approve_all(&ctx.principal)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(response))
}

// =============================================================================
//  4. CORREÇÃO ADMINISTRATIVA
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/applications/{id}/force-update",
    tag = "Applications",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = ForceUpdatePayload,
    responses(
        (status = 200, description = "Pedido corrigido e auditado", body = InsuranceApplication)
    ),
    security(("api_jwt" = []))
)]
pub async fn force_update_application(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<AdminTier>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ForceUpdatePayload>,
) -> Result<Json<InsuranceApplication>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let app = app_state
        .application_service
        .force_update(&principal, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(app))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/force-delete",
    tag = "Applications",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = ForceDeletePayload,
    responses(
        (status = 204, description = "Pedido excluído e auditado")
    ),
    security(("api_jwt" = []))
)]
pub async fn force_delete_application(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<AdminTier>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ForceDeletePayload>,
) -> Result<StatusCode, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .application_service
        .force_delete(&principal, id, &payload.reason)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/applications/{id}/policy-document",
    tag = "Applications",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = AttachPolicyPayload,
    responses(
        (status = 200, description = "Documento da apólice vinculado", body = InsuranceApplication)
    ),
    security(("api_jwt" = []))
)]
pub async fn attach_policy_document(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<AdminTier>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AttachPolicyPayload>,
) -> Result<Json<InsuranceApplication>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let app = app_state
        .application_service
        .attach_policy_document(&principal, id, &payload.policy_document_url)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(app))
}
