// src/handlers/points.rs

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
        i18n::Locale,
        rbac::{GroupScoped, MemberOnly, RequireRole},
        tenancy::PartnerGroupContext,
    },
    models::points::{
        CreateAdjustmentPayload, CreateDepositRequestPayload, DepositRequest, PointAdjustment,
        PointsFilter,
    },
};

#[utoipa::path(
    post,
    path = "/api/points/deposit-requests",
    tag = "Points",
    request_body = CreateDepositRequestPayload,
    responses(
        (status = 201, description = "Pedido de depósito registrado", body = DepositRequest)
    ),
    security(("api_jwt" = []))
)]
pub async fn request_deposit(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<MemberOnly>,
    Json(payload): Json<CreateDepositRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let request = app_state
        .points_service
        .request_deposit(&principal, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    get,
    path = "/api/points/deposit-requests",
    tag = "Points",
    params(PointsFilter),
    responses(
        (status = 200, description = "Pedidos de depósito do grupo (ou do próprio membro)", body = Vec<DepositRequest>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_deposit_requests(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<GroupScoped>,
    Query(filter): Query<PointsFilter>,
) -> Result<Json<Vec<DepositRequest>>, ApiError> {
    let requests = app_state
        .points_service
        .list_deposit_requests(&principal, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(requests))
}

#[utoipa::path(
    post,
    path = "/api/points/deposit-requests/{id}/confirm",
    tag = "Points",
    params(("id" = Uuid, Path, description = "ID do pedido de depósito")),
    responses(
        (status = 200, description = "Depósito confirmado e creditado", body = DepositRequest),
        (status = 409, description = "Depósito já confirmado")
    ),
    security(("api_jwt" = []))
)]
pub async fn confirm_deposit(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: PartnerGroupContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DepositRequest>, ApiError> {
    let request = app_state
        .points_service
        .confirm_deposit(&ctx.principal, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(request))
}

#[utoipa::path(
    get,
    path = "/api/points/adjustments",
    tag = "Points",
    params(PointsFilter),
    responses(
        (status = 200, description = "Histórico de movimentações", body = Vec<PointAdjustment>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_adjustments(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<GroupScoped>,
    Query(filter): Query<PointsFilter>,
) -> Result<Json<Vec<PointAdjustment>>, ApiError> {
    let adjustments = app_state
        .points_service
        .list_adjustments(&principal, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(adjustments))
}

#[utoipa::path(
    post,
    path = "/api/points/adjustments",
    tag = "Points",
    request_body = CreateAdjustmentPayload,
    responses(
        (status = 201, description = "Ajuste manual aplicado", body = PointAdjustment),
        (status = 409, description = "Saldo insuficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_adjustment(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: PartnerGroupContext,
    Json(payload): Json<CreateAdjustmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let adjustment = app_state
        .points_service
        .adjust(&ctx.principal, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(adjustment)))
}
