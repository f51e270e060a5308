// src/handlers/members.rs

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
        rbac::{AdminTier, GlobalAdminOnly, MemberOnly, RequireRole},
        tenancy::PartnerGroupContext,
    },
    models::auth::Principal,
    models::member::{
        CreateMemberPayload, Member, MemberFilter, UpdateMemberPayload, UpdateProfilePayload,
    },
};

// =============================================================================
//  1. PERFIL DO PRÓPRIO MEMBRO
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/members/me",
    tag = "Members",
    responses(
        (status = 200, description = "Perfil do membro logado", body = Member)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_profile(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<MemberOnly>,
) -> Result<Json<Member>, ApiError> {
    let Principal::Member { member_id, .. } = principal else {
        return Err(AppError::Forbidden.to_api_error(&locale, &app_state.i18n_store));
    };

    let member = app_state
        .member_service
        .profile(member_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(member))
}

#[utoipa::path(
    put,
    path = "/api/members/me",
    tag = "Members",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Perfil atualizado", body = Member)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_profile(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<MemberOnly>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<Member>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let Principal::Member { member_id, .. } = principal else {
        return Err(AppError::Forbidden.to_api_error(&locale, &app_state.i18n_store));
    };

    let member = app_state
        .member_service
        .update_profile(member_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(member))
}

// =============================================================================
//  2. GESTÃO DE MEMBROS DO GRUPO
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/partner/members",
    tag = "Members",
    params(MemberFilter),
    responses(
        (status = 200, description = "Membros do grupo", body = Vec<Member>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: PartnerGroupContext,
    Query(filter): Query<MemberFilter>,
) -> Result<Json<Vec<Member>>, ApiError> {
    let members = app_state
        .member_service
        .list(ctx.partner_group_id, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(members))
}

#[utoipa::path(
    post,
    path = "/api/partner/members",
    tag = "Members",
    request_body = CreateMemberPayload,
    responses(
        (status = 201, description = "Membro criado no grupo", body = Member),
        (status = 409, description = "Login ou número de registro duplicado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_group_member(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: PartnerGroupContext,
    Json(payload): Json<CreateMemberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let member = app_state
        .member_service
        .create(&ctx.principal, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    get,
    path = "/api/partner/members/{id}",
    tag = "Members",
    params(("id" = Uuid, Path, description = "ID do membro")),
    responses(
        (status = 200, description = "Membro", body = Member),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_member(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<AdminTier>,
    Path(id): Path<Uuid>,
) -> Result<Json<Member>, ApiError> {
    let member = app_state
        .member_service
        .get(&principal, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(member))
}

#[utoipa::path(
    put,
    path = "/api/partner/members/{id}",
    tag = "Members",
    params(("id" = Uuid, Path, description = "ID do membro")),
    request_body = UpdateMemberPayload,
    responses(
        (status = 200, description = "Membro atualizado", body = Member)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_member(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<AdminTier>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMemberPayload>,
) -> Result<Json<Member>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let member = app_state
        .member_service
        .update(&principal, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(member))
}

#[utoipa::path(
    post,
    path = "/api/partner/members/{id}/approve",
    tag = "Members",
    params(("id" = Uuid, Path, description = "ID do membro")),
    responses(
        (status = 200, description = "Cadastro aprovado", body = Member)
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_member(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<AdminTier>,
    Path(id): Path<Uuid>,
) -> Result<Json<Member>, ApiError> {
    let member = app_state
        .member_service
        .approve(&principal, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(member))
}

#[utoipa::path(
    delete,
    path = "/api/partner/members/{id}",
    tag = "Members",
    params(("id" = Uuid, Path, description = "ID do membro")),
    responses(
        (status = 204, description = "Membro excluído"),
        (status = 409, description = "O membro ainda tem pedidos ou pontos")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_member(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<AdminTier>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .member_service
        .delete(&principal, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  3. CRIAÇÃO PELO ADMINISTRADOR GLOBAL
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/admin/members",
    tag = "Members",
    request_body = CreateMemberPayload,
    responses(
        (status = 201, description = "Membro ou administrador global criado", body = Member)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_member(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<GlobalAdminOnly>,
    Json(payload): Json<CreateMemberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let member = app_state
        .member_service
        .create(&principal, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(member)))
}
