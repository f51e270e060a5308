// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::{AdminLoginPayload, AuthResponse, GroupLoginPayload, SessionView},
    models::member::{Member, RegisterMemberPayload},
};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterMemberPayload,
    responses(
        (status = 201, description = "Cadastro recebido, aguardando aprovação", body = Member),
        (status = 409, description = "Login ou número de registro duplicado")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<RegisterMemberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let member = app_state
        .member_service
        .register(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = GroupLoginPayload,
    responses(
        (status = 200, description = "Login do membro", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas"),
        (status = 403, description = "Cadastro aguardando aprovação")
    )
)]
pub async fn login_member(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<GroupLoginPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .auth_service
        .login_member(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/partner/login",
    tag = "Auth",
    request_body = GroupLoginPayload,
    responses(
        (status = 200, description = "Login do administrador do grupo", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login_partner_admin(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<GroupLoginPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .auth_service
        .login_partner_admin(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/admin/login",
    tag = "Auth",
    request_body = AdminLoginPayload,
    responses(
        (status = 200, description = "Login do administrador global", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login_admin(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<AdminLoginPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .auth_service
        .login_admin(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(response))
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Sessão atual", body = SessionView)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(principal): AuthenticatedUser) -> Json<SessionView> {
    Json(SessionView::from(&principal))
}
