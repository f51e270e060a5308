// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    common::error::{ApiError, AppError},
    common::i18n::I18nStore,
    config::AppState,
    middleware::i18n::Locale,
    models::auth::Principal,
};

/// Exige `Authorization: Bearer` e resolve o papel efetivo no banco a cada requisição.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let TypedHeader(Authorization(bearer)) = bearer.ok_or_else(|| to_api(AppError::InvalidToken))?;

    let claims = app_state
        .auth_service
        .decode_token(bearer.token())
        .map_err(to_api)?;
    let principal = app_state
        .auth_service
        .resolve_role(&claims)
        .await
        .map_err(to_api)?;

    // Insere o papel resolvido nos "extensions" da requisição
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

// Extrator para obter a sessão autenticada diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or_else(|| {
                AppError::InvalidToken
                    .to_api_error(&Locale::from_headers(&parts.headers), &I18nStore)
            })
    }
}
