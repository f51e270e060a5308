// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    common::i18n::I18nStore,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::Principal,
};

// O grupo administrado pela sessão, junto com o papel que o administra.
// Vem do papel resolvido, nunca de um cabeçalho enviado pelo cliente.
#[derive(Debug, Clone)]
pub struct PartnerGroupContext {
    pub partner_group_id: Uuid,
    pub principal: Principal,
}

impl<S> FromRequestParts<S> for PartnerGroupContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(principal) = AuthenticatedUser::from_request_parts(parts, state).await?;

        match principal.administered_group() {
            Some(partner_group_id) => Ok(PartnerGroupContext {
                partner_group_id,
                principal,
            }),
            None => Err(AppError::Forbidden
                .to_api_error(&Locale::from_headers(&parts.headers), &I18nStore)),
        }
    }
}
