// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    common::i18n::I18nStore,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::Principal,
};

/// 1. O Trait que define uma exigência de papel
pub trait RoleRequirement: Send + Sync + 'static {
    fn allows(principal: &Principal) -> bool;
}

/// 2. O Extractor (Guardião). Entrega o papel já conferido.
pub struct RequireRole<T>(pub Principal, pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleRequirement,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(principal) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !T::allows(&principal) {
            tracing::warn!("Acesso negado para {:?}", principal.session_role());
            return Err(AppError::Forbidden
                .to_api_error(&Locale::from_headers(&parts.headers), &I18nStore));
        }

        Ok(RequireRole(principal, PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS EXIGÊNCIAS (TIPOS)
// ---

/// Telas do administrador global (com ou sem grupo selecionado).
pub struct GlobalAdminOnly;
impl RoleRequirement for GlobalAdminOnly {
    fn allows(principal: &Principal) -> bool {
        principal.is_global_admin()
    }
}

/// Qualquer administrador: global, global atuando ou do grupo.
pub struct AdminTier;
impl RoleRequirement for AdminTier {
    fn allows(principal: &Principal) -> bool {
        principal.is_admin_tier()
    }
}

/// Administra um grupo: admin do grupo ou global atuando nele.
pub struct GroupAdmin;
impl RoleRequirement for GroupAdmin {
    fn allows(principal: &Principal) -> bool {
        principal.administered_group().is_some()
    }
}

/// Pertence a um grupo resolvido (membro ou administrador do grupo).
pub struct GroupScoped;
impl RoleRequirement for GroupScoped {
    fn allows(principal: &Principal) -> bool {
        principal.partner_scope().is_some()
    }
}

pub struct MemberOnly;
impl RoleRequirement for MemberOnly {
    fn allows(principal: &Principal) -> bool {
        matches!(principal, Principal::Member { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn all() -> [Principal; 4] {
        let group = Uuid::new_v4();
        [
            Principal::GlobalAdmin {
                member_id: Uuid::new_v4(),
                acting_group: None,
            },
            Principal::GlobalAdmin {
                member_id: Uuid::new_v4(),
                acting_group: Some(group),
            },
            Principal::PartnerAdmin { partner_group_id: group },
            Principal::Member {
                member_id: Uuid::new_v4(),
                partner_group_id: group,
            },
        ]
    }

    fn allowed<T: RoleRequirement>() -> [bool; 4] {
        all().map(|p| T::allows(&p))
    }

    #[test]
    fn requirements_match_the_role_matrix() {
        assert_eq!(allowed::<GlobalAdminOnly>(), [true, true, false, false]);
        assert_eq!(allowed::<AdminTier>(), [true, true, true, false]);
        assert_eq!(allowed::<GroupAdmin>(), [false, true, true, false]);
        assert_eq!(allowed::<GroupScoped>(), [false, true, true, true]);
        assert_eq!(allowed::<MemberOnly>(), [false, false, false, true]);
    }
}
