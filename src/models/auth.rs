// src/models/auth.rs

use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::audit::{ActorKind, AuditEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    Admin,
    PartnerAdmin,
    Member,
}

// Estrutura de dados ("claims") dentro do JWT.
// É apenas uma dica: a identidade é sempre reconferida no banco.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,           // ID do membro, ou do grupo para partner_admin
    pub role: SessionRole,
    pub pg: Option<Uuid>,    // Grupo da sessão
    pub acting: Option<Uuid>, // Grupo selecionado pelo administrador global
    pub exp: usize,
    pub iat: usize,
}

/// Papel efetivo de quem faz a requisição, já conferido no banco.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    GlobalAdmin {
        member_id: Uuid,
        acting_group: Option<Uuid>,
    },
    PartnerAdmin {
        partner_group_id: Uuid,
    },
    Member {
        member_id: Uuid,
        partner_group_id: Uuid,
    },
}

impl Principal {
    /// Grupo cujos dados a sessão enxerga (nenhum para o global fora de um grupo).
    pub fn partner_scope(&self) -> Option<Uuid> {
        match self {
            Principal::GlobalAdmin { acting_group, .. } => *acting_group,
            Principal::PartnerAdmin { partner_group_id }
            | Principal::Member { partner_group_id, .. } => Some(*partner_group_id),
        }
    }

    /// Grupo que a sessão administra (admin do grupo ou global atuando nele).
    pub fn administered_group(&self) -> Option<Uuid> {
        match self {
            Principal::GlobalAdmin { acting_group, .. } => *acting_group,
            Principal::PartnerAdmin { partner_group_id } => Some(*partner_group_id),
            Principal::Member { .. } => None,
        }
    }

    pub fn is_global_admin(&self) -> bool {
        matches!(self, Principal::GlobalAdmin { .. })
    }

    pub fn is_admin_tier(&self) -> bool {
        !matches!(self, Principal::Member { .. })
    }

    pub fn member_id(&self) -> Option<Uuid> {
        match self {
            Principal::Member { member_id, .. } => Some(*member_id),
            _ => None,
        }
    }

    pub fn session_role(&self) -> SessionRole {
        match self {
            Principal::GlobalAdmin { .. } => SessionRole::Admin,
            Principal::PartnerAdmin { .. } => SessionRole::PartnerAdmin,
            Principal::Member { .. } => SessionRole::Member,
        }
    }

    pub fn actor_kind(&self) -> ActorKind {
        match self {
            Principal::GlobalAdmin { acting_group: None, .. } => ActorKind::GlobalAdmin,
            Principal::GlobalAdmin { acting_group: Some(_), .. } => ActorKind::GlobalAdminActing,
            Principal::PartnerAdmin { .. } => ActorKind::PartnerAdmin,
            Principal::Member { .. } => ActorKind::Member,
        }
    }

    /// Começa um registro de auditoria em nome desta sessão.
    pub fn audit(&self, action: &'static str) -> AuditEntry {
        let actor_id = match self {
            Principal::GlobalAdmin { member_id, .. } | Principal::Member { member_id, .. } => {
                Some(*member_id)
            }
            Principal::PartnerAdmin { partner_group_id } => Some(*partner_group_id),
        };

        AuditEntry {
            actor_kind: self.actor_kind(),
            actor_id,
            partner_group_id: self.partner_scope(),
            action,
            target_id: None,
            detail: json!({}),
        }
    }
}

// Login do administrador global
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginPayload {
    #[validate(length(min = 1, message = "input.required"))]
    pub username: String,

    #[validate(length(min = 1, message = "input.required"))]
    pub password: String,
}

// Login dentro de um grupo (administrador do grupo ou membro)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupLoginPayload {
    pub partner_group_id: Uuid,

    #[validate(length(min = 1, message = "input.required"))]
    pub username: String,

    #[validate(length(min = 1, message = "input.required"))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub role: SessionRole,
    pub partner_group_id: Option<Uuid>,
    pub acting_partner_group_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub role: SessionRole,
    pub member_id: Option<Uuid>,
    pub partner_group_id: Option<Uuid>,
    pub impersonating: bool,
}

impl From<&Principal> for SessionView {
    fn from(principal: &Principal) -> Self {
        let member_id = match principal {
            Principal::GlobalAdmin { member_id, .. } | Principal::Member { member_id, .. } => {
                Some(*member_id)
            }
            Principal::PartnerAdmin { .. } => None,
        };

        Self {
            role: principal.session_role(),
            member_id,
            partner_group_id: principal.partner_scope(),
            impersonating: principal.actor_kind() == ActorKind::GlobalAdminActing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impersonation_is_visible_in_audit_entries() {
        let group = Uuid::new_v4();
        let admin = Uuid::new_v4();

        let own = Principal::PartnerAdmin { partner_group_id: group }.audit("application.approve");
        let acting = Principal::GlobalAdmin {
            member_id: admin,
            acting_group: Some(group),
        }
        .audit("application.approve");

        assert_eq!(own.actor_kind, ActorKind::PartnerAdmin);
        assert_eq!(acting.actor_kind, ActorKind::GlobalAdminActing);
        assert_eq!(acting.actor_id, Some(admin));
        assert_eq!(acting.partner_group_id, Some(group));
    }

    #[test]
    fn only_admins_administer_groups() {
        let group = Uuid::new_v4();
        let member = Principal::Member {
            member_id: Uuid::new_v4(),
            partner_group_id: group,
        };
        assert_eq!(member.partner_scope(), Some(group));
        assert_eq!(member.administered_group(), None);

        let global = Principal::GlobalAdmin {
            member_id: Uuid::new_v4(),
            acting_group: None,
        };
        assert_eq!(global.partner_scope(), None);
        assert!(global.is_admin_tier());
    }
}
