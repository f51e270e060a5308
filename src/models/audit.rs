// src/models/audit.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "actor_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorKind {
    GlobalAdmin,
    // Administrador global operando dentro de um grupo selecionado
    GlobalAdminActing,
    PartnerAdmin,
    Member,
    System,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub actor_kind: ActorKind,
    pub actor_id: Option<Uuid>,
    pub partner_group_id: Option<Uuid>,
    pub action: String,
    pub target_id: Option<Uuid>,

    #[schema(value_type = Object)]
    pub detail: Value,

    pub created_at: NaiveDateTime,
}

/// Registro a ser gravado, montado pelos serviços.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub actor_kind: ActorKind,
    pub actor_id: Option<Uuid>,
    pub partner_group_id: Option<Uuid>,
    pub action: &'static str,
    pub target_id: Option<Uuid>,
    pub detail: Value,
}

impl AuditEntry {
    pub fn target(mut self, id: Uuid) -> Self {
        self.target_id = Some(id);
        self
    }

    pub fn detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }

    /// Detalhe das edições de conta: só registra se a senha foi trocada.
    pub fn password_reset(self, reset: bool) -> Self {
        self.detail(json!({ "passwordReset": reset }))
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilter {
    pub partner_group_id: Option<Uuid>,
    pub action: Option<String>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(action: &'static str) -> AuditEntry {
        AuditEntry {
            actor_kind: ActorKind::GlobalAdmin,
            actor_id: None,
            partner_group_id: None,
            action,
            target_id: None,
            detail: json!({}),
        }
    }

    #[test]
    fn account_edits_share_the_password_reset_key() {
        let group = entry("partner_group.update").password_reset(true);
        let member = entry("member.update").password_reset(false);

        assert_eq!(group.detail, json!({ "passwordReset": true }));
        assert_eq!(member.detail["passwordReset"], json!(false));
        assert!(group.detail.get("password_reset").is_none());
    }
}
