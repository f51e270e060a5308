// src/services/bootstrap.rs

//! Provisionamento do administrador global. Só roda pela linha de comando
//! (`bootstrap-admin`); nunca existe credencial fixa no caminho de login.

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    common::time::now_kst,
    db::{AuditRepository, BootstrapState, MemberRepository, SystemRepository},
    models::audit::{ActorKind, AuditEntry},
    models::member::Member,
    services::auth::hash_password,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapAction {
    Create,
    Repair(Uuid),
}

/// Decide o que fazer: criar, consertar a linha existente ou recusar.
///
/// Depois da primeira execução só `--repair` é aceito, e ele sempre age
/// sobre o administrador registrado no estado do sistema, mesmo que o
/// nome de usuário informado seja outro. Criar de novo nunca acontece.
pub fn plan(
    state: BootstrapState,
    existing_admin: Option<Uuid>,
    repair: bool,
) -> Result<BootstrapAction, AppError> {
    if !state.completed {
        return Ok(match existing_admin {
            Some(id) => BootstrapAction::Repair(id),
            None => BootstrapAction::Create,
        });
    }
    if !repair {
        return Err(AppError::InvalidState("state.bootstrap_already_completed"));
    }
    state
        .admin_id
        .or(existing_admin)
        .map(BootstrapAction::Repair)
        .ok_or(AppError::InvalidState("state.bootstrap_admin_missing"))
}

#[derive(Clone)]
pub struct BootstrapService {
    member_repo: MemberRepository,
    system_repo: SystemRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl BootstrapService {
    pub fn new(
        member_repo: MemberRepository,
        system_repo: SystemRepository,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            member_repo,
            system_repo,
            audit_repo,
            pool,
        }
    }

    pub async fn run(&self, username: &str, password: &str, repair: bool) -> Result<Member, AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::InvalidInput("input.required"));
        }
        if password.chars().count() < 4 {
            return Err(AppError::InvalidInput("input.password_too_short"));
        }

        let password_hash = hash_password(password).await?;

        let mut tx = self.pool.begin().await?;

        // A trava na linha de estado serializa execuções concorrentes
        let state = self.system_repo.lock_bootstrap_state(&mut *tx).await?;
        let existing = self
            .member_repo
            .find_global_admin(&mut *tx, username)
            .await?
            .map(|m| m.id);

        let action = plan(state, existing, repair)?;
        let target = match action {
            BootstrapAction::Create => None,
            BootstrapAction::Repair(id) => Some(id),
        };
        let admin = self
            .member_repo
            .upsert_global_admin(&mut *tx, target, username, &password_hash)
            .await?;

        self.system_repo
            .mark_bootstrap_completed(&mut *tx, admin.id, now_kst())
            .await?;

        let entry = AuditEntry {
            actor_kind: ActorKind::System,
            actor_id: None,
            partner_group_id: None,
            action: "bootstrap.global_admin",
            target_id: Some(admin.id),
            detail: json!({ "repair": matches!(action, BootstrapAction::Repair(_)) }),
        };
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;

        tracing::info!("Administrador global provisionado: {} ({:?})", admin.id, action);
        Ok(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> BootstrapState {
        BootstrapState::default()
    }

    fn completed(admin_id: Uuid) -> BootstrapState {
        BootstrapState {
            completed: true,
            admin_id: Some(admin_id),
        }
    }

    #[test]
    fn first_run_creates_the_admin() {
        assert_eq!(plan(fresh(), None, false).unwrap(), BootstrapAction::Create);
    }

    #[test]
    fn existing_row_is_repaired_instead_of_duplicated() {
        let id = Uuid::new_v4();
        assert_eq!(plan(fresh(), Some(id), false).unwrap(), BootstrapAction::Repair(id));
        assert_eq!(plan(completed(id), Some(id), true).unwrap(), BootstrapAction::Repair(id));
    }

    #[test]
    fn rerun_without_repair_is_refused() {
        let id = Uuid::new_v4();
        let result = plan(completed(id), Some(id), false);
        assert!(matches!(
            result,
            Err(AppError::InvalidState("state.bootstrap_already_completed"))
        ));
    }

    #[test]
    fn repair_with_another_username_targets_the_bootstrapped_admin() {
        let bootstrapped = Uuid::new_v4();
        // nome novo: nenhuma linha global com esse usuário
        assert_eq!(
            plan(completed(bootstrapped), None, true).unwrap(),
            BootstrapAction::Repair(bootstrapped)
        );
        // nome de outro admin global: ainda conserta o registrado
        assert_eq!(
            plan(completed(bootstrapped), Some(Uuid::new_v4()), true).unwrap(),
            BootstrapAction::Repair(bootstrapped)
        );
    }

    #[test]
    fn repair_never_creates_after_completion() {
        let legacy = BootstrapState {
            completed: true,
            admin_id: None,
        };
        let id = Uuid::new_v4();
        assert_eq!(plan(legacy, Some(id), true).unwrap(), BootstrapAction::Repair(id));
        assert!(matches!(
            plan(legacy, None, true),
            Err(AppError::InvalidState("state.bootstrap_admin_missing"))
        ));
    }
}
