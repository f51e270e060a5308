// src/services/partner_group_service.rs

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, PartnerGroupRepository},
    models::auth::Principal,
    models::partner_group::{
        CreatePartnerGroupPayload, PartnerGroup, PartnerGroupSummary, UpdatePartnerGroupPayload,
    },
    services::auth::hash_password,
};

/// Um grupo só pode ser excluído quando já não tem membros nem pedidos.
pub fn ensure_deletable(members: i64, applications: i64) -> Result<(), AppError> {
    if members > 0 || applications > 0 {
        return Err(AppError::HasDependents("dependents.partner_group"));
    }
    Ok(())
}

#[derive(Clone)]
pub struct PartnerGroupService {
    repo: PartnerGroupRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl PartnerGroupService {
    pub fn new(repo: PartnerGroupRepository, audit_repo: AuditRepository, pool: PgPool) -> Self {
        Self {
            repo,
            audit_repo,
            pool,
        }
    }

    pub async fn list_public(&self) -> Result<Vec<PartnerGroupSummary>, AppError> {
        self.repo.list_summaries().await
    }

    pub async fn list(&self) -> Result<Vec<PartnerGroup>, AppError> {
        self.repo.list_all().await
    }

    pub async fn get(&self, id: Uuid) -> Result<PartnerGroup, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("not_found.partner_group"))
    }

    pub async fn create(
        &self,
        principal: &Principal,
        payload: &CreatePartnerGroupPayload,
    ) -> Result<PartnerGroup, AppError> {
        let admin_password_hash = hash_password(&payload.admin_password).await?;

        let mut tx = self.pool.begin().await?;

        let group = self.repo.create(&mut *tx, payload, &admin_password_hash).await?;

        let entry = principal
            .audit("partner_group.create")
            .target(group.id)
            .detail(json!({ "name": group.name }));
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;

        tracing::info!("Grupo parceiro criado: {} ({})", group.name, group.id);
        Ok(group)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        payload: &UpdatePartnerGroupPayload,
    ) -> Result<PartnerGroup, AppError> {
        let admin_password_hash = match &payload.admin_password {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let group = self
            .repo
            .update(&mut *tx, id, payload, admin_password_hash.as_deref())
            .await?
            .ok_or(AppError::NotFound("not_found.partner_group"))?;

        let entry = principal
            .audit("partner_group.update")
            .target(group.id)
            .password_reset(admin_password_hash.is_some());
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;

        tracing::info!("Grupo parceiro atualizado: {}", group.id);
        Ok(group)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let (members, applications) = self.repo.count_dependents(&mut *tx, id).await?;
        ensure_deletable(members, applications)?;

        if !self.repo.delete(&mut *tx, id).await? {
            return Err(AppError::NotFound("not_found.partner_group"));
        }

        let entry = principal.audit("partner_group.delete").target(id);
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;

        tracing::info!("Grupo parceiro excluído: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_with_dependents_cannot_be_deleted() {
        assert!(ensure_deletable(0, 0).is_ok());
        assert!(matches!(
            ensure_deletable(1, 0),
            Err(AppError::HasDependents("dependents.partner_group"))
        ));
        assert!(matches!(
            ensure_deletable(0, 3),
            Err(AppError::HasDependents(_))
        ));
    }
}
