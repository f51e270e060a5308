// src/services/member_service.rs

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, MemberRepository, PartnerGroupRepository},
    models::auth::Principal,
    models::member::{
        ApprovalStatus, CreateMemberPayload, Member, MemberFilter, MemberRole, NewMember,
        RegisterMemberPayload, SettlementMethod, UpdateMemberPayload, UpdateProfilePayload,
    },
    services::auth::hash_password,
};

/// Onde um membro criado administrativamente vai parar, e com qual papel.
///
/// Dentro de um grupo (admin do grupo ou global atuando) o grupo da sessão
/// prevalece e o papel é sempre `member`. Fora de um grupo, o global pode
/// criar membros em qualquer grupo ou outro administrador global.
pub fn placement(
    principal: &Principal,
    payload: &CreateMemberPayload,
) -> Result<(Option<Uuid>, MemberRole), AppError> {
    if let Some(group) = principal.administered_group() {
        return Ok((Some(group), MemberRole::Member));
    }
    if !principal.is_global_admin() {
        return Err(AppError::Forbidden);
    }
    match payload.partner_group_id {
        Some(group) => Ok((Some(group), MemberRole::Member)),
        None => Ok((None, MemberRole::Admin)),
    }
}

/// O membro está dentro do que a sessão pode administrar?
pub fn ensure_in_scope(principal: &Principal, member: &Member) -> Result<(), AppError> {
    match principal.partner_scope() {
        None if principal.is_global_admin() => Ok(()),
        Some(group) if principal.is_admin_tier() && member.partner_group_id == Some(group) => {
            Ok(())
        }
        _ => Err(AppError::NotFound("not_found.member")),
    }
}

#[derive(Clone)]
pub struct MemberService {
    repo: MemberRepository,
    partner_group_repo: PartnerGroupRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl MemberService {
    pub fn new(
        repo: MemberRepository,
        partner_group_repo: PartnerGroupRepository,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            repo,
            partner_group_repo,
            audit_repo,
            pool,
        }
    }

    /// Auto-cadastro: sempre entra como APPLIED e papel `member`.
    pub async fn register(&self, payload: &RegisterMemberPayload) -> Result<Member, AppError> {
        self.partner_group_repo
            .find_by_id(payload.partner_group_id)
            .await?
            .ok_or(AppError::NotFound("not_found.partner_group"))?;

        let password_hash = hash_password(&payload.password).await?;

        let new_member = NewMember {
            partner_group_id: Some(payload.partner_group_id),
            username: payload.username.clone(),
            password_hash,
            company_name: payload.company_name.clone(),
            representative: payload.representative.clone(),
            business_number: payload.business_number.clone(),
            phone: payload.phone.clone(),
            mobile: payload.mobile.clone(),
            email: payload.email.clone(),
            address: payload.address.clone(),
            memo: None,
            role: MemberRole::Member,
            approval_status: ApprovalStatus::Applied,
            member_type: payload.member_type,
            privacy_agreement: payload.privacy_agreement,
            settlement_method: SettlementMethod::Point,
        };

        let member = self.repo.create(&self.pool, &new_member).await?;
        tracing::info!(
            "Novo cadastro aguardando aprovação: {} (grupo {})",
            member.id,
            payload.partner_group_id
        );
        Ok(member)
    }

    pub async fn create(
        &self,
        principal: &Principal,
        payload: &CreateMemberPayload,
    ) -> Result<Member, AppError> {
        let (partner_group_id, role) = placement(principal, payload)?;

        if let Some(group) = partner_group_id {
            self.partner_group_repo
                .find_by_id(group)
                .await?
                .ok_or(AppError::NotFound("not_found.partner_group"))?;
        }

        let password_hash = hash_password(&payload.password).await?;

        let new_member = NewMember {
            partner_group_id,
            username: payload.username.clone(),
            password_hash,
            company_name: payload.company_name.clone(),
            representative: payload.representative.clone(),
            business_number: payload.business_number.clone(),
            phone: payload.phone.clone(),
            mobile: payload.mobile.clone(),
            email: payload.email.clone(),
            address: payload.address.clone(),
            memo: payload.memo.clone(),
            role,
            approval_status: payload.approval_status.unwrap_or(ApprovalStatus::Approved),
            member_type: payload.member_type,
            privacy_agreement: payload.privacy_agreement,
            settlement_method: payload.settlement_method.unwrap_or(SettlementMethod::Point),
        };

        let mut tx = self.pool.begin().await?;

        let member = self.repo.create(&mut *tx, &new_member).await?;

        let entry = principal
            .audit("member.create")
            .target(member.id)
            .detail(json!({ "role": member.role, "approvalStatus": member.approval_status }));
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;

        tracing::info!("Membro criado administrativamente: {}", member.id);
        Ok(member)
    }

    pub async fn list(&self, partner_group_id: Uuid, filter: &MemberFilter) -> Result<Vec<Member>, AppError> {
        self.repo.list_for_group(partner_group_id, filter).await
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<Member, AppError> {
        let member = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("not_found.member"))?;
        ensure_in_scope(principal, &member)?;
        Ok(member)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        payload: &UpdateMemberPayload,
    ) -> Result<Member, AppError> {
        self.get(principal, id).await?;

        let password_hash = match &payload.password {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let member = self
            .repo
            .update(&mut *tx, id, payload, password_hash.as_deref())
            .await?
            .ok_or(AppError::NotFound("not_found.member"))?;

        let entry = principal
            .audit("member.update")
            .target(member.id)
            .password_reset(password_hash.is_some());
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(member)
    }

    /// Aprovar duas vezes não é erro: a segunda chamada devolve o membro como está.
    pub async fn approve(&self, principal: &Principal, id: Uuid) -> Result<Member, AppError> {
        let current = self.get(principal, id).await?;

        let mut tx = self.pool.begin().await?;

        let Some(member) = self.repo.approve(&mut *tx, id).await? else {
            return Ok(current);
        };

        let entry = principal.audit("member.approve").target(member.id);
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;

        tracing::info!("Membro aprovado: {}", member.id);
        Ok(member)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        self.get(principal, id).await?;

        let mut tx = self.pool.begin().await?;

        if self.repo.count_dependents(&mut *tx, id).await? > 0 {
            return Err(AppError::HasDependents("dependents.member"));
        }
        if !self.repo.delete(&mut *tx, id).await? {
            return Err(AppError::NotFound("not_found.member"));
        }

        let entry = principal.audit("member.delete").target(id);
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;

        tracing::info!("Membro excluído: {}", id);
        Ok(())
    }

    // =========================================================================
    //  AUTOATENDIMENTO
    // =========================================================================

    pub async fn profile(&self, member_id: Uuid) -> Result<Member, AppError> {
        self.repo
            .find_by_id(member_id)
            .await?
            .ok_or(AppError::NotFound("not_found.member"))
    }

    pub async fn update_profile(
        &self,
        member_id: Uuid,
        payload: &UpdateProfilePayload,
    ) -> Result<Member, AppError> {
        let password_hash = match &payload.password {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;
        let member = self
            .repo
            .update_profile(&mut *tx, member_id, payload, password_hash.as_deref())
            .await?
            .ok_or(AppError::NotFound("not_found.member"))?;
        tx.commit().await?;

        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::time::now_kst;
    use crate::models::member::MemberType;

    fn payload(partner_group_id: Option<Uuid>) -> CreateMemberPayload {
        CreateMemberPayload {
            partner_group_id,
            username: "dealer02".into(),
            password: "secret1".into(),
            company_name: "해운대모터스".into(),
            representative: "박대표".into(),
            business_number: None,
            phone: None,
            mobile: None,
            email: None,
            address: None,
            memo: None,
            member_type: MemberType::Corporate,
            privacy_agreement: false,
            approval_status: None,
            settlement_method: None,
        }
    }

    fn member_in(group: Option<Uuid>) -> Member {
        Member {
            id: Uuid::new_v4(),
            partner_group_id: group,
            username: "dealer01".into(),
            password_hash: String::new(),
            company_name: "부산모터스".into(),
            representative: "김대표".into(),
            business_number: None,
            phone: None,
            mobile: None,
            email: None,
            address: None,
            memo: None,
            role: MemberRole::Member,
            approval_status: ApprovalStatus::Applied,
            member_type: MemberType::Corporate,
            privacy_agreement: false,
            settlement_method: SettlementMethod::Point,
            point_balance: 0,
            created_at: now_kst(),
        }
    }

    #[test]
    fn partner_admin_always_creates_in_its_own_group() {
        let own = Uuid::new_v4();
        let principal = Principal::PartnerAdmin { partner_group_id: own };
        let (group, role) = placement(&principal, &payload(Some(Uuid::new_v4()))).unwrap();
        assert_eq!(group, Some(own));
        assert_eq!(role, MemberRole::Member);
    }

    #[test]
    fn global_admin_without_group_creates_another_admin() {
        let principal = Principal::GlobalAdmin {
            member_id: Uuid::new_v4(),
            acting_group: None,
        };
        let (group, role) = placement(&principal, &payload(None)).unwrap();
        assert_eq!(group, None);
        assert_eq!(role, MemberRole::Admin);
    }

    #[test]
    fn members_cannot_create_members() {
        let principal = Principal::Member {
            member_id: Uuid::new_v4(),
            partner_group_id: Uuid::new_v4(),
        };
        assert!(matches!(
            placement(&principal, &payload(None)),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn other_groups_members_are_invisible() {
        let group = Uuid::new_v4();
        let principal = Principal::PartnerAdmin { partner_group_id: group };

        assert!(ensure_in_scope(&principal, &member_in(Some(group))).is_ok());
        assert!(matches!(
            ensure_in_scope(&principal, &member_in(Some(Uuid::new_v4()))),
            Err(AppError::NotFound(_))
        ));

        let global = Principal::GlobalAdmin {
            member_id: Uuid::new_v4(),
            acting_group: None,
        };
        assert!(ensure_in_scope(&global, &member_in(Some(Uuid::new_v4()))).is_ok());
    }
}
