// src/services/application_service.rs

use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    common::time::now_kst,
    db::{application_repo::ApplicationScope, ApplicationRepository, AuditRepository, MemberRepository},
    models::application::{
        ApplicationChanges, ApplicationFilter, BulkApprovalResponse, CreateApplicationPayload,
        ForceUpdatePayload, InsuranceApplication, LifecycleSnapshot, NewApplication,
        POLICY_PREMIUM,
    },
    models::auth::Principal,
    models::member::MemberRole,
    services::application_store::ApplicationStore,
    services::lifecycle,
};

/// Em nome de quem o administrador do grupo faz o pedido.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyTarget {
    Member(Uuid),
    InsuredCode(String),
}

pub fn proxy_target(payload: &CreateApplicationPayload) -> Result<ProxyTarget, AppError> {
    if let Some(member_id) = payload.member_id {
        return Ok(ProxyTarget::Member(member_id));
    }
    match payload.insured_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => Ok(ProxyTarget::InsuredCode(code.to_string())),
        _ => Err(AppError::InvalidInput("input.proxy_target_required")),
    }
}

/// Membros veem só os próprios pedidos; administradores, os do grupo;
/// o global fora de um grupo vê tudo.
pub fn can_view(principal: &Principal, app: &InsuranceApplication) -> bool {
    match principal {
        Principal::GlobalAdmin {
            acting_group: None, ..
        } => true,
        Principal::GlobalAdmin {
            acting_group: Some(group),
            ..
        } => app.partner_group_id == *group,
        Principal::PartnerAdmin { partner_group_id } => app.partner_group_id == *partner_group_id,
        Principal::Member {
            member_id,
            partner_group_id,
        } => {
            app.partner_group_id == *partner_group_id
                && app.created_by_member_id == Some(*member_id)
        }
    }
}

pub fn list_scope(principal: &Principal, filter: &ApplicationFilter) -> ApplicationScope {
    match principal {
        Principal::Member {
            member_id,
            partner_group_id,
        } => ApplicationScope {
            partner_group_id: Some(*partner_group_id),
            created_by_member_id: Some(*member_id),
        },
        Principal::GlobalAdmin {
            acting_group: None, ..
        } => ApplicationScope {
            partner_group_id: filter.partner_group_id,
            created_by_member_id: None,
        },
        _ => ApplicationScope {
            partner_group_id: principal.partner_scope(),
            created_by_member_id: None,
        },
    }
}

#[derive(Clone)]
pub struct ApplicationService {
    repo: ApplicationRepository,
    store: Arc<dyn ApplicationStore>,
    member_repo: MemberRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl ApplicationService {
    pub fn new(
        repo: ApplicationRepository,
        store: Arc<dyn ApplicationStore>,
        member_repo: MemberRepository,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            repo,
            store,
            member_repo,
            audit_repo,
            pool,
        }
    }

    // =========================================================================
    //  RECÁLCULO PREGUIÇOSO
    // =========================================================================

    /// Aplica as transições automáticas e tenta gravá-las. Uma falha na
    /// gravação vai para o log; a leitura devolve o estado recalculado mesmo assim.
    async fn refresh(&self, mut app: InsuranceApplication, now: NaiveDateTime) -> InsuranceApplication {
        let before = LifecycleSnapshot::of(&app);
        if lifecycle::advance(&mut app, now) {
            match self.store.persist_transition(&before, &app).await {
                Ok(true) => {}
                Ok(false) => tracing::debug!(
                    "Pedido {} mudou durante o recálculo; transição não gravada",
                    app.id
                ),
                Err(e) => tracing::warn!("Falha ao gravar transição do pedido {}: {}", app.id, e),
            }
        }
        app
    }

    async fn refresh_all(&self, apps: Vec<InsuranceApplication>) -> Vec<InsuranceApplication> {
        let now = now_kst();
        let mut refreshed = Vec::with_capacity(apps.len());
        for app in apps {
            refreshed.push(self.refresh(app, now).await);
        }
        refreshed
    }

    /// Ativa os pedidos aprovados que já passaram do prazo, antes de uma apuração.
    pub async fn refresh_awaiting_activation(
        &self,
        partner_group_id: Option<Uuid>,
    ) -> Result<usize, AppError> {
        let pending = self.repo.list_awaiting_activation(partner_group_id).await?;
        let now = now_kst();
        let mut activated = 0;
        for app in pending {
            if self.refresh(app, now).await.start_at.is_some() {
                activated += 1;
            }
        }
        Ok(activated)
    }

    // =========================================================================
    //  CONSULTA
    // =========================================================================

    pub async fn list(
        &self,
        principal: &Principal,
        filter: &ApplicationFilter,
    ) -> Result<Vec<InsuranceApplication>, AppError> {
        let apps = self.repo.list(list_scope(principal, filter), filter).await?;
        let mut apps = self.refresh_all(apps).await;

        // o filtro de status vale para o status já recalculado
        if let Some(status) = filter.status {
            apps.retain(|app| app.status == status);
        }
        Ok(apps)
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<InsuranceApplication, AppError> {
        let app = self
            .store
            .find_by_id(id)
            .await?
            .filter(|app| can_view(principal, app))
            .ok_or(AppError::NotFound("not_found.application"))?;
        Ok(self.refresh(app, now_kst()).await)
    }

    // =========================================================================
    //  CRIAÇÃO E EDIÇÃO COMUNS
    // =========================================================================

    pub async fn create(
        &self,
        principal: &Principal,
        payload: &CreateApplicationPayload,
    ) -> Result<InsuranceApplication, AppError> {
        let desired_start_date = payload
            .desired_start_date
            .ok_or(AppError::InvalidInput("input.desired_start_date_required"))?;
        let car_plate = payload
            .car_plate
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(AppError::InvalidInput("input.plate_required"))?
            .to_string();

        let (partner_group_id, created_by_member_id, insured_code) = match principal {
            Principal::Member {
                member_id,
                partner_group_id,
            } => (*partner_group_id, Some(*member_id), None),
            _ => {
                let group = principal.administered_group().ok_or(AppError::Forbidden)?;
                match proxy_target(payload)? {
                    ProxyTarget::Member(member_id) => {
                        let member = self
                            .member_repo
                            .find_by_id(member_id)
                            .await?
                            .filter(|m| {
                                m.partner_group_id == Some(group) && m.role == MemberRole::Member
                            })
                            .ok_or(AppError::NotFound("not_found.member"))?;
                        (group, Some(member.id), None)
                    }
                    ProxyTarget::InsuredCode(code) => (group, None, Some(code)),
                }
            }
        };

        let new_app = NewApplication {
            partner_group_id,
            created_by_member_id,
            insured_code,
            desired_start_date,
            created_at: now_kst(),
            car_plate,
            vin: payload.vin.clone(),
            car_name: payload.car_name.clone(),
            car_registered_at: payload.car_registered_at,
            premium: Decimal::from(POLICY_PREMIUM),
            memo: payload.memo.clone(),
        };

        let app = self.repo.create(&self.pool, &new_app).await?;
        tracing::info!("Pedido criado: {} (grupo {})", app.id, app.partner_group_id);
        Ok(app)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        changes: &ApplicationChanges,
    ) -> Result<InsuranceApplication, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut app = self
            .repo
            .find_for_update(&mut *tx, id)
            .await?
            .filter(|app| can_view(principal, app))
            .ok_or(AppError::NotFound("not_found.application"))?;

        lifecycle::ensure_editable(&app)?;
        changes.apply_to(&mut app);

        let saved = self.repo.save(&mut *tx, &app).await?;
        tx.commit().await?;

        tracing::info!("Pedido atualizado: {}", saved.id);
        Ok(saved)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let app = self
            .repo
            .find_for_update(&mut *tx, id)
            .await?
            .filter(|app| can_view(principal, app))
            .ok_or(AppError::NotFound("not_found.application"))?;

        lifecycle::ensure_editable(&app)?;
        self.repo.delete(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("Pedido excluído: {}", id);
        Ok(())
    }

    // =========================================================================
    //  APROVAÇÃO
    // =========================================================================

    /// Idempotente: se outro administrador aprovou antes, devolve o pedido como está.
    /// Membros que acertam em pontos pagam o prêmio na mesma transação.
    pub async fn approve(&self, principal: &Principal, id: Uuid) -> Result<InsuranceApplication, AppError> {
        let group = principal.administered_group().ok_or(AppError::Forbidden)?;
        let now = now_kst();

        let entry = principal.audit("application.approve");
        if let Some(app) = self.store.approve(id, group, now, entry).await? {
            tracing::info!("Pedido aprovado: {}", app.id);
            return Ok(app);
        }

        let app = self
            .store
            .find_by_id(id)
            .await?
            .filter(|app| app.partner_group_id == group)
            .ok_or(AppError::NotFound("not_found.application"))?;
        Ok(self.refresh(app, now).await)
    }

    pub async fn approve_all(&self, principal: &Principal) -> Result<BulkApprovalResponse, AppError> {
        let group = principal.administered_group().ok_or(AppError::Forbidden)?;

        let entry = principal.audit("application.approve_all");
        let result = self.store.approve_all(group, now_kst(), entry).await?;

        tracing::info!(
            "{} pedidos aprovados no grupo {} ({} sem pontos suficientes)",
            result.approved_count,
            group,
            result.skipped_ids.len()
        );
        Ok(result)
    }

    // =========================================================================
    //  CORREÇÃO ADMINISTRATIVA
    // =========================================================================

    /// Ignora a trava de aprovação. Exige motivo e sempre deixa registro.
    pub async fn force_update(
        &self,
        principal: &Principal,
        id: Uuid,
        payload: &ForceUpdatePayload,
    ) -> Result<InsuranceApplication, AppError> {
        if !principal.is_admin_tier() {
            return Err(AppError::Forbidden);
        }
        let reason = payload.reason.trim();
        if reason.is_empty() {
            return Err(AppError::InvalidInput("input.reason_required"));
        }

        let mut tx = self.pool.begin().await?;

        let mut app = self
            .repo
            .find_for_update(&mut *tx, id)
            .await?
            .filter(|app| can_view(principal, app))
            .ok_or(AppError::NotFound("not_found.application"))?;

        let before = json!({
            "status": app.status,
            "startAt": app.start_at,
            "endAt": app.end_at,
            "carPlate": app.car_plate,
        });

        payload.changes.apply_to(&mut app);
        if let Some(start_at) = payload.start_at {
            app.start_at = Some(start_at);
        }
        if let Some(end_at) = payload.end_at {
            app.end_at = Some(end_at);
        }
        if let (Some(start), Some(end)) = (app.start_at, app.end_at) {
            if end <= start {
                return Err(AppError::InvalidInput("input.invalid_period"));
            }
        }
        lifecycle::recompute(&mut app, now_kst());

        let saved = self.repo.save(&mut *tx, &app).await?;

        let entry = principal
            .audit("application.force_update")
            .target(saved.id)
            .detail(json!({
                "reason": reason,
                "before": before,
                "after": {
                    "status": saved.status,
                    "startAt": saved.start_at,
                    "endAt": saved.end_at,
                    "carPlate": saved.car_plate,
                },
            }));
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;

        tracing::info!("Correção administrativa no pedido {}", saved.id);
        Ok(saved)
    }

    pub async fn force_delete(
        &self,
        principal: &Principal,
        id: Uuid,
        reason: &str,
    ) -> Result<(), AppError> {
        if !principal.is_admin_tier() {
            return Err(AppError::Forbidden);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::InvalidInput("input.reason_required"));
        }

        let mut tx = self.pool.begin().await?;

        let app = self
            .repo
            .find_for_update(&mut *tx, id)
            .await?
            .filter(|app| can_view(principal, app))
            .ok_or(AppError::NotFound("not_found.application"))?;

        self.repo.delete(&mut *tx, id).await?;

        let entry = principal
            .audit("application.force_delete")
            .target(id)
            .detail(json!({
                "reason": reason,
                "partnerGroupId": app.partner_group_id,
                "carPlate": app.car_plate,
                "status": app.status,
                "approvedAt": app.approved_at,
            }));
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;

        tracing::info!("Exclusão administrativa do pedido {}", id);
        Ok(())
    }

    /// Guarda só a referência do documento; o arquivo fica em armazenamento externo.
    pub async fn attach_policy_document(
        &self,
        principal: &Principal,
        id: Uuid,
        url: &str,
    ) -> Result<InsuranceApplication, AppError> {
        if !principal.is_admin_tier() {
            return Err(AppError::Forbidden);
        }

        let mut tx = self.pool.begin().await?;

        self.repo
            .find_for_update(&mut *tx, id)
            .await?
            .filter(|app| can_view(principal, app))
            .ok_or(AppError::NotFound("not_found.application"))?;

        let app = self
            .repo
            .set_policy_document(&mut *tx, id, url.trim())
            .await?
            .ok_or(AppError::NotFound("not_found.application"))?;

        let entry = principal.audit("application.attach_policy").target(id);
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::ApplicationStatus;
    use crate::services::application_store::MockApplicationStore;
    use chrono::NaiveDate;
    use mockall::predicate::eq;
    use sqlx::postgres::PgPoolOptions;

    fn service_with(store: MockApplicationStore) -> ApplicationService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        ApplicationService::new(
            ApplicationRepository::new(pool.clone()),
            Arc::new(store),
            MemberRepository::new(pool.clone()),
            AuditRepository::new(pool.clone()),
            pool,
        )
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    // aprovado em 14/03 às 10h, vigência desejada a partir de 15/03
    fn approved_in(group: Uuid) -> InsuranceApplication {
        let mut app = app_in(group, Some(Uuid::new_v4()));
        app.approved_at = Some(at(2024, 3, 14, 10));
        app.status = ApplicationStatus::UnionApproved;
        app
    }

    fn app_in(group: Uuid, creator: Option<Uuid>) -> InsuranceApplication {
        InsuranceApplication {
            id: Uuid::new_v4(),
            partner_group_id: group,
            created_by_member_id: creator,
            insured_code: None,
            desired_start_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            created_at: now_kst(),
            approved_at: None,
            start_at: None,
            end_at: None,
            car_plate: "12가3456".into(),
            vin: None,
            car_name: None,
            car_registered_at: None,
            premium: Decimal::from(POLICY_PREMIUM),
            memo: None,
            status: ApplicationStatus::Applied,
            policy_document_url: None,
            point_deducted: false,
        }
    }

    fn create_payload(member_id: Option<Uuid>, insured_code: Option<&str>) -> CreateApplicationPayload {
        CreateApplicationPayload {
            desired_start_date: NaiveDate::from_ymd_opt(2024, 3, 15),
            car_plate: Some("12가3456".into()),
            vin: None,
            car_name: None,
            car_registered_at: None,
            memo: None,
            member_id,
            insured_code: insured_code.map(str::to_string),
        }
    }

    #[test]
    fn members_only_see_their_own_applications() {
        let group = Uuid::new_v4();
        let me = Uuid::new_v4();
        let principal = Principal::Member {
            member_id: me,
            partner_group_id: group,
        };

        assert!(can_view(&principal, &app_in(group, Some(me))));
        assert!(!can_view(&principal, &app_in(group, Some(Uuid::new_v4()))));
        assert!(!can_view(&principal, &app_in(group, None)));
    }

    #[test]
    fn partner_admins_are_confined_to_their_group() {
        let group = Uuid::new_v4();
        let principal = Principal::PartnerAdmin { partner_group_id: group };

        assert!(can_view(&principal, &app_in(group, None)));
        assert!(!can_view(&principal, &app_in(Uuid::new_v4(), None)));
    }

    #[test]
    fn acting_global_admin_is_confined_like_a_partner_admin() {
        let group = Uuid::new_v4();
        let acting = Principal::GlobalAdmin {
            member_id: Uuid::new_v4(),
            acting_group: Some(group),
        };
        assert!(!can_view(&acting, &app_in(Uuid::new_v4(), None)));

        let global = Principal::GlobalAdmin {
            member_id: Uuid::new_v4(),
            acting_group: None,
        };
        assert!(can_view(&global, &app_in(Uuid::new_v4(), None)));
    }

    #[test]
    fn global_filter_is_ignored_inside_a_group() {
        let group = Uuid::new_v4();
        let filter = ApplicationFilter {
            partner_group_id: Some(Uuid::new_v4()),
            ..Default::default()
        };

        let scope = list_scope(&Principal::PartnerAdmin { partner_group_id: group }, &filter);
        assert_eq!(scope.partner_group_id, Some(group));

        let global = Principal::GlobalAdmin {
            member_id: Uuid::new_v4(),
            acting_group: None,
        };
        assert_eq!(list_scope(&global, &filter).partner_group_id, filter.partner_group_id);
    }

    #[test]
    fn proxy_needs_a_member_or_insured_code() {
        let member = Uuid::new_v4();
        assert_eq!(
            proxy_target(&create_payload(Some(member), None)).unwrap(),
            ProxyTarget::Member(member)
        );
        assert_eq!(
            proxy_target(&create_payload(None, Some(" INS-1 "))).unwrap(),
            ProxyTarget::InsuredCode("INS-1".into())
        );
        assert!(matches!(
            proxy_target(&create_payload(None, Some("  "))),
            Err(AppError::InvalidInput("input.proxy_target_required"))
        ));
    }

    #[tokio::test]
    async fn failed_transition_write_still_returns_the_recomputed_state() {
        let mut store = MockApplicationStore::new();
        store
            .expect_persist_transition()
            .withf(|before, app| {
                before.status == ApplicationStatus::UnionApproved
                    && before.start_at.is_none()
                    && app.status == ApplicationStatus::Active
            })
            .times(1)
            .returning(|_, _| Err(AppError::InternalServerError(anyhow::anyhow!("connection reset"))));
        let service = service_with(store);

        let app = service.refresh(approved_in(Uuid::new_v4()), at(2024, 3, 15, 12)).await;

        assert_eq!(app.status, ApplicationStatus::Active);
        assert_eq!(app.start_at, Some(at(2024, 3, 15, 0)));
        assert_eq!(app.end_at, Some(at(2024, 4, 14, 0)));
    }

    #[tokio::test]
    async fn transition_lost_to_a_concurrent_write_is_not_an_error() {
        let mut store = MockApplicationStore::new();
        store
            .expect_persist_transition()
            .times(1)
            .returning(|_, _| Ok(false));
        let service = service_with(store);

        let app = service.refresh(approved_in(Uuid::new_v4()), at(2024, 3, 15, 12)).await;
        assert_eq!(app.status, ApplicationStatus::Active);
    }

    #[tokio::test]
    async fn unchanged_applications_are_not_written() {
        // sem expectativa: qualquer gravação faria o mock falhar
        let service = service_with(MockApplicationStore::new());
        let app = app_in(Uuid::new_v4(), None);

        let refreshed = service.refresh(app.clone(), at(2024, 3, 15, 12)).await;
        assert_eq!(refreshed.status, ApplicationStatus::Applied);
        assert_eq!(refreshed.start_at, None);
    }

    #[tokio::test]
    async fn second_approval_returns_the_existing_row() {
        let group = Uuid::new_v4();
        let existing = approved_in(group);
        let id = existing.id;

        let mut store = MockApplicationStore::new();
        store
            .expect_approve()
            .withf(move |app_id, g, _, _| *app_id == id && *g == group)
            .times(1)
            .returning(|_, _, _, _| Ok(None));
        let found = existing.clone();
        store
            .expect_find_by_id()
            .with(eq(id))
            .times(1)
            .returning(move |_| Ok(Some(found.clone())));
        store.expect_persist_transition().returning(|_, _| Ok(true));
        let service = service_with(store);

        let principal = Principal::PartnerAdmin { partner_group_id: group };
        let app = service.approve(&principal, id).await.unwrap();

        assert_eq!(app.id, id);
        assert_eq!(app.approved_at, existing.approved_at);
        assert!(app.status >= ApplicationStatus::UnionApproved);
    }

    #[tokio::test]
    async fn approving_another_groups_application_is_not_found() {
        let mine = Uuid::new_v4();
        let other = approved_in(Uuid::new_v4());
        let id = other.id;

        let mut store = MockApplicationStore::new();
        store.expect_approve().returning(|_, _, _, _| Ok(None));
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(other.clone())));
        let service = service_with(store);

        let principal = Principal::PartnerAdmin { partner_group_id: mine };
        assert!(matches!(
            service.approve(&principal, id).await,
            Err(AppError::NotFound("not_found.application"))
        ));
    }
}
