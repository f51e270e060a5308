// src/services/application_store.rs

//! Escritas do pedido que precisam de transação própria: gravação do
//! recálculo, aprovação e débito do prêmio em pontos.

use async_trait::async_trait;
use chrono::NaiveDateTime;
#[cfg(test)]
use mockall::automock;
use rust_decimal::prelude::ToPrimitive;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ApplicationRepository, AuditRepository, MemberRepository, PointsRepository},
    models::application::{BulkApprovalResponse, InsuranceApplication, LifecycleSnapshot},
    models::audit::AuditEntry,
    models::member::SettlementMethod,
    services::points_service::apply_adjustment,
};

const PREMIUM_NOTE: &str = "보험 가입 차감";

/// O que a aprovação faz com o saldo de pontos do membro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointCharge {
    // fatura, procuração por código ou prêmio já debitado
    None,
    Deduct { amount: i64, balance_after: i64 },
    Insufficient { amount: i64, balance: i64 },
}

impl PointCharge {
    pub fn amount(&self) -> i64 {
        match self {
            PointCharge::Deduct { amount, .. } => *amount,
            _ => 0,
        }
    }
}

/// `creator` é a forma de acerto e o saldo do membro que fez o pedido,
/// lidos sob trava. Só membros que acertam em pontos são debitados.
pub fn point_charge(
    app: &InsuranceApplication,
    creator: Option<(SettlementMethod, i64)>,
) -> PointCharge {
    let Some((SettlementMethod::Point, balance)) = creator else {
        return PointCharge::None;
    };
    if app.point_deducted {
        return PointCharge::None;
    }
    let Some(amount) = app.premium.trunc().to_i64().filter(|a| *a > 0) else {
        return PointCharge::None;
    };
    match apply_adjustment(balance, 0, amount) {
        Ok(balance_after) => PointCharge::Deduct {
            amount,
            balance_after,
        },
        Err(_) => PointCharge::Insufficient { amount, balance },
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<InsuranceApplication>, AppError>;

    /// Grava o recálculo só se a linha ainda estiver como `before`.
    async fn persist_transition(
        &self,
        before: &LifecycleSnapshot,
        app: &InsuranceApplication,
    ) -> Result<bool, AppError>;

    /// Aprova e debita o prêmio. `None` quando o pedido não está pendente
    /// no grupo (já aprovado ou inexistente).
    async fn approve(
        &self,
        id: Uuid,
        partner_group_id: Uuid,
        now: NaiveDateTime,
        audit: AuditEntry,
    ) -> Result<Option<InsuranceApplication>, AppError>;

    /// Aprova os pendentes do grupo; quem não tem pontos fica para depois.
    async fn approve_all(
        &self,
        partner_group_id: Uuid,
        now: NaiveDateTime,
        audit: AuditEntry,
    ) -> Result<BulkApprovalResponse, AppError>;
}

#[derive(Clone)]
pub struct PgApplicationStore {
    repo: ApplicationRepository,
    member_repo: MemberRepository,
    points_repo: PointsRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl PgApplicationStore {
    pub fn new(
        repo: ApplicationRepository,
        member_repo: MemberRepository,
        points_repo: PointsRepository,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            repo,
            member_repo,
            points_repo,
            audit_repo,
            pool,
        }
    }

    async fn charge_for(
        &self,
        conn: &mut PgConnection,
        app: &InsuranceApplication,
    ) -> Result<PointCharge, AppError> {
        let creator = match app.created_by_member_id {
            Some(member_id) => self.member_repo.lock_settlement(&mut *conn, member_id).await?,
            None => None,
        };
        Ok(point_charge(app, creator))
    }

    async fn deduct(
        &self,
        conn: &mut PgConnection,
        app: InsuranceApplication,
        charge: PointCharge,
    ) -> Result<InsuranceApplication, AppError> {
        let (amount, balance_after, member_id) = match (charge, app.created_by_member_id) {
            (
                PointCharge::Deduct {
                    amount,
                    balance_after,
                },
                Some(member_id),
            ) => (amount, balance_after, member_id),
            _ => return Ok(app),
        };

        self.points_repo
            .create_adjustment(
                &mut *conn,
                member_id,
                app.partner_group_id,
                0,
                amount,
                Some(PREMIUM_NOTE),
            )
            .await?;
        self.member_repo.set_balance(&mut *conn, member_id, balance_after).await?;
        self.repo.mark_point_deducted(&mut *conn, app.id).await
    }
}

#[async_trait]
impl ApplicationStore for PgApplicationStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<InsuranceApplication>, AppError> {
        self.repo.find_by_id(id).await
    }

    async fn persist_transition(
        &self,
        before: &LifecycleSnapshot,
        app: &InsuranceApplication,
    ) -> Result<bool, AppError> {
        self.repo.persist_transition(&self.pool, before, app).await
    }

    async fn approve(
        &self,
        id: Uuid,
        partner_group_id: Uuid,
        now: NaiveDateTime,
        audit: AuditEntry,
    ) -> Result<Option<InsuranceApplication>, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(pending) = self
            .repo
            .find_for_update(&mut *tx, id)
            .await?
            .filter(|app| app.partner_group_id == partner_group_id && app.approved_at.is_none())
        else {
            return Ok(None);
        };

        let charge = self.charge_for(&mut *tx, &pending).await?;
        if let PointCharge::Insufficient { amount, balance } = charge {
            tracing::info!(
                "Aprovação recusada: pedido {} exige {} pontos, saldo {}",
                id,
                amount,
                balance
            );
            return Err(AppError::InvalidState("state.insufficient_points"));
        }

        let Some(approved) = self.repo.approve(&mut *tx, id, partner_group_id, now).await? else {
            return Ok(None);
        };
        let approved = self.deduct(&mut *tx, approved, charge).await?;

        let entry = audit.target(approved.id).detail(json!({
            "approvedAt": approved.approved_at,
            "pointsCharged": charge.amount(),
        }));
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(Some(approved))
    }

    async fn approve_all(
        &self,
        partner_group_id: Uuid,
        now: NaiveDateTime,
        audit: AuditEntry,
    ) -> Result<BulkApprovalResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        let pending = self.repo.list_pending_for_update(&mut *tx, partner_group_id).await?;

        let mut approved_ids = Vec::with_capacity(pending.len());
        let mut skipped_ids = Vec::new();
        let mut points_charged = 0_i64;

        // o saldo é relido a cada pedido: vários podem ser do mesmo membro
        for app in pending {
            let charge = self.charge_for(&mut *tx, &app).await?;
            if matches!(charge, PointCharge::Insufficient { .. }) {
                skipped_ids.push(app.id);
                continue;
            }
            let Some(approved) = self.repo.approve(&mut *tx, app.id, partner_group_id, now).await?
            else {
                continue;
            };
            let approved = self.deduct(&mut *tx, approved, charge).await?;
            points_charged += charge.amount();
            approved_ids.push(approved.id);
        }

        if !approved_ids.is_empty() || !skipped_ids.is_empty() {
            let entry = audit.detail(json!({
                "count": approved_ids.len(),
                "ids": approved_ids,
                "skippedIds": skipped_ids,
                "pointsCharged": points_charged,
            }));
            self.audit_repo.record(&mut *tx, &entry).await?;
        }

        tx.commit().await?;

        Ok(BulkApprovalResponse {
            approved_count: approved_ids.len(),
            approved_ids,
            skipped_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::ApplicationStatus;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn pending(premium: i64) -> InsuranceApplication {
        InsuranceApplication {
            id: Uuid::new_v4(),
            partner_group_id: Uuid::new_v4(),
            created_by_member_id: Some(Uuid::new_v4()),
            insured_code: None,
            desired_start_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            created_at: NaiveDate::from_ymd_opt(2024, 3, 10)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            approved_at: None,
            start_at: None,
            end_at: None,
            car_plate: "12가3456".into(),
            vin: None,
            car_name: None,
            car_registered_at: None,
            premium: Decimal::from(premium),
            memo: None,
            status: ApplicationStatus::Applied,
            policy_document_url: None,
            point_deducted: false,
        }
    }

    #[test]
    fn point_members_pay_the_premium_on_approval() {
        let app = pending(9_500);
        assert_eq!(
            point_charge(&app, Some((SettlementMethod::Point, 20_000))),
            PointCharge::Deduct {
                amount: 9_500,
                balance_after: 10_500
            }
        );
        assert_eq!(
            point_charge(&app, Some((SettlementMethod::Point, 9_500))),
            PointCharge::Deduct {
                amount: 9_500,
                balance_after: 0
            }
        );
    }

    #[test]
    fn short_balance_is_reported_instead_of_going_negative() {
        let app = pending(9_500);
        assert_eq!(
            point_charge(&app, Some((SettlementMethod::Point, 9_499))),
            PointCharge::Insufficient {
                amount: 9_500,
                balance: 9_499
            }
        );
    }

    #[test]
    fn invoice_members_and_insured_codes_are_not_charged() {
        let app = pending(9_500);
        assert_eq!(point_charge(&app, Some((SettlementMethod::Invoice, 0))), PointCharge::None);
        assert_eq!(point_charge(&app, None), PointCharge::None);
    }

    #[test]
    fn premium_is_never_charged_twice() {
        let mut app = pending(9_500);
        app.point_deducted = true;
        let charge = point_charge(&app, Some((SettlementMethod::Point, 20_000)));
        assert_eq!(charge, PointCharge::None);
        assert_eq!(charge.amount(), 0);
    }
}
