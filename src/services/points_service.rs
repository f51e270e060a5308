// src/services/points_service.rs

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, MemberRepository, PointsRepository},
    models::auth::Principal,
    models::points::{
        CreateAdjustmentPayload, CreateDepositRequestPayload, DepositRequest, DepositStatus,
        PointAdjustment, PointsFilter,
    },
};

const DEPOSIT_NOTE: &str = "입금 확인";

/// Novo saldo depois de um ajuste. O saldo nunca fica negativo.
pub fn apply_adjustment(balance: i64, increase: i64, decrease: i64) -> Result<i64, AppError> {
    if increase < 0 || decrease < 0 || (increase == 0 && decrease == 0) {
        return Err(AppError::InvalidInput("input.amount_positive"));
    }
    balance
        .checked_add(increase)
        .and_then(|b| b.checked_sub(decrease))
        .filter(|b| *b >= 0)
        .ok_or(AppError::InvalidInput("input.insufficient_points"))
}

#[derive(Clone)]
pub struct PointsService {
    repo: PointsRepository,
    member_repo: MemberRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl PointsService {
    pub fn new(
        repo: PointsRepository,
        member_repo: MemberRepository,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            repo,
            member_repo,
            audit_repo,
            pool,
        }
    }

    pub async fn request_deposit(
        &self,
        principal: &Principal,
        payload: &CreateDepositRequestPayload,
    ) -> Result<DepositRequest, AppError> {
        let Principal::Member {
            member_id,
            partner_group_id,
        } = principal
        else {
            return Err(AppError::Forbidden);
        };

        let request = self
            .repo
            .create_deposit_request(&self.pool, *member_id, *partner_group_id, payload)
            .await?;

        tracing::info!("Pedido de depósito {} do membro {}", request.id, member_id);
        Ok(request)
    }

    /// Membros veem só os próprios registros.
    fn listing_scope(principal: &Principal, filter: &PointsFilter) -> Result<(Uuid, Option<Uuid>), AppError> {
        let group = principal.partner_scope().ok_or(AppError::Forbidden)?;
        let member = match principal.member_id() {
            Some(own) => Some(own),
            None => filter.member_id,
        };
        Ok((group, member))
    }

    pub async fn list_deposit_requests(
        &self,
        principal: &Principal,
        filter: &PointsFilter,
    ) -> Result<Vec<DepositRequest>, AppError> {
        let (group, member) = Self::listing_scope(principal, filter)?;
        self.repo.list_deposit_requests(group, member).await
    }

    pub async fn list_adjustments(
        &self,
        principal: &Principal,
        filter: &PointsFilter,
    ) -> Result<Vec<PointAdjustment>, AppError> {
        let (group, member) = Self::listing_scope(principal, filter)?;
        self.repo.list_adjustments(group, member).await
    }

    /// Credita o depósito no saldo do membro e registra o ajuste na mesma transação.
    pub async fn confirm_deposit(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<DepositRequest, AppError> {
        let group = principal.administered_group().ok_or(AppError::Forbidden)?;

        let mut tx = self.pool.begin().await?;

        let request = self
            .repo
            .find_deposit_for_update(&mut *tx, id)
            .await?
            .filter(|r| r.partner_group_id == group)
            .ok_or(AppError::NotFound("not_found.deposit_request"))?;

        if request.status == DepositStatus::Confirmed {
            return Err(AppError::InvalidState("state.deposit_already_confirmed"));
        }

        let (_, balance) = self
            .member_repo
            .lock_balance(&mut *tx, request.member_id)
            .await?
            .ok_or(AppError::NotFound("not_found.member"))?;
        let new_balance = apply_adjustment(balance, request.amount, 0)?;

        self.member_repo
            .set_balance(&mut *tx, request.member_id, new_balance)
            .await?;
        self.repo
            .create_adjustment(
                &mut *tx,
                request.member_id,
                group,
                request.amount,
                0,
                Some(DEPOSIT_NOTE),
            )
            .await?;
        let confirmed = self.repo.mark_deposit_confirmed(&mut *tx, id).await?;

        let entry = principal
            .audit("points.confirm_deposit")
            .target(id)
            .detail(json!({ "memberId": request.member_id, "amount": request.amount }));
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;

        tracing::info!("Depósito {} confirmado ({} pontos)", id, request.amount);
        Ok(confirmed)
    }

    pub async fn adjust(
        &self,
        principal: &Principal,
        payload: &CreateAdjustmentPayload,
    ) -> Result<PointAdjustment, AppError> {
        let group = principal.administered_group().ok_or(AppError::Forbidden)?;

        let mut tx = self.pool.begin().await?;

        let (member_group, balance) = self
            .member_repo
            .lock_balance(&mut *tx, payload.member_id)
            .await?
            .ok_or(AppError::NotFound("not_found.member"))?;
        if member_group != group {
            return Err(AppError::NotFound("not_found.member"));
        }

        let new_balance =
            apply_adjustment(balance, payload.increase_amount, payload.decrease_amount)?;

        self.member_repo
            .set_balance(&mut *tx, payload.member_id, new_balance)
            .await?;
        let adjustment = self
            .repo
            .create_adjustment(
                &mut *tx,
                payload.member_id,
                group,
                payload.increase_amount,
                payload.decrease_amount,
                payload.note.as_deref(),
            )
            .await?;

        let entry = principal
            .audit("points.adjust")
            .target(adjustment.id)
            .detail(json!({
                "memberId": payload.member_id,
                "change": adjustment.change_amount,
                "balance": new_balance,
            }));
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;

        tracing::info!(
            "Ajuste de pontos do membro {}: {:+}",
            payload.member_id,
            adjustment.change_amount
        );
        Ok(adjustment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjustments_move_the_balance() {
        assert_eq!(apply_adjustment(1_000, 500, 0).unwrap(), 1_500);
        assert_eq!(apply_adjustment(1_000, 0, 1_000).unwrap(), 0);
        assert_eq!(apply_adjustment(1_000, 200, 700).unwrap(), 500);
    }

    #[test]
    fn balance_cannot_go_negative() {
        assert!(matches!(
            apply_adjustment(100, 0, 101),
            Err(AppError::InvalidInput("input.insufficient_points"))
        ));
    }

    #[test]
    fn empty_adjustment_is_rejected() {
        assert!(matches!(
            apply_adjustment(100, 0, 0),
            Err(AppError::InvalidInput("input.amount_positive"))
        ));
    }

    #[test]
    fn members_only_list_their_own_records() {
        let group = Uuid::new_v4();
        let me = Uuid::new_v4();
        let principal = Principal::Member {
            member_id: me,
            partner_group_id: group,
        };
        let filter = PointsFilter {
            member_id: Some(Uuid::new_v4()),
        };
        assert_eq!(
            PointsService::listing_scope(&principal, &filter).unwrap(),
            (group, Some(me))
        );

        let global = Principal::GlobalAdmin {
            member_id: Uuid::new_v4(),
            acting_group: None,
        };
        assert!(PointsService::listing_scope(&global, &filter).is_err());
    }
}
