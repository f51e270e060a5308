// src/db/points_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    common::time::now_kst,
    models::points::{CreateDepositRequestPayload, DepositRequest, PointAdjustment},
};

#[derive(Clone)]
pub struct PointsRepository {
    pool: PgPool,
}

impl PointsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  PEDIDOS DE DEPÓSITO
    // =========================================================================

    pub async fn create_deposit_request<'e, E>(
        &self,
        executor: E,
        member_id: Uuid,
        partner_group_id: Uuid,
        input: &CreateDepositRequestPayload,
    ) -> Result<DepositRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, DepositRequest>(
            r#"
            INSERT INTO deposit_requests (
                id, member_id, partner_group_id, amount, account_holder, bank_name, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(member_id)
        .bind(partner_group_id)
        .bind(input.amount)
        .bind(&input.account_holder)
        .bind(&input.bank_name)
        .bind(now_kst())
        .fetch_one(executor)
        .await?;
        Ok(request)
    }

    pub async fn find_deposit_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<DepositRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, DepositRequest>(
            "SELECT * FROM deposit_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(request)
    }

    pub async fn mark_deposit_confirmed<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<DepositRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, DepositRequest>(
            r#"
            UPDATE deposit_requests SET status = 'CONFIRMED', confirmed_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(now_kst())
        .fetch_one(executor)
        .await?;
        Ok(request)
    }

    pub async fn list_deposit_requests(
        &self,
        partner_group_id: Uuid,
        member_id: Option<Uuid>,
    ) -> Result<Vec<DepositRequest>, AppError> {
        let requests = sqlx::query_as::<_, DepositRequest>(
            r#"
            SELECT * FROM deposit_requests
            WHERE partner_group_id = $1
              AND ($2::uuid IS NULL OR member_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(partner_group_id)
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    // =========================================================================
    //  AJUSTES DE PONTOS
    // =========================================================================

    pub async fn create_adjustment<'e, E>(
        &self,
        executor: E,
        member_id: Uuid,
        partner_group_id: Uuid,
        increase_amount: i64,
        decrease_amount: i64,
        note: Option<&str>,
    ) -> Result<PointAdjustment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let adjustment = sqlx::query_as::<_, PointAdjustment>(
            r#"
            INSERT INTO point_adjustments (
                id, member_id, partner_group_id,
                decrease_amount, increase_amount, change_amount, note, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(member_id)
        .bind(partner_group_id)
        .bind(decrease_amount)
        .bind(increase_amount)
        .bind(increase_amount - decrease_amount)
        .bind(note)
        .bind(now_kst())
        .fetch_one(executor)
        .await?;
        Ok(adjustment)
    }

    pub async fn list_adjustments(
        &self,
        partner_group_id: Uuid,
        member_id: Option<Uuid>,
    ) -> Result<Vec<PointAdjustment>, AppError> {
        let adjustments = sqlx::query_as::<_, PointAdjustment>(
            r#"
            SELECT * FROM point_adjustments
            WHERE partner_group_id = $1
              AND ($2::uuid IS NULL OR member_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(partner_group_id)
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(adjustments)
    }
}
