// src/db/member_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_foreign_key_violation, map_unique_violation, AppError},
    common::time::now_kst,
    models::member::{
        ApprovalStatus, Member, MemberFilter, MemberRole, MemberType, NewMember, SettlementMethod,
        UpdateMemberPayload, UpdateProfilePayload,
    },
};

// O repositório de membros, responsável por todas as interações com a tabela 'members'
#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Member>, AppError> {
        let member = sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(member)
    }

    /// Membro comum de um grupo, pelo login.
    pub async fn find_group_member(
        &self,
        partner_group_id: Uuid,
        username: &str,
    ) -> Result<Option<Member>, AppError> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            SELECT * FROM members
            WHERE partner_group_id = $1 AND username = $2 AND role = 'MEMBER'
            "#,
        )
        .bind(partner_group_id)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    /// Administrador global (sem grupo), pelo login.
    pub async fn find_global_admin<'e, E>(
        &self,
        executor: E,
        username: &str,
    ) -> Result<Option<Member>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, Member>(
            r#"
            SELECT * FROM members
            WHERE partner_group_id IS NULL AND role = 'ADMIN' AND username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(executor)
        .await?;
        Ok(member)
    }

    pub async fn list_for_group(
        &self,
        partner_group_id: Uuid,
        filter: &MemberFilter,
    ) -> Result<Vec<Member>, AppError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let members = sqlx::query_as::<_, Member>(
            r#"
            SELECT * FROM members
            WHERE partner_group_id = $1
              AND ($2::approval_status IS NULL OR approval_status = $2)
              AND ($3::text IS NULL
                   OR username ILIKE $3
                   OR company_name ILIKE $3
                   OR business_number ILIKE $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(partner_group_id)
        .bind(filter.approval_status)
        .bind(search)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    // Cria um novo membro; login e número de registro duplicados viram AppError::Duplicate
    pub async fn create<'e, E>(&self, executor: E, input: &NewMember) -> Result<Member, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (
                id, partner_group_id, username, password_hash, company_name,
                representative, business_number, phone, mobile, email, address, memo,
                role, approval_status, member_type, privacy_agreement, settlement_method,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.partner_group_id)
        .bind(input.username.trim())
        .bind(&input.password_hash)
        .bind(&input.company_name)
        .bind(&input.representative)
        .bind(input.business_number.as_deref().map(str::trim).filter(|s| !s.is_empty()))
        .bind(&input.phone)
        .bind(&input.mobile)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.memo)
        .bind(input.role)
        .bind(input.approval_status)
        .bind(input.member_type)
        .bind(input.privacy_agreement)
        .bind(input.settlement_method)
        .bind(now_kst())
        .fetch_one(executor)
        .await
        .map_err(map_unique_violation)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: &UpdateMemberPayload,
        password_hash: Option<&str>,
    ) -> Result<Option<Member>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET
                company_name = COALESCE($2, company_name),
                representative = COALESCE($3, representative),
                business_number = COALESCE($4, business_number),
                phone = COALESCE($5, phone),
                mobile = COALESCE($6, mobile),
                email = COALESCE($7, email),
                address = COALESCE($8, address),
                memo = COALESCE($9, memo),
                password_hash = COALESCE($10, password_hash),
                approval_status = COALESCE($11, approval_status),
                settlement_method = COALESCE($12, settlement_method)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.company_name)
        .bind(&input.representative)
        .bind(input.business_number.as_deref().map(str::trim).filter(|s| !s.is_empty()))
        .bind(&input.phone)
        .bind(&input.mobile)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.memo)
        .bind(password_hash)
        .bind(input.approval_status)
        .bind(input.settlement_method)
        .fetch_optional(executor)
        .await
        .map_err(map_unique_violation)
    }

    pub async fn update_profile<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: &UpdateProfilePayload,
        password_hash: Option<&str>,
    ) -> Result<Option<Member>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET
                phone = COALESCE($2, phone),
                mobile = COALESCE($3, mobile),
                email = COALESCE($4, email),
                address = COALESCE($5, address),
                password_hash = COALESCE($6, password_hash)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.phone)
        .bind(&input.mobile)
        .bind(&input.email)
        .bind(&input.address)
        .bind(password_hash)
        .fetch_optional(executor)
        .await?;
        Ok(member)
    }

    /// Aprovação idempotente: só altera quem ainda está em APPLIED.
    pub async fn approve<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Member>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET approval_status = 'APPROVED'
            WHERE id = $1 AND approval_status = 'APPLIED'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(member)
    }

    /// Conserta (ou cria) o administrador global do bootstrap.
    pub async fn upsert_global_admin<'e, E>(
        &self,
        executor: E,
        existing: Option<Uuid>,
        username: &str,
        password_hash: &str,
    ) -> Result<Member, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        match existing {
            Some(id) => {
                sqlx::query_as::<_, Member>(
                    r#"
                    UPDATE members SET
                        username = $3,
                        password_hash = $2,
                        role = 'ADMIN',
                        approval_status = 'APPROVED',
                        partner_group_id = NULL
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(password_hash)
                .bind(username)
                .fetch_optional(executor)
                .await
                .map_err(map_unique_violation)?
                .ok_or(AppError::InvalidState("state.bootstrap_admin_missing"))
            }
            None => {
                self.create(
                    executor,
                    &NewMember {
                        partner_group_id: None,
                        username: username.to_string(),
                        password_hash: password_hash.to_string(),
                        company_name: "전체관리자".to_string(),
                        representative: "전체관리자".to_string(),
                        business_number: None,
                        phone: None,
                        mobile: None,
                        email: None,
                        address: None,
                        memo: None,
                        role: MemberRole::Admin,
                        approval_status: ApprovalStatus::Approved,
                        member_type: MemberType::Corporate,
                        privacy_agreement: false,
                        settlement_method: SettlementMethod::Invoice,
                    },
                )
                .await
            }
        }
    }

    /// Pedidos criados pelo membro mais movimentações de pontos.
    pub async fn count_dependents<'e, E>(&self, executor: E, id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM insurance_applications WHERE created_by_member_id = $1)
              + (SELECT COUNT(*) FROM deposit_requests WHERE member_id = $1)
              + (SELECT COUNT(*) FROM point_adjustments WHERE member_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(map_foreign_key_violation("dependents.member"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Trava a linha do membro e devolve (grupo, saldo de pontos).
    pub async fn lock_balance<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<(Uuid, i64)>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row: Option<(Option<Uuid>, i64)> = sqlx::query_as(
            "SELECT partner_group_id, point_balance FROM members WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(row.and_then(|(group, balance)| group.map(|g| (g, balance))))
    }

    /// Trava a linha do membro e devolve (forma de acerto, saldo de pontos).
    pub async fn lock_settlement<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<(SettlementMethod, i64)>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row: Option<(SettlementMethod, i64)> = sqlx::query_as(
            "SELECT settlement_method, point_balance FROM members WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    pub async fn set_balance<'e, E>(&self, executor: E, id: Uuid, balance: i64) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE members SET point_balance = $2 WHERE id = $1")
            .bind(id)
            .bind(balance)
            .execute(executor)
            .await?;
        Ok(())
    }
}
