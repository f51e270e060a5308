// src/db/partner_group_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_foreign_key_violation, map_unique_violation, AppError},
    common::time::now_kst,
    models::partner_group::{
        CreatePartnerGroupPayload, PartnerGroup, PartnerGroupSummary, UpdatePartnerGroupPayload,
    },
};

#[derive(Clone)]
pub struct PartnerGroupRepository {
    pool: PgPool,
}

impl PartnerGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PartnerGroup>, AppError> {
        let group = sqlx::query_as::<_, PartnerGroup>("SELECT * FROM partner_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(group)
    }

    pub async fn list_all(&self) -> Result<Vec<PartnerGroup>, AppError> {
        let groups =
            sqlx::query_as::<_, PartnerGroup>("SELECT * FROM partner_groups ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(groups)
    }

    pub async fn list_summaries(&self) -> Result<Vec<PartnerGroupSummary>, AppError> {
        let groups = sqlx::query_as::<_, PartnerGroupSummary>(
            "SELECT id, name, logo_path FROM partner_groups ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    /// Cria o grupo. Nome, login do administrador e número de registro são únicos.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        input: &CreatePartnerGroupPayload,
        admin_password_hash: &str,
    ) -> Result<PartnerGroup, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, PartnerGroup>(
            r#"
            INSERT INTO partner_groups (
                id, name, admin_username, admin_password_hash, business_number,
                representative, phone, mobile, address, bank_name, account_number,
                registration_cert_path, logo_path, memo, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.name.trim())
        .bind(input.admin_username.trim())
        .bind(admin_password_hash)
        .bind(input.business_number.trim())
        .bind(&input.representative)
        .bind(&input.phone)
        .bind(&input.mobile)
        .bind(&input.address)
        .bind(&input.bank_name)
        .bind(&input.account_number)
        .bind(&input.registration_cert_path)
        .bind(&input.logo_path)
        .bind(&input.memo)
        .bind(now_kst())
        .fetch_one(executor)
        .await
        .map_err(map_unique_violation)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: &UpdatePartnerGroupPayload,
        admin_password_hash: Option<&str>,
    ) -> Result<Option<PartnerGroup>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, PartnerGroup>(
            r#"
            UPDATE partner_groups SET
                name = COALESCE($2, name),
                admin_username = COALESCE($3, admin_username),
                admin_password_hash = COALESCE($4, admin_password_hash),
                business_number = COALESCE($5, business_number),
                representative = COALESCE($6, representative),
                phone = COALESCE($7, phone),
                mobile = COALESCE($8, mobile),
                address = COALESCE($9, address),
                bank_name = COALESCE($10, bank_name),
                account_number = COALESCE($11, account_number),
                registration_cert_path = COALESCE($12, registration_cert_path),
                logo_path = COALESCE($13, logo_path),
                memo = COALESCE($14, memo)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.admin_username.as_deref().map(str::trim))
        .bind(admin_password_hash)
        .bind(input.business_number.as_deref().map(str::trim))
        .bind(&input.representative)
        .bind(&input.phone)
        .bind(&input.mobile)
        .bind(&input.address)
        .bind(&input.bank_name)
        .bind(&input.account_number)
        .bind(&input.registration_cert_path)
        .bind(&input.logo_path)
        .bind(&input.memo)
        .fetch_optional(executor)
        .await
        .map_err(map_unique_violation)
    }

    /// Quantos membros e pedidos ainda apontam para o grupo.
    pub async fn count_dependents<'e, E>(&self, executor: E, id: Uuid) -> Result<(i64, i64), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let counts: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM members WHERE partner_group_id = $1),
                (SELECT COUNT(*) FROM insurance_applications WHERE partner_group_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;
        Ok(counts)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // um membro inserido depois da contagem ainda barra a exclusão
        let result = sqlx::query("DELETE FROM partner_groups WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(map_foreign_key_violation("dependents.partner_group"))?;
        Ok(result.rows_affected() > 0)
    }
}
