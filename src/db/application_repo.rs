// src/db/application_repo.rs

use chrono::NaiveDateTime;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    common::time::midnight,
    models::application::{
        ApplicationFilter, InsuranceApplication, LifecycleSnapshot, NewApplication,
    },
    models::settlement::SettlementRow,
};

/// Recorte de visibilidade aplicado na listagem.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationScope {
    pub partner_group_id: Option<Uuid>,
    pub created_by_member_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        input: &NewApplication,
    ) -> Result<InsuranceApplication, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let app = sqlx::query_as::<_, InsuranceApplication>(
            r#"
            INSERT INTO insurance_applications (
                id, partner_group_id, created_by_member_id, insured_code,
                desired_start_date, created_at, car_plate, vin, car_name,
                car_registered_at, premium, memo, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'APPLIED')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.partner_group_id)
        .bind(input.created_by_member_id)
        .bind(&input.insured_code)
        .bind(input.desired_start_date)
        .bind(input.created_at)
        .bind(&input.car_plate)
        .bind(&input.vin)
        .bind(&input.car_name)
        .bind(input.car_registered_at)
        .bind(input.premium)
        .bind(&input.memo)
        .fetch_one(executor)
        .await?;

        Ok(app)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<InsuranceApplication>, AppError> {
        let app = sqlx::query_as::<_, InsuranceApplication>(
            "SELECT * FROM insurance_applications WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(app)
    }

    /// Lê e trava a linha para um read-modify-write dentro da transação.
    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<InsuranceApplication>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let app = sqlx::query_as::<_, InsuranceApplication>(
            "SELECT * FROM insurance_applications WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(app)
    }

    /// O filtro de status fica com o serviço: ele vale para o status recalculado.
    pub async fn list(
        &self,
        scope: ApplicationScope,
        filter: &ApplicationFilter,
    ) -> Result<Vec<InsuranceApplication>, AppError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        // `to` é inclusivo: vira a meia-noite do dia seguinte
        let from = filter.from.map(midnight);
        let to = filter.to.and_then(|d| d.succ_opt()).map(midnight);

        let apps = sqlx::query_as::<_, InsuranceApplication>(
            r#"
            SELECT * FROM insurance_applications
            WHERE ($1::uuid IS NULL OR partner_group_id = $1)
              AND ($2::uuid IS NULL OR created_by_member_id = $2)
              AND ($3::timestamp IS NULL OR created_at >= $3)
              AND ($4::timestamp IS NULL OR created_at < $4)
              AND ($5::text IS NULL
                   OR car_plate ILIKE $5
                   OR vin ILIKE $5
                   OR car_name ILIKE $5
                   OR insured_code ILIKE $5)
            ORDER BY created_at DESC
            "#,
        )
        .bind(scope.partner_group_id)
        .bind(scope.created_by_member_id)
        .bind(from)
        .bind(to)
        .bind(search)
        .fetch_all(&self.pool)
        .await?;

        Ok(apps)
    }

    /// Pedidos aprovados que ainda não receberam a vigência.
    pub async fn list_awaiting_activation(
        &self,
        partner_group_id: Option<Uuid>,
    ) -> Result<Vec<InsuranceApplication>, AppError> {
        let apps = sqlx::query_as::<_, InsuranceApplication>(
            r#"
            SELECT * FROM insurance_applications
            WHERE approved_at IS NOT NULL
              AND start_at IS NULL
              AND ($1::uuid IS NULL OR partner_group_id = $1)
            "#,
        )
        .bind(partner_group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(apps)
    }

    /// Grava o resultado do recálculo do ciclo de vida, desde que a linha
    /// ainda esteja como `before`. Devolve `false` quando outra escrita
    /// (uma correção administrativa, por exemplo) chegou antes.
    pub async fn persist_transition<'e, E>(
        &self,
        executor: E,
        before: &LifecycleSnapshot,
        app: &InsuranceApplication,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE insurance_applications
            SET status = $2, start_at = $3, end_at = $4
            WHERE id = $1
              AND status = $5
              AND start_at IS NOT DISTINCT FROM $6
              AND end_at IS NOT DISTINCT FROM $7
            "#,
        )
        .bind(app.id)
        .bind(app.status)
        .bind(app.start_at)
        .bind(app.end_at)
        .bind(before.status)
        .bind(before.start_at)
        .bind(before.end_at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Regrava todos os campos mutáveis (edição comum e correção administrativa).
    pub async fn save<'e, E>(
        &self,
        executor: E,
        app: &InsuranceApplication,
    ) -> Result<InsuranceApplication, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let saved = sqlx::query_as::<_, InsuranceApplication>(
            r#"
            UPDATE insurance_applications SET
                desired_start_date = $2,
                car_plate = $3,
                vin = $4,
                car_name = $5,
                car_registered_at = $6,
                memo = $7,
                start_at = $8,
                end_at = $9,
                status = $10
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(app.id)
        .bind(app.desired_start_date)
        .bind(&app.car_plate)
        .bind(&app.vin)
        .bind(&app.car_name)
        .bind(app.car_registered_at)
        .bind(&app.memo)
        .bind(app.start_at)
        .bind(app.end_at)
        .bind(app.status)
        .fetch_one(executor)
        .await?;
        Ok(saved)
    }

    /// Aprovação condicional: só grava se `approved_at` ainda estiver vazio.
    /// Duas aprovações concorrentes resultam em uma escrita e um no-op.
    pub async fn approve<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        partner_group_id: Uuid,
        now: NaiveDateTime,
    ) -> Result<Option<InsuranceApplication>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let app = sqlx::query_as::<_, InsuranceApplication>(
            r#"
            UPDATE insurance_applications
            SET approved_at = $3, status = 'UNION_APPROVED'
            WHERE id = $1 AND partner_group_id = $2 AND approved_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(partner_group_id)
        .bind(now)
        .fetch_optional(executor)
        .await?;
        Ok(app)
    }

    /// Pedidos ainda não aprovados do grupo, travados e na ordem de chegada.
    pub async fn list_pending_for_update<'e, E>(
        &self,
        executor: E,
        partner_group_id: Uuid,
    ) -> Result<Vec<InsuranceApplication>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let apps = sqlx::query_as::<_, InsuranceApplication>(
            r#"
            SELECT * FROM insurance_applications
            WHERE partner_group_id = $1 AND approved_at IS NULL
            ORDER BY created_at
            FOR UPDATE
            "#,
        )
        .bind(partner_group_id)
        .fetch_all(executor)
        .await?;
        Ok(apps)
    }

    pub async fn mark_point_deducted<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<InsuranceApplication, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let app = sqlx::query_as::<_, InsuranceApplication>(
            "UPDATE insurance_applications SET point_deducted = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(executor)
        .await?;
        Ok(app)
    }

    pub async fn set_policy_document<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        url: &str,
    ) -> Result<Option<InsuranceApplication>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let app = sqlx::query_as::<_, InsuranceApplication>(
            r#"
            UPDATE insurance_applications SET policy_document_url = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(url)
        .fetch_optional(executor)
        .await?;
        Ok(app)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM insurance_applications WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Apólices cuja vigência começou em `[start, end)`, com os dados do membro criador.
    pub async fn settlement_rows(
        &self,
        partner_group_id: Option<Uuid>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<SettlementRow>, AppError> {
        let rows = sqlx::query_as::<_, SettlementRow>(
            r#"
            SELECT
                a.id AS application_id,
                a.partner_group_id,
                a.start_at,
                m.company_name,
                m.representative,
                m.business_number
            FROM insurance_applications a
            LEFT JOIN members m ON m.id = a.created_by_member_id
            WHERE a.start_at >= $1
              AND a.start_at < $2
              AND ($3::uuid IS NULL OR a.partner_group_id = $3)
            ORDER BY m.company_name NULLS LAST, a.start_at
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(partner_group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
