// src/db/audit_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    common::time::now_kst,
    models::audit::{AuditEntry, AuditFilter, AuditLog},
};

const DEFAULT_LIMIT: i64 = 200;

#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Sempre chamado com a mesma transação da alteração auditada
    pub async fn record<'e, E>(&self, executor: E, entry: &AuditEntry) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, actor_kind, actor_id, partner_group_id, action, target_id, detail, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.actor_kind)
        .bind(entry.actor_id)
        .bind(entry.partner_group_id)
        .bind(entry.action)
        .bind(entry.target_id)
        .bind(&entry.detail)
        .bind(now_kst())
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditLog>, AppError> {
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 1000);

        let logs = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT * FROM audit_logs
            WHERE ($1::uuid IS NULL OR partner_group_id = $1)
              AND ($2::text IS NULL OR action = $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(filter.partner_group_id)
        .bind(&filter.action)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }
}
