// src/db/system_repo.rs

use chrono::NaiveDateTime;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;

/// Estado do bootstrap lido sob trava.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootstrapState {
    pub completed: bool,
    pub admin_id: Option<Uuid>,
}

// Linha única (id = 1) criada pela migration
#[derive(Clone, Default)]
pub struct SystemRepository;

impl SystemRepository {
    pub fn new() -> Self {
        Self
    }

    /// Trava a linha de estado e devolve quando e para quem o bootstrap rodou.
    pub async fn lock_bootstrap_state<'e, E>(&self, executor: E) -> Result<BootstrapState, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (completed_at, admin_id): (Option<NaiveDateTime>, Option<Uuid>) = sqlx::query_as(
            "SELECT bootstrap_completed_at, bootstrap_admin_id FROM system_state WHERE id = 1 FOR UPDATE",
        )
        .fetch_one(executor)
        .await?;
        Ok(BootstrapState {
            completed: completed_at.is_some(),
            admin_id,
        })
    }

    pub async fn mark_bootstrap_completed<'e, E>(
        &self,
        executor: E,
        admin_id: Uuid,
        at: NaiveDateTime,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE system_state SET bootstrap_completed_at = $1, bootstrap_admin_id = $2 WHERE id = 1",
        )
        .bind(at)
        .bind(admin_id)
        .execute(executor)
        .await?;
        Ok(())
    }
}
