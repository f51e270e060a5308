// src/models/settlement.rs

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Uma apólice ativada no período, com a identidade de quem a criou (LEFT JOIN).
#[derive(Debug, Clone, FromRow)]
pub struct SettlementRow {
    pub application_id: Uuid,
    pub partner_group_id: Uuid,
    pub start_at: NaiveDateTime,
    pub company_name: Option<String>,
    pub representative: Option<String>,
    pub business_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettlementLine {
    pub company_name: String,
    pub representative: String,
    pub business_number: String,

    /// Linha agregada de pedidos sem membro criador
    pub unknown: bool,

    pub count: i64,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReport {
    pub year: i32,
    pub month: u32,
    pub partner_group_id: Option<Uuid>,
    pub unit_price: Decimal,
    pub lines: Vec<SettlementLine>,
    pub total_count: i64,
    pub total_amount: Decimal,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SettlementQuery {
    #[schema(example = 2024)]
    pub year: i32,

    #[schema(example = 3)]
    pub month: u32,

    /// Só o administrador global (fora de um grupo) pode filtrar
    pub partner_group_id: Option<Uuid>,
}
