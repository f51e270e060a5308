// src/models/points.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "deposit_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Requested,
    Confirmed,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub id: Uuid,
    pub member_id: Uuid,
    pub partner_group_id: Uuid,

    #[schema(example = 100000)]
    pub amount: i64,

    pub account_holder: String,
    pub bank_name: String,
    pub status: DepositStatus,
    pub created_at: NaiveDateTime,
    pub confirmed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PointAdjustment {
    pub id: Uuid,
    pub member_id: Uuid,
    pub partner_group_id: Uuid,
    pub decrease_amount: i64,
    pub increase_amount: i64,
    pub change_amount: i64,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepositRequestPayload {
    #[validate(range(min = 1, message = "input.amount_positive"))]
    pub amount: i64,

    #[validate(length(min = 1, message = "input.required"))]
    pub account_holder: String,

    #[validate(length(min = 1, message = "input.required"))]
    pub bank_name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdjustmentPayload {
    pub member_id: Uuid,

    #[serde(default)]
    #[validate(range(min = 0, message = "input.amount_positive"))]
    pub increase_amount: i64,

    #[serde(default)]
    #[validate(range(min = 0, message = "input.amount_positive"))]
    pub decrease_amount: i64,

    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PointsFilter {
    pub member_id: Option<Uuid>,
}
