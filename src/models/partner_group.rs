// src/models/partner_group.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. PartnerGroup (o "Tenant")
// ---
// Tem a sua própria credencial de administrador, separada da tabela de membros.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartnerGroup {
    pub id: Uuid,

    #[schema(example = "부산자동차매매사업자조합")]
    pub name: String,

    #[schema(example = "busan_admin")]
    pub admin_username: String,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub admin_password_hash: String,

    #[schema(example = "123-45-67890")]
    pub business_number: String,
    pub representative: String,
    pub phone: String,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub registration_cert_path: Option<String>,
    pub logo_path: Option<String>,
    pub memo: Option<String>,
    pub created_at: NaiveDateTime,
}

// O que a tela de login precisa para o seletor de grupos
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartnerGroupSummary {
    pub id: Uuid,
    pub name: String,
    pub logo_path: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartnerGroupPayload {
    #[validate(length(min = 1, message = "input.required"))]
    pub name: String,

    #[validate(length(min = 1, message = "input.required"))]
    pub admin_username: String,

    #[validate(length(min = 4, message = "input.password_too_short"))]
    pub admin_password: String,

    #[validate(length(min = 1, message = "input.required"))]
    pub business_number: String,

    #[validate(length(min = 1, message = "input.required"))]
    pub representative: String,

    #[validate(length(min = 1, message = "input.required"))]
    pub phone: String,

    pub mobile: Option<String>,
    pub address: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub registration_cert_path: Option<String>,
    pub logo_path: Option<String>,
    pub memo: Option<String>,
}

/// Campos editáveis. `None` mantém o valor atual.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePartnerGroupPayload {
    #[validate(length(min = 1, message = "input.required"))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "input.required"))]
    pub admin_username: Option<String>,

    #[validate(length(min = 4, message = "input.password_too_short"))]
    pub admin_password: Option<String>,

    #[validate(length(min = 1, message = "input.required"))]
    pub business_number: Option<String>,

    pub representative: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub registration_cert_path: Option<String>,
    pub logo_path: Option<String>,
    pub memo: Option<String>,
}
