// src/models/application.rs

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Prêmio fixo por apólice (KRW).
pub const POLICY_PREMIUM: i64 = 9_500;

// A ordem das variantes é a ordem do ciclo de vida; o status nunca regride.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "application_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,       // 신청
    UnionApproved, // 조합승인
    Active,        // 가입
    Expired,       // 종료
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceApplication {
    pub id: Uuid,
    pub partner_group_id: Uuid,

    // Nulo quando o administrador do grupo cria por procuração
    pub created_by_member_id: Option<Uuid>,

    #[schema(example = "INS-000123")]
    pub insured_code: Option<String>,

    #[schema(example = "2024-03-15")]
    pub desired_start_date: NaiveDate,

    pub created_at: NaiveDateTime,
    pub approved_at: Option<NaiveDateTime>,
    pub start_at: Option<NaiveDateTime>,
    pub end_at: Option<NaiveDateTime>,

    #[schema(example = "12가3456")]
    pub car_plate: String,

    #[schema(example = "KMHxxxxxxxxxxxxxx")]
    pub vin: Option<String>,

    #[schema(example = "쏘나타")]
    pub car_name: Option<String>,

    pub car_registered_at: Option<NaiveDate>,

    #[schema(example = "9500")]
    pub premium: Decimal,

    pub memo: Option<String>,
    pub status: ApplicationStatus,
    pub policy_document_url: Option<String>,

    // Prêmio já debitado do saldo de pontos do membro
    pub point_deducted: bool,
}

impl InsuranceApplication {
    pub fn is_locked(&self) -> bool {
        self.approved_at.is_some()
    }
}

/// Campos que o recálculo automático pode mudar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSnapshot {
    pub status: ApplicationStatus,
    pub start_at: Option<NaiveDateTime>,
    pub end_at: Option<NaiveDateTime>,
}

impl LifecycleSnapshot {
    pub fn of(app: &InsuranceApplication) -> Self {
        Self {
            status: app.status,
            start_at: app.start_at,
            end_at: app.end_at,
        }
    }
}

/// Linha pronta para INSERT.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub partner_group_id: Uuid,
    pub created_by_member_id: Option<Uuid>,
    pub insured_code: Option<String>,
    pub desired_start_date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub car_plate: String,
    pub vin: Option<String>,
    pub car_name: Option<String>,
    pub car_registered_at: Option<NaiveDate>,
    pub premium: Decimal,
    pub memo: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationPayload {
    #[validate(required(message = "input.desired_start_date_required"))]
    pub desired_start_date: Option<NaiveDate>,

    #[validate(
        required(message = "input.plate_required"),
        custom(function = "validate_plate")
    )]
    pub car_plate: Option<String>,

    pub vin: Option<String>,
    pub car_name: Option<String>,
    pub car_registered_at: Option<NaiveDate>,
    pub memo: Option<String>,

    /// Procuração: membro do grupo em nome de quem o pedido é feito
    pub member_id: Option<Uuid>,

    /// Procuração: código do segurado fornecido externamente
    pub insured_code: Option<String>,
}

// Placa só com espaços conta como ausente
fn validate_plate(plate: &str) -> Result<(), ValidationError> {
    if plate.trim().is_empty() {
        let mut err = ValidationError::new("plate_required");
        err.message = Some("input.plate_required".into());
        return Err(err);
    }
    Ok(())
}

/// Campos mutáveis de um pedido. `None` mantém o valor atual.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationChanges {
    pub desired_start_date: Option<NaiveDate>,

    #[validate(custom(function = "validate_plate"))]
    pub car_plate: Option<String>,

    pub vin: Option<String>,
    pub car_name: Option<String>,
    pub car_registered_at: Option<NaiveDate>,
    pub memo: Option<String>,
}

impl ApplicationChanges {
    pub fn apply_to(&self, app: &mut InsuranceApplication) {
        if let Some(date) = self.desired_start_date {
            app.desired_start_date = date;
        }
        if let Some(plate) = &self.car_plate {
            app.car_plate = plate.trim().to_string();
        }
        if let Some(vin) = &self.vin {
            app.vin = Some(vin.clone());
        }
        if let Some(name) = &self.car_name {
            app.car_name = Some(name.clone());
        }
        if let Some(date) = self.car_registered_at {
            app.car_registered_at = Some(date);
        }
        if let Some(memo) = &self.memo {
            app.memo = Some(memo.clone());
        }
    }
}

// Correção administrativa depois da aprovação: pode mexer também na vigência.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForceUpdatePayload {
    #[validate(length(min = 1, message = "input.reason_required"))]
    pub reason: String,

    #[serde(flatten)]
    #[validate(nested)]
    pub changes: ApplicationChanges,

    pub start_at: Option<NaiveDateTime>,
    pub end_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForceDeletePayload {
    #[validate(length(min = 1, message = "input.reason_required"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachPolicyPayload {
    #[validate(length(min = 1, message = "input.required"))]
    pub policy_document_url: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub search: Option<String>,

    /// Só é considerado para o administrador global fora de um grupo
    pub partner_group_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkApprovalResponse {
    pub approved_count: usize,
    pub approved_ids: Vec<Uuid>,

    /// Pedidos que ficaram pendentes por falta de pontos do membro
    pub skipped_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order_follows_the_lifecycle() {
        assert!(ApplicationStatus::Applied < ApplicationStatus::UnionApproved);
        assert!(ApplicationStatus::UnionApproved < ApplicationStatus::Active);
        assert!(ApplicationStatus::Active < ApplicationStatus::Expired);
    }

    #[test]
    fn missing_plate_or_start_date_is_rejected() {
        let payload = CreateApplicationPayload {
            desired_start_date: None,
            car_plate: Some("12가3456".into()),
            vin: None,
            car_name: None,
            car_registered_at: None,
            memo: None,
            member_id: None,
            insured_code: None,
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("desired_start_date"));

        let payload = CreateApplicationPayload {
            desired_start_date: NaiveDate::from_ymd_opt(2024, 3, 15),
            car_plate: None,
            vin: None,
            car_name: None,
            car_registered_at: None,
            memo: None,
            member_id: None,
            insured_code: None,
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("car_plate"));
    }

    #[test]
    fn blank_plate_is_rejected_on_create_and_edit() {
        let payload = CreateApplicationPayload {
            desired_start_date: NaiveDate::from_ymd_opt(2024, 3, 15),
            car_plate: Some("   ".into()),
            vin: None,
            car_name: None,
            car_registered_at: None,
            memo: None,
            member_id: None,
            insured_code: None,
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("car_plate"));

        let changes = ApplicationChanges {
            car_plate: Some(" \t ".into()),
            ..Default::default()
        };
        let errors = changes.validate().unwrap_err();
        let plate = &errors.field_errors()["car_plate"][0];
        assert_eq!(plate.message.as_deref(), Some("input.plate_required"));

        let changes = ApplicationChanges {
            car_plate: Some(" 12가3456 ".into()),
            ..Default::default()
        };
        assert!(changes.validate().is_ok());
        assert!(ApplicationChanges::default().validate().is_ok());
    }
}
