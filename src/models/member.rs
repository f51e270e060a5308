// src/models/member.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "member_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Admin,  // Administrador global (sem grupo)
    Member, // Empresa associada a um grupo
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "approval_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Applied,
    Approved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "member_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    Corporate,  // 법인
    Individual, // 개인
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "settlement_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum SettlementMethod {
    Point,
    Invoice,
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Uuid,

    // Nulo apenas para administradores globais
    pub partner_group_id: Option<Uuid>,

    #[schema(example = "dealer01")]
    pub username: String,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,

    #[schema(example = "부산모터스")]
    pub company_name: String,
    pub representative: String,
    pub business_number: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub memo: Option<String>,
    pub role: MemberRole,
    pub approval_status: ApprovalStatus,
    pub member_type: MemberType,
    pub privacy_agreement: bool,
    pub settlement_method: SettlementMethod,
    pub point_balance: i64,
    pub created_at: NaiveDateTime,
}

impl Member {
    pub fn is_approved(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved
    }

    pub fn is_global_admin(&self) -> bool {
        self.role == MemberRole::Admin && self.partner_group_id.is_none()
    }
}

/// Linha pronta para INSERT (senha já com hash).
#[derive(Debug, Clone)]
pub struct NewMember {
    pub partner_group_id: Option<Uuid>,
    pub username: String,
    pub password_hash: String,
    pub company_name: String,
    pub representative: String,
    pub business_number: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub memo: Option<String>,
    pub role: MemberRole,
    pub approval_status: ApprovalStatus,
    pub member_type: MemberType,
    pub privacy_agreement: bool,
    pub settlement_method: SettlementMethod,
}

fn validate_privacy_agreement(
    member_type: MemberType,
    privacy_agreement: bool,
) -> Result<(), ValidationError> {
    if member_type == MemberType::Individual && !privacy_agreement {
        let mut err = ValidationError::new("privacy_agreement");
        err.message = Some("input.privacy_agreement_required".into());
        return Err(err);
    }
    Ok(())
}

fn validate_registration(payload: &RegisterMemberPayload) -> Result<(), ValidationError> {
    validate_privacy_agreement(payload.member_type, payload.privacy_agreement)
}

fn validate_admin_creation(payload: &CreateMemberPayload) -> Result<(), ValidationError> {
    validate_privacy_agreement(payload.member_type, payload.privacy_agreement)
}

// Auto-cadastro público: sempre entra como APPLIED / MEMBER
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_registration"))]
pub struct RegisterMemberPayload {
    pub partner_group_id: Uuid,

    #[validate(length(min = 1, message = "input.required"))]
    pub username: String,

    #[validate(length(min = 4, message = "input.password_too_short"))]
    pub password: String,

    #[validate(length(min = 1, message = "input.required"))]
    pub company_name: String,

    #[validate(length(min = 1, message = "input.required"))]
    pub representative: String,

    pub business_number: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,

    #[validate(email(message = "validation.invalid"))]
    pub email: Option<String>,

    pub address: Option<String>,
    pub member_type: MemberType,

    #[serde(default)]
    pub privacy_agreement: bool,
}

// Criação administrativa: o administrador escolhe status e papel
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_admin_creation"))]
pub struct CreateMemberPayload {
    /// Ignorado no escopo de um grupo. O administrador global deixa nulo
    /// para criar outro administrador global; o papel decorre disso.
    pub partner_group_id: Option<Uuid>,

    #[validate(length(min = 1, message = "input.required"))]
    pub username: String,

    #[validate(length(min = 4, message = "input.password_too_short"))]
    pub password: String,

    #[validate(length(min = 1, message = "input.required"))]
    pub company_name: String,

    #[validate(length(min = 1, message = "input.required"))]
    pub representative: String,

    pub business_number: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,

    #[validate(email(message = "validation.invalid"))]
    pub email: Option<String>,

    pub address: Option<String>,
    pub memo: Option<String>,
    pub member_type: MemberType,

    #[serde(default)]
    pub privacy_agreement: bool,

    /// Padrão: APPROVED
    pub approval_status: Option<ApprovalStatus>,
    pub settlement_method: Option<SettlementMethod>,
}

/// Edição administrativa. `None` mantém o valor atual.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberPayload {
    #[validate(length(min = 1, message = "input.required"))]
    pub company_name: Option<String>,

    #[validate(length(min = 1, message = "input.required"))]
    pub representative: Option<String>,

    pub business_number: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,

    #[validate(email(message = "validation.invalid"))]
    pub email: Option<String>,

    pub address: Option<String>,
    pub memo: Option<String>,

    #[validate(length(min = 4, message = "input.password_too_short"))]
    pub password: Option<String>,

    pub approval_status: Option<ApprovalStatus>,
    pub settlement_method: Option<SettlementMethod>,
}

// O próprio membro só mexe nos dados de contato
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    pub phone: Option<String>,
    pub mobile: Option<String>,

    #[validate(email(message = "validation.invalid"))]
    pub email: Option<String>,

    pub address: Option<String>,

    #[validate(length(min = 4, message = "input.password_too_short"))]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct MemberFilter {
    pub approval_status: Option<ApprovalStatus>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(member_type: MemberType, privacy_agreement: bool) -> RegisterMemberPayload {
        RegisterMemberPayload {
            partner_group_id: Uuid::new_v4(),
            username: "dealer01".into(),
            password: "secret1".into(),
            company_name: "부산모터스".into(),
            representative: "김대표".into(),
            business_number: None,
            phone: None,
            mobile: None,
            email: None,
            address: None,
            member_type,
            privacy_agreement,
        }
    }

    #[test]
    fn individuals_must_accept_privacy_agreement() {
        assert!(registration(MemberType::Individual, false).validate().is_err());
        assert!(registration(MemberType::Individual, true).validate().is_ok());
    }

    #[test]
    fn corporations_do_not_need_privacy_agreement() {
        assert!(registration(MemberType::Corporate, false).validate().is_ok());
    }

    #[test]
    fn short_passwords_are_rejected() {
        let mut payload = registration(MemberType::Corporate, false);
        payload.password = "abc".into();
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }
}
