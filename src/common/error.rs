// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;
use crate::models::vehicle::LookupError;

/// Qual chave única foi violada. Os nomes batem com as constraints das migrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateField {
    PartnerGroupName,
    PartnerGroupAdminUsername,
    PartnerGroupBusinessNumber,
    MemberUsername,
    MemberBusinessNumber,
    Other(String),
}

impl DuplicateField {
    pub fn from_constraint(constraint: &str) -> Self {
        match constraint {
            "partner_groups_name_key" => Self::PartnerGroupName,
            "partner_groups_admin_username_key" => Self::PartnerGroupAdminUsername,
            "partner_groups_business_number_key" => Self::PartnerGroupBusinessNumber,
            "members_group_username_key" | "members_global_username_key" => Self::MemberUsername,
            "members_business_number_key" => Self::MemberBusinessNumber,
            other => Self::Other(other.to_string()),
        }
    }

    fn message_key(&self) -> &'static str {
        match self {
            Self::PartnerGroupName => "duplicate.partner_group_name",
            Self::PartnerGroupAdminUsername => "duplicate.partner_group_admin_username",
            Self::PartnerGroupBusinessNumber | Self::MemberBusinessNumber => {
                "duplicate.business_number"
            }
            Self::MemberUsername => "duplicate.member_username",
            Self::Other(_) => "duplicate.generic",
        }
    }
}

/// Converte uma violação de unicidade do Postgres em `AppError::Duplicate`.
/// Qualquer outro erro segue como erro de banco.
pub fn map_unique_violation(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let field = db_err
                .constraint()
                .map(DuplicateField::from_constraint)
                .unwrap_or_else(|| DuplicateField::Other("unknown".into()));
            return AppError::Duplicate(field);
        }
    }
    e.into()
}

/// Converte uma violação de chave estrangeira em `AppError::HasDependents`,
/// para exclusões que perderam a corrida contra uma inserção concorrente.
pub fn map_foreign_key_violation(key: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_foreign_key_violation() {
                return AppError::HasDependents(key);
            }
        }
        e.into()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Entrada inválida: {0}")]
    InvalidInput(&'static str),

    #[error("Registro duplicado: {0:?}")]
    Duplicate(DuplicateField),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Cadastro ainda não aprovado")]
    MemberNotApproved,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    #[error("Não encontrado: {0}")]
    NotFound(&'static str),

    #[error("Pedido bloqueado após aprovação")]
    ApplicationLocked,

    #[error("Existem registros dependentes: {0}")]
    HasDependents(&'static str),

    #[error("Estado inválido: {0}")]
    InvalidState(&'static str),

    #[error("Falha na consulta externa: {0}")]
    Upstream(#[from] LookupError),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Duplicate(_)
            | AppError::ApplicationLocked
            | AppError::HasDependents(_)
            | AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::MemberNotApproved | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(LookupError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Upstream(LookupError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Upstream(LookupError::Upstream(_)) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Chave da mensagem no catálogo de traduções.
    pub fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation.invalid",
            AppError::InvalidInput(key)
            | AppError::NotFound(key)
            | AppError::HasDependents(key)
            | AppError::InvalidState(key) => key,
            AppError::Duplicate(field) => field.message_key(),
            AppError::InvalidCredentials => "auth.invalid_credentials",
            AppError::MemberNotApproved => "auth.member_not_approved",
            AppError::InvalidToken => "auth.invalid_token",
            AppError::Forbidden => "auth.forbidden",
            AppError::ApplicationLocked => "application.locked",
            AppError::Upstream(LookupError::NotFound) => "lookup.not_found",
            AppError::Upstream(LookupError::Timeout) => "lookup.timeout",
            AppError::Upstream(LookupError::Upstream(_)) => "lookup.upstream_error",
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => "internal",
        }
    }

    /// Falhas de autorização mandam o cliente de volta para o login.
    fn warning(&self) -> Option<&'static str> {
        match self {
            AppError::InvalidToken | AppError::Forbidden => Some("login_required"),
            _ => None,
        }
    }

    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();

        // Nunca expomos a causa de um erro interno; ela só vai para o log.
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {}", self);
        } else if let AppError::Upstream(cause) = self {
            tracing::warn!("Consulta externa falhou: {}", cause);
        }

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            let text = e
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string());
                            Value::String(store.translate(&locale.0, &text))
                        })
                        .collect();
                    details.insert(field.to_string(), Value::Array(messages));
                }
                Some(Value::Object(details))
            }
            _ => None,
        };

        ApiError {
            status,
            error: store.translate(&locale.0, self.message_key()),
            details,
            warning: self.warning(),
        }
    }
}

/// O erro já traduzido, pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
    pub warning: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.error });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        if let Some(warning) = self.warning {
            body["warning"] = Value::String(warning.to_string());
        }
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), &I18nStore::default())
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;

    fn ko() -> Locale {
        Locale("ko".to_string())
    }

    #[derive(Debug)]
    struct PgFailure {
        kind: ErrorKind,
        constraint: &'static str,
    }

    impl std::fmt::Display for PgFailure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "violates constraint {}", self.constraint)
        }
    }

    impl std::error::Error for PgFailure {}

    impl DatabaseError for PgFailure {
        fn message(&self) -> &str {
            "constraint violation"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            None
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.constraint)
        }

        fn kind(&self) -> ErrorKind {
            match self.kind {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn pg_failure(kind: ErrorKind, constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgFailure { kind, constraint }))
    }

    #[test]
    fn foreign_key_violation_on_delete_reports_dependents() {
        let err = pg_failure(ErrorKind::ForeignKeyViolation, "members_partner_group_id_fkey");
        let mapped = map_foreign_key_violation("dependents.partner_group")(err);
        assert!(matches!(mapped, AppError::HasDependents("dependents.partner_group")));
        assert_eq!(mapped.status(), StatusCode::CONFLICT);

        let other = pg_failure(ErrorKind::UniqueViolation, "partner_groups_name_key");
        assert!(matches!(
            map_foreign_key_violation("dependents.partner_group")(other),
            AppError::DatabaseError(_)
        ));
    }

    #[test]
    fn unique_violation_maps_to_the_duplicated_field() {
        let err = pg_failure(ErrorKind::UniqueViolation, "partner_groups_business_number_key");
        assert!(matches!(
            map_unique_violation(err),
            AppError::Duplicate(DuplicateField::PartnerGroupBusinessNumber)
        ));
    }

    #[test]
    fn constraint_names_map_to_duplicate_fields() {
        assert_eq!(
            DuplicateField::from_constraint("members_group_username_key"),
            DuplicateField::MemberUsername
        );
        assert_eq!(
            DuplicateField::from_constraint("members_global_username_key"),
            DuplicateField::MemberUsername
        );
        assert_eq!(
            DuplicateField::from_constraint("partner_groups_business_number_key"),
            DuplicateField::PartnerGroupBusinessNumber
        );
        assert_eq!(
            DuplicateField::from_constraint("something_else"),
            DuplicateField::Other("something_else".into())
        );
    }

    #[test]
    fn business_number_collisions_share_a_message() {
        let store = I18nStore::default();
        let a = AppError::Duplicate(DuplicateField::MemberBusinessNumber).to_api_error(&ko(), &store);
        let b = AppError::Duplicate(DuplicateField::PartnerGroupBusinessNumber)
            .to_api_error(&ko(), &store);
        assert_eq!(a.status, StatusCode::CONFLICT);
        assert_eq!(a.error, b.error);
    }

    #[test]
    fn internal_errors_do_not_leak_their_cause() {
        let err = AppError::InternalServerError(anyhow::anyhow!("connection reset by peer"));
        let api = err.to_api_error(&ko(), &I18nStore::default());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("connection reset"));
    }

    #[test]
    fn authorization_failures_ask_for_login() {
        let api = AppError::Forbidden.to_api_error(&ko(), &I18nStore::default());
        assert_eq!(api.status, StatusCode::FORBIDDEN);
        assert_eq!(api.warning, Some("login_required"));
    }

    #[test]
    fn not_approved_has_its_own_reason() {
        let store = I18nStore::default();
        let not_approved = AppError::MemberNotApproved.to_api_error(&ko(), &store);
        let bad_password = AppError::InvalidCredentials.to_api_error(&ko(), &store);
        assert_ne!(not_approved.error, bad_password.error);
        assert_eq!(not_approved.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn upstream_failures_map_to_gateway_statuses() {
        assert_eq!(AppError::Upstream(LookupError::Timeout).status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(AppError::Upstream(LookupError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Upstream(LookupError::Upstream("503".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
