// src/handlers/audit.rs

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{GlobalAdminOnly, RequireRole},
    },
    models::audit::{AuditFilter, AuditLog},
};

#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    tag = "Audit",
    params(AuditFilter),
    responses(
        (status = 200, description = "Registros de auditoria mais recentes", body = Vec<AuditLog>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_audit_logs(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<GlobalAdminOnly>,
    Query(filter): Query<AuditFilter>,
) -> Result<Json<Vec<AuditLog>>, ApiError> {
    let logs = app_state
        .audit_repo
        .list(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(logs))
}
