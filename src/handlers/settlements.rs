// src/handlers/settlements.rs

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{AdminTier, RequireRole},
    },
    models::settlement::{SettlementQuery, SettlementReport},
    services::settlement_service::to_csv,
};

#[utoipa::path(
    get,
    path = "/api/settlements",
    tag = "Settlements",
    params(SettlementQuery),
    responses(
        (status = 200, description = "Relatório mensal por membro criador", body = SettlementReport),
        (status = 400, description = "Ano ou mês inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_settlement(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<AdminTier>,
    Query(query): Query<SettlementQuery>,
) -> Result<Json<SettlementReport>, ApiError> {
    let report = app_state
        .settlement_service
        .report(&principal, &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/settlements/export",
    tag = "Settlements",
    params(SettlementQuery),
    responses(
        (status = 200, description = "Mesmo relatório em CSV (UTF-8 com BOM)", content_type = "text/csv")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_settlement(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<AdminTier>,
    Query(query): Query<SettlementQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .settlement_service
        .report(&principal, &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let filename = format!(
        "attachment; filename=\"settlement-{}-{:02}.csv\"",
        report.year, report.month
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        to_csv(&report),
    ))
}
