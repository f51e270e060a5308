// src/handlers/lookup.rs

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{GroupScoped, RequireRole},
    },
    models::vehicle::{LookupQuery, VehicleInfo},
};

#[utoipa::path(
    get,
    path = "/api/vehicles/lookup",
    tag = "Vehicles",
    params(LookupQuery),
    responses(
        (status = 200, description = "Dados do veículo para pré-preencher o pedido", body = VehicleInfo),
        (status = 404, description = "Placa não encontrada"),
        (status = 502, description = "Falha no serviço externo")
    ),
    security(("api_jwt" = []))
)]
pub async fn lookup_vehicle(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<GroupScoped>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<VehicleInfo>, ApiError> {
    let info = app_state
        .lookup_service
        .lookup(&query.plate)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(info))
}
