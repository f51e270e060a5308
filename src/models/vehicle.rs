// src/models/vehicle.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Dados normalizados devolvidos pelo registro de veículos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInfo {
    pub registration_date: Option<NaiveDate>,
    pub vin: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("vehicle not found")]
    NotFound,

    #[error("lookup timed out")]
    Timeout,

    #[error("upstream error: {0}")]
    Upstream(String),
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct LookupQuery {
    #[schema(example = "12가3456")]
    pub plate: String,
}
