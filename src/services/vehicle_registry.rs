// src/services/vehicle_registry.rs

//! Consulta ao registro externo de veículos. É só um auxílio para preencher
//! o formulário: qualquer falha vira um erro tipado e o pedido continua
//! podendo ser enviado com os campos digitados à mão.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
#[cfg(test)]
use mockall::automock;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{
    common::error::AppError,
    models::vehicle::{LookupError, VehicleInfo},
};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait VehicleRegistry: Send + Sync {
    /// Busca pelo número da placa já normalizado.
    async fn lookup(&self, plate: &str) -> Result<VehicleInfo, LookupError>;
}

#[derive(Debug, Clone)]
pub struct VehicleLookupConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpVehicleRegistry {
    config: VehicleLookupConfig,
    http: Client,
}

impl HttpVehicleRegistry {
    pub fn new(config: VehicleLookupConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryResponse {
    #[serde(alias = "registrationDate", alias = "firstRegDate", alias = "regDate")]
    registration_date: Option<String>,

    #[serde(alias = "vinNumber", alias = "chassisNumber")]
    vin: Option<String>,

    #[serde(alias = "carName", alias = "modelName")]
    model: Option<String>,
}

/// Aceita `YYYY-MM-DD`, `YYYYMMDD` e `YYYY.MM.DD`.
pub fn parse_registration_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    ["%Y-%m-%d", "%Y%m%d", "%Y.%m.%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize(response: RegistryResponse) -> VehicleInfo {
    VehicleInfo {
        registration_date: response
            .registration_date
            .as_deref()
            .and_then(parse_registration_date),
        vin: non_blank(response.vin),
        model: non_blank(response.model),
    }
}

#[async_trait]
impl VehicleRegistry for HttpVehicleRegistry {
    async fn lookup(&self, plate: &str) -> Result<VehicleInfo, LookupError> {
        let mut request = self.http.get(&self.config.url).query(&[("plate", plate)]);
        if let Some(key) = &self.config.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout
            } else {
                LookupError::Upstream(e.to_string())
            }
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(LookupError::NotFound),
            status if !status.is_success() => {
                return Err(LookupError::Upstream(format!("status {status}")));
            }
            _ => {}
        }

        let body: RegistryResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout
            } else {
                LookupError::Upstream(e.to_string())
            }
        })?;

        let info = normalize(body);
        if info.vin.is_none() && info.model.is_none() && info.registration_date.is_none() {
            return Err(LookupError::NotFound);
        }
        Ok(info)
    }
}

/// Usado quando `VEHICLE_LOOKUP_URL` não está configurada: nenhuma chamada de rede.
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredRegistry;

#[async_trait]
impl VehicleRegistry for UnconfiguredRegistry {
    async fn lookup(&self, _plate: &str) -> Result<VehicleInfo, LookupError> {
        Err(LookupError::Upstream("vehicle registry not configured".into()))
    }
}

#[derive(Clone)]
pub struct LookupService {
    registry: Arc<dyn VehicleRegistry>,
}

impl LookupService {
    pub fn new(registry: Arc<dyn VehicleRegistry>) -> Self {
        Self { registry }
    }

    pub async fn lookup(&self, plate: &str) -> Result<VehicleInfo, AppError> {
        let plate: String = plate.split_whitespace().collect();
        if plate.is_empty() {
            return Err(AppError::InvalidInput("input.plate_required"));
        }

        let info = self.registry.lookup(&plate).await?;
        tracing::info!("Consulta de veículo concluída para a placa {}", plate);
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn registration_dates_are_normalized() {
        let expected = NaiveDate::from_ymd_opt(2019, 7, 3);
        assert_eq!(parse_registration_date("2019-07-03"), expected);
        assert_eq!(parse_registration_date("20190703"), expected);
        assert_eq!(parse_registration_date(" 2019.07.03 "), expected);
        assert_eq!(parse_registration_date("03/07/2019"), None);
    }

    #[test]
    fn blank_fields_become_none() {
        let info = normalize(RegistryResponse {
            registration_date: Some("2019-07-03".into()),
            vin: Some("  ".into()),
            model: Some(" 쏘나타 ".into()),
        });
        assert_eq!(info.vin, None);
        assert_eq!(info.model.as_deref(), Some("쏘나타"));
    }

    #[tokio::test]
    async fn plate_whitespace_is_removed_before_lookup() {
        let mut registry = MockVehicleRegistry::new();
        registry
            .expect_lookup()
            .with(eq("12가3456"))
            .times(1)
            .returning(|_| {
                Ok(VehicleInfo {
                    registration_date: None,
                    vin: Some("KMHXX00XXXX000000".into()),
                    model: Some("쏘나타".into()),
                })
            });

        let service = LookupService::new(Arc::new(registry));
        let info = service.lookup(" 12가 3456 ").await.unwrap();
        assert_eq!(info.model.as_deref(), Some("쏘나타"));
    }

    #[tokio::test]
    async fn blank_plate_never_reaches_the_registry() {
        let mut registry = MockVehicleRegistry::new();
        registry.expect_lookup().never();

        let service = LookupService::new(Arc::new(registry));
        let result = service.lookup("   ").await;
        assert!(matches!(result, Err(AppError::InvalidInput("input.plate_required"))));
    }

    #[tokio::test]
    async fn registry_failures_keep_their_kind() {
        let mut registry = MockVehicleRegistry::new();
        registry
            .expect_lookup()
            .returning(|_| Err(LookupError::Timeout));

        let service = LookupService::new(Arc::new(registry));
        let result = service.lookup("12가3456").await;
        assert!(matches!(result, Err(AppError::Upstream(LookupError::Timeout))));
    }

    #[tokio::test]
    async fn unconfigured_registry_reports_upstream_error() {
        let result = UnconfiguredRegistry.lookup("12가3456").await;
        assert!(matches!(result, Err(LookupError::Upstream(_))));
    }
}
