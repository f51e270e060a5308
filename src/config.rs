// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        ApplicationRepository, AuditRepository, MemberRepository, PartnerGroupRepository,
        PointsRepository, SystemRepository,
    },
    services::{
        application_service::ApplicationService,
        application_store::PgApplicationStore,
        auth::AuthService,
        bootstrap::BootstrapService,
        member_service::MemberService,
        partner_group_service::PartnerGroupService,
        points_service::PointsService,
        settlement_service::SettlementService,
        vehicle_registry::{
            HttpVehicleRegistry, LookupService, UnconfiguredRegistry, VehicleLookupConfig,
            VehicleRegistry,
        },
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub session_ttl_hours: i64,
    pub vehicle_lookup: Option<VehicleLookupConfig>,
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválida: {}", key, e)),
        None => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    pub fn from_source<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = get("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = get("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET não pode ser vazio");
        }

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let session_ttl_hours = parse_or(
            get("SESSION_TTL_HOURS"),
            "SESSION_TTL_HOURS",
            DEFAULT_SESSION_TTL_HOURS,
        )?;
        let timeout_secs = parse_or(
            get("VEHICLE_LOOKUP_TIMEOUT_SECS"),
            "VEHICLE_LOOKUP_TIMEOUT_SECS",
            DEFAULT_LOOKUP_TIMEOUT_SECS,
        )?;

        let vehicle_lookup = get("VEHICLE_LOOKUP_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|url| VehicleLookupConfig {
                url,
                api_key: get("VEHICLE_LOOKUP_API_KEY").filter(|k| !k.is_empty()),
                timeout: Duration::from_secs(timeout_secs),
            });

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            session_ttl_hours,
            vehicle_lookup,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Settings,
    pub i18n_store: I18nStore,
    pub auth_service: AuthService,
    pub bootstrap_service: BootstrapService,
    pub partner_group_service: PartnerGroupService,
    pub member_service: MemberService,
    pub application_service: ApplicationService,
    pub settlement_service: SettlementService,
    pub points_service: PointsService,
    pub lookup_service: LookupService,
    pub audit_repo: AuditRepository,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let settings = Settings::from_env()?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Self::from_parts(db_pool, settings)
    }

    /// Monta o gráfico de dependências sobre um pool já criado.
    pub fn from_parts(db_pool: PgPool, settings: Settings) -> anyhow::Result<Self> {
        let registry: Arc<dyn VehicleRegistry> = match &settings.vehicle_lookup {
            Some(config) => Arc::new(
                HttpVehicleRegistry::new(config.clone())
                    .context("Falha ao criar o cliente HTTP do registro de veículos")?,
            ),
            None => {
                tracing::warn!("VEHICLE_LOOKUP_URL ausente: consulta de veículos desativada");
                Arc::new(UnconfiguredRegistry)
            }
        };

        Ok(Self::with_registry(db_pool, settings, registry))
    }

    pub fn with_registry(
        db_pool: PgPool,
        settings: Settings,
        registry: Arc<dyn VehicleRegistry>,
    ) -> Self {
        let partner_group_repo = PartnerGroupRepository::new(db_pool.clone());
        let member_repo = MemberRepository::new(db_pool.clone());
        let application_repo = ApplicationRepository::new(db_pool.clone());
        let points_repo = PointsRepository::new(db_pool.clone());
        let audit_repo = AuditRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            member_repo.clone(),
            partner_group_repo.clone(),
            audit_repo.clone(),
            settings.jwt_secret.clone(),
            chrono::Duration::hours(settings.session_ttl_hours),
            db_pool.clone(),
        );
        let bootstrap_service = BootstrapService::new(
            member_repo.clone(),
            SystemRepository::new(),
            audit_repo.clone(),
            db_pool.clone(),
        );
        let partner_group_service = PartnerGroupService::new(
            partner_group_repo.clone(),
            audit_repo.clone(),
            db_pool.clone(),
        );
        let member_service = MemberService::new(
            member_repo.clone(),
            partner_group_repo,
            audit_repo.clone(),
            db_pool.clone(),
        );
        let application_store = PgApplicationStore::new(
            application_repo.clone(),
            member_repo.clone(),
            points_repo.clone(),
            audit_repo.clone(),
            db_pool.clone(),
        );
        let application_service = ApplicationService::new(
            application_repo.clone(),
            Arc::new(application_store),
            member_repo.clone(),
            audit_repo.clone(),
            db_pool.clone(),
        );
        let settlement_service =
            SettlementService::new(application_repo, application_service.clone());
        let points_service =
            PointsService::new(points_repo, member_repo, audit_repo.clone(), db_pool.clone());

        Self {
            db_pool,
            settings,
            i18n_store: I18nStore,
            auth_service,
            bootstrap_service,
            partner_group_service,
            member_service,
            application_service,
            settlement_service,
            points_service,
            lookup_service: LookupService::new(registry),
            audit_repo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_values_are_missing() {
        let settings = Settings::from_source(source(&[
            ("DATABASE_URL", "postgres://localhost/portal"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(settings.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(settings.session_ttl_hours, 12);
        assert!(settings.vehicle_lookup.is_none());
    }

    #[test]
    fn lookup_is_configured_from_its_url() {
        let settings = Settings::from_source(source(&[
            ("DATABASE_URL", "postgres://localhost/portal"),
            ("JWT_SECRET", "secret"),
            ("VEHICLE_LOOKUP_URL", "https://registry.example/api/cars"),
            ("VEHICLE_LOOKUP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        let lookup = settings.vehicle_lookup.unwrap();
        assert_eq!(lookup.timeout, Duration::from_secs(5));
        assert_eq!(lookup.api_key, None);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let result = Settings::from_source(source(&[("DATABASE_URL", "postgres://localhost/portal")]));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_numbers_are_reported() {
        let result = Settings::from_source(source(&[
            ("DATABASE_URL", "postgres://localhost/portal"),
            ("JWT_SECRET", "secret"),
            ("SESSION_TTL_HOURS", "twelve"),
        ]));
        assert!(result.is_err());
    }
}
