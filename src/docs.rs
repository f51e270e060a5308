// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login_member,
        handlers::auth::login_partner_admin,
        handlers::auth::login_admin,
        handlers::auth::get_me,

        // --- Partner Groups ---
        handlers::partner_groups::list_public,
        handlers::partner_groups::list_partner_groups,
        handlers::partner_groups::create_partner_group,
        handlers::partner_groups::get_partner_group,
        handlers::partner_groups::update_partner_group,
        handlers::partner_groups::delete_partner_group,
        handlers::partner_groups::select_partner_group,
        handlers::partner_groups::deselect_partner_group,

        // --- Members ---
        handlers::members::get_profile,
        handlers::members::update_profile,
        handlers::members::list_members,
        handlers::members::create_group_member,
        handlers::members::get_member,
        handlers::members::update_member,
        handlers::members::approve_member,
        handlers::members::delete_member,
        handlers::members::create_member,

        // --- Applications ---
        handlers::applications::list_applications,
        handlers::applications::get_application,
        handlers::applications::create_application,
        handlers::applications::update_application,
        handlers::applications::delete_application,
        handlers::applications::approve_application,
        handlers::applications::approve_all_applications,
        handlers::applications::force_update_application,
        handlers::applications::force_delete_application,
        handlers::applications::attach_policy_document,

        // --- Settlements ---
        handlers::settlements::get_settlement,
        handlers::settlements::export_settlement,

        // --- Points ---
        handlers::points::request_deposit,
        handlers::points::list_deposit_requests,
        handlers::points::confirm_deposit,
        handlers::points::list_adjustments,
        handlers::points::create_adjustment,

        // --- Vehicles ---
        handlers::lookup::lookup_vehicle,

        // --- Audit ---
        handlers::audit::list_audit_logs,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::SessionRole,
            models::auth::AdminLoginPayload,
            models::auth::GroupLoginPayload,
            models::auth::AuthResponse,
            models::auth::SessionView,

            // --- Partner Groups ---
            models::partner_group::PartnerGroup,
            models::partner_group::PartnerGroupSummary,
            models::partner_group::CreatePartnerGroupPayload,
            models::partner_group::UpdatePartnerGroupPayload,

            // --- Members ---
            models::member::MemberRole,
            models::member::ApprovalStatus,
            models::member::MemberType,
            models::member::SettlementMethod,
            models::member::Member,
            models::member::RegisterMemberPayload,
            models::member::CreateMemberPayload,
            models::member::UpdateMemberPayload,
            models::member::UpdateProfilePayload,

            // --- Applications ---
            models::application::ApplicationStatus,
            models::application::InsuranceApplication,
            models::application::CreateApplicationPayload,
            models::application::ApplicationChanges,
            models::application::ForceUpdatePayload,
            models::application::ForceDeletePayload,
            models::application::AttachPolicyPayload,
            models::application::BulkApprovalResponse,

            // --- Settlements ---
            models::settlement::SettlementLine,
            models::settlement::SettlementReport,

            // --- Points ---
            models::points::DepositStatus,
            models::points::DepositRequest,
            models::points::PointAdjustment,
            models::points::CreateDepositRequestPayload,
            models::points::CreateAdjustmentPayload,

            // --- Vehicles ---
            models::vehicle::VehicleInfo,

            // --- Audit ---
            models::audit::ActorKind,
            models::audit::AuditLog,
        )
    ),
    tags(
        (name = "Auth", description = "Login, cadastro e sessão"),
        (name = "Partner Groups", description = "Grupos parceiros e seleção de grupo pelo administrador global"),
        (name = "Members", description = "Membros do grupo e perfil próprio"),
        (name = "Applications", description = "Pedidos de seguro e ciclo de vida"),
        (name = "Settlements", description = "Acerto mensal de apólices ativadas"),
        (name = "Points", description = "Depósitos e saldo de pontos"),
        (name = "Vehicles", description = "Consulta ao registro de veículos"),
        (name = "Audit", description = "Trilha de auditoria")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_protected_path_is_documented_with_bearer_auth() {
        let doc = ApiDoc::openapi();
        let components = doc.components.as_ref().unwrap();
        assert!(components.security_schemes.contains_key("api_jwt"));

        assert!(doc.paths.paths.contains_key("/api/applications/{id}/force-update"));
        assert!(doc.paths.paths.contains_key("/api/settlements/export"));
    }
}
