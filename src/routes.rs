// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas (login, cadastro e seletor de grupos)
    let public_routes = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/partner-groups/public", get(handlers::partner_groups::list_public))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login_member))
        .route("/api/auth/partner/login", post(handlers::auth::login_partner_admin))
        .route("/api/auth/admin/login", post(handlers::auth::login_admin));

    let session_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::get_me))
        .route("/api/vehicles/lookup", get(handlers::lookup::lookup_vehicle))
        .route(
            "/api/members/me",
            get(handlers::members::get_profile).put(handlers::members::update_profile),
        );

    let member_routes = Router::new()
        .route(
            "/api/partner/members",
            get(handlers::members::list_members).post(handlers::members::create_group_member),
        )
        .route(
            "/api/partner/members/{id}",
            get(handlers::members::get_member)
                .put(handlers::members::update_member)
                .delete(handlers::members::delete_member),
        )
        .route("/api/partner/members/{id}/approve", post(handlers::members::approve_member));

    let application_routes = Router::new()
        .route(
            "/api/applications",
            get(handlers::applications::list_applications)
                .post(handlers::applications::create_application),
        )
        .route(
            "/api/applications/approve-all",
            post(handlers::applications::approve_all_applications),
        )
        .route(
            "/api/applications/{id}",
            get(handlers::applications::get_application)
                .put(handlers::applications::update_application)
                .delete(handlers::applications::delete_application),
        )
        .route(
            "/api/applications/{id}/approve",
            post(handlers::applications::approve_application),
        )
        .route(
            "/api/applications/{id}/force-update",
            post(handlers::applications::force_update_application),
        )
        .route(
            "/api/applications/{id}/force-delete",
            post(handlers::applications::force_delete_application),
        )
        .route(
            "/api/applications/{id}/policy-document",
            put(handlers::applications::attach_policy_document),
        );

    let settlement_routes = Router::new()
        .route("/api/settlements", get(handlers::settlements::get_settlement))
        .route("/api/settlements/export", get(handlers::settlements::export_settlement));

    let points_routes = Router::new()
        .route(
            "/api/points/deposit-requests",
            get(handlers::points::list_deposit_requests).post(handlers::points::request_deposit),
        )
        .route(
            "/api/points/deposit-requests/{id}/confirm",
            post(handlers::points::confirm_deposit),
        )
        .route(
            "/api/points/adjustments",
            get(handlers::points::list_adjustments).post(handlers::points::create_adjustment),
        );

    // Telas do administrador global
    let admin_routes = Router::new()
        .route(
            "/api/admin/partner-groups",
            get(handlers::partner_groups::list_partner_groups)
                .post(handlers::partner_groups::create_partner_group),
        )
        .route(
            "/api/admin/partner-groups/deselect",
            post(handlers::partner_groups::deselect_partner_group),
        )
        .route(
            "/api/admin/partner-groups/{id}",
            get(handlers::partner_groups::get_partner_group)
                .put(handlers::partner_groups::update_partner_group)
                .delete(handlers::partner_groups::delete_partner_group),
        )
        .route(
            "/api/admin/partner-groups/{id}/select",
            post(handlers::partner_groups::select_partner_group),
        )
        .route("/api/admin/members", post(handlers::members::create_member))
        .route("/api/admin/audit-logs", get(handlers::audit::list_audit_logs));

    // Tudo abaixo exige token; o papel é conferido no banco a cada requisição
    let protected_routes = Router::new()
        .merge(session_routes)
        .merge(member_routes)
        .merge(application_routes)
        .merge(settlement_routes)
        .merge(points_routes)
        .merge(admin_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::config::Settings;
    use crate::services::vehicle_registry::UnconfiguredRegistry;

    // O pool é preguiçoso: nenhuma das rotas testadas chega ao banco.
    fn app() -> Router {
        let settings = Settings {
            database_url: "postgres://localhost/portal_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            session_ttl_hours: 12,
            vehicle_lookup: None,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy(&settings.database_url)
            .unwrap();
        build_router(AppState::with_registry(pool, settings, Arc::new(UnconfiguredRegistry)))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_route_without_token_asks_for_login() {
        let response = app()
            .oneshot(Request::get("/api/applications").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["warning"], "login_required");
    }

    #[tokio::test]
    async fn forged_token_is_rejected_before_the_database() {
        let response = app()
            .oneshot(
                Request::get("/api/auth/me")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .header(header::ACCEPT_LANGUAGE, "en-US")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_validates_the_payload() {
        let response = app()
            .oneshot(
                Request::post("/api/auth/admin/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"username":"","password":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["details"]["username"].is_array());
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = app()
            .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
