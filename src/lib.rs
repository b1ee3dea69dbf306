pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod provider;
pub mod services;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Environment, PortalConfig, SwaggerMode};
use crate::error::AppError;
use crate::provider::IdentityProvider;
use crate::services::{
    ApprovalService, ClaimsSync, CredentialVerifier, MarkerService, SessionCodec, SessionService,
};
use crate::store::ProfileStore;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::auth::signin,
        handlers::auth::signout,
        handlers::auth::session,
        handlers::auth::me,
        handlers::admin::list_users,
        handlers::admin::list_pending,
        handlers::admin::approve_user,
        handlers::admin::reject_user,
        handlers::admin::set_role,
        handlers::admin::set_disabled,
        handlers::admin::delete_user,
        handlers::admin::refresh_claims,
        handlers::admin::force_logout,
        handlers::admin::set_lockdown,
        handlers::admin::set_maintenance,
        handlers::audit::role_logs,
        handlers::audit::signin_logs,
    ),
    components(
        schemas(
            dtos::auth::SignInRequest,
            dtos::auth::SignInResponse,
            dtos::auth::SessionResponse,
            dtos::auth::MessageResponse,
            dtos::admin::ApproveRequest,
            dtos::admin::SetRoleRequest,
            dtos::admin::SetDisabledRequest,
            dtos::admin::SetLockdownRequest,
            dtos::admin::SetMaintenanceRequest,
            dtos::admin::PendingListResponse,
            dtos::admin::ApprovedListResponse,
            dtos::admin::MutationResponse,
            dtos::admin::ClaimsRefreshResponse,
            dtos::admin::ForceLogoutResponse,
            dtos::admin::AuditListResponse,
            models::Role,
            models::PendingProfile,
            models::ApprovedProfile,
            models::CustomClaims,
            models::AuditAction,
            models::AuditEntry,
        )
    ),
    tags(
        (name = "Authentication", description = "Sign-in, sign-out, and session inspection"),
        (name = "Administration", description = "Owner-only user and marker management"),
        (name = "Audit", description = "Append-only audit log access"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PortalConfig>,
    pub store: Arc<dyn ProfileStore>,
    pub provider: Arc<dyn IdentityProvider>,
    pub claims: ClaimsSync,
    pub approval: ApprovalService,
    pub sessions: SessionService,
    pub markers: MarkerService,
}

impl AppState {
    /// Wire the service graph over the given store and provider.
    pub fn build(
        config: PortalConfig,
        store: Arc<dyn ProfileStore>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AppError> {
        let codec = SessionCodec::new(&config.session).map_err(AppError::ConfigError)?;
        let claims = ClaimsSync::new(provider.clone(), config.bypass.clone());
        let approval = ApprovalService::new(
            store.clone(),
            provider.clone(),
            claims.clone(),
            config.approval.clone(),
        );
        let verifier = CredentialVerifier::new(provider.clone(), config.security.skip_auth);
        let sessions = SessionService::new(
            codec,
            verifier,
            approval.clone(),
            claims.clone(),
            store.clone(),
        );
        let markers = MarkerService::new(
            store.clone(),
            Duration::from_secs(config.markers.cache_ttl_seconds),
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            provider,
            claims,
            approval,
            sessions,
            markers,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/auth/session", get(handlers::auth::session))
        .layer(from_fn_with_state(state.clone(), middleware::session_guard));

    let staff_routes = Router::new()
        .route("/me", get(handlers::auth::me))
        .layer(from_fn_with_state(state.clone(), middleware::staff_guard));

    let admin_routes = Router::new()
        .route("/admin/users", get(handlers::admin::list_users))
        .route("/admin/users/pending", get(handlers::admin::list_pending))
        .route(
            "/admin/users/:subject_id/approve",
            post(handlers::admin::approve_user),
        )
        .route(
            "/admin/users/:subject_id/reject",
            post(handlers::admin::reject_user),
        )
        .route(
            "/admin/users/:subject_id/role",
            patch(handlers::admin::set_role),
        )
        .route(
            "/admin/users/:subject_id/disabled",
            patch(handlers::admin::set_disabled),
        )
        .route(
            "/admin/users/:subject_id",
            delete(handlers::admin::delete_user),
        )
        .route(
            "/admin/users/:subject_id/claims/refresh",
            post(handlers::admin::refresh_claims),
        )
        .route("/admin/force-logout", post(handlers::admin::force_logout))
        .route("/admin/lockdown", put(handlers::admin::set_lockdown))
        .route("/admin/maintenance", put(handlers::admin::set_maintenance))
        .route("/admin/logs/roles", get(handlers::audit::role_logs))
        .route("/admin/logs/signins", get(handlers::audit::signin_logs))
        .layer(from_fn_with_state(state.clone(), middleware::owner_guard));

    let mut app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/auth/signin", post(handlers::auth::signin))
        .route("/auth/signout", post(handlers::auth::signout));

    let swagger_enabled = match state.config.environment {
        Environment::Dev => true,
        Environment::Prod => state.config.swagger.enabled == SwaggerMode::Public,
    };
    if swagger_enabled {
        app = app.merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()));
    }

    app.merge(session_routes)
        .merge(staff_routes)
        .merge(admin_routes)
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|origin| {
                            origin.parse::<HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    origin,
                                    e
                                );
                                HeaderValue::from_static("http://localhost")
                            })
                        })
                        .collect::<Vec<HeaderValue>>(),
                )
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE])
                .allow_credentials(true),
        )
}
