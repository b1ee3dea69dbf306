//! Route guards.
//!
//! Each guarded router layer runs the Role Gate against the request's session
//! cookie and either forwards the request with the resolved access context in
//! its extensions, or answers with the gate's redirect/forbidden decision.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use crate::error::AppError;
use crate::services::{evaluate, AccessPolicy, GateDecision, SessionAccess, SESSION_COOKIE};
use crate::AppState;

/// Require a valid session but nothing more. Pending subjects pass.
pub async fn session_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    apply(AccessPolicy::SESSION_ONLY, state, jar, req, next).await
}

/// Require an approved session with at least the Staff role.
pub async fn staff_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    apply(AccessPolicy::STAFF, state, jar, req, next).await
}

/// Require an approved Owner session.
pub async fn owner_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    apply(AccessPolicy::OWNER, state, jar, req, next).await
}

async fn apply(
    policy: AccessPolicy,
    state: AppState,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let markers = state.markers.current().await;

    let access = match jar.get(SESSION_COOKIE) {
        Some(cookie) => match state.sessions.validate(cookie.value(), &markers).await {
            Ok(access) => Some(access),
            Err(rejection) => {
                tracing::debug!(?rejection, "Session credential rejected");
                None
            }
        },
        None => None,
    };

    match evaluate(policy, &markers, access.as_ref()) {
        GateDecision::Allow => {
            if let Some(access) = access {
                req.extensions_mut().insert(access);
            }
            next.run(req).await
        }
        GateDecision::Forbidden => {
            AppError::Forbidden(anyhow::anyhow!("Insufficient role for this operation"))
                .into_response()
        }
        decision => {
            // redirect_path is Some for every remaining decision
            match decision.redirect_path() {
                Some(path) => Redirect::temporary(path).into_response(),
                None => AppError::Unauthorized(anyhow::anyhow!("Access denied")).into_response(),
            }
        }
    }
}

/// Extractor for the access context a guard stored in request extensions.
pub struct CurrentUser(pub SessionAccess);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let access = parts
            .extensions
            .get::<SessionAccess>()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("No session in request")))?;
        Ok(CurrentUser(access.clone()))
    }
}
