use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::SameSitePolicy;
use crate::dtos::auth::{MessageResponse, SessionResponse, SignInRequest, SignInResponse};
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::{SessionCodec, SESSION_COOKIE};
use crate::AppState;

/// Non-httpOnly role hint for client-side UI decisions. Never consulted for
/// authorization.
pub const ROLE_COOKIE: &str = "portal_role";

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn same_site(policy: SameSitePolicy) -> SameSite {
    match policy {
        SameSitePolicy::Strict => SameSite::Strict,
        SameSitePolicy::Lax => SameSite::Lax,
    }
}

fn session_cookie(codec: &SessionCodec, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(codec.cookie_secure())
        .same_site(same_site(codec.same_site()))
        .max_age(time::Duration::seconds(codec.ttl_seconds()))
        .build()
}

fn role_cookie(codec: &SessionCodec, role_hint: String) -> Cookie<'static> {
    Cookie::build((ROLE_COOKIE, role_hint))
        .path("/")
        .secure(codec.cookie_secure())
        .same_site(same_site(codec.same_site()))
        .max_age(time::Duration::seconds(codec.ttl_seconds()))
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

/// Exchange an identity token for a session cookie
#[utoipa::path(
    post,
    path = "/auth/signin",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Session issued", body = SignInResponse),
        (status = 401, description = "Invalid or expired identity token"),
        (status = 502, description = "Identity provider unreachable"),
        (status = 503, description = "Profile store unavailable")
    ),
    tag = "Authentication"
)]
pub async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(req): Json<SignInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let signed_in = state
        .sessions
        .sign_in(&req.identity_token, client_ip(&headers), user_agent(&headers))
        .await?;

    let codec = state.sessions.codec();
    let role_hint = signed_in
        .access
        .role
        .map(|role| role.as_str().to_string())
        .unwrap_or_else(|| "pending".to_string());

    let jar = jar
        .add(session_cookie(codec, signed_in.token.clone()))
        .add(role_cookie(codec, role_hint));

    let body = SignInResponse {
        session: SessionResponse::from(&signed_in.access),
        newly_registered: signed_in.registration.newly_created,
        bootstrap_conflict: signed_in.registration.bootstrap_conflict,
        claims_sync_degraded: signed_in.registration.sync.is_degraded(),
    };
    Ok((StatusCode::OK, jar, Json(body)))
}

/// Clear the session cookies
#[utoipa::path(
    post,
    path = "/auth/signout",
    responses(
        (status = 200, description = "Signed out", body = MessageResponse)
    ),
    tag = "Authentication"
)]
pub async fn signout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar
        .remove(removal_cookie(SESSION_COOKIE))
        .remove(removal_cookie(ROLE_COOKIE));
    (
        StatusCode::OK,
        jar,
        Json(MessageResponse {
            message: "Signed out".to_string(),
        }),
    )
}

/// Current session info
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Session is valid", body = SessionResponse),
        (status = 307, description = "No valid session, redirect to login")
    ),
    tag = "Authentication"
)]
pub async fn session(CurrentUser(access): CurrentUser) -> impl IntoResponse {
    Json(SessionResponse::from(&access))
}

/// Profile view for any approved user
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Caller's access context", body = SessionResponse),
        (status = 307, description = "Redirected by the role gate")
    ),
    tag = "Authentication"
)]
pub async fn me(CurrentUser(access): CurrentUser) -> impl IntoResponse {
    Json(SessionResponse::from(&access))
}
