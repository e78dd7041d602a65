//! Authentication endpoints
//!
//! Session pairs travel in the JSON body; the refresh token additionally
//! rides an HTTP-only cookie scoped to this route tree so browser clients
//! can renew without persisting it themselves.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use tracing::{info, warn};
use validator::Validate;

use healthbridge_protocol::api::{
    ApiResponse, LoginRequest, LoginResponse, RefreshTokenRequest, RegisterRequest,
};
use healthbridge_protocol::common::{Role, SessionUser};

use crate::directory::NewUser;
use crate::error::AuthError;
use crate::middleware::{authenticate, AuthenticatedUser};
use crate::session::{Session, SessionIssuer};
use crate::state::AppState;

pub const REFRESH_COOKIE: &str = "refresh_token";
const AUTH_PATH: &str = "/api/auth";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh-token", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route(
            "/api/auth/me",
            get(me).route_layer(middleware::from_fn_with_state(state.clone(), authenticate)),
        )
        .with_state(state)
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

fn cookie_attributes() -> &'static str {
    // Secure is release-only so local http development keeps working
    if cfg!(debug_assertions) {
        "HttpOnly; SameSite=Strict"
    } else {
        "HttpOnly; Secure; SameSite=Strict"
    }
}

fn set_refresh_cookie(token: &str, max_age_secs: i64) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(&format!(
        "{REFRESH_COOKIE}={token}; {}; Path={AUTH_PATH}; Max-Age={max_age_secs}",
        cookie_attributes()
    ))
    .map_err(|e| AuthError::Internal(e.to_string()))
}

fn clear_refresh_cookie() -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(&format!(
        "{REFRESH_COOKIE}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; {}; Path={AUTH_PATH}",
        cookie_attributes()
    ))
    .map_err(|e| AuthError::Internal(e.to_string()))
}

fn session_response(
    status: StatusCode,
    session: Session,
) -> Result<(StatusCode, HeaderMap, Json<ApiResponse<LoginResponse>>), AuthError> {
    let max_age = SessionIssuer::seconds_until(session.refresh.expires_at);
    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        set_refresh_cookie(&session.refresh.token, max_age)?,
    );
    Ok((status, headers, Json(ApiResponse::ok(session.to_response()))))
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    body.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;
    let role = body.role.unwrap_or(Role::Patient);
    let session = state
        .issuer
        .register(NewUser {
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
            role,
        })
        .await?;
    info!(user_id = %session.user.id, role = %role, "account registered");
    session_response(StatusCode::CREATED, session)
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    body.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;
    let session = match state.issuer.login(&body.email, &body.password).await {
        Ok(session) => session,
        Err(err) => {
            warn!(email = %body.email, "login failed: {err}");
            return Err(err);
        }
    };
    info!(user_id = %session.user.id, role = %session.user.role, "login succeeded");
    session_response(StatusCode::OK, session)
}

async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let token = body
        .refresh_token
        .or_else(|| parse_cookie(&headers, REFRESH_COOKIE))
        .ok_or(AuthError::MissingCredential)?;
    let session = state.issuer.renew(&token).await?;
    info!(user_id = %session.user.id, "session renewed");
    session_response(StatusCode::OK, session)
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthError> {
    if let Some(token) = parse_cookie(&headers, REFRESH_COOKIE) {
        state.issuer.revoke(&token);
    }
    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, clear_refresh_cookie()?);
    Ok((
        response_headers,
        Json(ApiResponse::<()>::message("logged out")),
    ))
}

async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<SessionUser>>, AuthError> {
    let user = state
        .directory
        .find_by_id(&identity.id)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    Ok(Json(ApiResponse::ok(user.session_user())))
}
