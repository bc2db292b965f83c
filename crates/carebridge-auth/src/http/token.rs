//! Token endpoint handler.
//!
//! `POST /oauth/token` — exchanges authorization codes, refresh tokens,
//! or client credentials for bearer tokens. Errors use the standard
//! OAuth error body `{ "error": ..., "error_description": ... }`.

use axum::{
    Extension, Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::http::{AuthState, TenantContext};
use crate::oauth::token::TokenRequest;

/// Token endpoint handler.
///
/// # Responses
///
/// - 200 with the token response body on success
/// - 400 with an OAuth error body for grant failures
/// - 401 with `invalid_client` for authentication failures
/// - 500 with `server_error` for internal faults (no detail leaked)
pub async fn token_handler(
    State(state): State<AuthState>,
    Extension(tenant): Extension<TenantContext>,
    Form(request): Form<TokenRequest>,
) -> Response {
    match state.server.token(&request, &tenant.organization_id).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            tracing::debug!(
                error = %error.error,
                grant_type = %request.grant_type,
                "Token request rejected"
            );
            let status = StatusCode::from_u16(error.error.http_status())
                .unwrap_or(StatusCode::BAD_REQUEST);
            (status, Json(error)).into_response()
        }
    }
}
