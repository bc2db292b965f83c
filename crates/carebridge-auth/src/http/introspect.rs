//! Token introspection endpoint handler (RFC 7662).
//!
//! `POST /oauth/introspect` — requires client authentication, then
//! reveals the token's active state and claims. Inactive tokens yield
//! `{ "active": false }` with no hint of why.

use axum::{
    Extension, Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::http::{AuthState, TenantContext};

/// Form parameters for the introspection endpoint.
#[derive(Debug, Deserialize)]
pub struct IntrospectionForm {
    /// The token to introspect.
    pub token: String,

    /// Optional hint about the token type (accepted and ignored).
    #[serde(default)]
    pub token_type_hint: Option<String>,

    /// Client ID for authentication.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret for authentication.
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Token introspection endpoint handler.
///
/// # Responses
///
/// - 200 with the claim set, or `{ "active": false }`
/// - 400 when the `token` parameter is missing
/// - 401 when client authentication fails
pub async fn introspect_handler(
    State(state): State<AuthState>,
    Extension(tenant): Extension<TenantContext>,
    Form(form): Form<IntrospectionForm>,
) -> Response {
    if form.token.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "invalid_request",
                "error_description": "Missing required 'token' parameter",
            })),
        )
            .into_response();
    }

    let (Some(client_id), Some(client_secret)) = (form.client_id, form.client_secret) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "invalid_client",
                "error_description": "Client authentication required",
            })),
        )
            .into_response();
    };

    match state
        .server
        .introspect(
            &form.token,
            &client_id,
            &client_secret,
            &tenant.organization_id,
        )
        .await
    {
        Ok(response) => {
            tracing::debug!(active = response.active, "Token introspection completed");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(error) => {
            tracing::debug!(error = %error.error, "Introspection rejected");
            let status = StatusCode::from_u16(error.error.http_status())
                .unwrap_or(StatusCode::UNAUTHORIZED);
            (status, Json(error)).into_response()
        }
    }
}
