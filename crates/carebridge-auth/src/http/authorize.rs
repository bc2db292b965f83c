//! Authorization endpoint handler.
//!
//! `GET /oauth/authorize` — validates the request and redirects the
//! user agent back to the client with an authorization code, or with an
//! OAuth error once the redirect URI is trusted. Failures found before
//! that point return a JSON body instead: redirecting to an unverified
//! URI would be an open redirect.

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::http::{AuthState, CallerIdentity};
use crate::oauth::authorize::AuthorizationRequest;
use crate::server::AuthorizeRejection;

/// Authorization endpoint handler.
///
/// # Responses
///
/// - 302 redirect with `code` and `state` on success
/// - 302 redirect with `error` once the redirect URI is validated
/// - 400 JSON error body for pre-validation failures
pub async fn authorize_handler(
    State(state): State<AuthState>,
    Extension(identity): Extension<CallerIdentity>,
    Query(request): Query<AuthorizationRequest>,
) -> Response {
    let outcome = state
        .server
        .authorize(&request, &identity.user_id, &identity.organization_id)
        .await;

    match outcome {
        Ok(success) => Redirect::to(&success.redirect_uri).into_response(),
        Err(AuthorizeRejection::Redirect(location)) => Redirect::to(&location).into_response(),
        Err(AuthorizeRejection::Response(error)) => {
            tracing::debug!(error = %error.error, "Authorization request rejected");
            (StatusCode::BAD_REQUEST, Json(error)).into_response()
        }
    }
}
