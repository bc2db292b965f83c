//! End-to-end OAuth flow tests against the in-memory backend.
//!
//! These exercise the full stack: authorization server façade, client
//! manager, token service, storage, and audit sink.

use std::sync::Arc;

use carebridge_auth::oauth::authorize::AuthorizationRequest;
use carebridge_auth::oauth::pkce::{PkceChallenge, PkceVerifier};
use carebridge_auth::oauth::token::{TokenErrorCode, TokenRequest};
use carebridge_auth::server::{AuthorizationServer, AuthorizeRejection};
use carebridge_auth::token::{TokenConfig, TokenService};
use carebridge_auth::types::{ClientType, GrantType, HospitalRole};
use carebridge_auth::{ActorContext, ClientManager, CreateClientRequest, PermissionGrant};
use carebridge_auth_memory::{
    InMemoryAccessTokenStore, InMemoryClientStore, InMemoryCodeStore, InMemoryPermissionStore,
    InMemoryRefreshTokenStore, RecordingAuditSink,
};

const ORG: &str = "org-1";
const USER: &str = "u1";

struct Harness {
    server: AuthorizationServer,
    manager: Arc<ClientManager>,
    audit: Arc<RecordingAuditSink>,
}

fn setup() -> Harness {
    setup_with(TokenConfig::new(
        "https://auth.hospital.test",
        "https://api.hospital.test",
    ))
}

fn setup_with(config: TokenConfig) -> Harness {
    let audit = Arc::new(RecordingAuditSink::new());

    let manager = Arc::new(ClientManager::new(
        Arc::new(InMemoryClientStore::new()),
        Arc::new(InMemoryPermissionStore::new()),
        audit.clone(),
    ));

    let tokens = Arc::new(TokenService::new(
        Arc::new(InMemoryCodeStore::new()),
        Arc::new(InMemoryAccessTokenStore::new()),
        Arc::new(InMemoryRefreshTokenStore::new()),
        audit.clone(),
        config,
    ));

    Harness {
        server: AuthorizationServer::new(manager.clone(), tokens),
        manager,
        audit,
    }
}

fn actor() -> ActorContext {
    ActorContext::new(USER, ORG)
}

fn emr_client_request() -> CreateClientRequest {
    CreateClientRequest {
        name: "EMR Integration".to_string(),
        description: Some("Electronic medical record sync".to_string()),
        logo_uri: None,
        homepage_uri: None,
        policy_uri: None,
        client_type: ClientType::Confidential,
        redirect_uris: vec!["https://emr.test/cb".to_string()],
        allowed_origins: vec![],
        scopes: Some(vec!["read".to_string(), "patient:read".to_string()]),
        grant_types: Some(vec![
            GrantType::AuthorizationCode,
            GrantType::RefreshToken,
            GrantType::ClientCredentials,
        ]),
        allowed_departments: vec![],
        data_access_level: None,
        phi_access: true,
        audit_required: Some(true),
        rate_limit: None,
        token_lifetime: None,
        refresh_token_lifetime: None,
    }
}

fn authorize_request(client_id: &str) -> AuthorizationRequest {
    AuthorizationRequest {
        response_type: Some("code".to_string()),
        client_id: Some(client_id.to_string()),
        redirect_uri: Some("https://emr.test/cb".to_string()),
        scope: Some("read patient:read".to_string()),
        state: Some("abc".to_string()),
        hospital_role: Some("doctor".to_string()),
        ..AuthorizationRequest::default()
    }
}

fn token_request(client_id: &str, secret: &str) -> TokenRequest {
    TokenRequest {
        grant_type: "authorization_code".to_string(),
        code: None,
        redirect_uri: Some("https://emr.test/cb".to_string()),
        code_verifier: None,
        client_id: Some(client_id.to_string()),
        client_secret: Some(secret.to_string()),
        refresh_token: None,
        scope: None,
    }
}

/// Extracts a query parameter from a redirect URL.
fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

#[tokio::test]
async fn scenario_full_authorization_code_flow() {
    let h = setup();

    // 1. Create a confidential PHI client; the secret comes back once
    let (client, secret) = h
        .manager
        .create_client(emr_client_request(), &actor())
        .await
        .unwrap();
    assert!(!secret.is_empty());
    assert_ne!(client.secret_hash.as_deref(), Some(secret.as_str()));

    // 2. Authorize: redirect carries code and state
    let redirect = h
        .server
        .authorize(&authorize_request(&client.client_id), USER, ORG)
        .await
        .expect("authorization succeeds");
    assert!(redirect.redirect_uri.starts_with("https://emr.test/cb?"));
    let code = query_param(&redirect.redirect_uri, "code").expect("code present");
    assert_eq!(
        query_param(&redirect.redirect_uri, "state").as_deref(),
        Some("abc")
    );

    // 3. Exchange the code for tokens
    let mut request = token_request(&client.client_id, &secret);
    request.code = Some(code.clone());
    let response = h.server.token(&request, ORG).await.expect("token issued");

    assert!(!response.access_token.is_empty());
    assert!(response.refresh_token.is_some());
    assert_eq!(response.token_type, "Bearer");
    assert_eq!(response.hospital_role, Some(HospitalRole::Doctor));
    assert_eq!(response.scope.as_deref(), Some("read patient:read"));

    // 4. Re-submitting the same code fails with invalid_grant (P1)
    let replay = h.server.token(&request, ORG).await;
    assert_eq!(replay.unwrap_err().error, TokenErrorCode::InvalidGrant);
}

#[tokio::test]
async fn scenario_client_credentials_has_no_refresh_token() {
    let h = setup();
    let (client, secret) = h
        .manager
        .create_client(emr_client_request(), &actor())
        .await
        .unwrap();

    let request = TokenRequest {
        grant_type: "client_credentials".to_string(),
        scope: Some("read".to_string()),
        code: None,
        redirect_uri: None,
        code_verifier: None,
        client_id: Some(client.client_id.clone()),
        client_secret: Some(secret),
        refresh_token: None,
    };

    let response = h.server.token(&request, ORG).await.unwrap();
    assert!(!response.access_token.is_empty());
    assert!(response.refresh_token.is_none());
    assert_eq!(response.scope.as_deref(), Some("read"));

    // The serialized body must not even carry the field
    let body = serde_json::to_string(&response).unwrap();
    assert!(!body.contains("refresh_token"));
}

#[tokio::test]
async fn scenario_api_validation_dies_with_the_client() {
    let h = setup();
    let (client, secret) = h
        .manager
        .create_client(emr_client_request(), &actor())
        .await
        .unwrap();
    h.manager
        .add_permission(
            &client.client_id,
            PermissionGrant {
                scope: "read".to_string(),
                resource: "patient_data".to_string(),
                action: "read".to_string(),
                department_restrictions: vec![],
                data_classification: None,
                phi_access_level: None,
                risk_level: None,
                compliance_required: None,
                expires_at: None,
            },
            &actor(),
        )
        .await
        .unwrap();

    // Obtain an access token via the code flow
    let redirect = h
        .server
        .authorize(&authorize_request(&client.client_id), USER, ORG)
        .await
        .unwrap();
    let code = query_param(&redirect.redirect_uri, "code").unwrap();
    let mut request = token_request(&client.client_id, &secret);
    request.code = Some(code);
    let response = h.server.token(&request, ORG).await.unwrap();

    let header = format!("Bearer {}", response.access_token);
    let access = h
        .server
        .validate_token_for_api(&header, "read", "patient_data", "read", ORG, None)
        .await;
    assert!(access.valid);
    assert_eq!(access.client_id.as_deref(), Some(client.client_id.as_str()));
    assert_eq!(access.user_id.as_deref(), Some(USER));
    assert_eq!(access.hospital_role, Some(HospitalRole::Doctor));

    // Retiring the client closes the chokepoint immediately
    h.manager.revoke_client(&client.client_id, &actor()).await.unwrap();
    let access = h
        .server
        .validate_token_for_api(&header, "read", "patient_data", "read", ORG, None)
        .await;
    assert!(!access.valid);
    assert!(access.client_id.is_none());
}

// =============================================================================
// Redirect binding and expiry (P2, P3)
// =============================================================================

#[tokio::test]
async fn redeeming_with_different_redirect_uri_fails() {
    let h = setup();
    let (client, secret) = h
        .manager
        .create_client(emr_client_request(), &actor())
        .await
        .unwrap();

    let redirect = h
        .server
        .authorize(&authorize_request(&client.client_id), USER, ORG)
        .await
        .unwrap();
    let code = query_param(&redirect.redirect_uri, "code").unwrap();

    let mut request = token_request(&client.client_id, &secret);
    request.code = Some(code);
    request.redirect_uri = Some("https://emr.test/other".to_string());

    let result = h.server.token(&request, ORG).await;
    assert_eq!(result.unwrap_err().error, TokenErrorCode::InvalidGrant);
}

#[tokio::test]
async fn expired_codes_never_redeem_and_cleanup_purges_them() {
    // A negative code lifetime makes every code dead on arrival
    let h = setup_with(
        TokenConfig::new("https://auth.hospital.test", "https://api.hospital.test")
            .with_code_lifetime(time::Duration::seconds(-1)),
    );
    let (client, secret) = h
        .manager
        .create_client(emr_client_request(), &actor())
        .await
        .unwrap();

    let redirect = h
        .server
        .authorize(&authorize_request(&client.client_id), USER, ORG)
        .await
        .unwrap();
    let code = query_param(&redirect.redirect_uri, "code").unwrap();

    let mut request = token_request(&client.client_id, &secret);
    request.code = Some(code);
    let result = h.server.token(&request, ORG).await;
    assert_eq!(result.unwrap_err().error, TokenErrorCode::InvalidGrant);

    // A fresh expired code is swept by cleanup
    h.server
        .authorize(&authorize_request(&client.client_id), USER, ORG)
        .await
        .unwrap();
    let stats = h.server.tokens().cleanup_expired().await.unwrap();
    assert_eq!(stats.codes_deleted, 1);
}

// =============================================================================
// Secret handling (P4) and credential uniformity (P6)
// =============================================================================

#[tokio::test]
async fn plaintext_secret_never_leaves_registration() {
    let h = setup();
    let (client, secret) = h
        .manager
        .create_client(emr_client_request(), &actor())
        .await
        .unwrap();

    // Later reads carry no secret material
    let fetched = h.manager.get_client(&client.client_id, ORG).await.unwrap().unwrap();
    let json = serde_json::to_string(&fetched).unwrap();
    assert!(!json.contains(&secret));
    assert!(!json.contains("argon2"));

    // Audit history carries no secret material either
    for event in h.audit.events() {
        let serialized = serde_json::to_string(&event).unwrap();
        assert!(!serialized.contains(&secret));
        assert!(!serialized.contains("argon2"));
    }
}

#[tokio::test]
async fn unknown_client_and_wrong_secret_are_indistinguishable() {
    let h = setup();
    let (client, secret) = h
        .manager
        .create_client(emr_client_request(), &actor())
        .await
        .unwrap();

    let wrong_secret = h
        .manager
        .validate_credentials(&client.client_id, "wrong", ORG)
        .await
        .unwrap();
    let unknown_client = h
        .manager
        .validate_credentials("hos_ffffffffffffffffffffffffffffffff", &secret, ORG)
        .await
        .unwrap();

    assert!(wrong_secret.is_none());
    assert!(unknown_client.is_none());
}

// =============================================================================
// PHI/audit invariant (P5)
// =============================================================================

#[tokio::test]
async fn phi_without_audit_never_reaches_the_store() {
    let h = setup();

    let mut request = emr_client_request();
    request.audit_required = Some(false);
    assert!(h.manager.create_client(request, &actor()).await.is_err());

    // Nothing was persisted and nothing was audited
    assert!(h.manager.list_clients(ORG, 10, 0).await.unwrap().is_empty());
    assert!(h.audit.events().is_empty());
}

// =============================================================================
// Refresh rotation (P7)
// =============================================================================

#[tokio::test]
async fn refresh_rotation_invalidates_the_old_pair() {
    let h = setup();
    let (client, secret) = h
        .manager
        .create_client(emr_client_request(), &actor())
        .await
        .unwrap();

    let redirect = h
        .server
        .authorize(&authorize_request(&client.client_id), USER, ORG)
        .await
        .unwrap();
    let code = query_param(&redirect.redirect_uri, "code").unwrap();
    let mut request = token_request(&client.client_id, &secret);
    request.code = Some(code);
    let original = h.server.token(&request, ORG).await.unwrap();
    let old_refresh = original.refresh_token.clone().unwrap();

    // Rotate
    let refresh_request = TokenRequest {
        grant_type: "refresh_token".to_string(),
        refresh_token: Some(old_refresh.clone()),
        code: None,
        redirect_uri: None,
        code_verifier: None,
        client_id: Some(client.client_id.clone()),
        client_secret: Some(secret.clone()),
        scope: None,
    };
    let rotated = h.server.token(&refresh_request, ORG).await.unwrap();
    assert_ne!(rotated.access_token, original.access_token);
    assert_eq!(rotated.hospital_role, Some(HospitalRole::Doctor));

    // Old access token no longer introspects as active
    let introspection = h
        .server
        .introspect(&original.access_token, &client.client_id, &secret, ORG)
        .await
        .unwrap();
    assert!(!introspection.active);

    // Old refresh token is burned
    let replay = h.server.token(&refresh_request, ORG).await;
    assert_eq!(replay.unwrap_err().error, TokenErrorCode::InvalidGrant);

    // The new pair works until its own expiry
    let introspection = h
        .server
        .introspect(&rotated.access_token, &client.client_id, &secret, ORG)
        .await
        .unwrap();
    assert!(introspection.active);
    assert_eq!(introspection.hospital_role.as_deref(), Some("doctor"));
}

// =============================================================================
// Scope narrowing (P8)
// =============================================================================

#[tokio::test]
async fn client_credentials_with_unregistered_scope_is_rejected() {
    let h = setup();
    let (client, secret) = h
        .manager
        .create_client(emr_client_request(), &actor())
        .await
        .unwrap();

    let request = TokenRequest {
        grant_type: "client_credentials".to_string(),
        scope: Some("admin:write".to_string()),
        code: None,
        redirect_uri: None,
        code_verifier: None,
        client_id: Some(client.client_id.clone()),
        client_secret: Some(secret),
        refresh_token: None,
    };

    let result = h.server.token(&request, ORG).await;
    assert_eq!(result.unwrap_err().error, TokenErrorCode::InvalidScope);
}

// =============================================================================
// Introspection non-leakage (P9)
// =============================================================================

#[tokio::test]
async fn introspection_of_dead_tokens_reveals_nothing() {
    let h = setup();
    let (client, secret) = h
        .manager
        .create_client(emr_client_request(), &actor())
        .await
        .unwrap();

    // Never-issued token
    let response = h
        .server
        .introspect("no-such-token", &client.client_id, &secret, ORG)
        .await
        .unwrap();
    assert!(!response.active);
    let body = serde_json::to_string(&response).unwrap();
    assert_eq!(body, r#"{"active":false}"#);

    // Introspection itself requires client authentication
    let result = h
        .server
        .introspect("no-such-token", &client.client_id, "wrong", ORG)
        .await;
    assert_eq!(result.unwrap_err().error, TokenErrorCode::InvalidClient);
}

// =============================================================================
// Authorization endpoint error delivery
// =============================================================================

#[tokio::test]
async fn pre_redirect_failures_are_direct_responses() {
    let h = setup();
    let (client, _) = h
        .manager
        .create_client(emr_client_request(), &actor())
        .await
        .unwrap();

    // Missing parameters
    let request = AuthorizationRequest::default();
    match h.server.authorize(&request, USER, ORG).await {
        Err(AuthorizeRejection::Response(error)) => {
            assert_eq!(error.error.as_str(), "invalid_request");
        }
        other => panic!("expected direct response, got {other:?}"),
    }

    // Unregistered redirect URI must never produce a redirect
    let mut request = authorize_request(&client.client_id);
    request.redirect_uri = Some("https://evil.test/cb".to_string());
    match h.server.authorize(&request, USER, ORG).await {
        Err(AuthorizeRejection::Response(error)) => {
            assert_eq!(error.error.as_str(), "invalid_redirect_uri");
        }
        other => panic!("expected direct response, got {other:?}"),
    }
}

#[tokio::test]
async fn post_redirect_failures_travel_on_the_redirect() {
    let h = setup();
    let (client, _) = h
        .manager
        .create_client(emr_client_request(), &actor())
        .await
        .unwrap();

    // Scope outside the registration
    let mut request = authorize_request(&client.client_id);
    request.scope = Some("admin:write".to_string());
    match h.server.authorize(&request, USER, ORG).await {
        Err(AuthorizeRejection::Redirect(url)) => {
            assert!(url.starts_with("https://emr.test/cb?"));
            assert_eq!(query_param(&url, "error").as_deref(), Some("invalid_scope"));
            assert_eq!(query_param(&url, "state").as_deref(), Some("abc"));
        }
        other => panic!("expected redirect rejection, got {other:?}"),
    }

    // Unknown hospital role
    let mut request = authorize_request(&client.client_id);
    request.hospital_role = Some("janitor".to_string());
    match h.server.authorize(&request, USER, ORG).await {
        Err(AuthorizeRejection::Redirect(url)) => {
            assert_eq!(query_param(&url, "error").as_deref(), Some("invalid_request"));
            assert_eq!(query_param(&url, "state").as_deref(), Some("abc"));
        }
        other => panic!("expected redirect rejection, got {other:?}"),
    }

    // Malformed data_access_scope JSON
    let mut request = authorize_request(&client.client_id);
    request.data_access_scope = Some("{not json".to_string());
    match h.server.authorize(&request, USER, ORG).await {
        Err(AuthorizeRejection::Redirect(url)) => {
            assert_eq!(query_param(&url, "error").as_deref(), Some("invalid_request"));
        }
        other => panic!("expected redirect rejection, got {other:?}"),
    }
}

// =============================================================================
// Public client PKCE flow
// =============================================================================

#[tokio::test]
async fn public_client_pkce_end_to_end() {
    let h = setup();
    let mut registration = emr_client_request();
    registration.client_type = ClientType::Public;
    registration.phi_access = false;
    registration.grant_types = Some(vec![GrantType::AuthorizationCode]);
    let (client, _) = h.manager.create_client(registration, &actor()).await.unwrap();

    let verifier = PkceVerifier::generate();
    let challenge = PkceChallenge::from_verifier(&verifier);

    // Without a challenge the request is rejected on the redirect
    let request = authorize_request(&client.client_id);
    assert!(matches!(
        h.server.authorize(&request, USER, ORG).await,
        Err(AuthorizeRejection::Redirect(_))
    ));

    // With a challenge the code is issued
    let mut request = authorize_request(&client.client_id);
    request.code_challenge = Some(challenge.as_str().to_string());
    request.code_challenge_method = Some("S256".to_string());
    let redirect = h.server.authorize(&request, USER, ORG).await.unwrap();
    let code = query_param(&redirect.redirect_uri, "code").unwrap();

    // Redemption without the verifier is rejected before touching the code
    let exchange = TokenRequest {
        grant_type: "authorization_code".to_string(),
        code: Some(code.clone()),
        redirect_uri: Some("https://emr.test/cb".to_string()),
        code_verifier: None,
        client_id: Some(client.client_id.clone()),
        client_secret: None,
        refresh_token: None,
        scope: None,
    };
    let result = h.server.token(&exchange, ORG).await;
    assert_eq!(result.unwrap_err().error, TokenErrorCode::InvalidRequest);

    // With the right verifier the exchange completes
    let mut exchange = exchange;
    exchange.code_verifier = Some(verifier.as_str().to_string());
    let response = h.server.token(&exchange, ORG).await.unwrap();
    assert!(!response.access_token.is_empty());
}

// =============================================================================
// Audit trail
// =============================================================================

#[tokio::test]
async fn full_flow_leaves_an_audit_trail() {
    let h = setup();
    let (client, secret) = h
        .manager
        .create_client(emr_client_request(), &actor())
        .await
        .unwrap();

    let redirect = h
        .server
        .authorize(&authorize_request(&client.client_id), USER, ORG)
        .await
        .unwrap();
    let code = query_param(&redirect.redirect_uri, "code").unwrap();
    let mut request = token_request(&client.client_id, &secret);
    request.code = Some(code);
    h.server.token(&request, ORG).await.unwrap();

    let actions: Vec<&'static str> = h.audit.events().iter().map(|e| e.action.as_str()).collect();
    assert_eq!(
        actions,
        vec![
            "oauth.client.created",
            "oauth.code.issued",
            "oauth.code.redeemed",
            "oauth.token.issued",
        ]
    );
}
