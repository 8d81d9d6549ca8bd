//! Integration tests for the NHS login callback flow
//!
//! wiremock stands in for the identity provider and the PDS API; the
//! orchestrator runs against in-memory repositories and cache.

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::nhs_mock::{TEST_NHS_NUMBER, TEST_SUB};
use common::{test_nhs_config, MemoryTokenCache, MockTokenRepository, MockUserRepository, NhsMockServer};
use stride_auth_core::{
    AuthConfig, AuthError, AuthGateway, BearerAuth, CallbackParams, LoginError, LoginFlow,
    LoginOrchestrator, LoginOutcome, NhsAuthenticator, PdsClient, TokenSigner,
};
use stride_cache::{hash_token, TokenCache};
use stride_db::{TokenRepository, UserRepository};

const TEST_SECRET: &str = "a-login-flow-test-signing-secret";

struct Harness {
    orchestrator: LoginOrchestrator<MockUserRepository, MockTokenRepository, MemoryTokenCache>,
    users: Arc<MockUserRepository>,
    tokens: Arc<MockTokenRepository>,
    cache: Arc<MemoryTokenCache>,
    signer: TokenSigner,
}

async fn harness(server: &NhsMockServer) -> Harness {
    let config = test_nhs_config(&server.url());
    let oidc = NhsAuthenticator::discover(config.clone()).await.unwrap();
    let pds = PdsClient::new(config.clone()).unwrap();
    let signer = TokenSigner::new(&AuthConfig::new(TEST_SECRET));

    let users = Arc::new(MockUserRepository::new());
    let tokens = Arc::new(MockTokenRepository::new());
    let cache = Arc::new(MemoryTokenCache::new());

    let orchestrator = LoginOrchestrator::new(
        oidc,
        pds,
        signer.clone(),
        Arc::clone(&users),
        Arc::clone(&tokens),
        Arc::clone(&cache),
        config.app_uri,
    );

    Harness {
        orchestrator,
        users,
        tokens,
        cache,
        signer,
    }
}

fn callback(code: Option<&str>, state: Option<&str>, error: Option<&str>) -> CallbackParams {
    let mut query = HashMap::new();
    if let Some(code) = code {
        query.insert("code".to_string(), code.to_string());
    }
    if let Some(state) = state {
        query.insert("state".to_string(), state.to_string());
    }
    if let Some(error) = error {
        query.insert("error".to_string(), error.to_string());
    }
    CallbackParams::from_query(&query)
}

fn token_from_redirect(redirect_url: &str) -> String {
    redirect_url
        .split("token=")
        .nth(1)
        .expect("redirect carries a token")
        .to_string()
}

#[tokio::test]
async fn test_authorization_url_carries_state_and_claims() {
    let server = NhsMockServer::start().await;
    let h = harness(&server).await;

    let url = h.orchestrator.login_url("myapp", "42").unwrap();
    let query: HashMap<_, _> = url.query_pairs().into_owned().collect();

    assert!(url.as_str().starts_with(&format!("{}/authorize", server.url())));
    assert_eq!(query.get("state").map(String::as_str), Some("myapp_42"));
    assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
    assert_eq!(
        query.get("client_id").map(String::as_str),
        Some("stride-test-client")
    );
    assert!(query.get("vtr").unwrap().contains("P9.Cp.Cd"));
    assert!(query.get("claims").unwrap().contains("given_name"));
    assert!(!query.get("nonce").unwrap().is_empty());

    // Each authorize URL gets its own nonce
    let second = h.orchestrator.login_url("myapp", "42").unwrap();
    let second_query: HashMap<_, _> = second.query_pairs().into_owned().collect();
    assert_ne!(query.get("nonce"), second_query.get("nonce"));
}

#[tokio::test]
async fn test_callback_success_upserts_user_and_mints_token() {
    let server = NhsMockServer::start().await;
    server.with_identity_flow().await;
    server.with_pds_flow().await;
    let h = harness(&server).await;

    let outcome = h
        .orchestrator
        .process_callback(callback(Some("123"), Some("myapp_42"), None))
        .await
        .unwrap();

    let LoginOutcome::Success { redirect_url } = outcome else {
        panic!("expected Success, got {outcome:?}");
    };
    assert!(redirect_url.starts_with("active10dev://nhs_user_logged_in?token="));

    // The minted token embeds the internal user id, not the federated sub
    let token = token_from_redirect(&redirect_url);
    let claims = h.signer.decode(&token).unwrap();
    let user = h.users.find_by_sub(TEST_SUB).await.unwrap().unwrap();
    assert_eq!(claims.user_id().unwrap(), user.user_id());
    assert_ne!(claims.user_id, TEST_SUB);

    // Profile merged from userinfo + demographics
    assert_eq!(user.nhs_number, TEST_NHS_NUMBER);
    assert_eq!(user.first_name, "Jane");
    assert_eq!(user.email.as_deref(), Some("jane.doe@example.com"));
    assert_eq!(user.gender, "female");
    assert_eq!(user.postcode, "BB2"); // latest address start date wins
    assert_eq!(user.identity_level, "P9");
    assert_eq!(user.status, "Login");

    // The token row matches the minted token byte for byte
    let stored = h.tokens.find_by_user_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.token, token);
}

#[tokio::test]
async fn test_second_login_rotates_token_and_evicts_cache() {
    let server = NhsMockServer::start().await;
    server.with_identity_flow().await;
    server.with_pds_flow().await;
    let h = harness(&server).await;

    let gateway = AuthGateway::new(
        h.signer.clone(),
        Arc::clone(&h.users),
        Arc::clone(&h.tokens),
        Arc::clone(&h.cache),
    );

    let first = h
        .orchestrator
        .process_callback(callback(Some("123"), Some("myapp_42"), None))
        .await
        .unwrap();
    let old_token = token_from_redirect(first.redirect_url());

    // Warm the cache with the first token
    gateway.authenticate(&old_token).await.unwrap();
    assert!(h.cache.get_auth(&hash_token(&old_token)).await.is_some());

    // A later login replaces the token (sleep so the new expiry differs)
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let second = h
        .orchestrator
        .process_callback(callback(Some("456"), Some("myapp_42"), None))
        .await
        .unwrap();
    let new_token = token_from_redirect(second.redirect_url());
    assert_ne!(old_token, new_token);

    // The old cache entry was evicted before the new row landed
    assert!(h.cache.get_auth(&hash_token(&old_token)).await.is_none());

    // The old token no longer authenticates; the new one does
    let result = gateway.authenticate(&old_token).await;
    assert!(matches!(result, Err(AuthError::TokenInvalid)));
    gateway.authenticate(&new_token).await.unwrap();

    // Still a single user row for the subject
    assert_eq!(
        h.users.find_by_sub(TEST_SUB).await.unwrap().unwrap().id,
        h.tokens
            .find_by_user_id(h.users.find_by_sub(TEST_SUB).await.unwrap().unwrap().id)
            .await
            .unwrap()
            .unwrap()
            .user_id
    );
}

#[tokio::test]
async fn test_access_denied_returns_no_consent_deep_link() {
    let server = NhsMockServer::start().await;
    let h = harness(&server).await;

    let outcome = h
        .orchestrator
        .process_callback(callback(None, None, Some("access_denied")))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        LoginOutcome::NoConsent {
            redirect_url: "active10dev://nhs_noconsent".to_string()
        }
    );

    // No user state committed
    assert!(h.users.find_by_sub(TEST_SUB).await.unwrap().is_none());
}

#[tokio::test]
async fn test_callback_missing_parameters() {
    let server = NhsMockServer::start().await;
    let h = harness(&server).await;

    let result = h
        .orchestrator
        .process_callback(callback(None, Some("myapp_42"), None))
        .await;
    assert!(matches!(result, Err(LoginError::MissingCode)));

    let result = h
        .orchestrator
        .process_callback(callback(Some("123"), None, None))
        .await;
    assert!(matches!(result, Err(LoginError::MissingState)));

    let result = h.orchestrator.process_callback(callback(None, None, None)).await;
    assert!(matches!(result, Err(LoginError::MissingCodeAndState)));
}

#[tokio::test]
async fn test_token_endpoint_failure_is_upstream_error() {
    let server = NhsMockServer::start().await;
    server.with_token_endpoint_error(500).await;
    let h = harness(&server).await;

    let result = h
        .orchestrator
        .process_callback(callback(Some("123"), Some("myapp_42"), None))
        .await;

    assert!(matches!(result, Err(LoginError::Upstream(_))));
    // No partial user state committed
    assert!(h.users.find_by_sub(TEST_SUB).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unreadable_patient_record_degrades_to_empty_demographics() {
    let server = NhsMockServer::start().await;
    server.with_identity_flow().await;

    // PDS token exchange succeeds, the patient lookup does not
    server.with_pds_token_exchange().await;
    server.with_patient_endpoint_error(404).await;
    let h = harness(&server).await;

    let outcome = h
        .orchestrator
        .process_callback(callback(Some("123"), Some("myapp_42"), None))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Success { .. }));

    let user = h.users.find_by_sub(TEST_SUB).await.unwrap().unwrap();
    assert_eq!(user.gender, "");
    assert_eq!(user.postcode, "");
    // Identity fields still populated
    assert_eq!(user.first_name, "Jane");
}
