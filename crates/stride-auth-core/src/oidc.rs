//! NHS login OIDC client
//!
//! Drives the authorization-code flow against the NHS login authority:
//! endpoint discovery, authorization-URL construction, code exchange
//! authenticated with a short-lived `private_key_jwt` assertion, and
//! userinfo retrieval.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::{LoginError, NhsConfig};

/// OAuth2 JWT-bearer client-assertion type
pub(crate) const CLIENT_ASSERTION_TYPE: &str =
    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Identity-assurance vector requested from the provider (P9: verified
/// identity)
const IDENTITY_VTR: &str = r#"["P9.Cp.Cd", "P9.Cp.Ck", "P9.Cm"]"#;

/// Client assertions authenticate a single token-endpoint call; one minute
/// is plenty
const ASSERTION_LIFETIME_SECS: i64 = 60;

/// OIDC discovery document (the subset of endpoints this flow uses)
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
}

/// Token-endpoint response for the code exchange
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub id_token: String,
}

/// Userinfo claims returned by NHS login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NhsUserInfo {
    /// Subject identifier, stable per user per client
    pub sub: String,
    pub nhs_number: String,
    pub given_name: String,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    /// ISO date string, e.g. "1990-01-31"
    #[serde(default)]
    pub birthdate: Option<String>,
    #[serde(default)]
    pub identity_proofing_level: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Outbound HTTP client tuned for the federation endpoints: bounded
/// connect/read timeouts so a degraded provider fails the request instead
/// of hanging it, pooled connections for the repeat calls of one login.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_nodelay(true)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Read a JSON body from an upstream response, logging status and body
/// server-side on failure without leaking them to the caller.
pub(crate) async fn read_upstream_json<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T, LoginError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!("{what} returned {status}: {body}");
        return Err(LoginError::Upstream(format!("{what} returned {status}")));
    }

    response.json::<T>().await.map_err(|e| {
        tracing::error!("Failed to parse {what} response: {e}");
        LoginError::Upstream(format!("unreadable {what} response"))
    })
}

/// NHS login OIDC client
#[derive(Clone)]
pub struct NhsAuthenticator {
    config: NhsConfig,
    endpoints: DiscoveryDocument,
    http: reqwest::Client,
    assertion_key: EncodingKey,
}

impl NhsAuthenticator {
    /// Resolve the authority's endpoints and build a client
    pub async fn discover(config: NhsConfig) -> Result<Self, LoginError> {
        Self::discover_with_client(config, http_client()).await
    }

    /// Resolve endpoints using a caller-supplied HTTP client (custom proxy
    /// or TLS settings, shared pools)
    pub async fn discover_with_client(
        config: NhsConfig,
        http: reqwest::Client,
    ) -> Result<Self, LoginError> {
        let url = config.discovery_url();
        tracing::debug!("Fetching OIDC discovery document from {url}");

        let response = http.get(&url).send().await.map_err(|e| {
            tracing::error!("Failed to fetch discovery document: {e}");
            LoginError::Upstream("discovery document unreachable".to_string())
        })?;
        let endpoints: DiscoveryDocument =
            read_upstream_json(response, "discovery endpoint").await?;

        let assertion_key =
            EncodingKey::from_rsa_pem(config.private_key_pem.as_bytes()).map_err(|e| {
                LoginError::Configuration(format!("invalid assertion signing key: {e}"))
            })?;

        Ok(Self {
            config,
            endpoints,
            http,
            assertion_key,
        })
    }

    /// The resolved provider endpoints
    pub fn endpoints(&self) -> &DiscoveryDocument {
        &self.endpoints
    }

    /// Build the provider authorize URL for the code flow, with a fresh
    /// nonce, the identity-assurance vector, and the claims request.
    pub fn authorization_url(&self, state: &str) -> Result<Url, LoginError> {
        let mut url = Url::parse(&self.endpoints.authorization_endpoint)
            .map_err(|e| LoginError::Configuration(format!("bad authorization endpoint: {e}")))?;

        let claims = json!({
            "id_token": {
                "email": {"essential": null},
                "phone_number": null,
            },
            "userinfo": {
                "given_name": {"essential": true},
                "family_name": {"essential": true},
                "nickname": null,
            },
        });

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes)
            .append_pair("nonce", &Uuid::new_v4().simple().to_string())
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("state", state)
            .append_pair("vtr", IDENTITY_VTR)
            .append_pair("claims", &claims.to_string());

        Ok(url)
    }

    /// Exchange an authorization code for tokens, authenticating with a
    /// fresh `private_key_jwt` assertion (one per call, never reused).
    pub async fn exchange_code(
        &self,
        code: &str,
        state: Option<&str>,
    ) -> Result<TokenSet, LoginError> {
        let assertion = self.sign_client_assertion()?;

        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("client_id", self.config.client_id.clone()),
            ("redirect_uri", self.config.redirect_uri.clone()),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE.to_string()),
            ("client_assertion", assertion),
        ];
        if let Some(state) = state {
            form.push(("state", state.to_string()));
        }

        let response = self
            .http
            .post(&self.endpoints.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Token endpoint request failed: {e}");
                LoginError::Upstream("token endpoint unreachable".to_string())
            })?;

        read_upstream_json(response, "token endpoint").await
    }

    /// Fetch the provider's userinfo claims
    pub async fn userinfo(&self, access_token: &str) -> Result<NhsUserInfo, LoginError> {
        let response = self
            .http
            .get(&self.endpoints.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Userinfo request failed: {e}");
                LoginError::Upstream("userinfo endpoint unreachable".to_string())
            })?;

        read_upstream_json(response, "userinfo endpoint").await
    }

    fn sign_client_assertion(&self) -> Result<String, LoginError> {
        let claims = json!({
            "iss": self.config.client_id,
            "sub": self.config.client_id,
            "aud": self.endpoints.token_endpoint,
            "jti": Uuid::new_v4().to_string(),
            "exp": Utc::now().timestamp() + ASSERTION_LIFETIME_SECS,
        });

        encode(&Header::new(Algorithm::RS512), &claims, &self.assertion_key)
            .map_err(|e| LoginError::Configuration(format!("failed to sign assertion: {e}")))
    }
}

impl std::fmt::Debug for NhsAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NhsAuthenticator")
            .field("issuer", &self.endpoints.issuer)
            .finish_non_exhaustive()
    }
}
