//! Configuration types for auth services

use std::time::Duration;

/// App-token (bearer JWT) configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret, process-wide
    pub jwt_secret: String,
    /// Lifetime of issued tokens
    pub token_ttl: Duration,
}

impl AuthConfig {
    /// Default token lifetime: 30 days
    pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    /// Create a new auth config with the default token lifetime
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: Self::DEFAULT_TOKEN_TTL,
        }
    }

    /// Set the token lifetime
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }
}

/// NHS login / PDS federation configuration
#[derive(Debug, Clone)]
pub struct NhsConfig {
    /// OIDC authority base URL (discovery document lives underneath it)
    pub authority_url: String,
    /// OAuth2 client id registered with NHS login
    pub client_id: String,
    /// Space-separated scopes requested in the code flow
    pub scopes: String,
    /// Redirect URI registered for the callback
    pub redirect_uri: String,
    /// PDS API base URL
    pub api_url: String,
    /// PDS API key (subject and issuer of the PDS client assertion)
    pub api_key: String,
    /// RSA private key (PEM) signing both client assertions
    pub private_key_pem: String,
    /// Mobile-app deep-link base URI (e.g. `active10://`)
    pub app_uri: String,
}

impl NhsConfig {
    /// OIDC discovery document URL for the configured authority
    pub fn discovery_url(&self) -> String {
        format!(
            "{}/.well-known/openid-configuration",
            self.authority_url.trim_end_matches('/')
        )
    }

    /// Audience of PDS client assertions: the PDS token endpoint
    pub fn pds_token_url(&self) -> String {
        format!("{}/oauth2/token", self.api_url.trim_end_matches('/'))
    }
}
