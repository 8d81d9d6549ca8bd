//! Login-callback orchestration
//!
//! Drives a single NHS login callback to its terminal state: either a
//! deep link back into the mobile app (success or no-consent) or an error.
//! Branching is explicit through [`LoginOutcome`]; provider refusal is a
//! variant, not an exception.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use url::Url;

use stride_cache::{hash_token, TokenCache};
use stride_db::{TokenRepository, UpsertUser, UserRepository};

use crate::oidc::NhsAuthenticator;
use crate::pds::PdsClient;
use crate::{LoginError, TokenSigner};

/// Opaque state carried through the provider round trip, identifying the
/// calling app. Wire format is `{app_name}_{app_internal_id}`; parsing
/// splits on the LAST underscore, so app names may contain underscores as
/// long as internal ids do not (enforced at construction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginState {
    pub app_name: String,
    pub app_internal_id: String,
}

impl LoginState {
    /// Build a state value, rejecting internal ids that would make the
    /// encoding ambiguous
    pub fn new(
        app_name: impl Into<String>,
        app_internal_id: impl Into<String>,
    ) -> Result<Self, LoginError> {
        let app_name = app_name.into();
        let app_internal_id = app_internal_id.into();

        if app_internal_id.contains('_') {
            return Err(LoginError::InvalidState(
                "app internal id must not contain '_'".to_string(),
            ));
        }

        Ok(Self {
            app_name,
            app_internal_id,
        })
    }

    /// Parse the wire format back into its components
    pub fn parse(s: &str) -> Result<Self, LoginError> {
        let (app_name, app_internal_id) = s
            .rsplit_once('_')
            .ok_or_else(|| LoginError::InvalidState(format!("unparseable state: {s}")))?;
        Self::new(app_name, app_internal_id)
    }

    /// Wire format: `{app_name}_{app_internal_id}`
    pub fn encode(&self) -> String {
        format!("{}_{}", self.app_name, self.app_internal_id)
    }
}

impl std::fmt::Display for LoginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Query parameters of a provider callback
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    /// Extract the relevant parameters from the raw callback query
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        Self {
            code: query.get("code").cloned(),
            state: query.get("state").cloned(),
            error: query.get("error").cloned(),
        }
    }

    /// Require both code and state, distinguishing what is missing to aid
    /// client debugging of deep-link construction
    pub fn required(&self) -> Result<(&str, &str), LoginError> {
        match (self.code.as_deref(), self.state.as_deref()) {
            (None, None) => Err(LoginError::MissingCodeAndState),
            (None, Some(_)) => Err(LoginError::MissingCode),
            (Some(_), None) => Err(LoginError::MissingState),
            (Some(code), Some(state)) => Ok((code, state)),
        }
    }
}

/// Terminal state of one callback invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// User declined federation; the app proceeds without an NHS identity
    NoConsent { redirect_url: String },
    /// Login completed; the deep link carries the freshly minted app token
    Success { redirect_url: String },
}

impl LoginOutcome {
    /// The deep link to redirect the caller to
    pub fn redirect_url(&self) -> &str {
        match self {
            Self::NoConsent { redirect_url } | Self::Success { redirect_url } => redirect_url,
        }
    }
}

/// Object-safe seam for the login flow, so HTTP handlers and tests can
/// substitute implementations.
#[async_trait]
pub trait LoginFlow: Send + Sync {
    /// Build the provider authorize URL for an app
    fn login_url(&self, app_name: &str, app_internal_id: &str) -> Result<Url, LoginError>;

    /// Process a provider callback to its terminal state
    async fn process_callback(&self, params: CallbackParams) -> Result<LoginOutcome, LoginError>;
}

/// Completes NHS login callbacks: identity fetch, demographics merge, user
/// upsert, token rotation, deep-link generation.
pub struct LoginOrchestrator<U, T, C>
where
    U: UserRepository + ?Sized,
    T: TokenRepository + ?Sized,
    C: TokenCache + ?Sized,
{
    oidc: NhsAuthenticator,
    pds: PdsClient,
    signer: TokenSigner,
    users: Arc<U>,
    tokens: Arc<T>,
    cache: Arc<C>,
    app_uri: String,
}

impl<U, T, C> LoginOrchestrator<U, T, C>
where
    U: UserRepository + ?Sized,
    T: TokenRepository + ?Sized,
    C: TokenCache + ?Sized,
{
    /// Create a new orchestrator
    pub fn new(
        oidc: NhsAuthenticator,
        pds: PdsClient,
        signer: TokenSigner,
        users: Arc<U>,
        tokens: Arc<T>,
        cache: Arc<C>,
        app_uri: impl Into<String>,
    ) -> Self {
        Self {
            oidc,
            pds,
            signer,
            users,
            tokens,
            cache,
            app_uri: app_uri.into(),
        }
    }

    /// Identity fetch + demographics merge into the profile projection
    async fn fetch_profile(&self, code: &str, state: &str) -> Result<UpsertUser, LoginError> {
        let tokens = self.oidc.exchange_code(code, Some(state)).await?;
        let info = self.oidc.userinfo(&tokens.access_token).await?;
        let demographics = self
            .pds
            .demographics(&tokens.id_token, &info.nhs_number)
            .await?;

        let date_of_birth = info.birthdate.as_deref().and_then(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| tracing::warn!("Unparseable birthdate from provider: {e}"))
                .ok()
        });

        Ok(UpsertUser {
            unique_id: info.sub,
            nhs_number: info.nhs_number,
            first_name: info.given_name,
            email: info.email,
            date_of_birth,
            gender: demographics.gender,
            postcode: demographics.postcode,
            identity_level: info.identity_proofing_level,
        })
    }
}

#[async_trait]
impl<U, T, C> LoginFlow for LoginOrchestrator<U, T, C>
where
    U: UserRepository + ?Sized,
    T: TokenRepository + ?Sized,
    C: TokenCache + ?Sized,
{
    fn login_url(&self, app_name: &str, app_internal_id: &str) -> Result<Url, LoginError> {
        let state = LoginState::new(app_name, app_internal_id)?;
        self.oidc.authorization_url(&state.encode())
    }

    async fn process_callback(&self, params: CallbackParams) -> Result<LoginOutcome, LoginError> {
        if params.error.as_deref() == Some("access_denied") {
            tracing::info!("User declined NHS login consent");
            return Ok(LoginOutcome::NoConsent {
                redirect_url: format!("{}nhs_noconsent", self.app_uri),
            });
        }

        let (code, state) = params.required()?;

        let profile = self.fetch_profile(code, state).await?;
        let user = self.users.upsert(profile).await?;

        // Token embeds the internal user id, not the federated subject
        let token = self.signer.sign(user.user_id())?;

        // Evict the superseded token's cache entry before the replacement
        // row lands, so it cannot keep authenticating from cache
        if let Some(old) = self.tokens.find_by_user_id(user.id).await? {
            self.cache.delete_auth(&hash_token(&old.token)).await;
        }
        self.tokens.upsert(user.id, &token).await?;

        tracing::info!(user_id = %user.id, "NHS login completed");

        Ok(LoginOutcome::Success {
            redirect_url: format!("{}nhs_user_logged_in?token={token}", self.app_uri),
        })
    }
}

impl<U, T, C> std::fmt::Debug for LoginOrchestrator<U, T, C>
where
    U: UserRepository + ?Sized,
    T: TokenRepository + ?Sized,
    C: TokenCache + ?Sized,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginOrchestrator")
            .field("app_uri", &self.app_uri)
            .finish_non_exhaustive()
    }
}
