//! PDS demographics client
//!
//! Trades the NHS login `id_token` for a PDS-scoped access token (RFC 8693
//! token exchange) and fetches the patient record for the two demographic
//! attributes the profile needs: gender and current postcode.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::oidc::{http_client, read_upstream_json, CLIENT_ASSERTION_TYPE};
use crate::{LoginError, NhsConfig};

const PDS_API_PATH: &str = "personal-demographics/FHIR/R4";

/// Key id the PDS API expects in assertion headers
const ASSERTION_KID: &str = "better-health-app";

/// PDS assertions outlive the two calls of one login by a wide margin
const ASSERTION_LIFETIME_SECS: i64 = 300;

const TOKEN_EXCHANGE_GRANT: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
const ID_TOKEN_SUBJECT_TYPE: &str = "urn:ietf:params:oauth:token-type:id_token";

/// Demographic attributes merged into the user profile at login
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Demographics {
    pub gender: String,
    pub postcode: String,
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PatientResource {
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    address: Option<Vec<PatientAddress>>,
}

#[derive(Debug, Deserialize)]
struct PatientAddress {
    #[serde(default)]
    period: Option<AddressPeriod>,
    #[serde(rename = "postalCode", default)]
    postal_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddressPeriod {
    #[serde(default)]
    start: Option<String>,
}

/// PDS demographics client
#[derive(Clone)]
pub struct PdsClient {
    config: NhsConfig,
    http: reqwest::Client,
    assertion_key: EncodingKey,
}

impl PdsClient {
    /// Create a new PDS client
    pub fn new(config: NhsConfig) -> Result<Self, LoginError> {
        Self::with_client(config, http_client())
    }

    /// Create a PDS client with a caller-supplied HTTP client
    pub fn with_client(config: NhsConfig, http: reqwest::Client) -> Result<Self, LoginError> {
        let assertion_key =
            EncodingKey::from_rsa_pem(config.private_key_pem.as_bytes()).map_err(|e| {
                LoginError::Configuration(format!("invalid assertion signing key: {e}"))
            })?;

        Ok(Self {
            config,
            http,
            assertion_key,
        })
    }

    /// Fetch gender and postcode for a patient, given the identity
    /// provider's `id_token`. Token-exchange failures propagate; a missing
    /// or unreadable patient record degrades to empty fields so login
    /// still completes.
    pub async fn demographics(
        &self,
        id_token: &str,
        patient_id: &str,
    ) -> Result<Demographics, LoginError> {
        let access_token = self.token_exchange(id_token).await?;
        Ok(self.fetch_patient(&access_token, patient_id).await)
    }

    /// RFC 8693 token exchange: trade the `id_token` for a PDS-scoped
    /// access token, authenticated with a fresh signed assertion.
    pub async fn token_exchange(&self, id_token: &str) -> Result<String, LoginError> {
        let assertion = self.sign_assertion()?;

        let form = [
            ("grant_type", TOKEN_EXCHANGE_GRANT),
            ("subject_token_type", ID_TOKEN_SUBJECT_TYPE),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("subject_token", id_token),
            ("client_assertion", &assertion),
        ];

        let response = self
            .http
            .post(self.config.pds_token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("PDS token exchange request failed: {e}");
                LoginError::Upstream("PDS token endpoint unreachable".to_string())
            })?;

        let tokens: TokenExchangeResponse =
            read_upstream_json(response, "PDS token endpoint").await?;
        Ok(tokens.access_token)
    }

    /// Fetch the patient record. Errors degrade to empty-string fields
    /// (logged) rather than failing the overall login.
    pub async fn fetch_patient(&self, access_token: &str, patient_id: &str) -> Demographics {
        let url = format!(
            "{}/{PDS_API_PATH}/Patient/{patient_id}",
            self.config.api_url.trim_end_matches('/')
        );

        let response = match self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header("X-Request-ID", Uuid::new_v4().to_string())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("PDS patient request failed, demographics omitted: {e}");
                return Demographics::default();
            }
        };

        let patient: PatientResource = match read_upstream_json(response, "PDS patient endpoint")
            .await
        {
            Ok(patient) => patient,
            Err(e) => {
                tracing::warn!("PDS patient lookup failed, demographics omitted: {e}");
                return Demographics::default();
            }
        };

        Demographics {
            gender: patient.gender.unwrap_or_default(),
            postcode: latest_postcode(patient.address.unwrap_or_default()),
        }
    }

    fn sign_assertion(&self) -> Result<String, LoginError> {
        let claims = json!({
            "sub": self.config.api_key,
            "iss": self.config.api_key,
            "jti": Uuid::new_v4().to_string(),
            "aud": self.config.pds_token_url(),
            "exp": Utc::now().timestamp() + ASSERTION_LIFETIME_SECS,
        });

        let mut header = Header::new(Algorithm::RS512);
        header.kid = Some(ASSERTION_KID.to_string());

        encode(&header, &claims, &self.assertion_key)
            .map_err(|e| LoginError::Configuration(format!("failed to sign assertion: {e}")))
    }
}

/// Postal code of the most recent address: sort by period start date
/// (ISO strings order lexicographically) and take the last entry.
fn latest_postcode(mut addresses: Vec<PatientAddress>) -> String {
    if addresses.is_empty() {
        return String::new();
    }

    addresses.sort_by(|a, b| period_start(a).cmp(&period_start(b)));
    addresses
        .last()
        .and_then(|a| a.postal_code.clone())
        .unwrap_or_default()
}

fn period_start(address: &PatientAddress) -> Option<&str> {
    address.period.as_ref().and_then(|p| p.start.as_deref())
}

impl std::fmt::Debug for PdsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdsClient")
            .field("api_url", &self.config.api_url)
            .finish_non_exhaustive()
    }
}
