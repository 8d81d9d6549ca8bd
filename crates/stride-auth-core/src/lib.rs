//! Stride Auth Core - Authentication business logic
//!
//! Core authentication functionality: app-token signing and validation,
//! the cache-fronted bearer-auth gateway, and the NHS login federation
//! flow (OIDC code exchange, PDS demographics, user upsert, token
//! rotation).

pub mod config;
pub mod error;
pub mod gateway;
pub mod login;
pub mod oidc;
pub mod pds;
pub mod token;

pub use config::{AuthConfig, NhsConfig};
pub use error::{AuthError, LoginError};
pub use gateway::{AuthGateway, BearerAuth};
pub use login::{CallbackParams, LoginFlow, LoginOrchestrator, LoginOutcome, LoginState};
pub use oidc::{NhsAuthenticator, NhsUserInfo, TokenSet};
pub use pds::{Demographics, PdsClient};
pub use token::{TokenClaims, TokenSigner};
