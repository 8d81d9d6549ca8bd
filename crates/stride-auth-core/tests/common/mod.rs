//! Shared test infrastructure

pub mod memory_cache;
pub mod mock_repos;
pub mod nhs_mock;

#[allow(unused_imports)]
pub use memory_cache::MemoryTokenCache;
#[allow(unused_imports)]
pub use mock_repos::{MockTokenRepository, MockUserRepository};
#[allow(unused_imports)]
pub use nhs_mock::{test_nhs_config, NhsMockServer, TEST_RSA_PRIVATE_KEY_PEM};
