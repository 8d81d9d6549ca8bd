//! Stride Auth API entry point

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use stride_auth_api::config::Config;
use stride_auth_api::state::AppState;
use stride_auth_core::{
    AuthGateway, LoginOrchestrator, NhsAuthenticator, PdsClient, TokenSigner,
};
use stride_cache::{RedisTokenCache, TokenCache};
use stride_db::{create_pool, Repositories, TokenRepository, UserRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Stride Auth API");

    let config = Config::from_env()?;

    // Persistence
    let pool = create_pool(&config.database_url).await?;
    let repos = Repositories::new(pool);
    let users: Arc<dyn UserRepository> = Arc::new(repos.users);
    let tokens: Arc<dyn TokenRepository> = Arc::new(repos.tokens);

    // Auth cache: degraded-but-up when Redis is absent or unreachable
    let cache: Arc<dyn TokenCache> = match &config.redis_url {
        Some(url) => Arc::new(RedisTokenCache::connect(url).await),
        None => {
            tracing::warn!("REDIS_URL not set, auth cache disabled");
            Arc::new(RedisTokenCache::disabled())
        }
    };

    // Core services
    let signer = TokenSigner::new(&config.auth);
    let gateway = AuthGateway::new(
        signer.clone(),
        Arc::clone(&users),
        Arc::clone(&tokens),
        Arc::clone(&cache),
    );

    let oidc = NhsAuthenticator::discover(config.nhs.clone()).await?;
    let pds = PdsClient::new(config.nhs.clone())?;
    let orchestrator = LoginOrchestrator::new(
        oidc,
        pds,
        signer,
        Arc::clone(&users),
        Arc::clone(&tokens),
        Arc::clone(&cache),
        config.nhs.app_uri.clone(),
    );

    let state = AppState {
        auth: Arc::new(gateway),
        login: Arc::new(orchestrator),
        users,
        tokens,
        cache,
    };

    let app = stride_auth_api::router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
