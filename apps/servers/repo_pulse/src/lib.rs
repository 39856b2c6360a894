use axum::extract::FromRef;
use sdk::GitHubClient;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod cache;
pub mod config;
pub mod degrade;
pub mod error;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod routes;

pub use cache::{CacheBackend, CacheConfig, CacheStore, ReadThroughCache};
pub use config::*;
pub use error::RepoPulseError;
pub use health::perform_health_check;

/// Core: defines the universe - stable, global, rarely changes
#[derive(Clone)]
pub struct CoreContext {
	pub config: Arc<Config>,
	pub cancel_token: CancellationToken,
}

/// External APIs: third-party integrations with independent lifecycles
#[derive(Clone)]
pub struct ExternalApis {
	pub github_client: Arc<GitHubClient>,
}

/// Caching subsystem: the shared store plus one read-through orchestrator
/// per aggregate family
#[derive(Clone)]
pub struct CacheContext {
	pub store: Arc<CacheStore>,
	pub analytics: Arc<ReadThroughCache>,
	pub overview: Arc<ReadThroughCache>,
}

#[derive(Clone)]
pub struct AppState {
	pub core: CoreContext,
	pub external: ExternalApis,
	pub cache: CacheContext,
}

impl AppState {
	/// Build the entire universe in one explicit place
	pub fn build(config: Arc<Config>, cancel_token: CancellationToken) -> anyhow::Result<Self> {
		let core = CoreContext {
			config: config.clone(),
			cancel_token,
		};

		let external = ExternalApis {
			github_client: Arc::new(GitHubClient::new(config.github_api_url.clone(), config.github_token.clone())?),
		};

		let store = Arc::new(CacheStore::new(CacheConfig::from(config))?);
		let backend: Arc<dyn CacheBackend> = store.clone();
		let cache = CacheContext {
			analytics: Arc::new(ReadThroughCache::new(backend.clone(), "analytics")),
			overview: Arc::new(ReadThroughCache::new(backend, "overview")),
			store,
		};

		Ok(Self { core, external, cache })
	}
}

impl FromRef<AppState> for Arc<Config> {
	fn from_ref(state: &AppState) -> Self {
		state.core.config.clone()
	}
}

impl FromRef<AppState> for Arc<GitHubClient> {
	fn from_ref(state: &AppState) -> Self {
		state.external.github_client.clone()
	}
}

impl FromRef<AppState> for Arc<CacheStore> {
	fn from_ref(state: &AppState) -> Self {
		state.cache.store.clone()
	}
}

impl FromRef<AppState> for CancellationToken {
	fn from_ref(state: &AppState) -> Self {
		state.core.cancel_token.clone()
	}
}
