use super::store::{CacheBackend, CacheError};
use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture};
use sdk::GitHubError;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{instrument, warn};

/// Maximum age of a cached document still served without a refresh.
pub const FRESHNESS_WINDOW_SECS: i64 = 3600;

#[derive(Debug, Error)]
pub enum AggregateError {
	#[error(transparent)]
	Upstream(#[from] GitHubError),

	#[error("cache store error: {0}")]
	Store(#[from] CacheError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
	Cache,
	Live,
}

impl Provenance {
	/// Label used on the wire and in metrics.
	#[must_use]
	pub const fn as_api_str(self) -> &'static str {
		match self {
			Self::Cache => "cache",
			Self::Live => "github",
		}
	}
}

pub struct AggregateResponse {
	pub source: Provenance,
	pub data: Map<String, Value>,
	pub warnings: Vec<String>,
	pub last_updated: DateTime<Utc>,
}

/// The repository lookup that anchors an aggregate. Its failure is fatal for
/// the whole request; on success it may contribute a named payload entry, or
/// act as a pure existence check (`None`).
pub type PrimaryFetch<'a> = BoxFuture<'a, Result<Option<(&'static str, Value)>, GitHubError>>;

/// One independently fetched piece of an aggregate. `label` names the piece
/// in the warning emitted when `fallback` has to stand in for `fetch`.
pub struct SubResource<'a> {
	pub name: &'static str,
	pub label: &'static str,
	pub fetch: BoxFuture<'a, Result<Value, GitHubError>>,
	pub fallback: Box<dyn FnOnce() -> Value + Send + 'a>,
}

/// Cache-aside orchestrator shared by every aggregate endpoint: serve a
/// fresh stored document, otherwise refetch all pieces concurrently,
/// substitute fallbacks for failed secondary pieces, and write the merged
/// result back as one document.
///
/// Concurrent misses for the same key each fetch independently; the
/// whole-document upsert keeps that safe (last writer wins).
pub struct ReadThroughCache {
	backend: Arc<dyn CacheBackend>,
	namespace: &'static str,
}

impl ReadThroughCache {
	pub fn new(backend: Arc<dyn CacheBackend>, namespace: &'static str) -> Self {
		Self { backend, namespace }
	}

	fn storage_key(&self, key: &str) -> String {
		format!("{}:{}", self.namespace, key)
	}

	#[instrument(name = "fetch_aggregate", skip(self, primary, subs), fields(namespace = self.namespace, key = %key))]
	pub async fn fetch_aggregate<'a>(
		&self,
		key: &str,
		force_refresh: bool,
		primary: PrimaryFetch<'a>,
		subs: Vec<SubResource<'a>>,
	) -> Result<AggregateResponse, AggregateError> {
		let storage_key = self.storage_key(key);

		if !force_refresh {
			if let Some(entry) = self.backend.get(&storage_key).await? {
				if entry.is_fresh(Utc::now(), FRESHNESS_WINDOW_SECS) {
					return Ok(AggregateResponse {
						source: Provenance::Cache,
						data: entry.payload,
						warnings: entry.warnings,
						last_updated: entry.last_updated,
					});
				}
			}
		}

		// Names and fallbacks stay behind while the fetch futures run; the
		// join waits for every piece to settle, so a failed or slow piece
		// cannot short-circuit its siblings. join_all keeps declaration
		// order, which keeps the warning order deterministic.
		let mut substitutes = Vec::with_capacity(subs.len());
		let mut fetches = Vec::with_capacity(subs.len());
		for sub in subs {
			substitutes.push((sub.name, sub.label, sub.fallback));
			fetches.push(sub.fetch);
		}

		let (primary_result, sub_results) = futures::join!(primary, join_all(fetches));

		// Fatal: no fallback, no write, the error keeps its classification.
		let primary_payload = primary_result?;

		let mut payload = Map::new();
		let mut warnings = Vec::new();

		if let Some((name, value)) = primary_payload {
			payload.insert(name.to_string(), value);
		}

		for ((name, label, fallback), result) in substitutes.into_iter().zip(sub_results) {
			match result {
				Ok(value) => {
					payload.insert(name.to_string(), value);
				}
				Err(err) => {
					warn!(sub_resource = name, error = %err, "substituting fallback for failed sub-resource");
					payload.insert(name.to_string(), fallback());
					warnings.push(format!("Could not fetch {label} data"));
				}
			}
		}

		let entry = self.backend.upsert(&storage_key, key, payload, warnings).await?;

		Ok(AggregateResponse {
			source: Provenance::Live,
			data: entry.payload,
			warnings: entry.warnings,
			last_updated: entry.last_updated,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cache::store::CacheEntry;
	use async_trait::async_trait;
	use serde_json::json;
	use std::collections::HashMap;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use tokio::sync::Mutex;

	#[derive(Default)]
	struct MemoryBackend {
		entries: Mutex<HashMap<String, CacheEntry>>,
		writes: AtomicUsize,
	}

	#[async_trait]
	impl CacheBackend for MemoryBackend {
		async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
			Ok(self.entries.lock().await.get(key).cloned())
		}

		async fn upsert(&self, key: &str, fingerprint: &str, payload: Map<String, Value>, warnings: Vec<String>) -> Result<CacheEntry, CacheError> {
			self.writes.fetch_add(1, Ordering::SeqCst);

			let entry = CacheEntry {
				key: fingerprint.to_string(),
				payload,
				warnings,
				last_updated: Utc::now(),
			};
			self.entries.lock().await.insert(key.to_string(), entry.clone());

			Ok(entry)
		}
	}

	fn counted_primary(calls: Arc<AtomicUsize>) -> PrimaryFetch<'static> {
		Box::pin(async move {
			calls.fetch_add(1, Ordering::SeqCst);
			Ok(None)
		})
	}

	fn counted_sub(name: &'static str, label: &'static str, calls: Arc<AtomicUsize>, result: Result<Value, GitHubError>) -> SubResource<'static> {
		SubResource {
			name,
			label,
			fetch: Box::pin(async move {
				calls.fetch_add(1, Ordering::SeqCst);
				result
			}),
			fallback: Box::new(|| json!([{ "author": "contributor-1", "commits": 1 }, { "author": "contributor-2", "commits": 1 }, { "author": "contributor-3", "commits": 1 }])),
		}
	}

	async fn seed(backend: &MemoryBackend, storage_key: &str, age_secs: i64) {
		let mut payload = Map::new();
		payload.insert("contributors".to_string(), json!([{ "author": "octocat", "commits": 42 }]));

		let entry = CacheEntry {
			key: "octocat/Hello-World".to_string(),
			payload,
			warnings: Vec::new(),
			last_updated: Utc::now() - chrono::Duration::seconds(age_secs),
		};
		backend.entries.lock().await.insert(storage_key.to_string(), entry);
	}

	#[tokio::test]
	async fn fresh_entry_is_served_without_upstream_calls() {
		let backend = Arc::new(MemoryBackend::default());
		let cache = ReadThroughCache::new(backend.clone(), "analytics");
		seed(&backend, "analytics:octocat/Hello-World", 600).await;

		let calls = Arc::new(AtomicUsize::new(0));
		let response = cache
			.fetch_aggregate(
				"octocat/Hello-World",
				false,
				counted_primary(calls.clone()),
				vec![counted_sub("contributors", "contributors", calls.clone(), Ok(json!([])))],
			)
			.await
			.unwrap();

		assert_eq!(response.source, Provenance::Cache);
		assert_eq!(calls.load(Ordering::SeqCst), 0);
		assert_eq!(backend.writes.load(Ordering::SeqCst), 0);
		assert_eq!(response.data["contributors"][0]["author"], "octocat");
	}

	#[tokio::test]
	async fn entry_at_the_window_boundary_triggers_a_full_refresh() {
		let backend = Arc::new(MemoryBackend::default());
		let cache = ReadThroughCache::new(backend.clone(), "analytics");
		seed(&backend, "analytics:octocat/Hello-World", FRESHNESS_WINDOW_SECS).await;

		let calls = Arc::new(AtomicUsize::new(0));
		let response = cache
			.fetch_aggregate(
				"octocat/Hello-World",
				false,
				counted_primary(calls.clone()),
				vec![counted_sub("contributors", "contributors", calls.clone(), Ok(json!([{ "author": "hubot", "commits": 7 }])))],
			)
			.await
			.unwrap();

		assert_eq!(response.source, Provenance::Live);
		assert_eq!(calls.load(Ordering::SeqCst), 2); // primary + one sub
		assert_eq!(backend.writes.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn forced_refresh_bypasses_a_fresh_entry() {
		let backend = Arc::new(MemoryBackend::default());
		let cache = ReadThroughCache::new(backend.clone(), "analytics");
		seed(&backend, "analytics:octocat/Hello-World", 60).await;

		let calls = Arc::new(AtomicUsize::new(0));
		let response = cache
			.fetch_aggregate(
				"octocat/Hello-World",
				true,
				counted_primary(calls.clone()),
				vec![counted_sub("contributors", "contributors", calls.clone(), Ok(json!([])))],
			)
			.await
			.unwrap();

		assert_eq!(response.source, Provenance::Live);
		assert_eq!(calls.load(Ordering::SeqCst), 2);
		assert_eq!(backend.writes.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn cold_key_fetches_live_and_writes_once() {
		let backend = Arc::new(MemoryBackend::default());
		let cache = ReadThroughCache::new(backend.clone(), "analytics");

		let calls = Arc::new(AtomicUsize::new(0));
		let response = cache
			.fetch_aggregate(
				"octocat/Hello-World",
				false,
				counted_primary(calls.clone()),
				vec![
					counted_sub("contributors", "contributors", calls.clone(), Ok(json!([{ "author": "octocat", "commits": 42 }]))),
					counted_sub("commitActivity", "commit activity", calls.clone(), Ok(json!([{ "week": 1_700_000_000, "total": 3 }]))),
				],
			)
			.await
			.unwrap();

		assert_eq!(response.source, Provenance::Live);
		assert!(response.warnings.is_empty());
		assert_eq!(backend.writes.load(Ordering::SeqCst), 1);

		// Second call within the window is served from the store.
		let second = cache
			.fetch_aggregate(
				"octocat/Hello-World",
				false,
				counted_primary(calls.clone()),
				vec![counted_sub("contributors", "contributors", calls.clone(), Ok(json!([])))],
			)
			.await
			.unwrap();

		assert_eq!(second.source, Provenance::Cache);
		assert_eq!(second.data["contributors"], response.data["contributors"]);
		assert_eq!(calls.load(Ordering::SeqCst), 3); // nothing new after the first round
	}

	#[tokio::test]
	async fn secondary_failure_is_absorbed_with_a_warning() {
		let backend = Arc::new(MemoryBackend::default());
		let cache = ReadThroughCache::new(backend.clone(), "analytics");

		let calls = Arc::new(AtomicUsize::new(0));
		let response = cache
			.fetch_aggregate(
				"owner/repo",
				false,
				counted_primary(calls.clone()),
				vec![
					counted_sub("contributors", "contributors", calls.clone(), Err(GitHubError::Timeout)),
					counted_sub("commitActivity", "commit activity", calls.clone(), Ok(json!([{ "week": 1_700_000_000, "total": 3 }]))),
				],
			)
			.await
			.unwrap();

		assert_eq!(response.warnings, vec!["Could not fetch contributors data".to_string()]);
		assert_eq!(response.data["contributors"].as_array().unwrap().len(), 3);
		assert_eq!(response.data["commitActivity"][0]["total"], 3);
		assert_eq!(backend.writes.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn warnings_keep_declaration_order() {
		let backend = Arc::new(MemoryBackend::default());
		let cache = ReadThroughCache::new(backend.clone(), "analytics");

		let calls = Arc::new(AtomicUsize::new(0));
		let response = cache
			.fetch_aggregate(
				"owner/repo",
				false,
				counted_primary(calls.clone()),
				vec![
					counted_sub("contributors", "contributors", calls.clone(), Err(GitHubError::Timeout)),
					counted_sub("commitActivity", "commit activity", calls.clone(), Err(GitHubError::RateLimited)),
					counted_sub("codeFrequency", "code frequency", calls.clone(), Err(GitHubError::UpstreamServerError(502))),
				],
			)
			.await
			.unwrap();

		assert_eq!(
			response.warnings,
			vec![
				"Could not fetch contributors data".to_string(),
				"Could not fetch commit activity data".to_string(),
				"Could not fetch code frequency data".to_string(),
			]
		);
	}

	#[tokio::test]
	async fn primary_not_found_is_fatal_and_writes_nothing() {
		let backend = Arc::new(MemoryBackend::default());
		let cache = ReadThroughCache::new(backend.clone(), "analytics");

		let calls = Arc::new(AtomicUsize::new(0));
		let primary: PrimaryFetch<'static> = Box::pin(async { Err(GitHubError::NotFound) });

		let result = cache
			.fetch_aggregate(
				"ghost/does-not-exist",
				false,
				primary,
				vec![counted_sub("contributors", "contributors", calls.clone(), Ok(json!([])))],
			)
			.await;

		assert!(matches!(result, Err(AggregateError::Upstream(GitHubError::NotFound))));
		assert_eq!(backend.writes.load(Ordering::SeqCst), 0);
		assert!(backend.entries.lock().await.is_empty());
	}

	#[tokio::test]
	async fn primary_can_contribute_a_payload_entry() {
		let backend = Arc::new(MemoryBackend::default());
		let cache = ReadThroughCache::new(backend.clone(), "overview");

		let primary: PrimaryFetch<'static> = Box::pin(async { Ok(Some(("repo", json!({ "full_name": "octocat/Hello-World", "stars": 80 })))) });

		let response = cache
			.fetch_aggregate("octocat/Hello-World", false, primary, Vec::new())
			.await
			.unwrap();

		assert_eq!(response.data["repo"]["stars"], 80);
	}

	#[tokio::test]
	async fn upsert_replaces_the_whole_document() {
		let backend = Arc::new(MemoryBackend::default());

		let mut first = Map::new();
		first.insert("contributors".to_string(), json!([{ "author": "octocat", "commits": 42 }]));
		first.insert("commitActivity".to_string(), json!([{ "week": 1, "total": 1 }]));
		backend.upsert("analytics:k", "k", first, vec!["stale warning".to_string()]).await.unwrap();

		let mut second = Map::new();
		second.insert("contributors".to_string(), json!([{ "author": "hubot", "commits": 7 }]));
		backend.upsert("analytics:k", "k", second, Vec::new()).await.unwrap();

		let entry = backend.get("analytics:k").await.unwrap().unwrap();
		assert_eq!(entry.payload["contributors"][0]["author"], "hubot");
		assert!(entry.payload.get("commitActivity").is_none()); // no field merging across generations
		assert!(entry.warnings.is_empty());
	}
}
