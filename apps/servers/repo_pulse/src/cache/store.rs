use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Read;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::Config;

#[derive(Debug, Error)]
pub enum CacheError {
	#[error("Redis error: {0}")]
	Redis(#[from] redis::RedisError),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

/// One cached aggregate document. Serialized flat, so the stored JSON reads
/// `{ repoFullName, <sub-resource fields...>, lastUpdated, warnings? }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
	#[serde(rename = "repoFullName")]
	pub key: String,

	#[serde(flatten)]
	pub payload: Map<String, Value>,

	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub warnings: Vec<String>,

	pub last_updated: DateTime<Utc>,
}

impl CacheEntry {
	/// Strict inequality: an entry aged exactly to the window is stale.
	#[must_use]
	pub fn is_fresh(&self, now: DateTime<Utc>, window_secs: i64) -> bool {
		now.signed_duration_since(self.last_updated).num_seconds() < window_secs
	}
}

/// Storage seam for the read-through layer. The production impl is redis;
/// tests substitute an in-memory map.
#[async_trait]
pub trait CacheBackend: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

	/// Whole-document replace. Two concurrent writers for the same key must
	/// not interleave fields from different generations; last writer wins.
	async fn upsert(&self, key: &str, fingerprint: &str, payload: Map<String, Value>, warnings: Vec<String>) -> Result<CacheEntry, CacheError>;
}

// Cache configuration
#[derive(Clone, Debug)]
pub struct CacheConfig {
	pub redis_url: String,
	pub retention_ttl: u64,
	pub max_retries: u32,
	pub retry_delay_ms: u64,
	pub enable_compression: bool,
	pub compression_threshold: usize, // Compress if data > this size
	pub key_prefix: String,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			redis_url: "redis://127.0.0.1:6379".to_string(),
			retention_ttl: 86_400,
			max_retries: 3,
			retry_delay_ms: 100,
			enable_compression: true,
			compression_threshold: 1024, // 1KB
			key_prefix: "repopulse:".to_string(),
		}
	}
}

impl From<Arc<Config>> for CacheConfig {
	fn from(config: Arc<Config>) -> Self {
		Self {
			redis_url: config.redis_url.clone(),
			retention_ttl: config.cache_retention_secs,
			..Self::default()
		}
	}
}

#[derive(Clone)]
pub struct CacheStore {
	redis_client: Client,
	config: CacheConfig,
}

impl CacheStore {
	pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
		let redis_client = Client::open(config.redis_url.as_str())?;
		Ok(Self { redis_client, config })
	}

	// Generate prefixed key
	fn make_key(&self, key: &str) -> String {
		format!("{}{}", self.config.key_prefix, key)
	}

	// Retry mechanism for transient redis failures
	async fn with_retry<F, T>(&self, mut operation: F) -> Result<T, CacheError>
	where
		F: FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T, CacheError>> + Send>>,
	{
		let mut last_error = None;

		for attempt in 0..=self.config.max_retries {
			match operation().await {
				Ok(result) => return Ok(result),
				Err(e) => {
					last_error = Some(e);
					if attempt < self.config.max_retries {
						warn!("Cache operation failed (attempt {}), retrying...", attempt + 1);
						sleep(Duration::from_millis(self.config.retry_delay_ms * (u64::from(attempt) + 1))).await;
					}
				}
			}
		}

		Err(last_error.expect("retry loop ran at least once"))
	}

	// Compression helpers
	fn compress_data(&self, data: &[u8]) -> Result<Vec<u8>, CacheError> {
		if !self.config.enable_compression || data.len() < self.config.compression_threshold {
			return Ok(data.to_vec());
		}

		let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
		encoder.write_all(data)?;
		Ok(encoder.finish()?)
	}

	fn decompress_data(&self, data: &[u8]) -> Result<Vec<u8>, CacheError> {
		if !self.config.enable_compression {
			return Ok(data.to_vec());
		}

		// Try to decompress, fallback to original data if it fails (wasn't compressed)
		let mut decoder = GzDecoder::new(data);
		let mut decompressed = Vec::new();
		match decoder.read_to_end(&mut decompressed) {
			Ok(_) => Ok(decompressed),
			Err(_) => Ok(data.to_vec()), // Assume it wasn't compressed
		}
	}
}

#[async_trait]
impl CacheBackend for CacheStore {
	async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
		let cache_key = self.make_key(key);

		let data: Option<Vec<u8>> = self
			.with_retry(|| {
				let redis_client = self.redis_client.clone();
				let cache_key = cache_key.clone();

				Box::pin(async move {
					let mut con = redis_client.get_multiplexed_async_connection().await?;
					let result: Option<Vec<u8>> = con.get(&cache_key).await?;
					Result::<_, CacheError>::Ok(result)
				})
			})
			.await?;

		match data {
			Some(compressed_data) => {
				let decompressed = self.decompress_data(&compressed_data)?;
				let entry: CacheEntry = serde_json::from_slice(&decompressed)?;

				info!("Cache hit: {}", key);
				Ok(Some(entry))
			}
			None => Ok(None),
		}
	}

	async fn upsert(&self, key: &str, fingerprint: &str, payload: Map<String, Value>, warnings: Vec<String>) -> Result<CacheEntry, CacheError> {
		let cache_key = self.make_key(key);
		let ttl = self.config.retention_ttl;

		let entry = CacheEntry {
			key: fingerprint.to_string(),
			payload,
			warnings,
			last_updated: Utc::now(),
		};

		let serialized = serde_json::to_vec(&entry)?;
		let compressed = self.compress_data(&serialized)?;

		self
			.with_retry(|| {
				let redis_client = self.redis_client.clone();
				let cache_key = cache_key.clone();
				let compressed = compressed.clone();

				Box::pin(async move {
					let mut con = redis_client.get_multiplexed_async_connection().await?;
					let _: () = con.set_ex(&cache_key, compressed, ttl).await?;
					Result::<_, CacheError>::Ok(())
				})
			})
			.await?;

		info!("Cached document: {} (retention: {}s)", key, ttl);
		Ok(entry)
	}
}
