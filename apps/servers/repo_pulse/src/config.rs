use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser, Clone, Debug, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
pub struct Config {
	/// Use JSON formatting for tracing
	#[arg(long, env = "LOG_JSON", default_value = "false")]
	pub log_json: bool,

	/// Log level
	#[arg(long, env = "RUST_LOG")]
	pub rust_log: Option<String>,

	/// Server host
	#[arg(long, env = "HOST", default_value = "0.0.0.0")]
	pub host: String,

	/// Server port
	#[arg(long, env = "PORT", default_value = "3000")]
	pub port: u16,

	/// GitHub API token; optional, unauthenticated calls run at reduced rate limits
	#[arg(long, env = "GITHUB_TOKEN")]
	pub github_token: Option<String>,

	/// GitHub API base url
	#[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
	pub github_api_url: String,

	/// Redis connection url for the cache store
	#[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
	pub redis_url: String,

	/// Physical retention of cached documents in seconds; distinct from the
	/// freshness window, which is fixed and owned by the read-through layer
	#[arg(long, env = "CACHE_RETENTION_SECS", default_value = "86400")]
	pub cache_retention_secs: u64,

	/// Maximum request body size in MB
	#[arg(long, env = "MAX_REQUEST_SIZE", default_value = "2")]
	pub max_request_size: usize,

	/// Maximum concurrent in-flight requests
	#[arg(long, env = "MAX_CONCURRENT_REQ", default_value = "256")]
	pub max_concurrent_req: usize,

	/// Whole-request timeout in milliseconds
	#[arg(long, env = "TASK_TIMEOUT_MS", default_value = "30000")]
	pub task_timeout_ms: u64,

	/// Run a health check against a running instance and exit
	#[arg(long, default_value = "false")]
	pub health_check: bool,
}
