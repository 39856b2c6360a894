use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use urlencoding::encode;

/// Per-call deadline for a single upstream exchange. reqwest aborts the
/// in-flight request when this elapses, releasing the connection.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Whether a call should attach the configured bearer token. Anonymous calls
/// are served by GitHub at a reduced rate limit, which is still useful as a
/// degradation tier when the token itself is throttled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
	Token,
	Anonymous,
}

/// Outcome classification for a single upstream call.
#[derive(Debug, Error)]
pub enum GitHubError {
	#[error("resource not found upstream")]
	NotFound,

	#[error("rate limited by upstream api")]
	RateLimited,

	#[error("upstream client error: http {0}")]
	ClientError(u16),

	#[error("upstream server error: http {0}")]
	UpstreamServerError(u16),

	#[error("upstream unreachable: {0}")]
	Unreachable(String),

	#[error("upstream request timed out")]
	Timeout,

	#[error("failed to decode upstream response: {0}")]
	Parse(String),
}

impl GitHubError {
	/// Transient failures are the ones a degradation tier may still recover
	/// from by retrying through another path; `NotFound` is not one of them.
	#[must_use]
	pub const fn is_transient(&self) -> bool {
		!matches!(self, Self::NotFound)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSummary {
	pub id: u64,
	pub full_name: String,
	pub name: String,
	pub owner: String,
	pub description: Option<String>,
	pub stars: u64,
	pub forks: u64,
	pub language: Option<String>,
	pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorStat {
	pub author: String,
	pub commits: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitWeek {
	pub week: i64,
	pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeFrequencyWeek {
	pub timestamp: i64,
	pub additions: i64,
	pub deletions: i64,
}

#[derive(Debug, Clone)]
pub struct SearchResults {
	pub total_count: u64,
	pub items: Vec<RepoSummary>,
}

// GitHub API response types
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubRepository {
	pub id: u64,
	pub full_name: String,
	pub name: String,
	pub owner: GitHubOwner,
	pub description: Option<String>,
	pub stargazers_count: u64,
	pub forks_count: u64,
	pub language: Option<String>,
	pub html_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubOwner {
	pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubContributor {
	pub login: String,
	pub contributions: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubCommitActivityWeek {
	pub week: i64,
	pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubSearchResponse {
	pub total_count: u64,
	pub items: Vec<GitHubRepository>,
}

impl From<GitHubRepository> for RepoSummary {
	fn from(repo: GitHubRepository) -> Self {
		Self {
			id: repo.id,
			full_name: repo.full_name,
			name: repo.name,
			owner: repo.owner.login,
			description: repo.description,
			stars: repo.stargazers_count,
			forks: repo.forks_count,
			language: repo.language,
			url: repo.html_url,
		}
	}
}

impl From<GitHubCommitActivityWeek> for CommitWeek {
	fn from(week: GitHubCommitActivityWeek) -> Self {
		Self {
			week: week.week,
			total: week.total,
		}
	}
}

/// The code frequency endpoint answers bare integer triples, one per week:
/// `[[week_unix_ts, additions, deletions]]` with deletions already negative.
fn decode_code_frequency(raw: Vec<(i64, i64, i64)>) -> Vec<CodeFrequencyWeek> {
	raw
		.into_iter()
		.map(|(timestamp, additions, deletions)| CodeFrequencyWeek { timestamp, additions, deletions })
		.collect()
}

fn classify_transport(err: &reqwest::Error) -> GitHubError {
	if err.is_timeout() {
		GitHubError::Timeout
	} else {
		GitHubError::Unreachable(err.to_string())
	}
}

/// Map a non-2xx status to the error taxonomy. GitHub signals rate limiting
/// as 403 with `x-ratelimit-remaining: 0` (and sometimes plain 429), so the
/// 403 case needs the header and body to disambiguate from real forbiddens.
fn classify_status(status: u16, ratelimit_remaining: Option<&str>, body: &str) -> GitHubError {
	match status {
		404 => GitHubError::NotFound,
		429 => GitHubError::RateLimited,
		403 if ratelimit_remaining == Some("0") || body.contains("rate limit") => GitHubError::RateLimited,
		400..=499 => GitHubError::ClientError(status),
		500..=599 => GitHubError::UpstreamServerError(status),
		_ => GitHubError::ClientError(status),
	}
}

fn search_path(query: &str, sort: Option<&str>) -> String {
	let mut path = format!("/search/repositories?q={}&per_page=25", encode(query));
	if let Some(sort) = sort {
		path.push_str(&format!("&sort={sort}&order=desc"));
	}
	path
}

pub struct GitHubClient {
	client: Client,
	base_url: String,
	token: Option<String>,
}

impl GitHubClient {
	pub fn new(base_url: String, token: Option<String>) -> Result<Self, reqwest::Error> {
		let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
		let base_url = base_url.trim_end_matches('/').to_string();

		Ok(Self { client, base_url, token })
	}

	// Helper to make GitHub API requests with outcome classification
	async fn request<T>(&self, path: &str, auth: Auth) -> Result<T, GitHubError>
	where
		T: DeserializeOwned,
	{
		let url = format!("{}{}", self.base_url, path);

		let mut request = self
			.client
			.get(&url)
			.header(USER_AGENT, "repo-pulse")
			.header(ACCEPT, "application/vnd.github+json");

		if auth == Auth::Token {
			if let Some(token) = &self.token {
				request = request.header(AUTHORIZATION, format!("Bearer {token}"));
			}
		}

		let response = request.send().await.map_err(|e| classify_transport(&e))?;
		let status = response.status();

		if status.is_success() {
			// 202 means GitHub is still computing stats and ships an empty
			// body, which fails decoding and lands here as Parse.
			if status == StatusCode::ACCEPTED {
				tracing::debug!(path, "upstream stats not ready yet (202)");
			}
			return response.json::<T>().await.map_err(|e| GitHubError::Parse(e.to_string()));
		}

		let remaining = response
			.headers()
			.get("x-ratelimit-remaining")
			.and_then(|v| v.to_str().ok())
			.map(str::to_owned);
		let body = response.text().await.unwrap_or_default();

		Err(classify_status(status.as_u16(), remaining.as_deref(), &body))
	}

	pub async fn get_repository(&self, owner: &str, repo: &str, auth: Auth) -> Result<RepoSummary, GitHubError> {
		let path = format!("/repos/{}/{}", encode(owner), encode(repo));
		let repository: GitHubRepository = self.request(&path, auth).await?;

		Ok(repository.into())
	}

	pub async fn get_contributors(&self, owner: &str, repo: &str, auth: Auth) -> Result<Vec<ContributorStat>, GitHubError> {
		let path = format!("/repos/{}/{}/contributors?per_page=30", encode(owner), encode(repo));
		let contributors: Vec<GitHubContributor> = self.request(&path, auth).await?;

		Ok(
			contributors
				.into_iter()
				.map(|c| ContributorStat {
					author: c.login,
					commits: c.contributions,
				})
				.collect(),
		)
	}

	pub async fn get_commit_activity(&self, owner: &str, repo: &str, auth: Auth) -> Result<Vec<CommitWeek>, GitHubError> {
		let path = format!("/repos/{}/{}/stats/commit_activity", encode(owner), encode(repo));
		let weeks: Vec<GitHubCommitActivityWeek> = self.request(&path, auth).await?;

		Ok(weeks.into_iter().map(CommitWeek::from).collect())
	}

	pub async fn get_code_frequency(&self, owner: &str, repo: &str, auth: Auth) -> Result<Vec<CodeFrequencyWeek>, GitHubError> {
		let path = format!("/repos/{}/{}/stats/code_frequency", encode(owner), encode(repo));
		let raw: Vec<(i64, i64, i64)> = self.request(&path, auth).await?;

		Ok(decode_code_frequency(raw))
	}

	pub async fn get_languages(&self, owner: &str, repo: &str, auth: Auth) -> Result<HashMap<String, u64>, GitHubError> {
		let path = format!("/repos/{}/{}/languages", encode(owner), encode(repo));
		self.request(&path, auth).await
	}

	pub async fn search_repositories(&self, query: &str, sort: Option<&str>, auth: Auth) -> Result<SearchResults, GitHubError> {
		let response: GitHubSearchResponse = self.request(&search_path(query, sort), auth).await?;

		Ok(SearchResults {
			total_count: response.total_count,
			items: response.items.into_iter().map(RepoSummary::from).collect(),
		})
	}
}
