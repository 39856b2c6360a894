use crate::cache::fallback;
use crate::degrade::degrading_fetch;
use crate::error::RepoPulseError;
use crate::metrics::record_degraded_tier;
use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use sdk::{Auth, RepoSummary, SearchResults};
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Since {
	Daily,
	Weekly,
	Monthly,
}

impl Since {
	fn parse(raw: Option<&str>) -> Result<Self, RepoPulseError> {
		match raw {
			None | Some("daily") => Ok(Self::Daily),
			Some("weekly") => Ok(Self::Weekly),
			Some("monthly") => Ok(Self::Monthly),
			Some(other) => Err(RepoPulseError::Validation(format!(
				"Invalid since value: {other} (expected daily, weekly or monthly)"
			))),
		}
	}

	const fn days(self) -> i64 {
		match self {
			Self::Daily => 1,
			Self::Weekly => 7,
			Self::Monthly => 30,
		}
	}

	const fn as_str(self) -> &'static str {
		match self {
			Self::Daily => "daily",
			Self::Weekly => "weekly",
			Self::Monthly => "monthly",
		}
	}
}

/// GitHub has no trending endpoint; recently-created repositories sorted by
/// stars is the usual stand-in.
fn trending_query(since: Since, language: Option<&str>) -> String {
	let floor = (Utc::now() - Duration::days(since.days())).format("%Y-%m-%d");

	language.map_or_else(|| format!("created:>{floor}"), |language| format!("created:>{floor} language:{language}"))
}

fn sample_results() -> SearchResults {
	let items = fallback::sample_repositories();

	SearchResults {
		total_count: items.len() as u64,
		items,
	}
}

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
	pub since: Option<String>,
	pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
	pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExploreResponse {
	pub success: bool,
	pub repos: Vec<RepoSummary>,
	pub total_count: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub since: Option<&'static str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub language: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub note: Option<&'static str>,
}

#[axum::debug_handler]
#[instrument(name = "get_trending", skip(state, params))]
pub async fn get_trending(State(state): State<AppState>, Query(params): Query<TrendingParams>) -> Result<Json<ExploreResponse>, RepoPulseError> {
	// Input validation happens before any tier is attempted.
	let since = Since::parse(params.since.as_deref())?;
	let language = params.language.filter(|l| !l.trim().is_empty());
	let query = trending_query(since, language.as_deref());

	let client = &state.external.github_client;
	let degraded = degrading_fetch(
		client.search_repositories(&query, Some("stars"), Auth::Token),
		client.search_repositories(&query, Some("stars"), Auth::Anonymous),
		sample_results,
		fallback::SAMPLE_NOTE,
	)
	.await;

	record_degraded_tier("get_trending", degraded.tier);

	Ok(Json(ExploreResponse {
		success: true,
		repos: degraded.data.items,
		total_count: degraded.data.total_count,
		since: Some(since.as_str()),
		language,
		note: degraded.note,
	}))
}

#[axum::debug_handler]
#[instrument(name = "search_repos", skip(state, params))]
pub async fn search_repos(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<ExploreResponse>, RepoPulseError> {
	let query = params
		.q
		.as_deref()
		.map(str::trim)
		.filter(|q| !q.is_empty())
		.ok_or_else(|| RepoPulseError::Validation("Missing required query parameter: q".to_string()))?
		.to_string();

	let client = &state.external.github_client;
	let degraded = degrading_fetch(
		client.search_repositories(&query, None, Auth::Token),
		client.search_repositories(&query, None, Auth::Anonymous),
		sample_results,
		fallback::SAMPLE_NOTE,
	)
	.await;

	record_degraded_tier("search_repos", degraded.tier);

	Ok(Json(ExploreResponse {
		success: true,
		repos: degraded.data.items,
		total_count: degraded.data.total_count,
		since: None,
		language: None,
		note: degraded.note,
	}))
}
