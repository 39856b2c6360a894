use crate::cache::fallback;
use crate::cache::read_through::PrimaryFetch;
use crate::cache::SubResource;
use crate::error::RepoPulseError;
use crate::handlers::{AggregateEnvelope, RefreshParams};
use crate::metrics::record_cache_source;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use sdk::Auth;
use serde_json::json;
use tracing::instrument;

/// Aggregate analytics for one repository: contributors, weekly commit
/// activity and weekly code frequency, each fetched independently so one
/// flaky stats endpoint cannot take down the rest of the response.
#[axum::debug_handler]
#[instrument(name = "get_repo_analytics", skip(state, params), fields(owner = %owner, repo = %repo, refresh = params.refresh))]
pub async fn get_repo_analytics(
	State(state): State<AppState>,
	Path((owner, repo)): Path<(String, String)>,
	Query(params): Query<RefreshParams>,
) -> Result<Json<AggregateEnvelope>, RepoPulseError> {
	let key = format!("{owner}/{repo}");
	let client = state.external.github_client.clone();

	// The repository lookup is the existence check; its result is not part
	// of the stored document.
	let primary: PrimaryFetch<'_> = {
		let client = client.clone();
		let (owner, repo) = (owner.clone(), repo.clone());
		Box::pin(async move { client.get_repository(&owner, &repo, Auth::Token).await.map(|_| None) })
	};

	let subs = vec![
		SubResource {
			name: "contributors",
			label: "contributors",
			fetch: {
				let client = client.clone();
				let (owner, repo) = (owner.clone(), repo.clone());
				Box::pin(async move { client.get_contributors(&owner, &repo, Auth::Token).await.map(|v| json!(v)) })
			},
			fallback: Box::new(|| json!(fallback::contributors())),
		},
		SubResource {
			name: "commitActivity",
			label: "commit activity",
			fetch: {
				let client = client.clone();
				let (owner, repo) = (owner.clone(), repo.clone());
				Box::pin(async move { client.get_commit_activity(&owner, &repo, Auth::Token).await.map(|v| json!(v)) })
			},
			fallback: Box::new(|| json!(fallback::commit_activity())),
		},
		SubResource {
			name: "codeFrequency",
			label: "code frequency",
			fetch: {
				let client = client.clone();
				let (owner, repo) = (owner.clone(), repo.clone());
				Box::pin(async move { client.get_code_frequency(&owner, &repo, Auth::Token).await.map(|v| json!(v)) })
			},
			fallback: Box::new(|| json!(fallback::code_frequency())),
		},
	];

	let aggregate = state.cache.analytics.fetch_aggregate(&key, params.refresh, primary, subs).await?;

	record_cache_source("get_repo_analytics", aggregate.source);

	Ok(Json(aggregate.into()))
}
