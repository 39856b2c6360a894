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

/// Enriched repository card used when the frontend pins a saved repository:
/// the repository document itself plus its language breakdown. Unlike the
/// analytics aggregate, the primary lookup's value is part of the payload.
#[axum::debug_handler]
#[instrument(name = "get_repo_overview", skip(state, params), fields(owner = %owner, repo = %repo, refresh = params.refresh))]
pub async fn get_repo_overview(
	State(state): State<AppState>,
	Path((owner, repo)): Path<(String, String)>,
	Query(params): Query<RefreshParams>,
) -> Result<Json<AggregateEnvelope>, RepoPulseError> {
	let key = format!("{owner}/{repo}");
	let client = state.external.github_client.clone();

	let primary: PrimaryFetch<'_> = {
		let client = client.clone();
		let (owner, repo) = (owner.clone(), repo.clone());
		Box::pin(async move {
			let repository = client.get_repository(&owner, &repo, Auth::Token).await?;
			Ok(Some(("repo", json!(repository))))
		})
	};

	let subs = vec![SubResource {
		name: "languages",
		label: "languages",
		fetch: {
			let client = client.clone();
			let (owner, repo) = (owner.clone(), repo.clone());
			Box::pin(async move { client.get_languages(&owner, &repo, Auth::Token).await.map(|v| json!(v)) })
		},
		fallback: Box::new(|| json!(fallback::languages())),
	}];

	let aggregate = state.cache.overview.fetch_aggregate(&key, params.refresh, primary, subs).await?;

	record_cache_source("get_repo_overview", aggregate.source);

	Ok(Json(aggregate.into()))
}
