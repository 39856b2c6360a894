use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use sdk::GitHubError;

#[derive(thiserror::Error, Debug)]
pub enum RepoPulseError {
	#[error("{0}")]
	Validation(String),

	#[error(transparent)]
	Aggregate(#[from] crate::cache::AggregateError),

	#[error("Cache store error: {0}")]
	CacheStore(#[from] crate::cache::CacheError),

	#[error("Provided data is not serializable to JSON: {0}")]
	NonSerializableData(#[from] serde_json::Error),

	#[error("an internal server error occurred")]
	Anyhow(#[from] anyhow::Error),

	#[error("Request timeout")]
	RequestTimeout,

	#[error("Service temporarily overloaded")]
	ServiceOverloaded,

	#[error("Unexpected Tower Service error: {0}")]
	TowerError(#[from] tower::BoxError),
}

/// Status for a failed upstream exchange. Primary-resource failures surface
/// with these; secondary failures never reach this mapping because they are
/// absorbed into fallbacks before an error can escape.
const fn upstream_status(err: &GitHubError) -> StatusCode {
	match err {
		GitHubError::NotFound => StatusCode::NOT_FOUND,
		GitHubError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
		GitHubError::Unreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
		GitHubError::Timeout => StatusCode::GATEWAY_TIMEOUT,
		GitHubError::ClientError(_) | GitHubError::UpstreamServerError(_) | GitHubError::Parse(_) => StatusCode::BAD_GATEWAY,
	}
}

impl RepoPulseError {
	const fn status_code(&self) -> StatusCode {
		match self {
			Self::Validation(_) => StatusCode::BAD_REQUEST,
			Self::Aggregate(crate::cache::AggregateError::Upstream(err)) => upstream_status(err),
			Self::Aggregate(crate::cache::AggregateError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::CacheStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::NonSerializableData(_) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
			Self::ServiceOverloaded => StatusCode::SERVICE_UNAVAILABLE,
			Self::TowerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for RepoPulseError {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::Anyhow(ref e) => {
				tracing::error!("Generic error: {:?}", e);
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					Json(serde_json::json!({ "success": false, "error": "Internal Server Error" })),
				)
					.into_response()
			}
			_ => {
				let status = self.status_code();
				(status, Json(serde_json::json!({ "success": false, "error": self.to_string() }))).into_response()
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cache::AggregateError;

	#[test]
	fn upstream_taxonomy_maps_to_status() {
		assert_eq!(upstream_status(&GitHubError::NotFound), StatusCode::NOT_FOUND);
		assert_eq!(upstream_status(&GitHubError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
		assert_eq!(upstream_status(&GitHubError::Timeout), StatusCode::GATEWAY_TIMEOUT);
		assert_eq!(upstream_status(&GitHubError::Unreachable(String::new())), StatusCode::SERVICE_UNAVAILABLE);
		assert_eq!(upstream_status(&GitHubError::UpstreamServerError(500)), StatusCode::BAD_GATEWAY);
	}

	#[test]
	fn primary_not_found_surfaces_as_404() {
		let err = RepoPulseError::Aggregate(AggregateError::Upstream(GitHubError::NotFound));
		assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
	}

	#[test]
	fn validation_is_bad_request() {
		let err = RepoPulseError::Validation("Missing required query parameter: q".to_string());
		assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
	}
}
