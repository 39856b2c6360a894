use sdk::GitHubError;
use std::future::Future;
use tracing::warn;

/// Which tier ended up serving a degrading fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
	Authenticated,
	Anonymous,
	Sample,
}

impl Tier {
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Authenticated => "authenticated",
			Self::Anonymous => "anonymous",
			Self::Sample => "sample",
		}
	}
}

pub struct Degraded<T> {
	pub data: T,
	pub tier: Tier,
	pub note: Option<&'static str>,
}

/// Best-effort retrieval for uncached endpoints: authenticated call, then
/// the same call unauthenticated (separate, lower rate limit), then a fixed
/// sample. Each tier runs at most once and an upstream failure never escapes
/// this function; callers validate their input before entering tier 1.
///
/// Only the sample tier carries `note`, so the response shape is identical
/// across the live tiers.
pub async fn degrading_fetch<T, FutA, FutB>(authed: FutA, anonymous: FutB, sample: impl FnOnce() -> T, note: &'static str) -> Degraded<T>
where
	FutA: Future<Output = Result<T, GitHubError>>,
	FutB: Future<Output = Result<T, GitHubError>>,
{
	match authed.await {
		Ok(data) => {
			return Degraded {
				data,
				tier: Tier::Authenticated,
				note: None,
			}
		}
		Err(err) => warn!(error = %err, "authenticated tier failed, retrying anonymously"),
	}

	match anonymous.await {
		Ok(data) => Degraded {
			data,
			tier: Tier::Anonymous,
			note: None,
		},
		Err(err) => {
			warn!(error = %err, "anonymous tier failed, serving sample data");
			Degraded {
				data: sample(),
				tier: Tier::Sample,
				note: Some(note),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	const NOTE: &str = "sample data";

	#[tokio::test]
	async fn authenticated_tier_short_circuits() {
		let anonymous_calls = Arc::new(AtomicUsize::new(0));
		let counter = anonymous_calls.clone();

		let result = degrading_fetch(
			async { Ok::<_, GitHubError>(vec![1, 2, 3]) },
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Ok(vec![9])
			},
			Vec::new,
			NOTE,
		)
		.await;

		assert_eq!(result.tier, Tier::Authenticated);
		assert_eq!(result.data, vec![1, 2, 3]);
		assert!(result.note.is_none());
		assert_eq!(anonymous_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn rate_limited_token_falls_through_to_anonymous() {
		let result = degrading_fetch(
			async { Err::<Vec<i32>, _>(GitHubError::RateLimited) },
			async { Ok(vec![7]) },
			Vec::new,
			NOTE,
		)
		.await;

		assert_eq!(result.tier, Tier::Anonymous);
		assert_eq!(result.data, vec![7]);
		assert!(result.note.is_none()); // live data carries no note
	}

	#[tokio::test]
	async fn all_tiers_failing_serves_the_sample_with_a_note() {
		let result = degrading_fetch(
			async { Err::<Vec<i32>, _>(GitHubError::Unreachable("dns".to_string())) },
			async { Err(GitHubError::Timeout) },
			|| vec![42],
			NOTE,
		)
		.await;

		assert_eq!(result.tier, Tier::Sample);
		assert_eq!(result.data, vec![42]);
		assert_eq!(result.note, Some(NOTE));
	}

	#[tokio::test]
	async fn sample_closure_is_not_called_on_success() {
		let sampled = Arc::new(AtomicUsize::new(0));
		let counter = sampled.clone();

		let _ = degrading_fetch(
			async { Ok::<_, GitHubError>(Vec::<i32>::new()) },
			async { Ok(Vec::new()) },
			move || {
				counter.fetch_add(1, Ordering::SeqCst);
				Vec::new()
			},
			NOTE,
		)
		.await;

		assert_eq!(sampled.load(Ordering::SeqCst), 0);
	}
}
