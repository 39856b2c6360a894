//! Substitutes produced here match the shape of the real upstream values
//! exactly (field names, types, cardinality), so merge and consumer code
//! never special-cases missing data. The only degradation signal is the
//! warning the read-through layer emits alongside; nothing in the values
//! themselves marks them as synthetic.

use chrono::Utc;
use rand::Rng;
use sdk::{CodeFrequencyWeek, CommitWeek, ContributorStat, RepoSummary};
use std::collections::HashMap;

/// Note attached when the sample tier serves an explore request.
pub const SAMPLE_NOTE: &str = "Live repository data is unavailable; showing a sample set.";

const WEEKS: usize = 52;
const SECONDS_PER_WEEK: i64 = 604_800;

#[must_use]
pub fn contributors() -> Vec<ContributorStat> {
	let mut rng = rand::rng();

	(1..=3_u64)
		.map(|i| ContributorStat {
			author: format!("contributor-{i}"),
			commits: rng.random_range(10..500) / i,
		})
		.collect()
}

/// 52 weekly buckets ending at the current week, like the upstream series.
#[must_use]
pub fn commit_activity() -> Vec<CommitWeek> {
	let mut rng = rand::rng();
	let current_week = Utc::now().timestamp() / SECONDS_PER_WEEK * SECONDS_PER_WEEK;

	(0..WEEKS)
		.map(|i| CommitWeek {
			week: current_week - (WEEKS as i64 - 1 - i as i64) * SECONDS_PER_WEEK,
			total: rng.random_range(0..25),
		})
		.collect()
}

/// 52 weekly buckets; deletions are non-positive, as on the wire.
#[must_use]
pub fn code_frequency() -> Vec<CodeFrequencyWeek> {
	let mut rng = rand::rng();
	let current_week = Utc::now().timestamp() / SECONDS_PER_WEEK * SECONDS_PER_WEEK;

	(0..WEEKS)
		.map(|i| CodeFrequencyWeek {
			timestamp: current_week - (WEEKS as i64 - 1 - i as i64) * SECONDS_PER_WEEK,
			additions: rng.random_range(50..2000),
			deletions: -rng.random_range(30..1500),
		})
		.collect()
}

#[must_use]
pub fn languages() -> HashMap<String, u64> {
	let mut rng = rand::rng();
	let mut languages = HashMap::new();
	languages.insert("Unknown".to_string(), rng.random_range(1024..65_536));

	languages
}

/// Fixed representative records for the explore endpoints' last tier.
#[must_use]
pub fn sample_repositories() -> Vec<RepoSummary> {
	let records = [
		(1_u64, "rust-lang/rust", "rust-lang", "Empowering everyone to build reliable and efficient software.", 97_000_u64, 12_600_u64, Some("Rust")),
		(2, "facebook/react", "facebook", "The library for web and native user interfaces.", 228_000, 46_700, Some("JavaScript")),
		(3, "torvalds/linux", "torvalds", "Linux kernel source tree", 180_000, 54_000, Some("C")),
		(4, "microsoft/vscode", "microsoft", "Visual Studio Code", 163_000, 28_900, Some("TypeScript")),
		(5, "golang/go", "golang", "The Go programming language", 123_000, 17_600, Some("Go")),
		(6, "tensorflow/tensorflow", "tensorflow", "An Open Source Machine Learning Framework for Everyone", 186_000, 74_200, Some("C++")),
	];

	records
		.into_iter()
		.map(|(id, full_name, owner, description, stars, forks, language)| RepoSummary {
			id,
			full_name: full_name.to_string(),
			name: full_name.split('/').next_back().unwrap_or(full_name).to_string(),
			owner: owner.to_string(),
			description: Some(description.to_string()),
			stars,
			forks,
			language: language.map(str::to_string),
			url: format!("https://github.com/{full_name}"),
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn contributors_placeholder_has_three_entries() {
		let list = contributors();

		assert_eq!(list.len(), 3);
		assert!(list.iter().all(|c| !c.author.is_empty()));
	}

	#[test]
	fn commit_activity_spans_a_year_of_weeks() {
		let series = commit_activity();

		assert_eq!(series.len(), 52);
		for pair in series.windows(2) {
			assert_eq!(pair[1].week - pair[0].week, SECONDS_PER_WEEK);
		}
	}

	#[test]
	fn code_frequency_deletions_are_non_positive() {
		let series = code_frequency();

		assert_eq!(series.len(), 52);
		assert!(series.iter().all(|w| w.deletions <= 0));
		assert!(series.iter().all(|w| w.additions >= 0));
	}

	#[test]
	fn sample_repositories_are_shaped_like_live_results() {
		let repos = sample_repositories();

		assert!(!repos.is_empty());
		for repo in &repos {
			assert!(repo.full_name.contains('/'));
			assert_eq!(repo.full_name.split('/').next().unwrap(), repo.owner);
			assert!(repo.url.starts_with("https://github.com/"));
		}
	}
}
