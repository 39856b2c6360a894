use crate::cache::AggregateResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod analytics;
pub mod explore;
pub mod health;
pub mod repos;

#[derive(Debug, Deserialize)]
pub struct RefreshParams {
	#[serde(default)]
	pub refresh: bool,
}

/// Response body shared by the aggregate endpoints. The payload map is
/// flattened, so sub-resource fields sit at the top level next to the
/// provenance metadata.
#[derive(Debug, Serialize)]
pub struct AggregateEnvelope {
	pub success: bool,
	pub source: &'static str,
	#[serde(flatten)]
	pub data: Map<String, Value>,
	#[serde(rename = "lastUpdated")]
	pub last_updated: DateTime<Utc>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub warnings: Vec<String>,
}

impl From<AggregateResponse> for AggregateEnvelope {
	fn from(aggregate: AggregateResponse) -> Self {
		Self {
			success: true,
			source: aggregate.source.as_api_str(),
			data: aggregate.data,
			last_updated: aggregate.last_updated,
			warnings: aggregate.warnings,
		}
	}
}
