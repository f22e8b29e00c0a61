use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of a benchmark comparison request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRequest {
    pub industry: String,
    pub ratios: BTreeMap<String, f64>,
}

/// One audit-derived ratio compared against the industry reference set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatioComparison {
    pub ratio: String,
    pub client_value: f64,
    #[serde(default)]
    pub industry_median: Option<f64>,
    #[serde(default)]
    pub percentile: Option<f64>,
    #[serde(default)]
    pub assessment: Option<String>,
}

/// Benchmark comparison results for one industry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkComparison {
    pub industry: String,
    pub comparisons: Vec<RatioComparison>,
    pub overall_score: Option<f64>,
}
