use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bumped whenever a weight changes; scores under different versions are
/// not comparable.
pub const GRI_WEIGHTS_VERSION: u32 = 1;

pub const PARTICIPATION_WEIGHT: f64 = 0.40;
pub const EXECUTION_RELIABILITY_WEIGHT: f64 = 0.30;
pub const GOVERNANCE_LATENCY_WEIGHT: f64 = 0.20;
pub const TRANSPARENCY_WEIGHT: f64 = 0.10;

/// One explainable sub-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GriMetric {
    pub score: f64,
    pub weight: f64,
    pub raw_value: f64,
    pub description: String,
}

impl GriMetric {
    pub fn contribution(&self) -> f64 {
        self.score * self.weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GriBreakdown {
    pub participation: GriMetric,
    pub execution_reliability: GriMetric,
    pub governance_latency: GriMetric,
    pub transparency: GriMetric,
}

impl GriBreakdown {
    pub fn metrics(&self) -> [(&'static str, &GriMetric); 4] {
        [
            ("participation", &self.participation),
            ("executionReliability", &self.execution_reliability),
            ("governanceLatency", &self.governance_latency),
            ("transparency", &self.transparency),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GriScore {
    pub overall: f64,
    pub breakdown: GriBreakdown,
    pub weights_version: u32,
    /// Metadata only; not a scoring input.
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    Excellent,
    Good,
    Fair,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
    Critical,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::NeedsImprovement => "Needs Improvement",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
