use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use crate::models::domain::{GeneratedMatch, GeneratedPair, HistoricalLabel, PlayerForm};

/// Response for the forms endpoint, strongest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormsResponse {
    pub forms: Vec<PlayerForm>,
}

/// Response for the synergy endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynergyResponse {
    pub synergy: HashMap<String, f64>,
}

/// Response for the pairings endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingsResponse {
    pub teams: Vec<GeneratedPair>,
    #[serde(rename = "totalCost")]
    pub total_cost: f64,
}

/// Response for every endpoint that proposes matches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesResponse {
    pub matches: Vec<GeneratedMatch>,
    #[serde(rename = "totalResults")]
    pub total_results: usize,
}

/// Response for the predict endpoint; `prediction` is null when a team does not resolve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: Option<GeneratedMatch>,
}

/// Response for the historical labels endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelsResponse {
    pub labels: HashMap<String, HistoricalLabel>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(rename = "engineConfig")]
    pub engine_config: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
