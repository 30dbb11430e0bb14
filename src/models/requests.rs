use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::{Match, Player};

/// Request to compute every player's live form
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FormsRequest {
    pub players: Vec<Player>,
    #[serde(default)]
    pub matches: Vec<Match>,
}

/// Request to compute pairwise synergy
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SynergyRequest {
    #[serde(default)]
    pub matches: Vec<Match>,
}

/// Request to split a pool into teams
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PairingsRequest {
    pub players: Vec<Player>,
    #[serde(default)]
    pub matches: Vec<Match>,
    #[validate(length(min = 2))]
    #[serde(alias = "pool_ids")]
    pub pool_ids: Vec<String>,
    /// Teammate pairs to avoid repeating, as two-id lists
    #[validate(custom(function = "validate_pairs"))]
    #[serde(default, alias = "recent_pairs")]
    pub recent_pairs: Vec<Vec<String>>,
    pub seed: Option<u64>,
}

/// Request to build a full round of matchups
///
/// Teams come either from `poolIds` (paired by the optimizer) or from
/// explicitly supplied `teams`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_matchups_source"))]
pub struct MatchupsRequest {
    pub players: Vec<Player>,
    #[serde(default)]
    pub matches: Vec<Match>,
    #[serde(default, alias = "pool_ids")]
    pub pool_ids: Vec<String>,
    #[validate(custom(function = "validate_pairs"))]
    #[serde(default)]
    pub teams: Vec<Vec<String>>,
    #[validate(custom(function = "validate_pairs"))]
    #[serde(default, alias = "recent_pairs")]
    pub recent_pairs: Vec<Vec<String>>,
    /// Four-player groups that met recently
    #[serde(default, alias = "recent_matchups")]
    pub recent_matchups: Vec<Vec<String>>,
    pub seed: Option<u64>,
}

/// Request for the best opponents of a fixed team
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OpponentsRequest {
    #[validate(length(min = 2, max = 2))]
    pub team: Vec<String>,
    #[validate(length(min = 2))]
    #[serde(alias = "pool_ids")]
    pub pool_ids: Vec<String>,
    pub players: Vec<Player>,
    #[serde(default)]
    pub matches: Vec<Match>,
}

/// Request for the best partner against one or two fixed opponents
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BestPartnersRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "self_id")]
    pub self_id: String,
    #[validate(length(min = 1, max = 2))]
    #[serde(alias = "opponent_ids")]
    pub opponent_ids: Vec<String>,
    #[validate(length(min = 1))]
    #[serde(alias = "pool_ids")]
    pub pool_ids: Vec<String>,
    pub players: Vec<Player>,
    #[serde(default)]
    pub matches: Vec<Match>,
}

/// Request to predict the handicap between two given teams
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PredictRequest {
    #[validate(length(min = 1, max = 2))]
    pub team1: Vec<String>,
    #[validate(length(min = 1, max = 2))]
    pub team2: Vec<String>,
    pub players: Vec<Player>,
    #[serde(default)]
    pub matches: Vec<Match>,
}

/// Request to label historical matches
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HistoryRequest {
    pub players: Vec<Player>,
    #[serde(default)]
    pub matches: Vec<Match>,
}

fn validate_pairs(pairs: &Vec<Vec<String>>) -> Result<(), ValidationError> {
    if pairs.iter().all(|p| p.len() == 2 && p[0] != p[1]) {
        Ok(())
    } else {
        Err(ValidationError::new("pairs_need_two_distinct_ids"))
    }
}

fn validate_matchups_source(req: &MatchupsRequest) -> Result<(), ValidationError> {
    if req.pool_ids.is_empty() && req.teams.is_empty() {
        return Err(ValidationError::new("pool_or_teams_required"));
    }
    Ok(())
}
