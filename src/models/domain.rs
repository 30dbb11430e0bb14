use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// League player as supplied by the roster store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Raw skill value; normalized into a base rating by the form engine
    #[serde(default, alias = "skill")]
    pub rating: Option<f64>,
    #[serde(rename = "isActive", alias = "active", default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool { true }

/// One side of a recorded match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Side {
    Team1,
    Team2,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Side::Team1 => Side::Team2,
            Side::Team2 => Side::Team1,
        }
    }
}

impl TryFrom<u8> for Side {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Side::Team1),
            2 => Ok(Side::Team2),
            other => Err(format!("side must be 1 or 2, got {}", other)),
        }
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> u8 {
        match side {
            Side::Team1 => 1,
            Side::Team2 => 2,
        }
    }
}

/// Recorded doubles match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    #[serde(default)]
    pub date: Option<String>,
    pub team1: Vec<String>,
    pub team2: Vec<String>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub score1: u32,
    #[serde(default, deserialize_with = "lenient_score")]
    pub score2: u32,
    /// Only consulted when the scores are tied
    #[serde(default)]
    pub winner: Option<Side>,
    #[serde(rename = "type", default)]
    pub match_type: Option<String>,
    #[serde(rename = "bonusPoints", default)]
    pub bonus_points: Option<f64>,
}

impl Match {
    /// Parse the match date, falling back to `now` when absent or unparsable
    pub fn played_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.date
            .as_deref()
            .and_then(parse_match_date)
            .unwrap_or(now)
    }

    pub fn team(&self, side: Side) -> &[String] {
        match side {
            Side::Team1 => &self.team1,
            Side::Team2 => &self.team2,
        }
    }

    /// Which side the player was on, if any
    pub fn side_of(&self, player_id: &str) -> Option<Side> {
        if self.team1.iter().any(|id| id == player_id) {
            Some(Side::Team1)
        } else if self.team2.iter().any(|id| id == player_id) {
            Some(Side::Team2)
        } else {
            None
        }
    }

    pub fn winning_side(&self) -> Side {
        if self.score1 > self.score2 {
            Side::Team1
        } else if self.score2 > self.score1 {
            Side::Team2
        } else {
            self.winner.unwrap_or(Side::Team1)
        }
    }

    /// A 1-0 result carries no margin information
    pub fn is_binary(&self) -> bool {
        (self.score1 == 1 && self.score2 == 0) || (self.score1 == 0 && self.score2 == 1)
    }

    pub fn point_margin(&self) -> u32 {
        self.score1.abs_diff(self.score2)
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD`
pub fn parse_match_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Scores arrive as numbers or numeric strings; anything else counts as 0
fn lenient_score<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let score = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    };
    Ok(u32::try_from(score).unwrap_or(u32::MAX))
}

/// Canonical key for a teammate pair: the two ids sorted and joined with `-`
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}-{}", a, b)
    } else {
        format!("{}-{}", b, a)
    }
}

/// Canonical key for a four-player matchup, independent of side and order
pub fn matchup_key<S: AsRef<str>>(ids: &[S]) -> String {
    let mut sorted: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    sorted.join("|")
}

/// A player's live rating, derived from recent results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerForm {
    pub id: String,
    pub name: String,
    #[serde(rename = "baseRating")]
    pub base_rating: f64,
    pub form: f64,
    #[serde(rename = "effectiveRating")]
    pub effective_rating: f64,
    #[serde(rename = "last10WinRate")]
    pub last10_win_rate: f64,
    #[serde(rename = "nonBinaryLosses")]
    pub non_binary_losses: u32,
    #[serde(rename = "totalMarginRatioInLosses")]
    pub total_margin_ratio_in_losses: f64,
}

impl PlayerForm {
    /// Mean margin ratio across non-binary losses, 0 when there are none
    pub fn blowout_index(&self) -> f64 {
        if self.non_binary_losses == 0 {
            0.0
        } else {
            self.total_margin_ratio_in_losses / self.non_binary_losses as f64
        }
    }
}

/// A team of (normally) two players
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPair {
    pub players: Vec<PlayerForm>,
    pub strength: f64,
    pub structure: f64,
    pub cost: f64,
}

impl GeneratedPair {
    pub fn new(first: PlayerForm, second: PlayerForm, cost: f64) -> Self {
        let strength = first.effective_rating + second.effective_rating;
        let structure = (first.effective_rating - second.effective_rating).abs();
        Self {
            players: vec![first, second],
            strength,
            structure,
            cost,
        }
    }

    /// Single-player side, only used for outcome prediction
    pub fn solo(player: PlayerForm) -> Self {
        Self {
            strength: player.effective_rating,
            structure: 0.0,
            cost: 0.0,
            players: vec![player],
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.players.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    /// Pair key when this is a two-player team
    pub fn key(&self) -> Option<String> {
        match self.players.as_slice() {
            [a, b] => Some(pair_key(&a.id, &b.id)),
            _ => None,
        }
    }
}

/// Points granted to the weaker team, with the reasoning behind them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handicap {
    #[serde(rename = "weakerTeam")]
    pub weaker_team: Side,
    pub points: u8,
    pub reason: String,
    pub explanation: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchAnalysis {
    /// Team 1 pair synergy minus team 2 pair synergy
    pub synergy: f64,
    /// Team 1 mean form minus team 2 mean form
    pub form: f64,
    pub quality: f64,
}

/// A proposed team-vs-team match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMatch {
    pub team1: GeneratedPair,
    pub team2: GeneratedPair,
    #[serde(rename = "matchCost")]
    pub match_cost: f64,
    /// Absent when the matchup needs no adjustment
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub handicap: Option<Handicap>,
    pub analysis: MatchAnalysis,
}

impl GeneratedMatch {
    pub fn handicap_points(&self) -> u8 {
        self.handicap.as_ref().map_or(0, |h| h.points)
    }
}

/// Balance label for a match that has already been played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoricalLabel {
    Balanced,
    T1Favorite,
    T2Favorite,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(score1: u32, score2: u32, winner: Option<Side>) -> Match {
        Match {
            id: "m".to_string(),
            date: None,
            team1: vec!["a".to_string(), "b".to_string()],
            team2: vec!["c".to_string(), "d".to_string()],
            score1,
            score2,
            winner,
            match_type: None,
            bonus_points: None,
        }
    }

    #[test]
    fn test_winning_side_falls_back_on_tie() {
        assert_eq!(scored(11, 7, None).winning_side(), Side::Team1);
        assert_eq!(scored(4, 11, None).winning_side(), Side::Team2);
        assert_eq!(scored(5, 5, Some(Side::Team2)).winning_side(), Side::Team2);
        assert_eq!(scored(5, 5, None).winning_side(), Side::Team1);
    }

    #[test]
    fn test_binary_detection() {
        assert!(scored(1, 0, None).is_binary());
        assert!(scored(0, 1, None).is_binary());
        assert!(!scored(2, 0, None).is_binary());
        assert!(!scored(1, 1, None).is_binary());
    }

    #[test]
    fn test_lenient_scores() {
        let json = r#"{"id":"x","team1":["a"],"team2":["b"],"score1":"11","score2":"abc","winner":2}"#;
        let m: Match = serde_json::from_str(json).unwrap();
        assert_eq!(m.score1, 11);
        assert_eq!(m.score2, 0);
        assert_eq!(m.winner, Some(Side::Team2));

        let json = r#"{"id":"y","team1":["a"],"team2":["b"],"score1":-3,"score2":null}"#;
        let m: Match = serde_json::from_str(json).unwrap();
        assert_eq!(m.score1, 0);
        assert_eq!(m.score2, 0);
    }

    #[test]
    fn test_date_formats_and_fallback() {
        let now = Utc::now();
        let mut m = scored(1, 0, None);

        m.date = Some("2025-03-04".to_string());
        assert_eq!(m.played_at(now).to_rfc3339(), "2025-03-04T00:00:00+00:00");

        m.date = Some("2025-03-04T18:30:00".to_string());
        assert_eq!(m.played_at(now).to_rfc3339(), "2025-03-04T18:30:00+00:00");

        m.date = Some("2025-03-04T18:30:00+02:00".to_string());
        assert_eq!(m.played_at(now).to_rfc3339(), "2025-03-04T16:30:00+00:00");

        m.date = Some("last tuesday".to_string());
        assert_eq!(m.played_at(now), now);
    }

    #[test]
    fn test_keys_are_order_independent() {
        assert_eq!(pair_key("b", "a"), "a-b");
        assert_eq!(pair_key("a", "b"), "a-b");
        assert_eq!(matchup_key(&["d", "a", "c", "b"]), matchup_key(&["b", "c", "a", "d"]));
    }

    #[test]
    fn test_handicap_absent_is_not_serialized() {
        let form = PlayerForm {
            id: "a".to_string(),
            name: "A".to_string(),
            base_rating: 3.0,
            form: 0.0,
            effective_rating: 3.0,
            last10_win_rate: 0.0,
            non_binary_losses: 0,
            total_margin_ratio_in_losses: 0.0,
        };
        let team = GeneratedPair::solo(form);
        let m = GeneratedMatch {
            team1: team.clone(),
            team2: team,
            match_cost: 0.0,
            handicap: None,
            analysis: MatchAnalysis { synergy: 0.0, form: 0.0, quality: 100.0 },
        };
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("handicap").is_none());
    }
}
