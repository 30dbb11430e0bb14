use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::config::{EngineConfig, MatchupConfig};
use crate::core::handicap::calculate_handicap;
use crate::models::{matchup_key, GeneratedMatch, GeneratedPair, Match, MatchAnalysis};

/// Imbalance cost of one team against another (lower is better)
///
/// cost = dStrength^2 + 0.7 * dStructure^2 + 0.6 * clamp(|dStrength| / 2, 0, 1)^2
#[inline]
pub fn matchup_cost(t1: &GeneratedPair, t2: &GeneratedPair, cfg: &MatchupConfig) -> f64 {
    let strength_gap = t1.strength - t2.strength;
    let structure_gap = t1.structure - t2.structure;
    let scaled = (strength_gap.abs() / cfg.gap_scale).clamp(0.0, 1.0);

    strength_gap.powi(2) + cfg.structure_weight * structure_gap.powi(2) + cfg.gap_weight * scaled.powi(2)
}

/// Quality score used for optimizer and search results
#[inline]
pub fn cost_quality(match_cost: f64, cfg: &MatchupConfig) -> f64 {
    cfg.quality_scale / (1.0 + match_cost.max(0.0))
}

/// Quality score used for outcome predictions, linear in the strength gap
#[inline]
pub fn gap_quality(strength_gap: f64, cfg: &MatchupConfig) -> f64 {
    (cfg.quality_scale - cfg.predict_quality_slope * strength_gap.abs()).max(0.0)
}

/// Everything a matchup needs besides the two teams
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub synergy: &'a HashMap<String, f64>,
    pub matches: &'a [Match],
    pub config: &'a EngineConfig,
    pub now: DateTime<Utc>,
}

/// Attach handicap and analysis to a scored matchup
pub fn assemble_match(
    team1: GeneratedPair,
    team2: GeneratedPair,
    match_cost: f64,
    quality: f64,
    ctx: &MatchContext<'_>,
) -> GeneratedMatch {
    let handicap = calculate_handicap(&team1, &team2, ctx.matches, &ctx.config.handicap, ctx.now);
    let analysis = MatchAnalysis {
        synergy: team_synergy(&team1, ctx.synergy) - team_synergy(&team2, ctx.synergy),
        form: mean_form(&team1) - mean_form(&team2),
        quality,
    };

    GeneratedMatch {
        team1,
        team2,
        match_cost,
        handicap,
        analysis,
    }
}

fn team_synergy(team: &GeneratedPair, synergy: &HashMap<String, f64>) -> f64 {
    team.key()
        .and_then(|key| synergy.get(&key).copied())
        .unwrap_or(0.0)
}

fn mean_form(team: &GeneratedPair) -> f64 {
    if team.players.is_empty() {
        return 0.0;
    }
    team.players.iter().map(|p| p.form).sum::<f64>() / team.players.len() as f64
}

/// Pair teams against each other, strongest first
///
/// Each round removes the strongest remaining team and gives it the opponent
/// with the lowest matchup cost, penalizing exact four-player repeats. A
/// leftover odd team stays unmatched.
pub fn build_matchups(
    mut teams: Vec<GeneratedPair>,
    recent_matchups: &HashSet<String>,
    ctx: &MatchContext<'_>,
) -> Vec<GeneratedMatch> {
    let cfg = ctx.config;
    teams.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap_or(Ordering::Equal));

    let mut remaining: Vec<GeneratedPair> = teams;
    let mut generated = Vec::with_capacity(remaining.len() / 2);

    while remaining.len() >= 2 {
        let t1 = remaining.remove(0);

        let mut best: Option<(usize, f64)> = None;
        for (idx, candidate) in remaining.iter().enumerate() {
            let mut cost = matchup_cost(&t1, candidate, &cfg.matchup);
            let mut four: Vec<&str> = t1.ids();
            four.extend(candidate.ids());
            if recent_matchups.contains(&matchup_key(&four)) {
                cost += cfg.matchup.repeat_matchup_penalty;
            }
            if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                best = Some((idx, cost));
            }
        }

        let Some((idx, cost)) = best else { break };
        let t2 = remaining.remove(idx);
        generated.push(assemble_match(t1, t2, cost, cost_quality(cost, &cfg.matchup), ctx));
    }

    if let Some(left) = remaining.first() {
        tracing::debug!("Team {:?} left without an opponent", left.ids());
    }
    tracing::debug!("Generated {} matchups", generated.len());

    generated
}
