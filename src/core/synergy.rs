use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::core::form::margin_ratio;
use crate::models::{pair_key, Match, Side};

#[derive(Debug, Default, Clone, Copy)]
struct PairRecord {
    games: u32,
    wins: u32,
    non_binary_games: u32,
    margin_sum: f64,
}

/// Pairwise chemistry from shared-team history, keyed by `pair_key`.
///
/// synergy = logit(p) * games / (games + 6) * quality
/// where p is the smoothed win rate and quality grows with the mean margin
/// of the pair's non-binary games.
pub fn compute_synergy(
    matches: &[Match],
    cfg: &EngineConfig,
    now: DateTime<Utc>,
) -> HashMap<String, f64> {
    let mut records: HashMap<String, PairRecord> = HashMap::new();

    for m in matches {
        if m.team1.len() != 2 || m.team2.len() != 2 {
            continue;
        }
        let winner = m.winning_side();
        let binary = m.is_binary();
        let ratio = if binary {
            0.0
        } else {
            margin_ratio(m, m.played_at(now), &cfg.form)
        };

        for side in [Side::Team1, Side::Team2] {
            let team = m.team(side);
            if team[0] == team[1] {
                continue;
            }
            let record = records.entry(pair_key(&team[0], &team[1])).or_default();
            record.games += 1;
            if winner == side {
                record.wins += 1;
            }
            if !binary {
                record.non_binary_games += 1;
                record.margin_sum += ratio;
            }
        }
    }

    let s = &cfg.synergy;
    let prior_wins = cfg.form.prior_wins;
    let prior_games = cfg.form.prior_games;

    let synergy: HashMap<String, f64> = records
        .into_iter()
        .map(|(key, r)| {
            let games = r.games as f64;
            let p = ((r.wins as f64 + prior_wins) / (games + prior_games)).clamp(s.prob_floor, s.prob_ceiling);
            let shrunk = (p / (1.0 - p)).ln() * games / (games + s.shrink_games);
            let quality = if r.non_binary_games > 0 {
                let avg = r.margin_sum / r.non_binary_games as f64;
                s.quality_base + s.quality_span * avg.clamp(0.0, 1.0)
            } else {
                1.0
            };
            (key, shrunk * quality)
        })
        .collect();

    tracing::debug!("Computed synergy for {} pairs", synergy.len());
    synergy
}
