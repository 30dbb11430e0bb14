use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::core::form::compute_forms;
use crate::models::{HistoricalLabel, Match, Player, PlayerForm};

/// Label every past match as balanced or favoring one side, without lookahead
///
/// Matches are replayed in chronological order. For each match the form
/// engine is recomputed from scratch over only the matches played strictly
/// earlier, so editing or dropping later matches can never change an earlier
/// label. Matches sharing a timestamp (a league night recorded by date) do not
/// see each other, whatever their input order. Quadratic in the history length.
pub fn label_historical_handicaps(
    matches: &[Match],
    players: &[Player],
    cfg: &EngineConfig,
    now: DateTime<Utc>,
) -> HashMap<String, HistoricalLabel> {
    let mut chronological: Vec<(DateTime<Utc>, &Match)> = matches.iter().map(|m| (m.played_at(now), m)).collect();
    chronological.sort_by(|a, b| a.0.cmp(&b.0));
    let played: Vec<DateTime<Utc>> = chronological.iter().map(|(at, _)| *at).collect();
    let ordered: Vec<Match> = chronological.into_iter().map(|(_, m)| m.clone()).collect();

    let mut labels = HashMap::with_capacity(ordered.len());
    let mut cached: Option<(usize, HashMap<String, PlayerForm>)> = None;

    for (idx, m) in ordered.iter().enumerate() {
        let earlier = played.partition_point(|at| *at < played[idx]);
        if cached.as_ref().map_or(true, |(end, _)| *end != earlier) {
            cached = Some((earlier, compute_forms(players, &ordered[..earlier], &cfg.form, now)));
        }
        let Some((_, forms)) = cached.as_ref() else { continue };

        let (Some(avg1), Some(avg2)) = (side_average(&m.team1, forms), side_average(&m.team2, forms)) else {
            tracing::debug!("Skipping match {}: a side has no known players", m.id);
            continue;
        };

        let delta = avg1 - avg2;
        let label = if delta.abs() <= cfg.history.balanced_threshold {
            HistoricalLabel::Balanced
        } else if delta > 0.0 {
            HistoricalLabel::T1Favorite
        } else {
            HistoricalLabel::T2Favorite
        };
        labels.insert(m.id.clone(), label);
    }

    tracing::debug!("Labelled {} of {} historical matches", labels.len(), matches.len());
    labels
}

/// Mean effective rating of the side's known players
fn side_average(ids: &[String], forms: &HashMap<String, PlayerForm>) -> Option<f64> {
    let ratings: Vec<f64> = ids
        .iter()
        .filter_map(|id| forms.get(id).map(|f| f.effective_rating))
        .collect();
    if ratings.is_empty() {
        None
    } else {
        Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
    }
}
