use std::collections::{HashMap, HashSet};

use crate::config::PairCostConfig;
use crate::models::{pair_key, PlayerForm};

/// Cost of putting two players on the same team (lower is better)
///
/// cost = (
///     (gap - target_diff)^2 +          # aim for a strong/support mix
///     1.5 if gap < 0.6 +               # similar strength stacks up
///     3.0 if gap > 2.0 +               # extreme mismatch
///     10.0 if both below 2.6 +         # two supports
///     |synergy| * 2.0 if > 0.35 +      # extreme chemistry either way
///     15.0 if recently paired
/// )
pub fn pair_cost(
    a: &PlayerForm,
    b: &PlayerForm,
    synergy: &HashMap<String, f64>,
    recent_pairs: &HashSet<String>,
    cfg: &PairCostConfig,
) -> f64 {
    let gap = (a.effective_rating - b.effective_rating).abs();
    let mut cost = (gap - cfg.target_diff).powi(2);

    if gap < cfg.similar_gap {
        cost += cfg.similar_penalty;
    }
    if gap > cfg.extreme_gap {
        cost += cfg.extreme_penalty;
    }
    if a.effective_rating < cfg.support_cutoff && b.effective_rating < cfg.support_cutoff {
        cost += cfg.two_supports_penalty;
    }

    let key = pair_key(&a.id, &b.id);
    let chemistry = synergy.get(&key).copied().unwrap_or(0.0).abs();
    if chemistry > cfg.synergy_threshold {
        cost += chemistry * cfg.synergy_weight;
    }
    if recent_pairs.contains(&key) {
        cost += cfg.repeat_pair_penalty;
    }

    cost
}
