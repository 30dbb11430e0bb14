use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::FormConfig;
use crate::models::{Match, Player, PlayerForm, Side};

/// Normalize a roster skill value into a base rating.
///
/// Missing, zero or legacy-scale (> ceiling) values fall back to the default.
#[inline]
pub fn normalize_base_rating(source: Option<f64>, cfg: &FormConfig) -> f64 {
    match source {
        Some(r) if r.is_finite() && r != 0.0 && r <= cfg.legacy_scale_ceiling => r,
        _ => cfg.default_base_rating,
    }
}

/// Margin ratio for a non-binary match.
///
/// Only matches on or after the score-aware cutover carry real margins; older
/// ones get the configured flat placeholder.
#[inline]
pub fn margin_ratio(m: &Match, played_at: DateTime<Utc>, cfg: &FormConfig) -> f64 {
    if played_at >= cfg.score_aware_cutover {
        (m.point_margin() as f64 / cfg.margin_points_scale).clamp(0.0, 1.0)
    } else {
        cfg.legacy_margin_ratio
    }
}

/// Logistic win expectancy of `own` against `opponent` on the base-rating scale
#[inline]
pub fn expected_win(own: f64, opponent: f64, scale: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - own) / scale))
}

#[inline]
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute the live form of every player from the full match history
///
/// Each player's window is their most recent `window_size` matches. The form
/// adjustment combines three signals over that window:
///
/// raw = (
///     win_core * 0.80 +      # Laplace-smoothed win rate, rescaled to [-1, 1]
///     margin_norm * 0.15 +   # signed score margin in non-binary matches
///     upset_norm * 0.05      # results against base-rating expectancy
/// )
/// form = clamp(raw * 0.20, -0.30, 0.30)
pub fn compute_forms(
    players: &[Player],
    matches: &[Match],
    cfg: &FormConfig,
    now: DateTime<Utc>,
) -> HashMap<String, PlayerForm> {
    let base_ratings: HashMap<&str, f64> = players
        .iter()
        .map(|p| (p.id.as_str(), normalize_base_rating(p.rating, cfg)))
        .collect();

    let dated: Vec<(DateTime<Utc>, &Match)> = matches.iter().map(|m| (m.played_at(now), m)).collect();

    let forms: HashMap<String, PlayerForm> = players
        .iter()
        .map(|player| {
            let base = base_ratings
                .get(player.id.as_str())
                .copied()
                .unwrap_or(cfg.default_base_rating);
            let form = player_form(player, base, &dated, &base_ratings, cfg);
            (player.id.clone(), form)
        })
        .collect();

    tracing::debug!("Computed forms for {} players from {} matches", forms.len(), matches.len());
    forms
}

fn player_form(
    player: &Player,
    base: f64,
    dated: &[(DateTime<Utc>, &Match)],
    base_ratings: &HashMap<&str, f64>,
    cfg: &FormConfig,
) -> PlayerForm {
    let mut window: Vec<(DateTime<Utc>, &Match, Side)> = dated
        .iter()
        .filter_map(|(at, m)| m.side_of(&player.id).map(|side| (*at, *m, side)))
        .collect();
    window.sort_by(|a, b| b.0.cmp(&a.0));
    window.truncate(cfg.window_size);

    let mut result = PlayerForm {
        id: player.id.clone(),
        name: player.name.clone(),
        base_rating: base,
        form: 0.0,
        effective_rating: base,
        last10_win_rate: 0.0,
        non_binary_losses: 0,
        total_margin_ratio_in_losses: 0.0,
    };

    if window.is_empty() {
        return result;
    }

    let games = window.len() as f64;
    let mut wins = 0usize;
    let mut margin_sum = 0.0;
    let mut margin_games = 0usize;
    let mut upset_sum = 0.0;

    for (played_at, m, side) in &window {
        let won = m.winning_side() == *side;
        if won {
            wins += 1;
        }

        if !m.is_binary() {
            let ratio = margin_ratio(m, *played_at, cfg);
            let signed = if won { ratio } else { -ratio };
            margin_sum += signed.clamp(-cfg.margin_cap, cfg.margin_cap);
            margin_games += 1;

            if !won && *played_at >= cfg.score_aware_cutover {
                result.non_binary_losses += 1;
                result.total_margin_ratio_in_losses += ratio;
            }
        }

        let own = side_base_sum(m.team(*side), base_ratings, cfg);
        let opponent = side_base_sum(m.team(side.opponent()), base_ratings, cfg);
        let expected = expected_win(own, opponent, cfg.upset_scale);
        let signal = if won { 0.5 - expected } else { -(expected - 0.5) };
        upset_sum += signal.clamp(-cfg.upset_cap, cfg.upset_cap);
    }

    let win_rate = (wins as f64 + cfg.prior_wins) / (games + cfg.prior_games);
    let win_core = (win_rate - 0.5) / 0.5;
    let margin_norm = if margin_games > 0 {
        (margin_sum / margin_games as f64) / cfg.margin_cap
    } else {
        0.0
    };
    let upset_norm = (upset_sum / games) / cfg.upset_cap;

    let raw = cfg.win_weight * win_core + cfg.margin_weight * margin_norm + cfg.upset_weight * upset_norm;
    let mut form = (raw * cfg.form_scale).clamp(-cfg.form_max, cfg.form_max);
    if form.abs() < cfg.zero_snap {
        form = 0.0;
    }

    tracing::trace!(
        "form {}: wins={}/{} win_core={:.3} margin={:.3} upset={:.3} form={:.3}",
        player.id, wins, window.len(), win_core, margin_norm, upset_norm, form
    );

    result.form = form;
    result.effective_rating = round2(base + form);
    result.last10_win_rate = wins as f64 / games;
    result
}

/// Unknown ids count at the default base rating
fn side_base_sum(ids: &[String], base_ratings: &HashMap<&str, f64>, cfg: &FormConfig) -> f64 {
    ids.iter()
        .map(|id| base_ratings.get(id.as_str()).copied().unwrap_or(cfg.default_base_rating))
        .sum()
}
