use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::config::HandicapConfig;
use crate::models::{GeneratedPair, Handicap, Match, Side};

pub const HANDICAP_REASON: &str = "Point start for the weaker team to even out the matchup";

/// Running total plus the explanation line of every step that moved it
#[derive(Debug, Default)]
struct Ledger {
    total: f64,
    lines: Vec<String>,
}

impl Ledger {
    fn apply(&mut self, delta: f64, line: String) {
        if delta != 0.0 {
            self.total += delta;
            self.lines.push(line);
        }
    }
}

/// Compute the point handicap for a matchup
///
/// # Steps
/// 1. Rating-diff tier on the strength gap
/// 2. Support override: weak side fields more support players
/// 3. Form override: weak side is in better recent form
/// 4. Blowout risk: weak side tends to lose non-binary games heavily
/// 5. Head-to-head calibration over the recent window
///
/// Returns `None` when the rounded total is not positive; a zero handicap is
/// never represented explicitly.
pub fn calculate_handicap(
    team1: &GeneratedPair,
    team2: &GeneratedPair,
    matches: &[Match],
    cfg: &HandicapConfig,
    now: DateTime<Utc>,
) -> Option<Handicap> {
    let gap = (team1.strength - team2.strength).abs();
    if gap < cfg.equal_strength_epsilon {
        return None;
    }

    let (weak_side, strong, weak) = if team1.strength > team2.strength {
        (Side::Team2, team1, team2)
    } else {
        (Side::Team1, team2, team1)
    };

    let mut ledger = Ledger::default();

    // Step 1: rating-diff tier
    let tier = cfg
        .rating_tiers
        .iter()
        .filter(|t| gap > t.above)
        .max_by(|a, b| a.above.partial_cmp(&b.above).unwrap_or(std::cmp::Ordering::Equal));
    if let Some(tier) = tier {
        ledger.apply(
            tier.points,
            format!("Strength gap {:.2} exceeds {:.1}: +{}", gap, tier.above, tier.points),
        );
    }

    // Step 2: support override
    let weak_supports = support_count(weak, cfg.support_cutoff);
    let strong_supports = support_count(strong, cfg.support_cutoff);
    if weak_supports > strong_supports {
        ledger.apply(
            cfg.support_points,
            format!(
                "Weaker team fields {} support player(s) against {}: +{}",
                weak_supports, strong_supports, cfg.support_points
            ),
        );
    }

    // Step 3: form override
    let form_gap = mean_win_rate(weak) - mean_win_rate(strong);
    if form_gap >= cfg.form_major_gap {
        ledger.apply(
            -cfg.form_major_points,
            format!("Weaker team is hot (win rate +{:.0}%): -{}", form_gap * 100.0, cfg.form_major_points),
        );
    } else if form_gap >= cfg.form_minor_gap {
        ledger.apply(
            -cfg.form_minor_points,
            format!("Weaker team is in form (win rate +{:.0}%): -{}", form_gap * 100.0, cfg.form_minor_points),
        );
    }

    // Step 4: blowout risk
    let blowout = mean_blowout_index(weak);
    if blowout > cfg.blowout_threshold && ledger.total > 0.0 {
        ledger.apply(
            cfg.blowout_points,
            format!(
                "Weaker team tends to lose heavily (blowout index {:.2}): +{}",
                blowout, cfg.blowout_points
            ),
        );
    }

    // Step 5: head-to-head calibration
    let (meetings, strong_losses) = head_to_head(weak, strong, matches, cfg.head_to_head_days, now);
    if strong_losses > 0 {
        let delta = if meetings == 1 {
            -cfg.head_to_head_single
        } else {
            -cfg.head_to_head_multiple
        };
        ledger.apply(
            delta,
            format!(
                "Stronger team lost {} of {} recent meeting(s): {}",
                strong_losses, meetings, delta
            ),
        );
    }

    let rounded = round_half_up(ledger.total).min(cfg.max_points as f64);
    tracing::trace!("handicap total {:.2} rounds to {}", ledger.total, rounded);
    if rounded <= 0.0 {
        return None;
    }

    Some(Handicap {
        weaker_team: weak_side,
        points: rounded as u8,
        reason: HANDICAP_REASON.to_string(),
        explanation: ledger.lines,
    })
}

fn support_count(team: &GeneratedPair, cutoff: f64) -> usize {
    team.players.iter().filter(|p| p.effective_rating < cutoff).count()
}

fn mean_win_rate(team: &GeneratedPair) -> f64 {
    if team.players.is_empty() {
        return 0.0;
    }
    team.players.iter().map(|p| p.last10_win_rate).sum::<f64>() / team.players.len() as f64
}

fn mean_blowout_index(team: &GeneratedPair) -> f64 {
    if team.players.is_empty() {
        return 0.0;
    }
    team.players.iter().map(|p| p.blowout_index()).sum::<f64>() / team.players.len() as f64
}

/// Count recent meetings between exactly these two teams and the strong side's losses
fn head_to_head(
    weak: &GeneratedPair,
    strong: &GeneratedPair,
    matches: &[Match],
    window_days: i64,
    now: DateTime<Utc>,
) -> (usize, usize) {
    let weak_ids: HashSet<&str> = weak.ids().into_iter().collect();
    let strong_ids: HashSet<&str> = strong.ids().into_iter().collect();
    // An unrepresentable window reaches back to the start of time
    let since = Duration::try_days(window_days)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut meetings = 0;
    let mut strong_losses = 0;

    for m in matches {
        if m.played_at(now) < since {
            continue;
        }
        let team1: HashSet<&str> = m.team1.iter().map(String::as_str).collect();
        let team2: HashSet<&str> = m.team2.iter().map(String::as_str).collect();

        let strong_side = if team1 == strong_ids && team2 == weak_ids {
            Side::Team1
        } else if team2 == strong_ids && team1 == weak_ids {
            Side::Team2
        } else {
            continue;
        };

        meetings += 1;
        if m.winning_side() != strong_side {
            strong_losses += 1;
        }
    }

    (meetings, strong_losses)
}

/// Halves round up, so a 2.5 running total becomes 3 and -0.5 becomes 0
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
