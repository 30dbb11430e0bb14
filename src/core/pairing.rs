use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::config::EngineConfig;
use crate::core::cost::pair_cost;
use crate::core::error::EngineError;
use crate::models::{GeneratedPair, PlayerForm};

/// Partition a pool into teams of two, minimizing total teammate cost
///
/// # Phases
/// 1. Greedy: walk the pool from weakest to strongest, pairing each unmatched
///    player with the cheapest unmatched partner.
/// 2. Refinement: up to `swap_iterations` random cross-swaps of second
///    members between two teams, kept only when they lower the combined cost.
///
/// A repeated id keeps only its first entry, so no team holds one player
/// twice. The result is not guaranteed to be a global optimum. All
/// randomness comes from `rng`, so a seeded generator reproduces the same
/// output.
pub fn build_pairings<R: Rng + ?Sized>(
    pool: &[PlayerForm],
    synergy: &HashMap<String, f64>,
    recent_pairs: &HashSet<String>,
    cfg: &EngineConfig,
    rng: &mut R,
) -> Result<Vec<GeneratedPair>, EngineError> {
    let mut seen = HashSet::with_capacity(pool.len());
    let mut order: Vec<&PlayerForm> = pool.iter().filter(|&p| seen.insert(p.id.as_str())).collect();
    if order.len() != pool.len() {
        tracing::warn!("Dropped {} repeated player id(s) from the pool", pool.len() - order.len());
    }
    if order.len() % 2 != 0 {
        return Err(EngineError::OddPool { size: order.len() });
    }

    let cost_of = |a: &PlayerForm, b: &PlayerForm| pair_cost(a, b, synergy, recent_pairs, &cfg.cost);

    order.sort_by(|a, b| {
        a.effective_rating
            .partial_cmp(&b.effective_rating)
            .unwrap_or(Ordering::Equal)
    });

    let mut taken = vec![false; order.len()];
    let mut pairs: Vec<GeneratedPair> = Vec::with_capacity(order.len() / 2);

    for i in 0..order.len() {
        if taken[i] {
            continue;
        }
        taken[i] = true;

        let mut best: Option<(usize, f64)> = None;
        for j in (i + 1)..order.len() {
            if taken[j] {
                continue;
            }
            let cost = cost_of(order[i], order[j]);
            if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                best = Some((j, cost));
            }
        }

        if let Some((j, cost)) = best {
            taken[j] = true;
            pairs.push(GeneratedPair::new(order[i].clone(), order[j].clone(), cost));
        }
    }

    let mut total_cost: f64 = pairs.iter().map(|p| p.cost).sum();
    let greedy_cost = total_cost;

    if pairs.len() >= 2 {
        for _ in 0..cfg.pairing.swap_iterations {
            let a = rng.gen_range(0..pairs.len());
            let mut b = rng.gen_range(0..pairs.len() - 1);
            if b >= a {
                b += 1;
            }

            let (a1, a2) = (&pairs[a].players[0], &pairs[a].players[1]);
            let (b1, b2) = (&pairs[b].players[0], &pairs[b].players[1]);

            let first = cost_of(a1, b2);
            let second = cost_of(b1, a2);
            let current = pairs[a].cost + pairs[b].cost;

            if first + second < current {
                let swapped_a = GeneratedPair::new(a1.clone(), b2.clone(), first);
                let swapped_b = GeneratedPair::new(b1.clone(), a2.clone(), second);
                pairs[a] = swapped_a;
                pairs[b] = swapped_b;
                total_cost += first + second - current;
            }
        }
    }

    tracing::debug!(
        "Paired {} players into {} teams (greedy cost {:.3}, refined cost {:.3})",
        pool.len(),
        pairs.len(),
        greedy_cost,
        total_cost
    );

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn form(id: &str, effective: f64) -> PlayerForm {
        PlayerForm {
            id: id.to_string(),
            name: id.to_string(),
            base_rating: effective,
            form: 0.0,
            effective_rating: effective,
            last10_win_rate: 0.0,
            non_binary_losses: 0,
            total_margin_ratio_in_losses: 0.0,
        }
    }

    fn pool(ratings: &[f64]) -> Vec<PlayerForm> {
        ratings
            .iter()
            .enumerate()
            .map(|(i, r)| form(&format!("p{}", i), *r))
            .collect()
    }

    #[test]
    fn test_odd_pool_rejected() {
        let cfg = EngineConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = build_pairings(&pool(&[3.0, 3.5, 4.0]), &HashMap::new(), &HashSet::new(), &cfg, &mut rng);
        assert_eq!(result, Err(EngineError::OddPool { size: 3 }));
    }

    #[test]
    fn test_repeated_id_never_paired_with_itself() {
        let cfg = EngineConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let twice = vec![form("a", 4.4), form("a", 3.0)];
        let result = build_pairings(&twice, &HashMap::new(), &HashSet::new(), &cfg, &mut rng);
        assert_eq!(result, Err(EngineError::OddPool { size: 1 }));

        let mut with_repeat = pool(&[2.0, 3.4, 3.5]);
        with_repeat.push(form("p0", 4.0));
        with_repeat.push(form("p3", 2.2));
        let pairs = build_pairings(&with_repeat, &HashMap::new(), &HashSet::new(), &cfg, &mut rng).unwrap();
        assert_eq!(pairs.len(), 2);
        for pair in &pairs {
            assert_ne!(pair.players[0].id, pair.players[1].id);
        }
    }

    #[test]
    fn test_empty_pool_yields_no_pairs() {
        let cfg = EngineConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let pairs = build_pairings(&[], &HashMap::new(), &HashSet::new(), &cfg, &mut rng).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_greedy_pairs_strong_with_support() {
        let cfg = EngineConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let pairs = build_pairings(&pool(&[2.0, 2.1, 3.4, 3.5]), &HashMap::new(), &HashSet::new(), &cfg, &mut rng).unwrap();

        assert_eq!(pairs.len(), 2);
        for pair in &pairs {
            // Every team gets one player below 2.6 and one above
            let low = pair.players.iter().filter(|p| p.effective_rating < 2.6).count();
            assert_eq!(low, 1);
        }
    }

    #[test]
    fn test_partition_covers_pool_exactly_once() {
        let cfg = EngineConfig::default();
        let ratings: Vec<f64> = (0..16).map(|i| 1.5 + (i as f64 * 0.37) % 3.0).collect();
        let players = pool(&ratings);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let pairs = build_pairings(&players, &HashMap::new(), &HashSet::new(), &cfg, &mut rng).unwrap();

        let mut seen = HashSet::new();
        for pair in &pairs {
            assert_eq!(pair.players.len(), 2);
            assert_ne!(pair.players[0].id, pair.players[1].id);
            for p in &pair.players {
                assert!(seen.insert(p.id.clone()), "{} paired twice", p.id);
            }
        }
        assert_eq!(seen.len(), players.len());
    }

    #[test]
    fn test_same_seed_same_pairings() {
        let cfg = EngineConfig::default();
        let ratings: Vec<f64> = (0..12).map(|i| 1.8 + (i as f64 * 0.53) % 2.7).collect();
        let players = pool(&ratings);

        let mut first_rng = ChaCha8Rng::seed_from_u64(2024);
        let mut second_rng = ChaCha8Rng::seed_from_u64(2024);
        let first = build_pairings(&players, &HashMap::new(), &HashSet::new(), &cfg, &mut first_rng).unwrap();
        let second = build_pairings(&players, &HashMap::new(), &HashSet::new(), &cfg, &mut second_rng).unwrap();

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_refinement_never_raises_cost() {
        let mut cfg = EngineConfig::default();
        let ratings: Vec<f64> = (0..10).map(|i| 2.0 + (i as f64 * 0.71) % 2.5).collect();
        let players = pool(&ratings);

        cfg.pairing.swap_iterations = 0;
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let greedy = build_pairings(&players, &HashMap::new(), &HashSet::new(), &cfg, &mut rng).unwrap();

        cfg.pairing.swap_iterations = 200;
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let refined = build_pairings(&players, &HashMap::new(), &HashSet::new(), &cfg, &mut rng).unwrap();

        let greedy_total: f64 = greedy.iter().map(|p| p.cost).sum();
        let refined_total: f64 = refined.iter().map(|p| p.cost).sum();
        assert!(refined_total <= greedy_total + 1e-9);
    }
}
