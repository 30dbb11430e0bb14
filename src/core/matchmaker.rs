use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::EngineConfig;
use crate::core::{
    cost::pair_cost,
    error::EngineError,
    form::compute_forms,
    history::label_historical_handicaps,
    matchup::{assemble_match, build_matchups, cost_quality, gap_quality, matchup_cost, MatchContext},
    pairing::build_pairings,
    synergy::compute_synergy,
};
use crate::models::{GeneratedMatch, GeneratedPair, HistoricalLabel, Match, Player, PlayerForm};

/// Main matchmaking orchestrator - composes the engine components into the
/// public queries
///
/// Every call recomputes forms and synergy from the supplied history; nothing
/// is cached between calls.
#[derive(Debug, Clone)]
pub struct Matchmaker {
    config: EngineConfig,
    as_of: Option<DateTime<Utc>>,
}

impl Matchmaker {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        Ok(Self { config, as_of: None })
    }

    pub fn with_default_config() -> Self {
        Self {
            config: EngineConfig::default(),
            as_of: None,
        }
    }

    /// Pin "now" for date fallback and the head-to-head window
    pub fn as_of(mut self, now: DateTime<Utc>) -> Self {
        self.as_of = Some(now);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.as_of.unwrap_or_else(Utc::now)
    }

    /// Random source for the pairing refinement; a per-call seed wins over the configured one
    pub fn rng(&self, seed: Option<u64>) -> ChaCha8Rng {
        match seed.or(self.config.rng_seed) {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    pub fn compute_forms(&self, players: &[Player], matches: &[Match]) -> HashMap<String, PlayerForm> {
        compute_forms(players, matches, &self.config.form, self.now())
    }

    pub fn compute_synergy(&self, matches: &[Match]) -> HashMap<String, f64> {
        compute_synergy(matches, &self.config, self.now())
    }

    /// Partition a pool into teams. Fails on an odd-sized pool.
    pub fn build_pairings(
        &self,
        pool: &[PlayerForm],
        synergy: &HashMap<String, f64>,
        recent_pairs: &HashSet<String>,
        seed: Option<u64>,
    ) -> Result<Vec<GeneratedPair>, EngineError> {
        let mut rng = self.rng(seed);
        build_pairings(pool, synergy, recent_pairs, &self.config, &mut rng)
    }

    /// Resolve a pool of ids against the roster and partition it into teams
    ///
    /// Unknown and repeated ids are dropped, and the parity check runs
    /// before any form or synergy work.
    pub fn pair_pool(
        &self,
        pool_ids: &[String],
        players: &[Player],
        matches: &[Match],
        recent_pairs: &HashSet<String>,
        seed: Option<u64>,
    ) -> Result<Vec<GeneratedPair>, EngineError> {
        let roster: HashSet<&str> = players.iter().map(|p| p.id.as_str()).collect();
        let resolved: Vec<String> = dedup(pool_ids)
            .into_iter()
            .filter(|id| roster.contains(id))
            .map(str::to_string)
            .collect();
        if resolved.len() != pool_ids.len() {
            tracing::warn!("{} pool id(s) did not resolve to a unique player", pool_ids.len() - resolved.len());
        }
        if resolved.len() % 2 != 0 {
            return Err(EngineError::OddPool { size: resolved.len() });
        }

        let forms = self.compute_forms(players, matches);
        let synergy = self.compute_synergy(matches);
        let pool: Vec<PlayerForm> = resolve_pool(&resolved, &forms, |_| true).into_iter().cloned().collect();
        self.build_pairings(&pool, &synergy, recent_pairs, seed)
    }

    /// Turn externally fixed teams into scored pairs, skipping any that do not resolve
    pub fn fixed_teams(&self, teams: &[Vec<String>], players: &[Player], matches: &[Match]) -> Vec<GeneratedPair> {
        let forms = self.compute_forms(players, matches);
        let synergy = self.compute_synergy(matches);
        let no_recent = HashSet::new();
        let mut used: HashSet<String> = HashSet::new();

        teams
            .iter()
            .filter(|ids| ids.len() == 2)
            .filter_map(|ids| self.team_from_ids(ids, &forms, &synergy, &no_recent))
            .filter(|team| {
                let ids = team.ids();
                if ids.iter().any(|id| used.contains(*id)) {
                    return false;
                }
                used.extend(ids.iter().map(|id| id.to_string()));
                true
            })
            .collect()
    }

    /// Pair up teams against each other and annotate the handicaps
    pub fn build_matchups(
        &self,
        teams: Vec<GeneratedPair>,
        recent_matchups: &HashSet<String>,
        matches: &[Match],
    ) -> Vec<GeneratedMatch> {
        let synergy = self.compute_synergy(matches);
        let ctx = self.context(&synergy, matches);
        build_matchups(teams, recent_matchups, &ctx)
    }

    /// Best opponents for a fixed team, drawn from every pair in the pool
    ///
    /// Candidates are ranked handicap-free first, then by handicap points,
    /// then by match cost.
    pub fn find_opponents_for_team(
        &self,
        team_ids: &[String],
        pool_ids: &[String],
        players: &[Player],
        matches: &[Match],
    ) -> Vec<GeneratedMatch> {
        let forms = self.compute_forms(players, matches);
        let synergy = self.compute_synergy(matches);
        let no_recent = HashSet::new();

        let Some(fixed) = self.team_from_ids(team_ids, &forms, &synergy, &no_recent) else {
            tracing::debug!("Fixed team {:?} does not resolve to two players", team_ids);
            return Vec::new();
        };
        if fixed.players.len() != 2 {
            return Vec::new();
        }

        let candidates = resolve_pool(pool_ids, &forms, |id| !fixed.contains(id));
        let ctx = self.context(&synergy, matches);
        let weight = self.config.matchup.candidate_pair_weight;

        let mut results = Vec::new();
        for (i, a) in candidates.iter().enumerate() {
            for b in &candidates[i + 1..] {
                let cost = pair_cost(a, b, &synergy, &no_recent, &self.config.cost);
                let opponent = GeneratedPair::new((*a).clone(), (*b).clone(), cost);
                let match_cost = matchup_cost(&fixed, &opponent, &self.config.matchup) + weight * opponent.cost;
                results.push(self.scored(fixed.clone(), opponent, match_cost, &ctx));
            }
        }

        self.rank(results)
    }

    /// Best partner for `self_id` given one or two fixed opponents
    ///
    /// With one opponent, every (my partner, their partner) combination from
    /// the pool is searched. With two, only my partner varies.
    pub fn find_best_partners(
        &self,
        self_id: &str,
        opponent_ids: &[String],
        pool_ids: &[String],
        players: &[Player],
        matches: &[Match],
    ) -> Vec<GeneratedMatch> {
        let forms = self.compute_forms(players, matches);
        let synergy = self.compute_synergy(matches);
        let no_recent = HashSet::new();
        let ctx = self.context(&synergy, matches);
        let weight = self.config.matchup.candidate_pair_weight;
        let cost_of = |a: &PlayerForm, b: &PlayerForm| pair_cost(a, b, &synergy, &no_recent, &self.config.cost);

        let Some(me) = forms.get(self_id) else {
            tracing::debug!("Player {} not found", self_id);
            return Vec::new();
        };
        let opponents: Vec<&PlayerForm> = dedup(opponent_ids)
            .into_iter()
            .filter(|id| *id != self_id)
            .filter_map(|id| forms.get(id))
            .collect();
        if opponents.is_empty() || opponents.len() > 2 || opponents.len() != opponent_ids.len() {
            return Vec::new();
        }

        let candidates = resolve_pool(pool_ids, &forms, |id| {
            id != self_id && opponents.iter().all(|o| o.id != id)
        });

        let mut results = Vec::new();
        match *opponents.as_slice() {
            [opponent] => {
                for &partner in &candidates {
                    let mine = GeneratedPair::new(me.clone(), partner.clone(), cost_of(me, partner));
                    for &theirs in candidates.iter().filter(|c| c.id != partner.id) {
                        let other = GeneratedPair::new(opponent.clone(), theirs.clone(), cost_of(opponent, theirs));
                        let match_cost = matchup_cost(&mine, &other, &self.config.matchup)
                            + weight * (mine.cost + other.cost);
                        results.push(self.scored(mine.clone(), other, match_cost, &ctx));
                    }
                }
            }
            [first, second] => {
                let fixed = GeneratedPair::new(first.clone(), second.clone(), cost_of(first, second));
                for &partner in &candidates {
                    let mine = GeneratedPair::new(me.clone(), partner.clone(), cost_of(me, partner));
                    let match_cost = matchup_cost(&mine, &fixed, &self.config.matchup) + weight * mine.cost;
                    results.push(self.scored(mine, fixed.clone(), match_cost, &ctx));
                }
            }
            _ => {}
        }

        self.rank(results)
    }

    /// Handicap and quality for two fully specified teams of one or two players
    ///
    /// Quality here is linear in the strength gap, unlike the cost-derived
    /// quality of the search queries.
    pub fn predict_outcome(
        &self,
        team1_ids: &[String],
        team2_ids: &[String],
        players: &[Player],
        matches: &[Match],
    ) -> Option<GeneratedMatch> {
        if team1_ids.iter().any(|id| team2_ids.contains(id)) {
            return None;
        }

        let forms = self.compute_forms(players, matches);
        let synergy = self.compute_synergy(matches);
        let no_recent = HashSet::new();

        let team1 = self.team_from_ids(team1_ids, &forms, &synergy, &no_recent)?;
        let team2 = self.team_from_ids(team2_ids, &forms, &synergy, &no_recent)?;

        let match_cost = matchup_cost(&team1, &team2, &self.config.matchup);
        let quality = gap_quality(team1.strength - team2.strength, &self.config.matchup);
        let ctx = self.context(&synergy, matches);

        Some(assemble_match(team1, team2, match_cost, quality, &ctx))
    }

    pub fn label_historical_handicaps(
        &self,
        matches: &[Match],
        players: &[Player],
    ) -> HashMap<String, HistoricalLabel> {
        label_historical_handicaps(matches, players, &self.config, self.now())
    }

    fn scored(
        &self,
        team1: GeneratedPair,
        team2: GeneratedPair,
        match_cost: f64,
        ctx: &MatchContext<'_>,
    ) -> GeneratedMatch {
        let quality = cost_quality(match_cost, &self.config.matchup);
        assemble_match(team1, team2, match_cost, quality, ctx)
    }

    fn context<'a>(&'a self, synergy: &'a HashMap<String, f64>, matches: &'a [Match]) -> MatchContext<'a> {
        MatchContext {
            synergy,
            matches,
            config: &self.config,
            now: self.now(),
        }
    }

    /// One- or two-player team from ids; `None` if any id is unknown or repeated
    fn team_from_ids(
        &self,
        ids: &[String],
        forms: &HashMap<String, PlayerForm>,
        synergy: &HashMap<String, f64>,
        recent_pairs: &HashSet<String>,
    ) -> Option<GeneratedPair> {
        match ids {
            [solo] => forms.get(solo).cloned().map(GeneratedPair::solo),
            [a, b] if a != b => {
                let (a, b) = (forms.get(a)?, forms.get(b)?);
                let cost = pair_cost(a, b, synergy, recent_pairs, &self.config.cost);
                Some(GeneratedPair::new(a.clone(), b.clone(), cost))
            }
            _ => None,
        }
    }

    fn rank(&self, mut results: Vec<GeneratedMatch>) -> Vec<GeneratedMatch> {
        results.sort_by(|a, b| {
            a.handicap
                .is_some()
                .cmp(&b.handicap.is_some())
                .then_with(|| a.handicap_points().cmp(&b.handicap_points()))
                .then_with(|| a.match_cost.partial_cmp(&b.match_cost).unwrap_or(Ordering::Equal))
        });
        results.truncate(self.config.matchup.result_limit);
        results
    }
}

impl Default for Matchmaker {
    fn default() -> Self {
        Self::with_default_config()
    }
}

/// Resolve pool ids to forms, dropping unknown ids and duplicates
pub fn resolve_pool<'a, F>(ids: &[String], forms: &'a HashMap<String, PlayerForm>, keep: F) -> Vec<&'a PlayerForm>
where
    F: Fn(&str) -> bool,
{
    dedup(ids)
        .into_iter()
        .filter(|id| keep(*id))
        .filter_map(|id| forms.get(id))
        .collect()
}

fn dedup(ids: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(String::as_str)
        .filter(|id| seen.insert(*id))
        .collect()
}
