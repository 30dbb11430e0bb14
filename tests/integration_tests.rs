// Integration tests for the doubles matchmaker

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};
use doubles_matchmaker::core::{EngineError, Matchmaker};
use doubles_matchmaker::models::{HistoricalLabel, Match, Player, Side};

fn create_player(id: &str, rating: f64) -> Player {
    Player {
        id: id.to_string(),
        name: format!("Player {}", id),
        rating: Some(rating),
        is_active: true,
    }
}

fn create_match(id: &str, date: &str, team1: [&str; 2], team2: [&str; 2], s1: u32, s2: u32) -> Match {
    Match {
        id: id.to_string(),
        date: Some(date.to_string()),
        team1: team1.iter().map(|s| s.to_string()).collect(),
        team2: team2.iter().map(|s| s.to_string()).collect(),
        score1: s1,
        score2: s2,
        winner: None,
        match_type: None,
        bonus_points: None,
    }
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
}

fn matchmaker() -> Matchmaker {
    Matchmaker::with_default_config().as_of(now())
}

fn league() -> Vec<Player> {
    vec![
        create_player("ana", 4.2),
        create_player("ben", 3.9),
        create_player("cai", 3.5),
        create_player("dee", 3.1),
        create_player("eli", 2.8),
        create_player("fay", 2.5),
        create_player("gus", 2.3),
        create_player("hal", 2.0),
    ]
}

fn league_history() -> Vec<Match> {
    vec![
        create_match("m1", "2025-03-01", ["ana", "hal"], ["ben", "gus"], 11, 7),
        create_match("m2", "2025-03-08", ["cai", "fay"], ["dee", "eli"], 9, 11),
        create_match("m3", "2025-03-15", ["ana", "gus"], ["cai", "eli"], 11, 4),
        create_match("m4", "2025-03-22", ["ben", "fay"], ["dee", "hal"], 11, 10),
        create_match("m5", "2025-04-05", ["ana", "fay"], ["ben", "eli"], 6, 11),
        create_match("m6", "2025-04-12", ["cai", "hal"], ["dee", "gus"], 1, 0),
        create_match("m7", "2025-05-03", ["ana", "eli"], ["ben", "hal"], 11, 3),
        create_match("m8", "2025-05-10", ["cai", "gus"], ["dee", "fay"], 8, 11),
    ]
}

#[test]
fn test_integration_pairings_partition_pool() {
    let mm = matchmaker();
    let players = league();
    let pool: Vec<String> = players.iter().map(|p| p.id.clone()).collect();

    let teams = mm
        .pair_pool(&pool, &players, &league_history(), &HashSet::new(), Some(42))
        .unwrap();

    assert_eq!(teams.len(), 4);
    let mut seen: Vec<&str> = teams.iter().flat_map(|t| t.ids()).collect();
    seen.sort_unstable();
    let mut expected: Vec<&str> = pool.iter().map(String::as_str).collect();
    expected.sort_unstable();
    assert_eq!(seen, expected);

    for team in &teams {
        assert_eq!(team.players.len(), 2);
        let (a, b) = (&team.players[0], &team.players[1]);
        assert!((team.strength - (a.effective_rating + b.effective_rating)).abs() < 1e-9);
        assert!((team.structure - (a.effective_rating - b.effective_rating).abs()).abs() < 1e-9);
    }
}

#[test]
fn test_integration_same_seed_same_pairings() {
    let mm = matchmaker();
    let players = league();
    let pool: Vec<String> = players.iter().map(|p| p.id.clone()).collect();
    let history = league_history();

    let first = mm.pair_pool(&pool, &players, &history, &HashSet::new(), Some(2024)).unwrap();
    let second = mm.pair_pool(&pool, &players, &history, &HashSet::new(), Some(2024)).unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_integration_odd_pool_rejected() {
    let mm = matchmaker();
    let players = league();
    let result = mm.pair_pool(&ids(&["ana", "ben", "cai"]), &players, &[], &HashSet::new(), Some(1));
    assert_eq!(result, Err(EngineError::OddPool { size: 3 }));
}

#[test]
fn test_integration_recent_pair_avoided() {
    let mm = matchmaker();
    let players = vec![
        create_player("a", 4.0),
        create_player("b", 2.6),
        create_player("c", 4.0),
        create_player("d", 2.6),
    ];
    let pool = ids(&["a", "b", "c", "d"]);

    let mut recent = HashSet::new();
    recent.insert(doubles_matchmaker::models::pair_key("a", "b"));
    recent.insert(doubles_matchmaker::models::pair_key("c", "d"));

    let teams = mm.pair_pool(&pool, &players, &[], &recent, Some(5)).unwrap();
    for team in &teams {
        let key = team.key().unwrap();
        assert!(!recent.contains(&key), "recent pair {} was repeated", key);
    }
}

#[test]
fn test_integration_forms_bounded_and_rounded() {
    let mm = matchmaker();
    let forms = mm.compute_forms(&league(), &league_history());

    assert_eq!(forms.len(), 8);
    for form in forms.values() {
        assert!(form.form.abs() <= 0.30 + 1e-12);
        let unrounded = form.base_rating + form.form;
        assert!((form.effective_rating - unrounded).abs() <= 0.005 + 1e-9);
        assert!((form.effective_rating * 100.0 - (form.effective_rating * 100.0).round()).abs() < 1e-6);
        assert!((0.0..=1.0).contains(&form.last10_win_rate));
    }
}

#[test]
fn test_integration_hot_streak_and_cold_streak() {
    let mm = matchmaker();
    let players = vec![
        create_player("w1", 3.0),
        create_player("w2", 3.0),
        create_player("l1", 3.0),
        create_player("l2", 3.0),
    ];
    let matches: Vec<Match> = (1..=10)
        .map(|day| {
            create_match(
                &format!("m{}", day),
                &format!("2025-04-{:02}", day),
                ["w1", "w2"],
                ["l1", "l2"],
                1,
                0,
            )
        })
        .collect();

    let forms = mm.compute_forms(&players, &matches);
    assert!(forms["w1"].form > 0.10 && forms["w1"].form < 0.13);
    assert!(forms["l1"].form < -0.10 && forms["l1"].form > -0.13);
    assert_eq!(forms["w1"].last10_win_rate, 1.0);
    assert_eq!(forms["l1"].non_binary_losses, 0);
}

#[test]
fn test_integration_legacy_scale_ratings_fall_back() {
    let mm = matchmaker();
    let players = vec![
        create_player("legacy", 1450.0),
        create_player("zero", 0.0),
        Player {
            id: "missing".to_string(),
            name: String::new(),
            rating: None,
            is_active: true,
        },
    ];
    let forms = mm.compute_forms(&players, &[]);
    for form in forms.values() {
        assert_eq!(form.base_rating, 3.0);
        assert_eq!(form.effective_rating, 3.0);
    }
}

#[test]
fn test_integration_equal_teams_get_no_handicap() {
    let mm = matchmaker();
    let players = vec![
        create_player("a", 4.0),
        create_player("b", 2.0),
        create_player("c", 3.0),
        create_player("d", 3.0),
    ];

    let prediction = mm
        .predict_outcome(&ids(&["a", "b"]), &ids(&["c", "d"]), &players, &[])
        .unwrap();
    assert!(prediction.handicap.is_none());
    assert_eq!(prediction.analysis.quality, 100.0);
}

#[test]
fn test_integration_weaker_team_receives_points() {
    let mm = matchmaker();
    let players = vec![
        create_player("a", 3.0),
        create_player("b", 3.0),
        create_player("c", 4.0),
        create_player("d", 3.5),
    ];

    let prediction = mm
        .predict_outcome(&ids(&["a", "b"]), &ids(&["c", "d"]), &players, &[])
        .unwrap();
    let handicap = prediction.handicap.unwrap();
    assert_eq!(handicap.weaker_team, Side::Team1);
    // Gap 1.5 hits the top tier
    assert_eq!(handicap.points, 4);
    assert!(!handicap.explanation.is_empty());
}

#[test]
fn test_integration_head_to_head_cancels_small_handicap() {
    let mm = matchmaker();
    let players = vec![
        create_player("a", 4.0),
        create_player("b", 3.0),
        create_player("c", 3.5),
        create_player("d", 3.0),
    ];

    let fresh = mm
        .predict_outcome(&ids(&["a", "b"]), &ids(&["c", "d"]), &players, &[])
        .unwrap();
    assert_eq!(fresh.handicap.as_ref().map(|h| h.points), Some(1));

    // The stronger team split two recent meetings
    let history = vec![
        create_match("h1", "2025-05-20", ["a", "b"], ["c", "d"], 1, 0),
        create_match("h2", "2025-05-25", ["c", "d"], ["a", "b"], 1, 0),
    ];
    let calibrated = mm
        .predict_outcome(&ids(&["a", "b"]), &ids(&["c", "d"]), &players, &history)
        .unwrap();
    assert!(calibrated.handicap.is_none());
}

#[test]
fn test_integration_handicap_never_exceeds_cap() {
    let mm = matchmaker();
    let players = league();
    let pool = ids(&["cai", "dee", "eli", "fay", "gus", "hal"]);

    let results = mm.find_opponents_for_team(&ids(&["ana", "ben"]), &pool, &players, &league_history());
    assert!(!results.is_empty());
    assert!(results.len() <= 10);
    for m in &results {
        assert!(m.handicap_points() <= 4);
        if let Some(h) = &m.handicap {
            assert!(h.points >= 1);
        }
    }
}

#[test]
fn test_integration_search_results_are_ranked() {
    let mm = matchmaker();
    let players = league();
    let pool: Vec<String> = players.iter().map(|p| p.id.clone()).collect();

    let results = mm.find_best_partners("dee", &ids(&["ana"]), &pool, &players, &league_history());
    assert!(!results.is_empty());

    for pair in results.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let key_a = (a.handicap.is_some(), a.handicap_points());
        let key_b = (b.handicap.is_some(), b.handicap_points());
        assert!(key_a <= key_b);
        if key_a == key_b {
            assert!(a.match_cost <= b.match_cost);
        }
    }
    for m in &results {
        assert_eq!(m.team1.players[0].id, "dee");
        assert_eq!(m.team2.players[0].id, "ana");
        assert!((m.analysis.quality - 100.0 / (1.0 + m.match_cost)).abs() < 1e-9);
    }
}

#[test]
fn test_integration_matchups_from_pool() {
    let mm = matchmaker();
    let players = league();
    let pool: Vec<String> = players.iter().map(|p| p.id.clone()).collect();
    let history = league_history();

    let teams = mm.pair_pool(&pool, &players, &history, &HashSet::new(), Some(9)).unwrap();
    let matches = mm.build_matchups(teams, &HashSet::new(), &history);

    assert_eq!(matches.len(), 2);
    let mut everyone: Vec<&str> = matches
        .iter()
        .flat_map(|m| m.team1.ids().into_iter().chain(m.team2.ids()))
        .collect();
    everyone.sort_unstable();
    everyone.dedup();
    assert_eq!(everyone.len(), 8);
    assert!(matches[0].team1.strength >= matches[1].team1.strength);
}

#[test]
fn test_integration_history_has_no_lookahead() {
    let mm = matchmaker();
    let players = league();
    let history = league_history();

    let full = mm.label_historical_handicaps(&history, &players);
    let truncated = mm.label_historical_handicaps(&history[..4], &players);

    assert_eq!(full.len(), history.len());
    for (id, label) in &truncated {
        assert_eq!(full.get(id), Some(label), "label for {} changed", id);
    }
}

#[test]
fn test_integration_history_first_match_uses_base_ratings() {
    let mm = matchmaker();
    let players = league();
    let history = league_history();

    let labels: HashMap<String, HistoricalLabel> = mm.label_historical_handicaps(&history, &players);
    // ana+hal 3.1 vs ben+gus 3.1
    assert_eq!(labels["m1"], HistoricalLabel::Balanced);
}

#[test]
fn test_integration_match_json_is_lenient() {
    let json = r#"[
        {"id": "m1", "team1": ["a", "b"], "team2": ["c", "d"], "score1": "11", "score2": 9, "date": "2025-05-01"},
        {"id": "m2", "team1": ["a", "c"], "team2": ["b", "d"], "score1": "n/a", "score2": null},
        {"id": "m3", "team1": ["a", "d"], "team2": ["b", "c"], "score1": 7, "score2": 7, "winner": 2, "type": "league", "bonusPoints": 1}
    ]"#;
    let matches: Vec<Match> = serde_json::from_str(json).unwrap();

    assert_eq!(matches[0].score1, 11);
    assert_eq!(matches[1].score1, 0);
    assert_eq!(matches[1].score2, 0);
    assert_eq!(matches[1].played_at(now()), now());
    assert_eq!(matches[2].winning_side(), Side::Team2);
    assert_eq!(matches[2].match_type.as_deref(), Some("league"));
}
