// Engine exports
pub mod cost;
pub mod error;
pub mod form;
pub mod handicap;
pub mod history;
pub mod matchmaker;
pub mod matchup;
pub mod pairing;
pub mod synergy;

pub use cost::pair_cost;
pub use error::EngineError;
pub use form::{compute_forms, normalize_base_rating};
pub use handicap::calculate_handicap;
pub use history::label_historical_handicaps;
pub use matchmaker::Matchmaker;
pub use matchup::{build_matchups, matchup_cost, MatchContext};
pub use pairing::build_pairings;
pub use synergy::compute_synergy;
