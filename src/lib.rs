//! Doubles Matchmaker - rating, pairing and handicap engine for a recreational
//! doubles league.
//!
//! The engine derives a live rating per player from match history, builds
//! balanced teams and matchups, and explains the point handicap it assigns to
//! uneven matchups. All engine calls are pure and synchronous.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;

// Re-export commonly used types
pub use config::{EngineConfig, Settings};
pub use core::{EngineError, Matchmaker};
pub use models::{GeneratedMatch, GeneratedPair, Handicap, HistoricalLabel, Match, Player, PlayerForm, Side};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let matchmaker = Matchmaker::default();
        assert_eq!(matchmaker.config().version, "v2");
        assert!(matchmaker.compute_forms(&[], &[]).is_empty());
    }
}
