// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    matchup_key, pair_key, parse_match_date, GeneratedMatch, GeneratedPair, Handicap, HistoricalLabel, Match,
    MatchAnalysis, Player, PlayerForm, Side,
};
pub use requests::{
    BestPartnersRequest, FormsRequest, HistoryRequest, MatchupsRequest, OpponentsRequest, PairingsRequest,
    PredictRequest, SynergyRequest,
};
pub use responses::{
    ErrorResponse, FormsResponse, HealthResponse, LabelsResponse, MatchesResponse, PairingsResponse, PredictResponse,
    SynergyResponse,
};
