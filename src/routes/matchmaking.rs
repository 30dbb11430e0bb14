use std::collections::HashSet;

use actix_web::{web, HttpResponse, Responder};
use validator::{Validate, ValidationErrors};

use crate::core::{EngineError, Matchmaker};
use crate::models::{
    matchup_key, pair_key, BestPartnersRequest, ErrorResponse, FormsRequest, FormsResponse, HealthResponse,
    HistoryRequest, LabelsResponse, MatchesResponse, MatchupsRequest, OpponentsRequest, PairingsRequest,
    PairingsResponse, PlayerForm, PredictRequest, PredictResponse, SynergyRequest, SynergyResponse,
};

/// Application state shared across all handlers
///
/// The engine is stateless: every request carries its own roster and history.
#[derive(Clone)]
pub struct AppState {
    pub matchmaker: Matchmaker,
}

/// Configure all matchmaking routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/forms", web::post().to(forms))
        .route("/synergy", web::post().to(synergy))
        .route("/pairings", web::post().to(pairings))
        .route("/matchups", web::post().to(matchups))
        .route("/opponents", web::post().to(opponents))
        .route("/partners", web::post().to(partners))
        .route("/predict", web::post().to(predict))
        .route("/history/labels", web::post().to(history_labels));
}

fn validation_failed(errors: ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

fn engine_failed(err: EngineError) -> HttpResponse {
    let error = match err {
        EngineError::OddPool { .. } => "Odd pool",
        EngineError::InvalidConfig(_) => "Invalid configuration",
    };
    HttpResponse::BadRequest().json(ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code: 400,
    })
}

/// Pair keys for every well-formed two-id list
fn pair_keys(pairs: &[Vec<String>]) -> HashSet<String> {
    pairs
        .iter()
        .filter_map(|p| match p.as_slice() {
            [a, b] => Some(pair_key(a, b)),
            _ => None,
        })
        .collect()
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine_config: state.matchmaker.config().version.clone(),
        timestamp: chrono::Utc::now(),
    })
}

/// Live form of every player
///
/// POST /api/v1/forms
async fn forms(state: web::Data<AppState>, req: web::Json<FormsRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let mut forms: Vec<PlayerForm> = state
        .matchmaker
        .compute_forms(&req.players, &req.matches)
        .into_values()
        .collect();
    forms.sort_by(|a, b| {
        b.effective_rating
            .partial_cmp(&a.effective_rating)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    tracing::debug!("Computed forms for {} players", forms.len());
    HttpResponse::Ok().json(FormsResponse { forms })
}

/// Pairwise synergy keyed by pair key
///
/// POST /api/v1/synergy
async fn synergy(state: web::Data<AppState>, req: web::Json<SynergyRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let synergy = state.matchmaker.compute_synergy(&req.matches);
    HttpResponse::Ok().json(SynergyResponse { synergy })
}

/// Split a pool into teams
///
/// POST /api/v1/pairings
///
/// Request body:
/// ```json
/// {
///   "players": [{"id": "a", "rating": 3.5}],
///   "matches": [],
///   "poolIds": ["a", "b"],
///   "recentPairs": [["a", "b"]],
///   "seed": 42
/// }
/// ```
async fn pairings(state: web::Data<AppState>, req: web::Json<PairingsRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let recent = pair_keys(&req.recent_pairs);
    match state
        .matchmaker
        .pair_pool(&req.pool_ids, &req.players, &req.matches, &recent, req.seed)
    {
        Ok(teams) => {
            let total_cost: f64 = teams.iter().map(|t| t.cost).sum();
            tracing::info!("Paired {} teams (total cost {:.3})", teams.len(), total_cost);
            HttpResponse::Ok().json(PairingsResponse { teams, total_cost })
        }
        Err(e) => {
            tracing::info!("Pairing rejected: {}", e);
            engine_failed(e)
        }
    }
}

/// Build a round of matchups from a pool or from fixed teams
///
/// POST /api/v1/matchups
async fn matchups(state: web::Data<AppState>, req: web::Json<MatchupsRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let mm = &state.matchmaker;
    let teams = if req.teams.is_empty() {
        let recent = pair_keys(&req.recent_pairs);
        match mm.pair_pool(&req.pool_ids, &req.players, &req.matches, &recent, req.seed) {
            Ok(teams) => teams,
            Err(e) => {
                tracing::info!("Matchup pairing rejected: {}", e);
                return engine_failed(e);
            }
        }
    } else {
        mm.fixed_teams(&req.teams, &req.players, &req.matches)
    };

    let recent_matchups: HashSet<String> = req
        .recent_matchups
        .iter()
        .filter(|group| !group.is_empty())
        .map(|group| matchup_key(group.as_slice()))
        .collect();

    let matches = mm.build_matchups(teams, &recent_matchups, &req.matches);
    tracing::info!("Returning {} matchups", matches.len());

    HttpResponse::Ok().json(MatchesResponse {
        total_results: matches.len(),
        matches,
    })
}

/// Best opponents for a fixed team
///
/// POST /api/v1/opponents
async fn opponents(state: web::Data<AppState>, req: web::Json<OpponentsRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let matches = state
        .matchmaker
        .find_opponents_for_team(&req.team, &req.pool_ids, &req.players, &req.matches);
    tracing::debug!("Found {} opponent candidates for {:?}", matches.len(), req.team);

    HttpResponse::Ok().json(MatchesResponse {
        total_results: matches.len(),
        matches,
    })
}

/// Best partners against one or two fixed opponents
///
/// POST /api/v1/partners
async fn partners(state: web::Data<AppState>, req: web::Json<BestPartnersRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let matches = state.matchmaker.find_best_partners(
        &req.self_id,
        &req.opponent_ids,
        &req.pool_ids,
        &req.players,
        &req.matches,
    );
    tracing::debug!("Found {} partner candidates for {}", matches.len(), req.self_id);

    HttpResponse::Ok().json(MatchesResponse {
        total_results: matches.len(),
        matches,
    })
}

/// Handicap and quality for two given teams
///
/// POST /api/v1/predict
async fn predict(state: web::Data<AppState>, req: web::Json<PredictRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let prediction = state
        .matchmaker
        .predict_outcome(&req.team1, &req.team2, &req.players, &req.matches);
    HttpResponse::Ok().json(PredictResponse { prediction })
}

/// Label every past match without lookahead
///
/// POST /api/v1/history/labels
///
/// The replay is quadratic in the history length, so it runs on the
/// blocking pool.
async fn history_labels(state: web::Data<AppState>, req: web::Json<HistoryRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let matchmaker = state.matchmaker.clone();
    let HistoryRequest { players, matches } = req.into_inner();

    match web::block(move || matchmaker.label_historical_handicaps(&matches, &players)).await {
        Ok(labels) => {
            tracing::info!("Labelled {} historical matches", labels.len());
            HttpResponse::Ok().json(LabelsResponse { labels })
        }
        Err(e) => {
            tracing::error!("History replay failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "History replay failed".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}
