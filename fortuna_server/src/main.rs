use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::TypedHeader;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use fortuna_core::{
    FlightView, GameConfig, RoundDetail, RoundError, RoundHandle, RoundOutcome, Session, Tick,
};
use fortuna_shared::{
    AdminSetBalanceRequest, AdminSetWinBiasRequest, ApiError, BalanceResponse, CashOutResponse,
    ConfigResponse, CrashStartRequest, CrashStartResponse, ErrorBody, FlightResponse, GameKind,
    HistoryEntry, SetBetRequest, SpinRequest, SpinResponse,
};

/// The session plus the ticker of its in-flight crash round, guarded together so that ticks
/// and cash-outs are applied one at a time in arrival order.
struct Table {
    session: Session,
    ticker: Option<AbortHandle>,
}

impl Table {
    fn stop_ticking(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

struct AppState {
    table: Mutex<Table>,
    api_key: String,
}

#[derive(Debug)]
struct AppError(ApiError);

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl From<RoundError> for AppError {
    fn from(e: RoundError) -> Self {
        Self(match e {
            RoundError::InsufficientFunds { balance, bet } => {
                ApiError::InsufficientFunds { balance, bet }
            }
            RoundError::InvalidBet { .. } => ApiError::Invalid(e.to_string()),
            RoundError::TooLate => ApiError::TooLate,
            RoundError::RoundInProgress => ApiError::Busy,
            RoundError::UnknownRound(id) => ApiError::UnknownRound(id),
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            ApiError::TooLate | ApiError::Busy => StatusCode::CONFLICT,
            ApiError::UnknownRound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        };
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResponse<T> = Result<Json<T>, AppError>;

fn history_entry(outcome: &RoundOutcome) -> HistoryEntry {
    let (game, line) = match &outcome.detail {
        RoundDetail::Slots { line, .. } => (GameKind::Slots, line.map(|l| l.name().to_string())),
        RoundDetail::Crash { .. } => (GameKind::Crash, None),
    };
    HistoryEntry {
        game,
        won: outcome.won,
        bet: outcome.bet,
        payout: outcome.payout,
        profit: outcome.profit(),
        multiplier: outcome.multiplier(),
        line,
    }
}

fn flight_response(view: FlightView) -> FlightResponse {
    match view {
        FlightView::Flying { multiplier } => FlightResponse::Flying { multiplier },
        FlightView::CashedOut { multiplier } => FlightResponse::CashedOut { multiplier },
        FlightView::Crashed { crash_point } => FlightResponse::Crashed { crash_point },
    }
}

/// Drives one flight until it crashes. Cash-out and reset stop it through its abort handle.
fn spawn_ticker(state: Arc<AppState>, handle: RoundHandle, period: Duration) -> AbortHandle {
    let took_off = Instant::now();
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticks.tick().await;
            let mut table = state.table.lock().await;
            match table.session.advance(handle, took_off.elapsed()) {
                Ok(Tick::Flying { .. }) => {}
                Ok(Tick::Crashed { crash_point }) => {
                    info!(%handle, crash_point, "flight crashed");
                    table.ticker = None;
                    break;
                }
                Ok(Tick::Finished) => break,
                Err(e) => {
                    debug!(%handle, error = %e, "ticker stopped");
                    break;
                }
            }
        }
    })
    .abort_handle()
}

fn check_admin(
    state: &AppState,
    bearer: &axum_extra::headers::authorization::Bearer,
) -> Result<(), AppError> {
    if bearer.token() != state.api_key {
        warn!("rejected admin request");
        return Err(ApiError::Unauthorized.into());
    }
    Ok(())
}

async fn route_balance(State(state): State<Arc<AppState>>) -> Json<BalanceResponse> {
    let table = state.table.lock().await;
    Json(BalanceResponse {
        balance: table.session.balance(),
        bet: table.session.bet(),
        in_flight: table.session.phase() == fortuna_core::Phase::InFlight,
    })
}

async fn route_set_bet(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetBetRequest>,
) -> ApiResponse<BalanceResponse> {
    let mut table = state.table.lock().await;
    table.session.set_bet(req.bet)?;
    Ok(Json(BalanceResponse {
        balance: table.session.balance(),
        bet: table.session.bet(),
        in_flight: table.session.phase() == fortuna_core::Phase::InFlight,
    }))
}

async fn route_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    let table = state.table.lock().await;
    let config = table.session.config();
    let bias = table.session.win_bias();
    Json(ConfigResponse {
        win_chance_percent: bias.percent(),
        difficulty: format!("{:?}", bias.difficulty()).to_lowercase(),
        slot_bet_presets: config.slot_bet_presets.clone(),
        crash_bet_presets: config.crash_bet_presets.clone(),
        tick_interval_ms: config.tick_interval_ms,
    })
}

async fn route_spin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SpinRequest>,
) -> ApiResponse<SpinResponse> {
    let mut table = state.table.lock().await;
    let bet = req.bet.unwrap_or_else(|| table.session.bet());
    let outcome = table.session.start_slot_round(bet)?;
    let RoundDetail::Slots {
        grid,
        line,
        multiplier,
        ..
    } = outcome.detail
    else {
        return Err(ApiError::Invalid("slot round produced a crash outcome".into()).into());
    };
    Ok(Json(SpinResponse {
        reels: grid.to_indices(),
        won: outcome.won,
        bet: outcome.bet,
        payout: outcome.payout,
        line: line.map(|l| l.name().to_string()),
        multiplier,
        balance: table.session.balance(),
    }))
}

async fn route_crash_start(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CrashStartRequest>,
) -> ApiResponse<CrashStartResponse> {
    let mut table = state.table.lock().await;
    let bet = req.bet.unwrap_or_else(|| table.session.bet());
    let handle = table.session.start_crash_round(bet)?;
    let period = table.session.config().tick_interval();
    table.stop_ticking();
    table.ticker = Some(spawn_ticker(state.clone(), handle, period));
    Ok(Json(CrashStartResponse {
        round_id: handle.0,
        bet,
        balance: table.session.balance(),
        tick_interval_ms: table.session.config().tick_interval_ms,
    }))
}

async fn route_crash_poll(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<u64>,
) -> ApiResponse<FlightResponse> {
    let table = state.table.lock().await;
    let view = table.session.poll_multiplier(RoundHandle(round_id))?;
    Ok(Json(flight_response(view)))
}

async fn route_crash_cash_out(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<u64>,
) -> ApiResponse<CashOutResponse> {
    let mut table = state.table.lock().await;
    let outcome = table.session.cash_out(RoundHandle(round_id))?;
    table.stop_ticking();
    Ok(Json(CashOutResponse {
        round_id,
        multiplier: outcome.multiplier(),
        payout: outcome.payout,
        balance: table.session.balance(),
    }))
}

async fn route_history(State(state): State<Arc<AppState>>) -> Json<Vec<HistoryEntry>> {
    let table = state.table.lock().await;
    Json(table.session.history().map(history_entry).collect())
}

async fn route_reset(State(state): State<Arc<AppState>>) -> Json<BalanceResponse> {
    let mut table = state.table.lock().await;
    table.stop_ticking();
    table.session.reset();
    Json(BalanceResponse {
        balance: table.session.balance(),
        bet: table.session.bet(),
        in_flight: false,
    })
}

async fn route_admin_set_balance(
    State(state): State<Arc<AppState>>,
    TypedHeader(axum_extra::headers::Authorization(bearer)): TypedHeader<
        axum_extra::headers::Authorization<axum_extra::headers::authorization::Bearer>,
    >,
    Json(req): Json<AdminSetBalanceRequest>,
) -> Result<StatusCode, AppError> {
    check_admin(&state, &bearer)?;
    state.table.lock().await.session.set_balance(req.balance);
    Ok(StatusCode::NO_CONTENT)
}

async fn route_admin_set_win_bias(
    State(state): State<Arc<AppState>>,
    TypedHeader(axum_extra::headers::Authorization(bearer)): TypedHeader<
        axum_extra::headers::Authorization<axum_extra::headers::authorization::Bearer>,
    >,
    Json(req): Json<AdminSetWinBiasRequest>,
) -> Result<StatusCode, AppError> {
    check_admin(&state, &bearer)?;
    state.table.lock().await.session.set_win_bias(req.percent);
    Ok(StatusCode::NO_CONTENT)
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/balance", get(route_balance))
        .route("/bet", post(route_set_bet))
        .route("/config", get(route_config))
        .route("/slots/spin", post(route_spin))
        .route("/crash/start", post(route_crash_start))
        .route("/crash/:id", get(route_crash_poll))
        .route("/crash/:id/cash-out", post(route_crash_cash_out))
        .route("/history", get(route_history))
        .route("/session/reset", post(route_reset))
        .route("/admin/balance", post(route_admin_set_balance))
        .route("/admin/win-bias", post(route_admin_set_win_bias))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

fn new_state(config: GameConfig, api_key: String) -> Arc<AppState> {
    Arc::new(AppState {
        table: Mutex::new(Table {
            session: Session::new(config),
            ticker: None,
        }),
        api_key,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var("FORTUNA_CONFIG") {
        Ok(path) => GameConfig::load(&path)?,
        Err(_) => GameConfig::default(),
    };
    info!(
        balance = config.initial_balance,
        win_chance = config.win_chance_percent,
        "session configured"
    );

    let state = new_state(
        config,
        std::env::var("API_KEY").unwrap_or_else(|_| "dev-key".into()),
    );

    let addr = std::env::var("BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
