//! Round orchestration for a single player.
//!
//! Slots: `Idle -> Committed -> Resolved -> Idle`, all inside one call.
//! Crash: `Idle -> InFlight -> {CashedOut | Crashed} -> Idle`, driven by `advance` ticks from
//! the host and `cash_out` requests, applied in the order they arrive.

use std::collections::VecDeque;
use std::time::Duration;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{GameConfig, WinBias};
use crate::crash::{CrashFlight, FlightState, Tick};
use crate::error::RoundError;
use crate::evaluator::{evaluate_crash, evaluate_slots, RoundOutcome};
use crate::generator::{generate_crash_round, generate_slot_round};
use crate::ledger::Ledger;
use crate::rng::EntropyRng;

/// Identifies one crash flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoundHandle(pub u64);

impl std::fmt::Display for RoundHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    InFlight,
}

/// What a poller sees of a flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlightView {
    Flying { multiplier: f64 },
    CashedOut { multiplier: f64 },
    Crashed { crash_point: f64 },
}

/// Bet taken from the ledger, outcome not yet applied.
#[derive(Debug)]
#[must_use]
struct Committed {
    bet: u64,
}

pub struct Session<R = EntropyRng> {
    config: GameConfig,
    ledger: Ledger,
    bias: WinBias,
    rng: R,
    flight: Option<(RoundHandle, CrashFlight)>,
    next_round: u64,
    last_outcome: Option<RoundOutcome>,
    history: VecDeque<RoundOutcome>,
}

impl Session<EntropyRng> {
    pub fn new(config: GameConfig) -> Self {
        Self::with_rng(config, EntropyRng)
    }
}

impl Default for Session<EntropyRng> {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

impl<R: RngCore> Session<R> {
    pub fn with_rng(config: GameConfig, rng: R) -> Self {
        Self {
            ledger: Ledger::new(config.initial_balance, config.default_bet),
            bias: WinBias::from(config.win_chance_percent),
            rng,
            flight: None,
            next_round: 1,
            last_outcome: None,
            history: VecDeque::with_capacity(config.history_len),
            config,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn balance(&self) -> u64 {
        self.ledger.balance()
    }

    pub fn bet(&self) -> u64 {
        self.ledger.bet()
    }

    pub fn set_bet(&mut self, bet: u64) -> Result<(), RoundError> {
        self.ledger.set_bet(bet)
    }

    pub fn win_bias(&self) -> WinBias {
        self.bias
    }

    pub fn phase(&self) -> Phase {
        if self.active_flight().is_some() {
            Phase::InFlight
        } else {
            Phase::Idle
        }
    }

    pub fn last_outcome(&self) -> Option<&RoundOutcome> {
        self.last_outcome.as_ref()
    }

    /// Resolved rounds, newest first.
    pub fn history(&self) -> impl Iterator<Item = &RoundOutcome> {
        self.history.iter()
    }

    /// Handle of the current or most recent flight.
    pub fn flight_handle(&self) -> Option<RoundHandle> {
        self.flight.as_ref().map(|(handle, _)| *handle)
    }

    pub fn set_balance(&mut self, balance: u64) {
        self.ledger.set_balance(balance);
    }

    /// Clamped to `[0, 100]`; takes effect from the next round.
    pub fn set_win_bias(&mut self, percent: i64) -> WinBias {
        self.bias = WinBias::new(percent);
        info!(percent = self.bias.percent(), difficulty = ?self.bias.difficulty(), "win bias set");
        self.bias
    }

    /// Back to configured balance and bet. An in-flight bet is forfeit.
    pub fn reset(&mut self) {
        if let Some(handle) = self.active_flight().map(|(handle, _)| handle) {
            warn!(%handle, "flight abandoned by reset");
        }
        self.ledger.reset();
        self.flight = None;
        self.last_outcome = None;
        self.history.clear();
        info!(balance = self.ledger.balance(), "session reset");
    }

    fn active_flight(&self) -> Option<(RoundHandle, &CrashFlight)> {
        self.flight
            .as_ref()
            .filter(|(_, flight)| flight.in_flight())
            .map(|(handle, flight)| (*handle, flight))
    }

    fn commit(&mut self, bet: u64) -> Result<Committed, RoundError> {
        if self.active_flight().is_some() {
            return Err(RoundError::RoundInProgress);
        }
        let balance = self.ledger.balance();
        if bet == 0 {
            return Err(RoundError::InvalidBet { bet, balance });
        }
        if !self.ledger.debit(bet) {
            debug!(bet, balance, "insufficient funds");
            return Err(RoundError::InsufficientFunds { balance, bet });
        }
        Ok(Committed { bet })
    }

    fn resolve(&mut self, committed: Committed, outcome: RoundOutcome) -> RoundOutcome {
        debug_assert_eq!(committed.bet, outcome.bet);
        if outcome.payout > 0 {
            self.ledger.credit(outcome.payout);
        }
        self.history.push_front(outcome.clone());
        self.history.truncate(self.config.history_len);
        self.last_outcome = Some(outcome.clone());
        outcome
    }

    pub fn start_slot_round(&mut self, bet: u64) -> Result<RoundOutcome, RoundError> {
        let committed = self.commit(bet)?;
        let result = generate_slot_round(&mut self.rng, self.bias, &self.config.paytable);
        let outcome = evaluate_slots(&result, committed.bet, &self.config.paytable);
        if result.predestined_win != outcome.won {
            debug!(predestined = result.predestined_win, won = outcome.won, "accidental line");
        }
        let outcome = self.resolve(committed, outcome);
        info!(
            bet,
            won = outcome.won,
            payout = outcome.payout,
            line = ?outcome.line(),
            balance = self.ledger.balance(),
            "slot round resolved"
        );
        Ok(outcome)
    }

    /// Spin with the ledger's selected bet.
    pub fn spin(&mut self) -> Result<RoundOutcome, RoundError> {
        self.start_slot_round(self.ledger.bet())
    }

    pub fn start_crash_round(&mut self, bet: u64) -> Result<RoundHandle, RoundError> {
        let committed = self.commit(bet)?;
        let plan = generate_crash_round(&mut self.rng, self.bias);
        let handle = RoundHandle(self.next_round);
        self.next_round += 1;
        self.flight = Some((handle, CrashFlight::from_plan(committed.bet, plan)));
        info!(%handle, bet, "take-off");
        Ok(handle)
    }

    fn flight_mut(&mut self, handle: RoundHandle) -> Result<&mut CrashFlight, RoundError> {
        match self.flight.as_mut() {
            Some((current, flight)) if *current == handle => Ok(flight),
            _ => Err(RoundError::UnknownRound(handle.0)),
        }
    }

    /// Timer tick: `elapsed` is the time since take-off.
    pub fn advance(&mut self, handle: RoundHandle, elapsed: Duration) -> Result<Tick, RoundError> {
        let flight = self.flight_mut(handle)?;
        let tick = flight.tick(elapsed);
        if let Tick::Crashed { crash_point } = tick {
            let bet = flight.bet();
            let outcome = evaluate_crash(bet, None, flight.plan());
            self.resolve(Committed { bet }, outcome);
            info!(%handle, crash_point, balance = self.ledger.balance(), "crashed");
        }
        Ok(tick)
    }

    pub fn poll_multiplier(&self, handle: RoundHandle) -> Result<FlightView, RoundError> {
        match self.flight.as_ref() {
            Some((current, flight)) if *current == handle => Ok(match flight.state() {
                FlightState::InFlight => FlightView::Flying {
                    multiplier: flight.multiplier(),
                },
                FlightState::CashedOut { multiplier } => FlightView::CashedOut { multiplier },
                FlightState::Crashed => FlightView::Crashed {
                    crash_point: flight.crash_point(),
                },
            }),
            _ => Err(RoundError::UnknownRound(handle.0)),
        }
    }

    /// Takes the multiplier of the last tick. `TooLate` once the flight has ended.
    pub fn cash_out(&mut self, handle: RoundHandle) -> Result<RoundOutcome, RoundError> {
        let flight = self.flight_mut(handle)?;
        let multiplier = flight.cash_out()?;
        let bet = flight.bet();
        let outcome = evaluate_crash(bet, Some(multiplier), flight.plan());
        let outcome = self.resolve(Committed { bet }, outcome);
        info!(
            %handle,
            multiplier,
            payout = outcome.payout,
            balance = self.ledger.balance(),
            "cashed out"
        );
        Ok(outcome)
    }
}
