//! Crash flight state machine.
//!
//! A flight is advanced only by ticks carrying the elapsed time since take-off. The host owns
//! the timer; this module owns the ordering rules. Whatever event reaches the flight first
//! decides it: a cash-out before the crash tick pays, a cash-out after it is too late.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RoundError;
use crate::generator::CrashPlan;

pub const GROWTH_BASE: f64 = 1.1;

/// `1.1^(2t)`, exactly 1.0 at take-off.
pub fn multiplier_at(elapsed: Duration) -> f64 {
    GROWTH_BASE.powf(2.0 * elapsed.as_secs_f64())
}

/// Time at which the multiplier reaches `crash_point`.
pub fn time_to_reach(crash_point: f64) -> Duration {
    if crash_point <= 1.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(crash_point.ln() / (2.0 * GROWTH_BASE.ln()))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlightState {
    InFlight,
    CashedOut { multiplier: f64 },
    Crashed,
}

/// Result of delivering one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    Flying { multiplier: f64 },
    /// This tick ended the flight.
    Crashed { crash_point: f64 },
    /// The flight had already ended; the ticker should stop.
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrashFlight {
    bet: u64,
    plan: CrashPlan,
    multiplier: f64,
    state: FlightState,
}

impl CrashFlight {
    pub fn new(bet: u64, crash_point: f64) -> Self {
        Self::from_plan(
            bet,
            CrashPlan {
                crash_point,
                predestined_win: false,
            },
        )
    }

    pub fn from_plan(bet: u64, plan: CrashPlan) -> Self {
        Self {
            bet,
            plan: CrashPlan {
                crash_point: plan.crash_point.max(1.0),
                ..plan
            },
            multiplier: 1.0,
            state: FlightState::InFlight,
        }
    }

    pub fn bet(&self) -> u64 {
        self.bet
    }

    pub fn crash_point(&self) -> f64 {
        self.plan.crash_point
    }

    pub fn plan(&self) -> &CrashPlan {
        &self.plan
    }

    /// Multiplier as of the last tick, frozen once the flight ends.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn state(&self) -> FlightState {
        self.state
    }

    pub fn in_flight(&self) -> bool {
        matches!(self.state, FlightState::InFlight)
    }

    pub fn tick(&mut self, elapsed: Duration) -> Tick {
        if !self.in_flight() {
            return Tick::Finished;
        }
        let next = multiplier_at(elapsed).max(self.multiplier);
        let crash_point = self.plan.crash_point;
        if next >= crash_point {
            self.multiplier = crash_point;
            self.state = FlightState::Crashed;
            Tick::Crashed { crash_point }
        } else {
            self.multiplier = next;
            Tick::Flying { multiplier: next }
        }
    }

    /// Freezes the multiplier of the last tick. Rejected once the flight has ended.
    pub fn cash_out(&mut self) -> Result<f64, RoundError> {
        if !self.in_flight() {
            return Err(RoundError::TooLate);
        }
        self.state = FlightState::CashedOut {
            multiplier: self.multiplier,
        };
        Ok(self.multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_one() {
        assert_eq!(multiplier_at(Duration::ZERO), 1.0);
        let flight = CrashFlight::new(10, 2.0);
        assert_eq!(flight.multiplier(), 1.0);
        assert!(flight.in_flight());
    }

    #[test]
    fn test_growth_matches_formula() {
        let m = multiplier_at(Duration::from_secs(5));
        assert!((m - 1.1f64.powi(10)).abs() < 1e-12);
    }

    #[test]
    fn test_monotonic_ticks() {
        let mut flight = CrashFlight::new(10, 9.0);
        let mut last = flight.multiplier();
        // 9.0x is reached after ~11.5s
        for ms in (0..20_000).step_by(50) {
            match flight.tick(Duration::from_millis(ms)) {
                Tick::Flying { multiplier } => {
                    assert!(multiplier >= last);
                    last = multiplier;
                }
                Tick::Crashed { crash_point } => {
                    assert_eq!(crash_point, 9.0);
                    break;
                }
                Tick::Finished => unreachable!(),
            }
        }
        assert_eq!(flight.state(), FlightState::Crashed);
    }

    #[test]
    fn test_late_tick_does_not_rewind() {
        let mut flight = CrashFlight::new(10, 9.0);
        flight.tick(Duration::from_secs(2));
        let high = flight.multiplier();
        flight.tick(Duration::from_secs(1));
        assert_eq!(flight.multiplier(), high);
    }

    #[test]
    fn test_crash_tick_wins_race() {
        let mut flight = CrashFlight::new(10, 1.5);
        let tick = flight.tick(time_to_reach(1.5) + Duration::from_millis(1));
        assert!(matches!(tick, Tick::Crashed { .. }));
        assert_eq!(flight.cash_out(), Err(RoundError::TooLate));
        assert_eq!(flight.multiplier(), 1.5);
        assert_eq!(flight.tick(Duration::from_secs(60)), Tick::Finished);
    }

    #[test]
    fn test_cash_out_freezes() {
        let mut flight = CrashFlight::new(10, 5.0);
        flight.tick(Duration::from_secs(1));
        let at = flight.cash_out().unwrap();
        assert_eq!(at, multiplier_at(Duration::from_secs(1)));
        assert_eq!(flight.tick(Duration::from_secs(2)), Tick::Finished);
        assert_eq!(flight.multiplier(), at);
        assert_eq!(flight.cash_out(), Err(RoundError::TooLate));
    }

    #[test]
    fn test_crash_point_clamped() {
        let flight = CrashFlight::from_plan(
            10,
            CrashPlan {
                crash_point: 0.5,
                predestined_win: true,
            },
        );
        assert_eq!(flight.crash_point(), 1.0);
        assert!(flight.plan().predestined_win);
    }

    #[test]
    fn test_time_to_reach() {
        let t = time_to_reach(2.0);
        assert!((multiplier_at(t) - 2.0).abs() < 1e-9);
        assert_eq!(time_to_reach(1.0), Duration::ZERO);
    }
}
