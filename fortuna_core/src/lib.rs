pub mod config;
pub mod crash;
pub mod error;
pub mod evaluator;
pub mod generator;
pub mod ledger;
pub mod paytable;
pub mod rng;
pub mod session;
pub mod symbols;

pub use crate::config::{ConfigError, Difficulty, GameConfig, WinBias};
pub use crate::crash::{multiplier_at, time_to_reach, CrashFlight, FlightState, Tick};
pub use crate::error::RoundError;
pub use crate::evaluator::{evaluate_crash, evaluate_slots, RoundDetail, RoundOutcome};
pub use crate::generator::{
    generate_outcome, CrashPlan, GameMode, GeneratedRound, SlotResult,
};
pub use crate::ledger::Ledger;
pub use crate::paytable::{Payline, Paytable, PaytableEntry};
pub use crate::rng::{EntropyRng, SeededRng};
pub use crate::session::{FlightView, Phase, RoundHandle, Session};
pub use crate::symbols::{SlotGrid, Symbol};
