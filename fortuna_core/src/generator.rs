//! Bias-weighted outcome generation.
//!
//! Every round first rolls whether it is predestined to win. The visible result is then
//! built to agree with that decision: a winning slot grid has one payline forced to a single
//! symbol, a winning crash flight gets a high crash point.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::WinBias;
use crate::paytable::{Payline, Paytable};
use crate::rng::{random_index, random_range, random_unit};
use crate::symbols::{SlotGrid, Symbol};

/// Crash points for predestined wins, `[low, high)`.
pub const CRASH_WIN_RANGE: (f64, f64) = (2.0, 10.0);
/// Crash points for predestined losses, `[low, high)`.
pub const CRASH_LOSS_RANGE: (f64, f64) = (1.1, 2.5);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Slots,
    Crash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotResult {
    pub grid: SlotGrid,
    pub predestined_win: bool,
    /// Payline forced by the generator, if any.
    pub forced_line: Option<Payline>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrashPlan {
    pub crash_point: f64,
    pub predestined_win: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneratedRound {
    Slots(SlotResult),
    Crash(CrashPlan),
}

impl GeneratedRound {
    pub fn predestined_win(&self) -> bool {
        match self {
            GeneratedRound::Slots(r) => r.predestined_win,
            GeneratedRound::Crash(p) => p.predestined_win,
        }
    }
}

/// One uniform draw in `[0, 100)` compared against the bias.
pub fn roll_predestined_win<R: RngCore + ?Sized>(rng: &mut R, bias: WinBias) -> bool {
    random_unit(rng) * 100.0 < bias.percent() as f64
}

/// Slot grid for an already-decided round.
///
/// On a win the payline is drawn from the paytable so the forced line always pays. Other
/// cells stay independent, so extra accidental lines are possible.
pub fn generate_slot_grid<R: RngCore + ?Sized>(
    rng: &mut R,
    paytable: &Paytable,
    win: bool,
) -> SlotResult {
    if !win || paytable.0.is_empty() {
        return SlotResult {
            grid: SlotGrid::random(rng),
            predestined_win: win,
            forced_line: None,
        };
    }

    let line = paytable.0[random_index(rng, paytable.0.len())].line;
    let symbol = Symbol::random(rng);
    let mut grid = SlotGrid::random(rng);
    for cell in line.cells() {
        grid.set(cell, symbol);
    }
    SlotResult {
        grid,
        predestined_win: true,
        forced_line: Some(line),
    }
}

pub fn generate_crash_plan<R: RngCore + ?Sized>(rng: &mut R, win: bool) -> CrashPlan {
    let (low, high) = if win { CRASH_WIN_RANGE } else { CRASH_LOSS_RANGE };
    CrashPlan {
        crash_point: random_range(rng, low, high),
        predestined_win: win,
    }
}

/// Predestine a slot round and build its grid.
pub fn generate_slot_round<R: RngCore + ?Sized>(
    rng: &mut R,
    bias: WinBias,
    paytable: &Paytable,
) -> SlotResult {
    let win = roll_predestined_win(rng, bias);
    debug!(bias = bias.percent(), win, "slot round predestined");
    generate_slot_grid(rng, paytable, win)
}

/// Predestine a crash round and draw its crash point.
pub fn generate_crash_round<R: RngCore + ?Sized>(rng: &mut R, bias: WinBias) -> CrashPlan {
    let win = roll_predestined_win(rng, bias);
    debug!(bias = bias.percent(), win, "crash round predestined");
    generate_crash_plan(rng, win)
}

/// Decide the round, then build a result for `mode` consistent with the decision.
pub fn generate_outcome<R: RngCore + ?Sized>(
    rng: &mut R,
    mode: GameMode,
    bias: WinBias,
    paytable: &Paytable,
) -> GeneratedRound {
    match mode {
        GameMode::Slots => GeneratedRound::Slots(generate_slot_round(rng, bias, paytable)),
        GameMode::Crash => GeneratedRound::Crash(generate_crash_round(rng, bias)),
    }
}
