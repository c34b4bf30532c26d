use serde::{Deserialize, Serialize};

use crate::generator::{CrashPlan, SlotResult};
use crate::paytable::{Payline, Paytable};
use crate::symbols::{SlotGrid, Symbol};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum RoundDetail {
    Slots {
        grid: SlotGrid,
        line: Option<Payline>,
        symbol: Option<Symbol>,
        multiplier: u32,
    },
    Crash {
        /// Cash-out multiplier, or the crash point when the flight crashed.
        multiplier: f64,
        crash_point: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub won: bool,
    pub bet: u64,
    pub payout: u64,
    /// Whether the round was predestined to win. Accidental lines make `won` true without it.
    pub predestined_win: bool,
    pub detail: RoundDetail,
}

impl RoundOutcome {
    /// Net balance change of the round.
    pub fn profit(&self) -> i64 {
        self.payout as i64 - self.bet as i64
    }

    pub fn line(&self) -> Option<Payline> {
        match &self.detail {
            RoundDetail::Slots { line, .. } => *line,
            RoundDetail::Crash { .. } => None,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match &self.detail {
            RoundDetail::Slots { multiplier, .. } => *multiplier as f64,
            RoundDetail::Crash { multiplier, .. } => *multiplier,
        }
    }
}

/// First paying line in priority order.
pub fn winning_line(grid: &SlotGrid, paytable: &Paytable) -> Option<(Payline, Symbol, u32)> {
    paytable.entries().find_map(|entry| {
        entry
            .line
            .matched(grid)
            .map(|symbol| (entry.line, symbol, entry.payout_multiplier))
    })
}

/// Slot payout. Only one line ever pays.
pub fn evaluate_slots(result: &SlotResult, bet: u64, paytable: &Paytable) -> RoundOutcome {
    match winning_line(&result.grid, paytable) {
        Some((line, symbol, multiplier)) => RoundOutcome {
            won: true,
            bet,
            payout: bet.saturating_mul(multiplier as u64),
            predestined_win: result.predestined_win,
            detail: RoundDetail::Slots {
                grid: result.grid,
                line: Some(line),
                symbol: Some(symbol),
                multiplier,
            },
        },
        None => RoundOutcome {
            won: false,
            bet,
            payout: 0,
            predestined_win: result.predestined_win,
            detail: RoundDetail::Slots {
                grid: result.grid,
                line: None,
                symbol: None,
                multiplier: 0,
            },
        },
    }
}

/// `floor(bet * multiplier)`
pub fn cash_out_payout(bet: u64, multiplier: f64) -> u64 {
    (bet as f64 * multiplier).floor() as u64
}

/// Crash payout. Pays only when cashed out strictly below the crash point; `None` means the
/// flight crashed first and the bet is forfeit.
pub fn evaluate_crash(bet: u64, cash_out_at: Option<f64>, plan: &CrashPlan) -> RoundOutcome {
    let crash_point = plan.crash_point;
    match cash_out_at {
        Some(multiplier) if multiplier < crash_point => RoundOutcome {
            won: true,
            bet,
            payout: cash_out_payout(bet, multiplier),
            predestined_win: plan.predestined_win,
            detail: RoundDetail::Crash {
                multiplier,
                crash_point,
            },
        },
        _ => RoundOutcome {
            won: false,
            bet,
            payout: 0,
            predestined_win: plan.predestined_win,
            detail: RoundDetail::Crash {
                multiplier: crash_point,
                crash_point,
            },
        },
    }
}
