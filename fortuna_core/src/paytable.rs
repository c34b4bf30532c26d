use crate::symbols::{Cell, SlotGrid, Symbol};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Payline {
    MiddleRow,
    TopRow,
    BottomRow,
    /// Top-left to bottom-right.
    DiagonalDown,
    /// Bottom-left to top-right.
    DiagonalUp,
}

impl Payline {
    pub const ALL: [Payline; 5] = [
        Payline::MiddleRow,
        Payline::TopRow,
        Payline::BottomRow,
        Payline::DiagonalDown,
        Payline::DiagonalUp,
    ];

    pub fn cells(self) -> [Cell; 3] {
        match self {
            Payline::TopRow => [(0, 0), (0, 1), (0, 2)],
            Payline::MiddleRow => [(1, 0), (1, 1), (1, 2)],
            Payline::BottomRow => [(2, 0), (2, 1), (2, 2)],
            Payline::DiagonalDown => [(0, 0), (1, 1), (2, 2)],
            Payline::DiagonalUp => [(2, 0), (1, 1), (0, 2)],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Payline::MiddleRow => "middle_row",
            Payline::TopRow => "top_row",
            Payline::BottomRow => "bottom_row",
            Payline::DiagonalDown => "diagonal_down",
            Payline::DiagonalUp => "diagonal_up",
        }
    }

    /// The symbol on this line if all three cells agree.
    pub fn matched(self, grid: &SlotGrid) -> Option<Symbol> {
        let [a, b, c] = self.cells().map(|cell| grid.get(cell));
        (a == b && b == c).then_some(a)
    }
}

impl std::fmt::Display for Payline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaytableEntry {
    pub line: Payline,
    pub payout_multiplier: u32,
}

/// Paylines in evaluation priority order. The first matching entry pays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Paytable(pub Vec<PaytableEntry>);

impl Paytable {
    pub fn multiplier(&self, line: Payline) -> Option<u32> {
        self.0
            .iter()
            .find(|e| e.line == line)
            .map(|e| e.payout_multiplier)
    }

    pub fn entries(&self) -> impl Iterator<Item = &PaytableEntry> {
        self.0.iter()
    }
}

impl Default for Paytable {
    fn default() -> Self {
        Self(vec![
            PaytableEntry {
                line: Payline::MiddleRow,
                payout_multiplier: 10,
            },
            PaytableEntry {
                line: Payline::TopRow,
                payout_multiplier: 5,
            },
            PaytableEntry {
                line: Payline::BottomRow,
                payout_multiplier: 5,
            },
            PaytableEntry {
                line: Payline::DiagonalDown,
                payout_multiplier: 5,
            },
            PaytableEntry {
                line: Payline::DiagonalUp,
                payout_multiplier: 5,
            },
        ])
    }
}
