use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::rng::random_index;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    Cherry,
    Lemon,
    Diamond,
    Star,
    Bell,
    Seven,
}

impl Symbol {
    pub const ALL: [Symbol; 6] = [
        Symbol::Cherry,
        Symbol::Lemon,
        Symbol::Diamond,
        Symbol::Star,
        Symbol::Bell,
        Symbol::Seven,
    ];

    pub fn from_index(i: u8) -> Self {
        Self::ALL[i as usize % Self::ALL.len()]
    }

    pub fn to_index(self) -> u8 {
        match self {
            Symbol::Cherry => 0,
            Symbol::Lemon => 1,
            Symbol::Diamond => 2,
            Symbol::Star => 3,
            Symbol::Bell => 4,
            Symbol::Seven => 5,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Symbol::Cherry => "🍒",
            Symbol::Lemon => "🍋",
            Symbol::Diamond => "💎",
            Symbol::Star => "⭐",
            Symbol::Bell => "🔔",
            Symbol::Seven => "7️⃣",
        }
    }

    /// Uniformly chosen symbol.
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[random_index(rng, Self::ALL.len())]
    }
}

pub const GRID_SIZE: usize = 3;

/// Cell coordinate as `(row, col)`.
pub type Cell = (usize, usize);

/// Visible 3x3 window, row-major.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotGrid(pub [[Symbol; GRID_SIZE]; GRID_SIZE]);

impl SlotGrid {
    /// Every cell independently uniform.
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut cells = [[Symbol::Cherry; GRID_SIZE]; GRID_SIZE];
        for row in cells.iter_mut() {
            for cell in row.iter_mut() {
                *cell = Symbol::random(rng);
            }
        }
        Self(cells)
    }

    pub fn get(&self, (row, col): Cell) -> Symbol {
        self.0[row][col]
    }

    pub fn set(&mut self, (row, col): Cell, symbol: Symbol) {
        self.0[row][col] = symbol;
    }

    pub fn to_indices(&self) -> Vec<Vec<u8>> {
        self.0
            .iter()
            .map(|row| row.iter().map(|s| s.to_index()).collect())
            .collect()
    }
}

impl std::fmt::Display for SlotGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, row) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let glyphs: Vec<&str> = row.iter().map(|s| s.glyph()).collect();
            write!(f, "{}", glyphs.join(" "))?;
        }
        Ok(())
    }
}
