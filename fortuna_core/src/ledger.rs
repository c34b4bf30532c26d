use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RoundError;

/// Sole authority over the player's money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    balance: u64,
    bet: u64,
    initial_balance: u64,
    default_bet: u64,
}

impl Ledger {
    pub fn new(initial_balance: u64, default_bet: u64) -> Self {
        Self {
            balance: initial_balance,
            bet: default_bet,
            initial_balance,
            default_bet,
        }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn bet(&self) -> u64 {
        self.bet
    }

    /// Subtracts `amount` if the balance covers it. On failure nothing changes.
    pub fn debit(&mut self, amount: u64) -> bool {
        match self.balance.checked_sub(amount) {
            Some(rest) => {
                self.balance = rest;
                debug!(amount, balance = self.balance, "debit");
                true
            }
            None => false,
        }
    }

    pub fn credit(&mut self, amount: u64) {
        self.balance = self.balance.saturating_add(amount);
        debug!(amount, balance = self.balance, "credit");
    }

    /// Selects the bet used when a round does not name one.
    pub fn set_bet(&mut self, bet: u64) -> Result<(), RoundError> {
        if bet == 0 || bet > self.balance {
            return Err(RoundError::InvalidBet {
                bet,
                balance: self.balance,
            });
        }
        self.bet = bet;
        Ok(())
    }

    pub fn set_balance(&mut self, balance: u64) {
        info!(from = self.balance, to = balance, "balance overridden");
        self.balance = balance;
    }

    pub fn reset(&mut self) {
        self.balance = self.initial_balance;
        self.bet = self.default_bet;
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_INITIAL_BALANCE,
            crate::config::DEFAULT_BET,
        )
    }
}
