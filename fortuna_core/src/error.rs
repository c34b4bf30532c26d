/// Round-level failures. None of them mutate the ledger or the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    #[error("insufficient funds: balance {balance}, bet {bet}")]
    InsufficientFunds { balance: u64, bet: u64 },
    #[error("invalid bet {bet} (balance {balance})")]
    InvalidBet { bet: u64, balance: u64 },
    #[error("round already resolved")]
    TooLate,
    #[error("a round is already in progress")]
    RoundInProgress,
    #[error("unknown round {0}")]
    UnknownRound(u64),
}
