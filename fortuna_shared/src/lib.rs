use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SpinRequest {
    /// Falls back to the selected bet when absent.
    #[serde(default)]
    pub bet: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpinResponse {
    pub reels: Vec<Vec<u8>>, // rows of symbol indices
    pub won: bool,
    pub bet: u64,
    pub payout: u64,
    pub line: Option<String>,
    pub multiplier: u32,
    pub balance: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CrashStartRequest {
    #[serde(default)]
    pub bet: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CrashStartResponse {
    pub round_id: u64,
    pub bet: u64,
    pub balance: u64,
    pub tick_interval_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlightResponse {
    Flying { multiplier: f64 },
    CashedOut { multiplier: f64 },
    Crashed { crash_point: f64 },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CashOutResponse {
    pub round_id: u64,
    pub multiplier: f64,
    pub payout: u64,
    pub balance: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BalanceResponse {
    pub balance: u64,
    pub bet: u64,
    pub in_flight: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SetBetRequest {
    pub bet: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConfigResponse {
    pub win_chance_percent: u8,
    pub difficulty: String,
    pub slot_bet_presets: Vec<u64>,
    pub crash_bet_presets: Vec<u64>,
    pub tick_interval_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminSetBalanceRequest {
    pub balance: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminSetWinBiasRequest {
    pub percent: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Slots,
    Crash,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HistoryEntry {
    pub game: GameKind,
    pub won: bool,
    pub bet: u64,
    pub payout: u64,
    pub profit: i64,
    pub multiplier: f64,
    pub line: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("insufficient funds: balance {balance}, bet {bet}")]
    InsufficientFunds { balance: u64, bet: u64 },
    #[error("too late: round already resolved")]
    TooLate,
    #[error("a round is already in progress")]
    Busy,
    #[error("unknown round {0}")]
    UnknownRound(u64),
    #[error("unauthorized")]
    Unauthorized,
}
