use std::time::Duration;

use fortuna_core::{
    generate_outcome, time_to_reach, FlightView, GameConfig, GameMode, Paytable, Payline,
    RoundDetail, RoundError, SeededRng, Session, Tick, WinBias,
};

fn session(seed: &str, balance: u64, bias: u8) -> Session<SeededRng> {
    let config = GameConfig {
        initial_balance: balance,
        win_chance_percent: bias,
        ..GameConfig::default()
    };
    Session::with_rng(config, SeededRng::new(seed, 7))
}

#[test]
fn sure_win_slot_round() {
    for nonce in 0..200u64 {
        let config = GameConfig {
            win_chance_percent: 100,
            ..GameConfig::default()
        };
        let mut s = Session::with_rng(config, SeededRng::new("sure-win", nonce));
        let out = s.start_slot_round(10).unwrap();
        assert!(out.won);
        assert!(out.payout == 50 || out.payout == 100, "payout {}", out.payout);
        assert_eq!(s.balance(), 1000 - 10 + out.payout);
        let RoundDetail::Slots { grid, line, symbol, .. } = out.detail else {
            panic!("slot detail expected");
        };
        let line = line.unwrap();
        for cell in line.cells() {
            assert_eq!(Some(grid.get(cell)), symbol);
        }
    }
}

#[test]
fn insufficient_funds_scenario() {
    let mut s = session("poor", 5, 50);
    assert!(matches!(
        s.start_slot_round(10),
        Err(RoundError::InsufficientFunds { .. })
    ));
    assert_eq!(s.balance(), 5);
}

#[test]
fn losing_crash_round_cash_out() {
    let mut s = session("low-flight", 1000, 0);
    let handle = s.start_crash_round(10).unwrap();
    // loss branch crashes at >= 1.1x; 0.25s only reaches ~1.049x
    let tick = s.advance(handle, Duration::from_millis(250)).unwrap();
    let Tick::Flying { multiplier } = tick else {
        panic!("should still be flying, got {tick:?}");
    };
    let out = s.cash_out(handle).unwrap();
    assert!(out.won);
    assert_eq!(out.payout, (10.0 * multiplier).floor() as u64);
    assert_eq!(s.balance(), 1000 - 10 + out.payout);
}

#[test]
fn crash_points_follow_bias() {
    let mut rng = SeededRng::new("crash-points", 0);
    let paytable = Paytable::default();
    for bias in [0, 100] {
        for _ in 0..1_000 {
            let round = generate_outcome(&mut rng, GameMode::Crash, WinBias::new(bias), &paytable);
            let fortuna_core::GeneratedRound::Crash(plan) = round else {
                panic!("crash plan expected");
            };
            if bias == 0 {
                assert!((1.1..2.5).contains(&plan.crash_point));
            } else {
                assert!((2.0..10.0).contains(&plan.crash_point));
            }
        }
    }
}

#[test]
fn ticked_flight_is_monotonic_and_terminates() {
    let mut s = session("flight", 1000, 60);
    for _ in 0..50 {
        let handle = s.start_crash_round(10).unwrap();
        assert_eq!(
            s.poll_multiplier(handle),
            Ok(FlightView::Flying { multiplier: 1.0 })
        );
        let mut last = 1.0;
        let mut elapsed = Duration::ZERO;
        loop {
            elapsed += Duration::from_millis(50);
            match s.advance(handle, elapsed).unwrap() {
                Tick::Flying { multiplier } => {
                    assert!(multiplier >= last);
                    last = multiplier;
                }
                Tick::Crashed { crash_point } => {
                    assert!(crash_point >= last);
                    assert!(elapsed <= time_to_reach(crash_point) + Duration::from_millis(50));
                    break;
                }
                Tick::Finished => panic!("flight ended without a crash tick"),
            }
        }
    }
    // every flight crashed, so every bet was forfeit
    assert_eq!(s.balance(), 1000 - 50 * 10);
}

#[test]
fn conservation_over_mixed_rounds() {
    let mut s = session("conservation", 10_000, 35);
    let start = s.balance();
    let mut bets = 0u64;
    let mut payouts = 0u64;
    for i in 0..400u64 {
        let bet = 1 + i % 20;
        if i % 3 == 0 {
            let handle = s.start_crash_round(bet).unwrap();
            bets += bet;
            let cash_at = Duration::from_millis(200 * (i % 25));
            let mut elapsed = Duration::ZERO;
            let mut crashed = false;
            while elapsed < cash_at {
                elapsed += Duration::from_millis(50);
                if let Tick::Crashed { .. } = s.advance(handle, elapsed).unwrap() {
                    crashed = true;
                    break;
                }
            }
            match s.cash_out(handle) {
                Ok(out) => {
                    assert!(!crashed);
                    payouts += out.payout;
                }
                Err(RoundError::TooLate) => assert!(crashed),
                Err(e) => panic!("unexpected {e}"),
            }
        } else {
            let out = s.start_slot_round(bet).unwrap();
            bets += bet;
            payouts += out.payout;
        }
        assert_eq!(s.balance(), start - bets + payouts);
    }
}

#[test]
fn predestined_win_rate_converges_to_bias() {
    const N: usize = 20_000;
    let paytable = Paytable::default();
    for percent in [0u8, 15, 50, 85, 100] {
        let mut rng = SeededRng::new("bias-rate", percent as u64);
        let wins = (0..N)
            .filter(|_| {
                generate_outcome(&mut rng, GameMode::Slots, WinBias::new(percent as i64), &paytable)
                    .predestined_win()
            })
            .count();
        let rate = wins as f64 / N as f64;
        let expected = percent as f64 / 100.0;
        assert!(
            (rate - expected).abs() < 0.02,
            "bias {percent}: observed {rate}, expected {expected}"
        );
    }
}

#[test]
fn observed_slot_win_rate_includes_accidental_lines() {
    const N: u64 = 20_000;
    // a uniform grid completes at least one of the five lines ~13.1% of the time
    let mut zero = session("accidental", N * 10, 0);
    let wins = (0..N).filter(|_| zero.start_slot_round(1).unwrap().won).count();
    let rate = wins as f64 / N as f64;
    assert!((0.11..0.15).contains(&rate), "observed {rate}");

    let mut half = session("half", N * 10, 50);
    let wins = (0..N).filter(|_| half.start_slot_round(1).unwrap().won).count();
    let rate = wins as f64 / N as f64;
    assert!((rate - 0.566).abs() < 0.02, "observed {rate}");
}

#[test]
fn middle_row_outranks_other_lines() {
    let mut rng = SeededRng::new("priority", 0);
    let paytable = Paytable::default();
    for _ in 0..2_000 {
        let fortuna_core::GeneratedRound::Slots(result) =
            generate_outcome(&mut rng, GameMode::Slots, WinBias::new(100), &paytable)
        else {
            panic!("slot result expected");
        };
        let out = fortuna_core::evaluate_slots(&result, 10, &paytable);
        if Payline::MiddleRow.matched(&result.grid).is_some() {
            assert_eq!(out.line(), Some(Payline::MiddleRow));
            assert_eq!(out.payout, 100);
        } else {
            assert_eq!(out.payout, 50);
        }
    }
}
