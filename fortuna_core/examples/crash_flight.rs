use std::time::Duration;

use fortuna_core::{GameConfig, SeededRng, Session, Tick};

fn main() {
    // Example flight on a virtual clock, cashing out at 1.5x
    let mut session = Session::with_rng(GameConfig::default(), SeededRng::new("example-seed", 1));
    let handle = session.start_crash_round(10).expect("default balance covers the bet");
    let tick = session.config().tick_interval();
    let mut elapsed = Duration::ZERO;
    loop {
        elapsed += tick;
        match session.advance(handle, elapsed).expect("current round") {
            Tick::Flying { multiplier } if multiplier >= 1.5 => {
                let outcome = session.cash_out(handle).expect("still flying");
                println!("cashed out at {:.2}x payout={}", multiplier, outcome.payout);
                break;
            }
            Tick::Flying { .. } => {}
            Tick::Crashed { crash_point } => {
                println!("crashed at {:.2}x", crash_point);
                break;
            }
            Tick::Finished => break,
        }
    }
    println!("balance={}", session.balance());
}
