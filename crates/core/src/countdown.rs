//! Precision countdown to the market-open instant.
//!
//! The wait is a tight wall-clock poll, not a fixed-interval timer: a
//! timer would wake late by up to its period at exactly the moment that
//! matters. The emission policy lives in a pure state machine so it can
//! be tested against a simulated clock.

use chrono::{DateTime, Local};
use tracing::info;

/// What a single clock observation produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Wall clock reached the target instant.
    Done,
    /// A progress line should be emitted for this many remaining seconds.
    Tick(i64),
    /// Keep polling, nothing to report.
    Idle,
}

/// Tick bookkeeping for one wait.
///
/// `target` is when the wait ends; `display` is the true market-open
/// instant the remaining time is computed against, so progress reflects
/// real time-to-open even when `target` is an earlier safety checkpoint.
#[derive(Debug)]
pub struct Countdown {
    target: DateTime<Local>,
    display: DateTime<Local>,
    last_second: Option<i64>,
}

impl Countdown {
    pub fn new(target: DateTime<Local>, display: DateTime<Local>) -> Self {
        Self {
            target,
            display,
            last_second: None,
        }
    }

    /// Feeds one clock reading through the tick policy.
    ///
    /// Emits at most once per whole second: every second under 10
    /// remaining, only multiples of five at 10 or more.
    pub fn observe(&mut self, now: DateTime<Local>) -> Step {
        if now >= self.target {
            return Step::Done;
        }

        let remaining = (self.display - now).num_seconds().max(0);
        if self.last_second == Some(remaining) {
            return Step::Idle;
        }
        self.last_second = Some(remaining);

        if remaining >= 10 && remaining % 5 != 0 {
            return Step::Idle;
        }
        Step::Tick(remaining)
    }
}

/// Blocks until the wall clock reaches `target`, logging countdown ticks
/// computed against `display`.
///
/// Returns immediately when `target` is already in the past.
pub async fn wait_until(target: DateTime<Local>, display: DateTime<Local>) {
    let mut countdown = Countdown::new(target, display);
    loop {
        match countdown.observe(Local::now()) {
            Step::Done => return,
            Step::Tick(remaining) => {
                info!(target = "courtsnipe.countdown", "倒數 {remaining} 秒");
            }
            Step::Idle => {}
        }
        // Stay scheduler-friendly without giving up sub-second wake
        // precision to a timer.
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base() -> DateTime<Local> {
        // Any fixed instant works; the policy only sees differences.
        Local::now()
    }

    /// Runs a simulated clock from `from_ms` milliseconds before the
    /// target down to it, stepping 100ms, and collects the emitted ticks.
    fn ticks_from(from_ms: i64) -> Vec<i64> {
        let open = base();
        let mut countdown = Countdown::new(open, open);
        let mut emitted = Vec::new();

        let mut offset_ms = from_ms;
        while offset_ms > 0 {
            let now = open - Duration::milliseconds(offset_ms);
            match countdown.observe(now) {
                Step::Tick(s) => emitted.push(s),
                Step::Idle => {}
                Step::Done => panic!("done before target"),
            }
            offset_ms -= 100;
        }
        emitted
    }

    #[test]
    fn far_out_ticks_only_on_multiples_of_five() {
        assert_eq!(ticks_from(37_000), vec![35, 30, 25, 20, 15, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn under_ten_ticks_every_second() {
        assert_eq!(ticks_from(7_400), vec![7, 6, 5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn never_emits_twice_within_a_second() {
        let open = base();
        let mut countdown = Countdown::new(open, open);

        let first = countdown.observe(open - Duration::milliseconds(3_900));
        let again = countdown.observe(open - Duration::milliseconds(3_500));
        assert_eq!(first, Step::Tick(3));
        assert_eq!(again, Step::Idle);
    }

    #[test]
    fn reaching_target_is_done() {
        let open = base();
        let mut countdown = Countdown::new(open, open);
        assert_eq!(countdown.observe(open), Step::Done);
        assert_eq!(countdown.observe(open + Duration::seconds(1)), Step::Done);
    }

    #[test]
    fn checkpoint_target_displays_true_time_to_open() {
        let open = base();
        let checkpoint = open - Duration::seconds(90);
        let mut countdown = Countdown::new(checkpoint, open);

        // 100 seconds before open, 10 before the checkpoint.
        match countdown.observe(open - Duration::seconds(100)) {
            Step::Tick(remaining) => assert_eq!(remaining, 100),
            other => panic!("expected tick, got {other:?}"),
        }
        // The wait itself still ends at the checkpoint.
        assert_eq!(countdown.observe(checkpoint), Step::Done);
    }

    #[tokio::test]
    async fn past_target_returns_immediately() {
        let past = Local::now() - Duration::seconds(5);
        let started = std::time::Instant::now();
        wait_until(past, past).await;
        assert!(started.elapsed() < std::time::Duration::from_millis(100));
    }
}
