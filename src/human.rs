//! Randomized plans for human-like pointer movement, typing, and scrolling.
//!
//! The planners are pure: they take an RNG and return the steps to perform,
//! so the browser only replays them and the timing can be tested offline.

use std::time::Duration;

use rand::Rng;

/// Viewport the plans are generated for.
pub const VIEWPORT: (f64, f64) = (1280.0, 800.0);

/// One intermediate pointer position and the pause after reaching it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerStep {
    pub x: f64,
    pub y: f64,
    pub pause: Duration,
}

/// One scroll round: scroll by `dy`, then move the pointer to `pointer`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRound {
    pub dy: i32,
    pub pointer: (f64, f64),
    pub pause: Duration,
}

/// Path from `from` to `to` through jittered, eased intermediate points.
///
/// The last step always lands exactly on `to`.
pub fn pointer_path<R: Rng>(from: (f64, f64), to: (f64, f64), rng: &mut R) -> Vec<PointerStep> {
    let steps: usize = rng.random_range(10..=25);
    (1..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            // ease-in-out so the pointer accelerates then settles
            let eased = t * t * (3.0 - 2.0 * t);
            let (jx, jy) = if i == steps {
                (0.0, 0.0)
            } else {
                (rng.random_range(-3.0..=3.0), rng.random_range(-3.0..=3.0))
            };
            PointerStep {
                x: from.0 + (to.0 - from.0) * eased + jx,
                y: from.1 + (to.1 - from.1) * eased + jy,
                pause: Duration::from_millis(rng.random_range(5..=25)),
            }
        })
        .collect()
}

/// Delay to wait after typing each character of `text`.
///
/// Mostly 50-180ms, with an occasional longer pause.
pub fn keystroke_delays<R: Rng>(text: &str, rng: &mut R) -> Vec<Duration> {
    text.chars()
        .map(|_| {
            let mut ms: u64 = rng.random_range(50..=180);
            if rng.random_bool(0.1) {
                ms += rng.random_range(300..=800);
            }
            Duration::from_millis(ms)
        })
        .collect()
}

/// Short hesitation before an action such as clicking or submitting.
pub fn think_pause<R: Rng>(rng: &mut R) -> Duration {
    Duration::from_millis(rng.random_range(300..=900))
}

/// One or two rounds of scrolling with pointer movement in between.
pub fn scroll_plan<R: Rng>(rng: &mut R) -> Vec<ScrollRound> {
    let rounds: usize = rng.random_range(1..=2);
    (0..rounds)
        .map(|_| ScrollRound {
            dy: rng.random_range(200..=700),
            pointer: (
                rng.random_range(50.0..VIEWPORT.0 - 50.0),
                rng.random_range(50.0..VIEWPORT.1 - 50.0),
            ),
            pause: Duration::from_millis(rng.random_range(400..=1200)),
        })
        .collect()
}
