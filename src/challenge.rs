//! Bot-challenge detection and the retry backoff applied when one is served.

use std::time::Duration;

use rand::Rng;

/// Case-insensitive markers of captcha / unusual-traffic interstitials.
pub const CHALLENGE_INDICATORS: &[&str] = &[
    "unusual traffic",
    "captcha",
    "prove you are not a robot",
    "verify you are human",
    "having trouble accessing",
    "/sorry/index",
    "로봇이 아닙니다",
    "비정상적인 트래픽",
    "异常流量",
    "验证码",
    "ロボットではありません",
];

/// Returns the first indicator found in `html`, if any.
pub fn find_indicator(html: &str) -> Option<&'static str> {
    let lower = html.to_lowercase();
    CHALLENGE_INDICATORS
        .iter()
        .copied()
        .find(|indicator| lower.contains(indicator))
}

/// Returns true if `html` looks like a bot-challenge page.
pub fn is_challenge_page(html: &str) -> bool {
    find_indicator(html).is_some()
}

/// Bounded retry policy for challenge pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengePolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay; each backoff is drawn from `[5x, 10x]` of it.
    pub base_delay: Duration,
}

impl Default for ChallengePolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(1_000),
        }
    }
}

impl ChallengePolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Randomized wait before the next attempt.
    pub fn backoff(&self) -> Duration {
        self.backoff_with(&mut rand::rng())
    }

    pub fn backoff_with<R: Rng>(&self, rng: &mut R) -> Duration {
        let factor: f64 = rng.random_range(5.0..=10.0);
        self.base_delay.mul_f64(factor)
    }
}
