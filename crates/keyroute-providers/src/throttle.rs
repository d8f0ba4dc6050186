//! Token pacing — a minimum delay between successive token deliveries.
//!
//! `StreamRate` is the policy carried by the emitted config; it is plain data.
//! A transport asks it for a `TokenPacer` per stream and calls
//! [`TokenPacer::on_token`] before delivering each token.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Minimum interval between token emissions, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRate {
    interval_ms: u64,
}

impl StreamRate {
    /// A cadence of zero means "no pacing" and yields `None`.
    pub fn from_millis(interval_ms: u64) -> Option<Self> {
        (interval_ms > 0).then_some(Self { interval_ms })
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Fresh pacer for one stream.
    pub fn pacer(&self) -> TokenPacer {
        TokenPacer {
            interval: self.interval(),
            last_emit: None,
        }
    }
}

/// Per-stream pacing state.
#[derive(Debug)]
pub struct TokenPacer {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl TokenPacer {
    /// How long the next token must wait if it were emitted at `now`.
    pub fn delay_at(&self, now: Instant) -> Duration {
        match self.last_emit {
            Some(last) => (last + self.interval).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Wait until the next token may be delivered, then record the emission.
    ///
    /// The first token is never delayed. Time already spent producing a token
    /// counts toward the interval, so a slow upstream is not slowed further.
    pub async fn on_token(&mut self) {
        if let Some(last) = self.last_emit {
            tokio::time::sleep_until(last + self.interval).await;
        }
        self.last_emit = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rate_disables_pacing() {
        assert!(StreamRate::from_millis(0).is_none());
        assert_eq!(StreamRate::from_millis(17).unwrap().interval_ms(), 17);
    }

    #[test]
    fn test_serializes_interval() {
        let json = serde_json::to_value(StreamRate::from_millis(30).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({ "intervalMs": 30 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_token_is_immediate() {
        let mut pacer = StreamRate::from_millis(30).unwrap().pacer();
        let start = Instant::now();
        pacer.on_token().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enforces_minimum_gap_between_tokens() {
        let mut pacer = StreamRate::from_millis(30).unwrap().pacer();
        let start = Instant::now();

        for _ in 0..4 {
            pacer.on_token().await;
        }

        // Four tokens → three enforced gaps (timer wheel resolution is 1ms).
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(90), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(94), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_producer_is_not_delayed_further() {
        let mut pacer = StreamRate::from_millis(30).unwrap().pacer();
        pacer.on_token().await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        let before = Instant::now();
        pacer.on_token().await;

        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_at_reports_remaining_wait() {
        let mut pacer = StreamRate::from_millis(30).unwrap().pacer();
        assert_eq!(pacer.delay_at(Instant::now()), Duration::ZERO);

        pacer.on_token().await;
        tokio::time::advance(Duration::from_millis(10)).await;
        assert_eq!(pacer.delay_at(Instant::now()), Duration::from_millis(20));
    }
}
