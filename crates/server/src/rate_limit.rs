//! Token bucket rate limiter for WebSocket connections

use std::time::Instant;

use parla_config::RateLimitConfig;

/// Per-connection message rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    tokens: f32,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let burst = config.messages_per_second as f32 * config.burst_multiplier;
        Self { config, tokens: burst, last_refill: Instant::now() }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed_secs = now.duration_since(self.last_refill).as_secs_f32();

        if elapsed_secs > 0.0 {
            let refill = elapsed_secs * self.config.messages_per_second as f32;
            let max = self.config.messages_per_second as f32 * self.config.burst_multiplier;
            self.tokens = (self.tokens + refill).min(max);
            self.last_refill = now;
        }
    }

    /// Consume a token for one inbound message, if available.
    pub fn check_message(&mut self) -> Result<(), RateLimitExceeded> {
        if !self.config.enabled {
            return Ok(());
        }

        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            Err(RateLimitExceeded)
        }
    }
}

/// Too many messages per second on one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("message rate limit exceeded")]
pub struct RateLimitExceeded;

#[cfg(test)]
mod tests {
    use super::*;

    fn config(messages_per_second: u32, burst_multiplier: f32) -> RateLimitConfig {
        RateLimitConfig { enabled: true, messages_per_second, burst_multiplier }
    }

    #[test]
    fn test_allows_up_to_burst() {
        let mut limiter = RateLimiter::new(config(10, 2.0));
        for _ in 0..20 {
            assert!(limiter.check_message().is_ok());
        }
        assert!(limiter.check_message().is_err());
    }

    #[test]
    fn test_blocks_over_limit() {
        let mut limiter = RateLimiter::new(config(10, 1.0));
        for _ in 0..10 {
            assert!(limiter.check_message().is_ok());
        }
        assert!(limiter.check_message().is_err());
    }

    #[test]
    fn test_disabled_always_allows() {
        let mut limiter = RateLimiter::new(RateLimitConfig {
            enabled: false,
            messages_per_second: 1,
            burst_multiplier: 1.0,
        });
        for _ in 0..1000 {
            assert!(limiter.check_message().is_ok());
        }
    }
}
