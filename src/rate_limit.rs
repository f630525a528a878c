use crate::actions::Action;
use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u32,
    pub window_reset_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    pub limit: u32,
    pub window: Duration,
    pub retry_after: Duration,
}

/// Fixed-window counter per destructive action name.
///
/// Bursts straddling a window boundary can reach twice the ceiling.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    ceiling: u32,
    windows: HashMap<&'static str, RateWindow>,
}

impl RateLimiter {
    pub fn new(window: Duration, ceiling: u32) -> Self {
        Self {
            window,
            ceiling,
            windows: HashMap::new(),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            Duration::from_millis(config.window_ms),
            config.max_destructive_calls,
        )
    }

    pub fn check_and_consume(&mut self, action: &Action) -> Result<(), RateLimited> {
        self.check_and_consume_at(action, Instant::now())
    }

    pub fn check_and_consume_at(&mut self, action: &Action, now: Instant) -> Result<(), RateLimited> {
        if !action.is_destructive {
            return Ok(());
        }

        match self.windows.get_mut(action.name) {
            Some(window) if now < window.window_reset_at => {
                if window.count >= self.ceiling {
                    return Err(RateLimited {
                        limit: self.ceiling,
                        window: self.window,
                        retry_after: window.window_reset_at.saturating_duration_since(now),
                    });
                }
                window.count += 1;
            }
            _ => {
                self.windows.insert(
                    action.name,
                    RateWindow {
                        count: 1,
                        window_reset_at: now + self.window,
                    },
                );
            }
        }
        Ok(())
    }

    pub fn window(&self, action_name: &str) -> Option<RateWindow> {
        self.windows.get(action_name).copied()
    }
}
