// src/connection/idle.rs

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, Sleep};

/// A restartable single-shot timer that fires after a period without traffic.
#[derive(Debug)]
pub struct IdleTimeout {
    period: Duration,
    sleep: Pin<Box<Sleep>>,
}

impl IdleTimeout {
    /// Creates the timer already armed.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            sleep: Box::pin(tokio::time::sleep(period)),
        }
    }

    /// Pushes the deadline out to one full period from now.
    pub fn rearm(&mut self) {
        let deadline = Instant::now() + self.period;
        self.sleep.as_mut().reset(deadline);
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Completes once the current deadline passes. Cancel safe: dropping the
    /// returned future leaves the timer armed.
    pub async fn expired(&mut self) {
        self.sleep.as_mut().await
    }
}
