use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

#[cfg(debug_assertions)]
use crate::config::DEBUG_FLAGS;

/// Shared spacing between provider fetches across every task.
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Reserve the next free slot and sleep until it arrives.
    pub async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.min_interval);
            slot
        };

        #[cfg(debug_assertions)]
        if DEBUG_FLAGS.print_fetch_events {
            let wait = slot.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                log::info!("[rate] waiting {:?} for next fetch slot", wait);
            }
        }
        sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn spaces_consecutive_fetches() {
        let gate = Arc::new(RateGate::new(Duration::from_millis(20)));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.wait().await })
            })
            .collect();
        futures::future::join_all(handles).await;

        // Slots at 0, 20, 40, 60ms
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn zero_interval_never_waits() {
        let gate = RateGate::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..100 {
            gate.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
