//! Tokio implementation of the broadcast timer.
//!
//! Each arming spawns a task that ticks on a fixed period and forwards
//! every tick to the autopilot service over a channel. The service owns the
//! autopilot, so ticks and commands are never handled concurrently.

use log::{debug, trace};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use autopilot_core::BroadcastTimer;

/// Marker sent on every timer firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// Repeating timer backed by a tokio task.
///
/// Must be armed from within a tokio runtime.
pub struct TokioTimer {
    tick_tx: mpsc::Sender<Tick>,
    running: Option<CancellationToken>,
}

impl TokioTimer {
    pub fn new(tick_tx: mpsc::Sender<Tick>) -> Self {
        Self {
            tick_tx,
            running: None,
        }
    }
}

impl BroadcastTimer for TokioTimer {
    fn arm(&mut self, period: Duration) {
        self.disarm();

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let tick_tx = self.tick_tx.clone();

        tokio::spawn(async move {
            // First firing one period after arming, like setInterval
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! { biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        match tick_tx.try_send(Tick) {
                            Ok(()) => {}
                            // Previous tick still queued; this one adds nothing
                            Err(TrySendError::Full(_)) => trace!("Broadcast tick coalesced"),
                            Err(TrySendError::Closed(_)) => break,
                        }
                    }
                }
            }
            debug!("Broadcast timer stopped");
        });

        debug!("Broadcast timer armed, period {:?}", period);
        self.running = Some(token);
    }

    fn disarm(&mut self) {
        if let Some(token) = self.running.take() {
            token.cancel();
        }
    }

    fn is_armed(&self) -> bool {
        self.running.is_some()
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_after_period() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut timer = TokioTimer::new(tx);
        let start = Instant::now();

        timer.arm(Duration::from_millis(1000));
        assert!(timer.is_armed());

        assert_eq!(rx.recv().await, Some(Tick));
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert_eq!(rx.recv().await, Some(Tick));
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_stops_ticks() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut timer = TokioTimer::new(tx);

        timer.arm(Duration::from_millis(1000));
        assert_eq!(rx.recv().await, Some(Tick));

        timer.disarm();
        timer.disarm();
        assert!(!timer.is_armed());
        assert!(timeout(Duration::from_secs(5), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_timer() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = TokioTimer::new(tx);

        timer.arm(Duration::from_millis(1000));
        timer.arm(Duration::from_millis(1000));

        // Only one task ticks: two ticks take two periods
        let start = Instant::now();
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }
}
