//! Recurring tick timer owned by a publisher actor
//!
//! At most one deadline exists at a time. Arming replaces it, disarming clears it, so the
//! timer can be re-armed across reconnects without ever producing a second tick stream.

use super::lifecycle::FirstTick;
use std::time::Duration;
use tokio::time::Instant;

/// `(due_time, period)` timer
#[derive(Debug, Clone)]
pub struct TickScheduler {
    due_time: Duration,
    period: Duration,
    next: Option<Instant>,
}

impl TickScheduler {
    pub fn new(due_time: Duration, period: Duration) -> Self {
        Self {
            due_time,
            period,
            next: None,
        }
    }

    /// Arm (or re-arm) the timer relative to now
    pub fn arm(&mut self, first: FirstTick) {
        let delay = match first {
            FirstTick::AfterDueTime => self.due_time,
            FirstTick::AfterPeriod => self.period,
        };
        self.next = Some(Instant::now() + delay);
    }

    pub fn disarm(&mut self) {
        self.next = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Move the deadline one period forward after a tick.
    ///
    /// Missed periods are skipped rather than replayed.
    pub fn advance(&mut self) {
        if let Some(previous) = self.next {
            let now = Instant::now();
            let mut candidate = previous + self.period;
            if candidate <= now {
                candidate = now + self.period;
            }
            self.next = Some(candidate);
        }
    }

    /// Resolve at the next deadline; never resolves while disarmed
    pub async fn wait(&self) {
        match self.next {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_arm_uses_due_time() {
        let mut scheduler = TickScheduler::new(Duration::from_secs(10), PERIOD);
        let start = Instant::now();

        scheduler.arm(FirstTick::AfterDueTime);

        assert!(scheduler.is_armed());
        assert_eq!(scheduler.next_deadline(), Some(start + Duration::from_secs(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_after_period() {
        let mut scheduler = TickScheduler::new(Duration::ZERO, PERIOD);
        let start = Instant::now();

        scheduler.arm(FirstTick::AfterPeriod);

        assert_eq!(scheduler.next_deadline(), Some(start + PERIOD));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_deadline() {
        let mut scheduler = TickScheduler::new(Duration::ZERO, PERIOD);
        scheduler.arm(FirstTick::AfterPeriod);
        scheduler.arm(FirstTick::AfterDueTime);

        assert_eq!(scheduler.next_deadline(), Some(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_advance_keeps_fixed_rate() {
        let mut scheduler = TickScheduler::new(Duration::ZERO, PERIOD);
        let start = Instant::now();
        scheduler.arm(FirstTick::AfterDueTime);

        scheduler.wait().await;
        scheduler.advance();
        assert_eq!(scheduler.next_deadline(), Some(start + PERIOD));

        scheduler.wait().await;
        scheduler.advance();
        assert_eq!(scheduler.next_deadline(), Some(start + PERIOD * 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_advance_skips_missed_periods() {
        let mut scheduler = TickScheduler::new(Duration::ZERO, PERIOD);
        scheduler.arm(FirstTick::AfterDueTime);

        tokio::time::sleep(PERIOD * 3 + Duration::from_secs(1)).await;
        scheduler.advance();

        assert_eq!(scheduler.next_deadline(), Some(Instant::now() + PERIOD));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_never_fires() {
        let mut scheduler = TickScheduler::new(Duration::ZERO, PERIOD);
        scheduler.arm(FirstTick::AfterDueTime);
        scheduler.disarm();
        scheduler.advance();

        assert!(!scheduler.is_armed());
        let fired = tokio::time::timeout(PERIOD * 10, scheduler.wait()).await;
        assert!(fired.is_err());
    }
}
