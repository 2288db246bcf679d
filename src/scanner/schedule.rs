use crate::config::ScanStrategy;
use std::future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};

/// Source of sampling ticks. Suspending the loop never drops it.
pub enum ScanSchedule {
    Interval {
        period: Duration,
        timer: Option<Interval>,
    },
    PerFrame {
        frames: Option<watch::Receiver<u64>>,
    },
}

impl ScanSchedule {
    pub fn new(strategy: ScanStrategy, period: Duration) -> Self {
        match strategy {
            ScanStrategy::Interval => ScanSchedule::Interval {
                period,
                timer: None,
            },
            ScanStrategy::PerFrame => ScanSchedule::PerFrame { frames: None },
        }
    }

    pub fn strategy(&self) -> ScanStrategy {
        match self {
            ScanSchedule::Interval { .. } => ScanStrategy::Interval,
            ScanSchedule::PerFrame { .. } => ScanStrategy::PerFrame,
        }
    }

    /// Follow the frame notifications of a newly live camera
    pub fn attach_frames(&mut self, receiver: Option<watch::Receiver<u64>>) {
        if let ScanSchedule::PerFrame { frames } = self {
            *frames = receiver;
        }
    }

    /// Restart the period so the first tick after a resume is not a stale one
    pub fn reset(&mut self) {
        if let ScanSchedule::Interval { timer, .. } = self {
            *timer = None;
        }
    }

    /// Wait for the next tick. Pends forever when there is nothing to follow.
    pub async fn next_tick(&mut self) {
        match self {
            ScanSchedule::Interval { period, timer } => {
                let timer = timer.get_or_insert_with(|| {
                    let mut interval =
                        tokio::time::interval_at(tokio::time::Instant::now() + *period, *period);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    interval
                });
                timer.tick().await;
            }
            ScanSchedule::PerFrame { frames } => {
                let Some(receiver) = frames.as_mut() else {
                    return future::pending().await;
                };
                if receiver.changed().await.is_err() {
                    *frames = None;
                    future::pending::<()>().await;
                }
            }
        }
    }
}
