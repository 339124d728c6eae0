//! Cadence Scheduler
//!
//! Each schedule entry is an independent interval timer. All timers share
//! one deduplicator behind an async mutex; a tick that finds it held skips
//! its cycle instead of queueing, so cycles never overlap.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{Duration, MissedTickBehavior};

use crate::config::ScheduleConfig;
use crate::dedup::Deduplicator;
use crate::error::Result;
use crate::pipeline::{CycleReport, CycleScope, Pipeline};

#[derive(Clone)]
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    dedup: Arc<Mutex<Deduplicator>>,
    schedule: Vec<ScheduleConfig>,
}

impl Scheduler {
    pub fn new(pipeline: Pipeline, dedup: Deduplicator, schedule: Vec<ScheduleConfig>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            dedup: Arc::new(Mutex::new(dedup)),
            schedule,
        }
    }

    pub fn dedup(&self) -> Arc<Mutex<Deduplicator>> {
        self.dedup.clone()
    }

    /// Run one cycle unless another is in flight. `None` means skipped.
    pub async fn tick(&self, scope: &CycleScope) -> Option<Result<CycleReport>> {
        let Ok(mut dedup) = self.dedup.try_lock() else {
            tracing::info!(cadence = %scope.name, "Previous cycle still running, skipping tick");
            return None;
        };
        let result = self.pipeline.run_cycle(&mut dedup, scope).await;
        if let Err(e) = &result {
            tracing::error!(cadence = %scope.name, error = %e, "Cycle failed");
        }
        Some(result)
    }

    /// Run every cadence once, in schedule order
    pub async fn run_once(&self) -> Vec<Result<CycleReport>> {
        let mut results = Vec::with_capacity(self.schedule.len());
        for entry in &self.schedule {
            if let Some(result) = self.tick(&CycleScope::from(entry)).await {
                results.push(result);
            }
        }
        results
    }

    /// Start one timer per cadence and run until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut tasks: JoinSet<()> = JoinSet::new();

        for entry in &self.schedule {
            let scheduler = self.clone();
            let scope = CycleScope::from(entry);
            let period = entry.period();
            tracing::info!(cadence = %scope.name, every_minutes = entry.every_minutes, "Cadence started");

            tasks.spawn(scheduler.run_cadence(scope, period));
        }

        shutdown.await;
        tracing::info!("Shutting down scheduler");
        tasks.shutdown().await;
    }

    async fn run_cadence(self, scope: CycleScope, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.tick(&scope).await;
        }
    }
}
