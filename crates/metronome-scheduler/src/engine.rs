use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashSet;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    config::SchedulerConfig,
    dispatch::spawn_firing,
    error::Result,
    registry::TaskRegistry,
    schedule::{next_occurrence, truncate_to_second},
    types::FireKey,
};

/// Core scheduler: polls the registry on a fixed cadence and dispatches due
/// tasks at ±1 s precision.
///
/// The engine owns the registry; `last_fired` is mutated only from the tick
/// loop. The in-flight fire-key set is the single piece of state shared with
/// dispatch tasks.
pub struct SchedulerEngine {
    registry: TaskRegistry,
    config: SchedulerConfig,
    /// Fire keys currently pending or running. Dispatch tasks remove their
    /// key on completion.
    in_flight: Arc<DashSet<FireKey>>,
}

impl SchedulerEngine {
    pub fn new(registry: TaskRegistry, config: SchedulerConfig) -> Self {
        Self {
            registry,
            config,
            in_flight: Arc::new(DashSet::new()),
        }
    }

    /// Number of firings currently pending or running.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Main event loop.
    ///
    /// Sleeps through the startup grace period, then polls every
    /// `tick_interval_ms` until `shutdown` broadcasts `true`. Cancellation
    /// is observed only at these await points — a tick in progress always
    /// completes, and in-flight firings run to completion independently.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(tasks = self.registry.len(), "scheduler engine started");

        if !self.startup_grace(&mut shutdown).await {
            info!("scheduler engine shutting down before first tick");
            return;
        }

        let mut interval = tokio::time::interval(std::time::Duration::from_millis(
            self.config.tick_interval_ms,
        ));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick(truncate_to_second(Utc::now())) {
                        error!("scheduler tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Wait out the startup grace period.
    ///
    /// Returns `false` if shutdown was requested while waiting. A watch
    /// update that does not request shutdown leaves the remaining grace
    /// intact — only a genuine stop interrupts the sleep.
    async fn startup_grace(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let grace = tokio::time::sleep(std::time::Duration::from_secs(
            self.config.startup_grace_secs,
        ));
        tokio::pin!(grace);
        // The watch guard from `wait_for` must be dropped before awaiting
        // again so the future stays Send, so any follow-up sleep happens
        // outside the select arm.
        let stop_requested = tokio::select! {
            _ = &mut grace => return true,
            res = shutdown.wait_for(|stop| *stop) => res.is_ok(),
        };
        if stop_requested {
            return false;
        }
        // Sender dropped without requesting shutdown; sleep out the
        // remainder.
        grace.await;
        true
    }

    /// Evaluate every enabled task against `now` (whole seconds) and
    /// dispatch the ones whose next occurrence is exactly `now`.
    ///
    /// Exposed so tests can drive the loop with explicit timestamps.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<()> {
        let grace = Duration::seconds(self.config.first_fire_grace_secs);
        for task in self.registry.tasks_mut() {
            if !task.enabled {
                continue;
            }

            // A task with no prior firing anchors at now + grace so it does
            // not fire the instant the loop first sees it.
            let anchor = *task.last_fired.get_or_insert(now + grace);

            let next = match next_occurrence(&task.schedule, anchor) {
                Some(next) => next,
                None => {
                    warn!(
                        task = %task.name,
                        cron = %task.cron,
                        "cron expression yields no future occurrence"
                    );
                    continue;
                }
            };

            if next < now {
                // The slot was missed (delayed tick or suspended process).
                // Re-anchor at the next tick's `now`; the missed occurrence
                // is dropped, never backfilled.
                debug!(task = %task.name, missed = %next, "missed slot, re-anchoring");
                task.last_fired = None;
                continue;
            }

            if next == now {
                let key = FireKey::new(now, &task.name);
                // Atomic insert-if-absent: exactly one dispatch per
                // (second, task) pair.
                if self.in_flight.insert(key.clone()) {
                    task.last_fired = Some(now);
                    spawn_firing(
                        &task.name,
                        Arc::clone(&task.action),
                        key,
                        Arc::clone(&self.in_flight),
                    );
                } else {
                    debug!(%key, "dispatch already in flight for this instant");
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn set_last_fired(&mut self, name: &str, t: Option<DateTime<Utc>>) {
        self.registry.get_mut(name).unwrap().last_fired = t;
    }

    #[cfg(test)]
    fn last_fired(&mut self, name: &str) -> Option<DateTime<Utc>> {
        self.registry.get_mut(name).unwrap().last_fired
    }

    #[cfg(test)]
    pub(crate) fn insert_key(&self, key: FireKey) -> bool {
        self.in_flight.insert(key)
    }
}
