use std::sync::Arc;
use std::time::Instant;

use dashmap::DashSet;
use tracing::{debug, error};

use crate::types::{FireKey, TaskAction};

/// Removes its fire key from the in-flight set when dropped, so the key is
/// released even if the action panics.
struct KeyGuard {
    key: FireKey,
    in_flight: Arc<DashSet<FireKey>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

/// Run `action` on its own tokio task.
///
/// The engine loop never awaits the spawned task. Failures are logged with
/// task-name context and do not propagate; no retry is attempted. The fire
/// key is released on completion regardless of outcome.
pub(crate) fn spawn_firing(
    name: &str,
    action: Arc<dyn TaskAction>,
    key: FireKey,
    in_flight: Arc<DashSet<FireKey>>,
) {
    let name = name.to_string();
    tokio::spawn(async move {
        let _guard = KeyGuard { key, in_flight };
        let started = Instant::now();
        match action.run().await {
            Ok(()) => {
                debug!(
                    task = %name,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "task completed"
                );
            }
            Err(e) => {
                error!(task = %name, error = %e, "task action failed");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::DateTime;

    use super::*;

    fn key_at(secs: i64, name: &str) -> FireKey {
        FireKey::new(DateTime::from_timestamp(secs, 0).unwrap(), name)
    }

    #[tokio::test(start_paused = true)]
    async fn key_removed_after_success() {
        let in_flight: Arc<DashSet<FireKey>> = Arc::new(DashSet::new());
        let key = key_at(100, "ok");
        assert!(in_flight.insert(key.clone()));

        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let action: Arc<dyn TaskAction> = Arc::new(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            }
        });

        spawn_firing("ok", action, key, Arc::clone(&in_flight));
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(in_flight.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn key_removed_after_failure() {
        let in_flight: Arc<DashSet<FireKey>> = Arc::new(DashSet::new());
        let key = key_at(101, "boom");
        assert!(in_flight.insert(key.clone()));

        async fn failing() -> anyhow::Result<()> {
            anyhow::bail!("simulated failure")
        }
        let action: Arc<dyn TaskAction> = Arc::new(failing);

        spawn_firing("boom", action, key, Arc::clone(&in_flight));
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(in_flight.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn key_removed_after_panic() {
        let in_flight: Arc<DashSet<FireKey>> = Arc::new(DashSet::new());
        let key = key_at(102, "panics");
        assert!(in_flight.insert(key.clone()));

        async fn panicking() -> anyhow::Result<()> {
            panic!("action panicked")
        }
        let action: Arc<dyn TaskAction> = Arc::new(panicking);

        spawn_firing("panics", action, key, Arc::clone(&in_flight));
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        // The drop guard runs during task unwinding.
        assert!(in_flight.is_empty());
    }

    #[test]
    fn insert_if_absent_is_exclusive() {
        let in_flight: DashSet<FireKey> = DashSet::new();
        assert!(in_flight.insert(key_at(103, "x")));
        assert!(!in_flight.insert(key_at(103, "x")));
        // A different second or name is a different key.
        assert!(in_flight.insert(key_at(104, "x")));
        assert!(in_flight.insert(key_at(103, "y")));
    }
}
