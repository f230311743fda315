use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// An executable task body, captured at registration time and invoked with
/// no arguments on its own tokio task.
///
/// Implement it on a named type, or pass an async closure directly — the
/// blanket impl below covers `Fn() -> Future<Output = anyhow::Result<()>>`.
#[async_trait]
pub trait TaskAction: Send + Sync {
    async fn run(&self) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> TaskAction for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn run(&self) -> anyhow::Result<()> {
        (self)().await
    }
}

/// A registered task.
///
/// `last_fired` is written only by the engine loop, never by a dispatcher,
/// so it needs no synchronization: the engine owns the registry outright.
pub struct TaskDefinition {
    /// Unique name across the registry.
    pub name: String,
    /// Raw cron expression, kept for log context.
    pub cron: String,
    /// Parsed form, validated at registration.
    pub(crate) schedule: cron::Schedule,
    /// Disabled tasks are skipped entirely during tick evaluation.
    pub enabled: bool,
    /// Anchor for the next-occurrence computation. `None` until the loop
    /// first sees the task (or after a missed slot resets it).
    pub(crate) last_fired: Option<DateTime<Utc>>,
    pub(crate) action: Arc<dyn TaskAction>,
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("name", &self.name)
            .field("cron", &self.cron)
            .field("enabled", &self.enabled)
            .field("last_fired", &self.last_fired)
            .finish_non_exhaustive()
    }
}

/// Dedup token for one firing: a due second paired with the task name.
///
/// Present in the engine's in-flight set exactly while that instant's
/// firing is pending or running.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FireKey {
    second: i64,
    name: String,
}

impl FireKey {
    pub fn new(at: DateTime<Utc>, name: &str) -> Self {
        Self {
            second: at.timestamp(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for FireKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.second, self.name)
    }
}
