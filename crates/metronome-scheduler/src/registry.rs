use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Result, SchedulerError};
use crate::types::{TaskAction, TaskDefinition};

/// Explicit task registry, populated once at process start and then moved
/// into the engine, which becomes its sole owner (and the sole writer of
/// each task's `last_fired`).
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Vec<TaskDefinition>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under a unique name.
    ///
    /// The cron expression is validated here so the engine never sees an
    /// unparseable schedule; steady-state evaluation cannot fail on it.
    pub fn register<A>(
        &mut self,
        name: impl Into<String>,
        cron_expr: &str,
        enabled: bool,
        action: A,
    ) -> Result<()>
    where
        A: TaskAction + 'static,
    {
        let name = name.into();
        if self.tasks.iter().any(|t| t.name == name) {
            return Err(SchedulerError::DuplicateTask { name });
        }
        let schedule = cron::Schedule::from_str(cron_expr).map_err(|e| {
            SchedulerError::InvalidCronExpression {
                expr: cron_expr.to_string(),
                reason: e.to_string(),
            }
        })?;
        self.tasks.push(TaskDefinition {
            name,
            cron: cron_expr.to_string(),
            schedule,
            enabled,
            last_fired: None,
            action: Arc::new(action),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn tasks_mut(&mut self) -> impl Iterator<Item = &mut TaskDefinition> {
        self.tasks.iter_mut()
    }

    #[cfg(test)]
    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut TaskDefinition> {
        self.tasks.iter_mut().find(|t| t.name == name)
    }
}
