use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, error, warn};
use crate::error::{Error, Result};

/// Tracks the long-running tasks of the process.
///
/// ## Usage
/// ```rust,ignore
/// let mut supervisor = TaskSupervisor::new();
/// supervisor.spawn("scheduler", scheduler.run(cancel.clone()));
///
/// // Any task ending before shutdown is a failure.
/// supervisor.check_health()?;
///
/// cancel.cancel();
/// supervisor.shutdown(Duration::from_secs(10)).await;
/// ```
pub struct TaskSupervisor {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        TaskSupervisor {
            tasks: HashMap::new(),
        }
    }

    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> &mut Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(future);

        info!(task = %name, "Spawned background task");
        self.tasks.insert(name, handle);
        self
    }

    /// Fails if any task has finished; finished tasks stop being tracked.
    pub fn check_health(&mut self) -> Result<()> {
        let mut finished: Vec<String> = self.tasks.iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();

        if finished.is_empty() {
            return Ok(());
        }

        finished.sort();
        for name in &finished {
            self.tasks.remove(name);
        }

        let message = format!("tasks terminated unexpectedly: {}", finished.join(", "));
        error!("{}", message);
        Err(Error::TaskFailed(message))
    }

    pub fn active_task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every task to finish, aborting whatever is still running once
    /// `grace` has elapsed.
    pub async fn shutdown(&mut self, grace: Duration) {
        info!(tasks = self.tasks.len(), grace_ms = grace.as_millis() as u64, "Shutting down background tasks");
        let deadline = Instant::now() + grace;

        for (name, mut handle) in self.tasks.drain() {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => info!(task = %name, "Task finished"),
                Ok(Err(e)) => error!(task = %name, error = %e, "Task failed"),
                Err(_) => {
                    handle.abort();
                    warn!(task = %name, "Task did not finish in time, aborted");
                }
            }
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn finished_task_fails_health_check() {
        let mut supervisor = TaskSupervisor::new();
        supervisor.spawn("short", async {});
        supervisor.spawn("long", std::future::pending());

        tokio::time::sleep(Duration::from_millis(20)).await;
        let err = supervisor.check_health().unwrap_err();

        assert!(matches!(err, Error::TaskFailed(ref m) if m.contains("short")));
        assert_eq!(supervisor.active_task_count(), 1);
        supervisor.check_health().unwrap();
    }

    #[tokio::test]
    async fn shutdown_waits_for_cooperative_tasks_and_aborts_the_rest() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let mut supervisor = TaskSupervisor::new();
        supervisor
            .spawn("cooperative", async move { token.cancelled().await })
            .spawn("stubborn", std::future::pending());

        cancel.cancel();
        let started = Instant::now();
        supervisor.shutdown(Duration::from_millis(50)).await;

        assert_eq!(supervisor.active_task_count(), 0);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
