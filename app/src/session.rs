//! Per-channel session state owned by the orchestrator.

use std::future::Future;
use std::time::Duration;

use kick_client::ChannelInfo;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long a cancelled task may take to wind down before it is abandoned.
pub const CANCEL_GRACE: Duration = Duration::from_secs(2);

/// A spawned task paired with its cancellation token.
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Spawn `make(token)` on the current runtime.
    pub fn spawn<F, Fut>(name: &'static str, make: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let join = tokio::spawn(make(cancel.clone()));
        Self { name, cancel, join }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signal cancellation without waiting.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel and wait up to `grace` for the task to end. Panics and
    /// stragglers are logged, never propagated.
    pub async fn shutdown(self, slug: &str, grace: Duration) {
        self.cancel.cancel();
        let mut join = self.join;
        match tokio::time::timeout(grace, &mut join).await {
            Ok(Ok(())) => tracing::debug!(slug, task = self.name, "Task stopped"),
            Ok(Err(e)) => tracing::warn!(slug, task = self.name, error = %e, "Task ended abnormally"),
            Err(_) => {
                tracing::warn!(slug, task = self.name, "Task ignored cancellation, aborting");
                join.abort();
            }
        }
    }
}

/// One connected channel.
#[derive(Debug)]
pub struct ChannelSession {
    pub slug: String,
    /// Distinguishes this session from earlier ones with the same slug.
    pub id: u64,
    pub info: Option<ChannelInfo>,
    pub chatroom_id: Option<u64>,
    metadata_task: Option<TaskHandle>,
    listener_task: Option<TaskHandle>,
}

impl ChannelSession {
    pub fn new(slug: impl Into<String>, id: u64) -> Self {
        Self {
            slug: slug.into(),
            id,
            info: None,
            chatroom_id: None,
            metadata_task: None,
            listener_task: None,
        }
    }

    /// Install a metadata task, stopping any previous one first.
    pub async fn set_metadata_task(&mut self, task: TaskHandle) {
        if let Some(prev) = self.metadata_task.take() {
            prev.shutdown(&self.slug, CANCEL_GRACE).await;
        }
        self.metadata_task = Some(task);
    }

    /// Install a listener task, stopping any previous one first.
    pub async fn set_listener_task(&mut self, task: TaskHandle) {
        if let Some(prev) = self.listener_task.take() {
            prev.shutdown(&self.slug, CANCEL_GRACE).await;
        }
        self.listener_task = Some(task);
    }

    pub fn has_listener(&self) -> bool {
        self.listener_task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel both tasks and wait for them. Safe on a half-built session.
    pub async fn close(mut self, grace: Duration) {
        let tasks: Vec<TaskHandle> = [self.metadata_task.take(), self.listener_task.take()]
            .into_iter()
            .flatten()
            .collect();
        for task in &tasks {
            task.cancel();
        }
        let slug = self.slug;
        futures_util::future::join_all(tasks.into_iter().map(|t| t.shutdown(&slug, grace))).await;
        tracing::info!(slug = %slug, "Session closed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    fn cancellable(flag: Arc<AtomicBool>) -> TaskHandle {
        TaskHandle::spawn("test", move |cancel| async move {
            cancel.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn replacing_a_task_stops_the_previous_one() {
        let first = Arc::new(AtomicBool::new(false));
        let mut session = ChannelSession::new("xqc", 1);
        session.set_listener_task(cancellable(first.clone())).await;
        assert!(session.has_listener());

        session.set_listener_task(cancellable(Arc::new(AtomicBool::new(false)))).await;
        assert!(first.load(Ordering::SeqCst));
        assert!(session.has_listener());
    }

    #[tokio::test]
    async fn close_without_tasks_is_fine() {
        ChannelSession::new("empty", 1).close(CANCEL_GRACE).await;
    }

    #[tokio::test]
    async fn stubborn_task_is_aborted_after_grace() {
        let task = TaskHandle::spawn("stubborn", |_cancel| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        let started = tokio::time::Instant::now();
        task.shutdown("x", Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn close_cancels_both_tasks() {
        let meta = Arc::new(AtomicBool::new(false));
        let chat = Arc::new(AtomicBool::new(false));
        let mut session = ChannelSession::new("xqc", 2);
        session.set_metadata_task(cancellable(meta.clone())).await;
        session.set_listener_task(cancellable(chat.clone())).await;
        session.close(CANCEL_GRACE).await;
        assert!(meta.load(Ordering::SeqCst));
        assert!(chat.load(Ordering::SeqCst));
    }
}
