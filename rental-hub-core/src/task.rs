//! Plumbing for running a role as a background tokio task.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{ShutdownMode, TaskError};

/// A handle to the background task running an actor.
/// Awaiting this will return the actor's final state or an error.
#[derive(Debug)]
pub struct ActorTask<T, E> {
    handle: JoinHandle<Result<T, E>>,
}

impl<T, E> ActorTask<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }
}

impl<T, E> ActorTask<T, E> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels the task. Awaiting it afterwards yields [`TaskError::Join`].
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl<T, E> Future for ActorTask<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(Ok(res))) => Poll::Ready(Ok(res)),
            Poll::Ready(Ok(Err(e))) => Poll::Ready(Err(TaskError::Actor(e))),
            Poll::Ready(Err(e)) => Poll::Ready(Err(TaskError::Join(e))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Creates a linked shutdown trigger (kept by handles) and signal (kept by the
/// actor).
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(None);
    (ShutdownTrigger { tx: Arc::new(tx) }, ShutdownSignal { rx })
}

/// Requests shutdown of an actor.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<Option<ShutdownMode>>>,
}

impl ShutdownTrigger {
    /// The first request wins; later requests are ignored.
    pub fn request(&self, mode: ShutdownMode) {
        self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(mode);
                true
            } else {
                false
            }
        });
    }

    pub fn graceful(&self) {
        self.request(ShutdownMode::Graceful);
    }

    pub fn immediate(&self) {
        self.request(ShutdownMode::Immediate);
    }
}

/// Resolves once shutdown has been requested.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<Option<ShutdownMode>>,
}

impl ShutdownSignal {
    pub fn current(&self) -> Option<ShutdownMode> {
        *self.rx.borrow()
    }

    /// Waits for a shutdown request. Never resolves if every trigger is
    /// dropped without requesting one.
    pub async fn requested(&mut self) -> ShutdownMode {
        loop {
            if let Some(mode) = *self.rx.borrow_and_update() {
                return mode;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn task_maps_actor_errors() {
        let ok: ActorTask<u32, String> = ActorTask::spawn(async { Ok(3) });
        assert_eq!(ok.await.unwrap(), 3);

        let failed: ActorTask<u32, String> = ActorTask::spawn(async { Err("boom".to_string()) });
        assert!(matches!(failed.await, Err(TaskError::Actor(e)) if e == "boom"));
    }

    #[tokio::test]
    async fn aborted_task_reports_join_error() {
        let task: ActorTask<(), ()> = ActorTask::spawn(std::future::pending());
        task.abort();
        assert!(matches!(task.await, Err(TaskError::Join(_))));
    }

    #[tokio::test]
    async fn first_shutdown_request_wins() {
        let (trigger, mut signal) = shutdown_channel();
        assert_eq!(signal.current(), None);

        trigger.graceful();
        trigger.immediate();

        assert_eq!(signal.requested().await, ShutdownMode::Graceful);
    }
}
