// rust/pager-core/src/task.rs

//! Background tasks for page fetching.
//!
//! A fetch is submitted with [`spawn`], which hands the work to an
//! [`Executor`] and returns a [`TaskHandle`]. The handle is a single-use
//! receiver: [`TaskHandle::wait`] blocks until the task has delivered its
//! result, and the delivery happens-before the return of `wait`.
//!
//! Tasks cannot be cancelled. Dropping a handle that was never waited on
//! orphans its task: the task still runs to completion and the result is
//! discarded when it tries to deliver it.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

use crate::error::{PagerError, Result};

/// A unit of work submitted to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs in the background.
pub trait Executor: Send + Sync {
    /// Submits a job. The job must eventually run unless an error is returned.
    fn execute(&self, job: Job) -> Result<()>;
}

/// Runs `work` on `executor` and returns a handle to its result.
///
/// If the executor refuses the job, the returned handle is already
/// completed with that error.
pub fn spawn<R, F>(executor: &dyn Executor, work: F) -> TaskHandle<R>
where
    R: Send + 'static,
    F: FnOnce() -> Result<R> + Send + 'static,
{
    let (sender, receiver) = channel::bounded(1);
    let job: Job = Box::new(move || {
        // The receiver is gone when the handle was dropped unawaited.
        let _ = sender.send(work());
    });

    match executor.execute(job) {
        Ok(()) => TaskHandle {
            receiver,
            outcome: None,
        },
        Err(e) => TaskHandle::completed(Err(e)),
    }
}

/// Single-assignment handle to the result of a background task.
#[derive(Debug)]
pub struct TaskHandle<R> {
    receiver: Receiver<Result<R>>,
    /// Result already taken off the channel by `is_finished`.
    outcome: Option<Result<R>>,
}

impl<R> TaskHandle<R> {
    /// A handle whose result is already available.
    pub fn completed(result: Result<R>) -> Self {
        Self {
            receiver: channel::never(),
            outcome: Some(result),
        }
    }

    /// Returns true once `wait` would return without blocking: the result
    /// was delivered, or the task ended without delivering one.
    pub fn is_finished(&mut self) -> bool {
        if self.outcome.is_none() {
            match self.receiver.try_recv() {
                Ok(result) => self.outcome = Some(result),
                Err(TryRecvError::Disconnected) => {
                    self.outcome = Some(Err(PagerError::Interrupted))
                }
                Err(TryRecvError::Empty) => {}
            }
        }
        self.outcome.is_some()
    }

    /// Blocks until the task delivers its result.
    ///
    /// A task that ends without delivering (its job panicked or was dropped
    /// by the executor) yields [`PagerError::Interrupted`].
    pub fn wait(self) -> Result<R> {
        match self.outcome {
            Some(result) => result,
            None => self
                .receiver
                .recv()
                .unwrap_or(Err(PagerError::Interrupted)),
        }
    }
}

/// Spawns one named OS thread per job.
#[derive(Debug, Clone)]
pub struct ThreadExecutor {
    thread_name: String,
}

impl ThreadExecutor {
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
        }
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new("pager-fetch")
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, job: Job) -> Result<()> {
        thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(job)
            .map(|_| ())
            .map_err(|e| PagerError::executor_with_source("failed to spawn fetch thread", e))
    }
}

/// Runs jobs one at a time, in submission order, on a single worker thread.
///
/// Clones share the worker. The worker exits once every clone is dropped
/// and the queued jobs have run.
#[derive(Debug, Clone)]
pub struct SerialExecutor {
    sender: Sender<Job>,
}

impl SerialExecutor {
    pub fn new(thread_name: impl Into<String>) -> Result<Self> {
        let (sender, receiver) = channel::unbounded::<Job>();
        thread::Builder::new()
            .name(thread_name.into())
            .spawn(move || {
                for job in receiver {
                    // A panicking job must not take the worker down with it.
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        tracing::warn!("Serial executor job panicked");
                    }
                }
            })
            .map_err(|e| PagerError::executor_with_source("failed to spawn serial worker", e))?;

        Ok(Self { sender })
    }
}

impl Executor for SerialExecutor {
    fn execute(&self, job: Job) -> Result<()> {
        self.sender
            .send(job)
            .map_err(|_| PagerError::executor("serial executor has shut down"))
    }
}

/// Runs jobs on a tokio runtime's blocking thread pool.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

#[cfg(feature = "tokio")]
impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is running in.
    ///
    /// Note: This must be called from within a tokio runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

#[cfg(feature = "tokio")]
impl Executor for TokioExecutor {
    fn execute(&self, job: Job) -> Result<()> {
        // Results travel through the task channel.
        drop(self.handle.spawn_blocking(job));
        Ok(())
    }
}
