//! Task queue
//!
//! Runs replay units either inline on the caller's thread (`Sync`) or on a
//! bounded pool of worker threads (`Async`). `shutdown` blocks until every
//! enqueued task has finished.
//!
//! A task that panics does not take its worker down. The panic is counted
//! and `shutdown` reports it as a queue failure.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

use super::errors::{LoaderError, LoaderResult};

/// A unit of work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Queued tasks per worker before `enqueue` blocks
const BACKLOG_PER_WORKER: usize = 4;

/// How queued tasks are executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QueuePolicy {
    /// Run each task on the enqueuing thread
    #[default]
    Sync,
    /// Run tasks on a fixed number of worker threads
    Async { workers: usize },
}

enum Execution {
    Inline,
    Pool {
        sender: SyncSender<Task>,
        workers: Vec<JoinHandle<()>>,
    },
}

/// Executor for replay units
pub struct TaskQueue {
    execution: Execution,
    panics: Arc<AtomicUsize>,
}

impl TaskQueue {
    /// Start a queue. `Async` spawns its workers immediately.
    pub fn new(policy: QueuePolicy) -> LoaderResult<Self> {
        let panics = Arc::new(AtomicUsize::new(0));

        let execution = match policy {
            QueuePolicy::Sync => Execution::Inline,
            QueuePolicy::Async { workers } => {
                if workers == 0 {
                    return Err(LoaderError::Queue("worker count must be positive".into()));
                }
                let (sender, receiver) = mpsc::sync_channel::<Task>(workers * BACKLOG_PER_WORKER);
                let receiver = Arc::new(Mutex::new(receiver));

                let mut handles = Vec::with_capacity(workers);
                for index in 0..workers {
                    let receiver = Arc::clone(&receiver);
                    let panics = Arc::clone(&panics);
                    let handle = thread::Builder::new()
                        .name(format!("docdao-loader-{}", index))
                        .spawn(move || work(&receiver, &panics))
                        .map_err(|e| LoaderError::Queue(format!("cannot spawn worker: {}", e)))?;
                    handles.push(handle);
                }

                Execution::Pool {
                    sender,
                    workers: handles,
                }
            }
        };

        Ok(Self { execution, panics })
    }

    /// Submit a task. Inline queues run it before returning.
    pub fn enqueue<F>(&self, task: F) -> LoaderResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.execution {
            Execution::Inline => {
                run(Box::new(task), &self.panics);
                Ok(())
            }
            Execution::Pool { sender, .. } => sender
                .send(Box::new(task))
                .map_err(|_| LoaderError::Queue("workers have exited".into())),
        }
    }

    /// Wait for every enqueued task, then stop the workers
    pub fn shutdown(self) -> LoaderResult<()> {
        if let Execution::Pool { sender, workers } = self.execution {
            drop(sender);
            for worker in workers {
                if worker.join().is_err() {
                    return Err(LoaderError::Queue("worker thread died".into()));
                }
            }
        }

        match self.panics.load(Ordering::SeqCst) {
            0 => Ok(()),
            n => Err(LoaderError::Queue(format!("{} task(s) panicked", n))),
        }
    }
}

fn work(receiver: &Mutex<Receiver<Task>>, panics: &AtomicUsize) {
    loop {
        let next = receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv();
        match next {
            Ok(task) => run(task, panics),
            Err(_) => break,
        }
    }
}

fn run(task: Task, panics: &AtomicUsize) {
    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
        panics.fetch_add(1, Ordering::SeqCst);
    }
}
