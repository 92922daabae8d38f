//! Bounded fan-out/fan-in executor shared by the resolve and copy stages.
//!
//! The calling thread feeds jobs into a bounded queue (blocking when it is
//! full) while `workers` tasks on a dedicated rayon pool drain it. Every job
//! yields exactly one [`Outcome`], sent over an unbounded channel so workers
//! never wait on the collector. Outcomes arrive in completion order.

use crate::options::IngestOptions;
use crossbeam_channel::Sender;
use std::path::Path;

/// Result of one unit of work.
#[derive(Debug)]
pub enum Outcome<T, S, E> {
    /// The job succeeded
    Done(T),
    /// The job was deliberately not performed
    Skipped(S),
    /// The job failed
    Failed(E),
}

/// Everything a pipeline run produced.
#[derive(Debug)]
pub struct Outcomes<T, S, E> {
    pub done: Vec<T>,
    pub skipped: Vec<S>,
    pub failed: Vec<E>,
    /// Dispatch stopped early because the cancel token was set
    pub cancelled: bool,
}

impl<T, S, E> Default for Outcomes<T, S, E> {
    fn default() -> Self {
        Self {
            done: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            cancelled: false,
        }
    }
}

impl<T, S, E> Outcomes<T, S, E> {
    fn push(&mut self, outcome: Outcome<T, S, E>) {
        match outcome {
            Outcome::Done(v) => self.done.push(v),
            Outcome::Skipped(v) => self.skipped.push(v),
            Outcome::Failed(v) => self.failed.push(v),
        }
    }
}

/// Best-effort status notifier.
///
/// Sends never block: if the channel is full or disconnected the message is dropped.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    sender: Option<Sender<String>>,
}

impl Progress {
    #[must_use]
    pub fn new(sender: Option<Sender<String>>) -> Self {
        Self { sender }
    }

    /// Send `"{action}: {file name}"`.
    pub fn file(&self, action: &str, path: &Path) {
        let Some(sender) = &self.sender else {
            return;
        };
        let name = path
            .file_name()
            .map_or_else(|| path.to_string_lossy(), |n| n.to_string_lossy());
        let _ = sender.try_send(format!("{action}: {name}"));
    }
}

/// A fixed number of workers fed through a bounded queue.
#[derive(Debug)]
pub struct WorkerPool<'a> {
    workers: usize,
    queue_capacity: usize,
    options: &'a IngestOptions,
}

impl<'a> WorkerPool<'a> {
    /// Size the pool from `options.workers` and `options.queue_capacity`.
    #[must_use]
    pub fn new(options: &'a IngestOptions) -> Self {
        Self {
            workers: options.workers.max(1),
            queue_capacity: options.queue_capacity.max(1),
            options,
        }
    }

    /// Apply `work` to every job and collect the outcomes.
    ///
    /// Checks the cancel token before dispatching each job; once it is set,
    /// no further jobs start and queued ones are discarded.
    pub fn run<J, T, S, E, I, F>(&self, jobs: I, work: F) -> Outcomes<T, S, E>
    where
        I: IntoIterator<Item = J>,
        J: Send,
        T: Send,
        S: Send,
        E: Send,
        F: Fn(J, &Progress) -> Outcome<T, S, E> + Sync,
    {
        let progress = Progress::new(self.options.progress.clone());
        let stage = Stage {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            options: self.options,
            progress: &progress,
            work: &work,
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("mediacopy-worker-{i}"))
            .build()
        {
            Ok(pool) => pool.in_place_scope(|scope| stage.drive(scope, jobs)),
            Err(e) => {
                self.options.warn(&format!(
                    "Failed to create thread pool ({e}), using global pool"
                ));
                rayon::in_place_scope(|scope| stage.drive(scope, jobs))
            }
        }
    }
}

struct Stage<'r, F> {
    workers: usize,
    queue_capacity: usize,
    options: &'r IngestOptions,
    progress: &'r Progress,
    work: &'r F,
}

impl<'r, F> Stage<'r, F> {
    fn drive<'scope, J, T, S, E, I>(&self, scope: &rayon::Scope<'scope>, jobs: I) -> Outcomes<T, S, E>
    where
        'r: 'scope,
        I: IntoIterator<Item = J>,
        J: Send + 'scope,
        T: Send + 'scope,
        S: Send + 'scope,
        E: Send + 'scope,
        F: Fn(J, &Progress) -> Outcome<T, S, E> + Sync,
    {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<J>(self.queue_capacity);
        let (result_tx, result_rx) = crossbeam_channel::unbounded();

        for _ in 0..self.workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let (options, progress, work) = (self.options, self.progress, self.work);
            scope.spawn(move |_| {
                for job in job_rx {
                    if options.is_cancelled() {
                        continue;
                    }
                    if result_tx.send(work(job, progress)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(result_tx);

        let mut outcomes = Outcomes::default();
        for job in jobs {
            if self.options.is_cancelled() {
                outcomes.cancelled = true;
                break;
            }
            if job_tx.send(job).is_err() {
                break;
            }
        }
        drop(job_tx);

        // Ends once every worker has dropped its sender.
        for outcome in result_rx {
            outcomes.push(outcome);
        }
        outcomes.cancelled |= self.options.is_cancelled();
        outcomes
    }
}
