//! Post-to-owner-context capability for single-threaded rendering sinks

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::debug;
use std::time::Duration;

/// Deferred presentation work
pub type Job = Box<dyn FnOnce() + Send>;

/// Runs jobs on the context that owns the rendering sink.
///
/// `post` must not wait for the job to run.
pub trait PresentationContext: Send + Sync {
    fn post(&self, job: Job);
}

/// Cloneable posting handle for a [`PresentationQueue`]
#[derive(Clone)]
pub struct PresentationHandle {
    tx: Sender<Job>,
}

impl PresentationContext for PresentationHandle {
    fn post(&self, job: Job) {
        if self.tx.send(job).is_err() {
            debug!("presentation queue closed, dropping job");
        }
    }
}

/// Unbounded job queue drained by the owning thread
pub struct PresentationQueue {
    tx: Sender<Job>,
    rx: Receiver<Job>,
}

impl PresentationQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn handle(&self) -> PresentationHandle {
        PresentationHandle { tx: self.tx.clone() }
    }

    /// Jobs posted but not run yet
    pub fn backlog(&self) -> usize {
        self.rx.len()
    }

    /// Run every job already queued; returns how many ran
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Keep running jobs until none arrives for `idle`
    pub fn run_until_idle(&self, idle: Duration) -> usize {
        let mut ran = 0;
        loop {
            match self.rx.recv_timeout(idle) {
                Ok(job) => {
                    job();
                    ran += 1;
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return ran,
            }
        }
    }
}

impl Default for PresentationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationContext for PresentationQueue {
    fn post(&self, job: Job) {
        // the queue holds its own receiver, so sending cannot fail
        let _ = self.tx.send(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_jobs_run_only_when_drained() {
        let queue = PresentationQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            queue.handle().post(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(queue.backlog(), 3);

        assert_eq!(queue.run_pending(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_jobs_from_other_threads_keep_order() {
        let queue = PresentationQueue::new();
        let handle = queue.handle();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

        let poster = {
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                for i in 0..10 {
                    let seen = Arc::clone(&seen);
                    handle.post(Box::new(move || seen.lock().unwrap().push(i)));
                }
            })
        };
        poster.join().unwrap();

        queue.run_until_idle(Duration::from_millis(20));
        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_post_after_queue_dropped_is_harmless() {
        let queue = PresentationQueue::new();
        let handle = queue.handle();
        drop(queue);
        handle.post(Box::new(|| {}));
    }
}
