//! Bounded worker pool used to process dequeued messages off the consume loop.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{CourierError, Result};

/// Number of jobs submitted but not yet picked up by a worker
#[derive(Debug, Clone, Default)]
pub struct QueueDepth(Arc<AtomicUsize>);

impl QueueDepth {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn incr(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    fn decr(&self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Fixed set of tasks draining a bounded queue.
///
/// `submit` waits while the queue is full, so a producer that outruns the
/// workers is slowed down instead of piling up tasks.
pub struct WorkerPool<T> {
    sender: mpsc::Sender<T>,
    depth: QueueDepth,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn spawn<H, Fut>(workers: usize, capacity: usize, handler: H) -> Self
    where
        H: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn_with_depth(workers, capacity, QueueDepth::default(), handler)
    }

    /// Like [`WorkerPool::spawn`], reporting backlog through an existing gauge
    pub fn spawn_with_depth<H, Fut>(
        workers: usize,
        capacity: usize,
        depth: QueueDepth,
        handler: H,
    ) -> Self
    where
        H: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let handler = Arc::new(handler);

        let workers = (0..workers.max(1))
            .map(|id| {
                let receiver = receiver.clone();
                let handler = handler.clone();
                let depth = depth.clone();
                tokio::spawn(async move {
                    loop {
                        let job = { receiver.lock().await.recv().await };
                        match job {
                            Some(job) => {
                                depth.decr();
                                handler(job).await;
                            }
                            None => break,
                        }
                    }
                    debug!(worker = id, "Worker stopped");
                })
            })
            .collect();

        Self {
            sender,
            depth,
            workers,
        }
    }

    /// Queue a job, waiting for room if the queue is full
    pub async fn submit(&self, job: T) -> Result<()> {
        self.depth.incr();
        if self.sender.send(job).await.is_err() {
            self.depth.decr();
            return Err(CourierError::delivery_error("worker pool is shut down"));
        }
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn depth_gauge(&self) -> QueueDepth {
        self.depth.clone()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop accepting jobs, then wait for the queued ones to finish
    pub async fn shutdown(self) -> Result<()> {
        drop(self.sender);
        for worker in self.workers {
            worker.await?;
        }
        Ok(())
    }
}
