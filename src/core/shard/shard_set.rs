// src/core/shard/shard_set.rs

//! Owns the shard threads and the channels used to hand work to them.

use super::local::ShardLocal;
use crate::core::SpinelError;
use crate::core::metrics::SHARD_BROADCASTS_TOTAL;
use futures::future::join_all;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::runtime::Builder as TokioBuilder;
use tokio::sync::{mpsc, oneshot};
use tokio::task::LocalSet;
use tracing::{debug, error, info};

type BriefFn = Arc<dyn Fn(u32) + Send + Sync>;

enum ShardTask {
    /// Run a short synchronous callback and acknowledge.
    Brief {
        f: BriefFn,
        done: oneshot::Sender<()>,
    },
    /// Spawn a task on the shard's local set.
    Spawn(Box<dyn FnOnce() + Send>),
    Shutdown,
}

#[derive(Debug)]
pub struct ShardSet {
    senders: Vec<mpsc::UnboundedSender<ShardTask>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for ShardTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShardTask::Brief { .. } => f.write_str("Brief"),
            ShardTask::Spawn(_) => f.write_str("Spawn"),
            ShardTask::Shutdown => f.write_str("Shutdown"),
        }
    }
}

impl ShardSet {
    /// Starts `count` shard threads.
    pub fn new(count: usize, interpreters_per_shard: usize) -> Result<Self, SpinelError> {
        let mut senders = Vec::with_capacity(count);
        let mut threads = Vec::with_capacity(count);

        for index in 0..count as u32 {
            let (tx, rx) = mpsc::unbounded_channel();
            let handle = thread::Builder::new()
                .name(format!("shard-{index}"))
                .spawn(move || shard_thread_main(index, interpreters_per_shard, rx))?;
            senders.push(tx);
            threads.push(handle);
        }

        info!("Started {} shard threads", count);
        Ok(Self {
            senders,
            threads: Mutex::new(threads),
        })
    }

    pub fn size(&self) -> usize {
        self.senders.len()
    }

    /// Runs `f(shard_index)` on every shard and waits until all of them have run it.
    ///
    /// The caller is suspended, not blocked, so this may be awaited from a task running on
    /// a shard: that shard's own event loop keeps serving the broadcast in the meantime.
    pub async fn await_brief<F>(&self, f: F) -> Result<(), SpinelError>
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        let f: BriefFn = Arc::new(f);
        let mut pending = Vec::with_capacity(self.senders.len());
        for (index, tx) in self.senders.iter().enumerate() {
            let (done_tx, done_rx) = oneshot::channel();
            tx.send(ShardTask::Brief {
                f: Arc::clone(&f),
                done: done_tx,
            })
            .map_err(|_| SpinelError::ShardUnavailable(index as u32))?;
            pending.push(done_rx);
        }
        SHARD_BROADCASTS_TOTAL.inc();

        for (index, ack) in join_all(pending).await.into_iter().enumerate() {
            ack.map_err(|_| SpinelError::ShardUnavailable(index as u32))?;
        }
        Ok(())
    }

    /// Runs an async job on the event loop of shard `index` and returns its result.
    ///
    /// The job is built on the shard itself, so the future it returns need not be `Send`.
    pub fn spawn_on<F, Fut, T>(&self, index: u32, f: F) -> Result<oneshot::Receiver<T>, SpinelError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + 'static,
        T: Send + 'static,
    {
        let tx = self
            .senders
            .get(index as usize)
            .ok_or(SpinelError::ShardUnavailable(index))?;
        let (result_tx, result_rx) = oneshot::channel();
        let job = Box::new(move || {
            tokio::task::spawn_local(async move {
                let _ = result_tx.send(f().await);
            });
        });
        tx.send(ShardTask::Spawn(job))
            .map_err(|_| SpinelError::ShardUnavailable(index))?;
        Ok(result_rx)
    }

    /// Stops every shard and joins its thread. Safe to call more than once.
    pub fn shutdown(&self) {
        for tx in &self.senders {
            let _ = tx.send(ShardTask::Shutdown);
        }
        let current = thread::current().id();
        let handles: Vec<_> = self.threads.lock().drain(..).collect();
        for handle in handles {
            // A shard cannot join itself.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("A shard thread panicked during shutdown");
            }
        }
    }
}

fn shard_thread_main(
    index: u32,
    interpreters_per_shard: usize,
    mut rx: mpsc::UnboundedReceiver<ShardTask>,
) {
    let runtime = match TokioBuilder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Shard {} failed to build its runtime: {}", index, e);
            return;
        }
    };

    ShardLocal::install(index, interpreters_per_shard);
    debug!("Shard {} running", index);

    let local_set = LocalSet::new();
    runtime.block_on(local_set.run_until(async move {
        while let Some(task) = rx.recv().await {
            match task {
                ShardTask::Brief { f, done } => {
                    f(index);
                    let _ = done.send(());
                }
                ShardTask::Spawn(job) => job(),
                ShardTask::Shutdown => break,
            }
        }
    }));

    // Drop local tasks before the shard state they may reference.
    drop(local_set);
    ShardLocal::uninstall();
    info!("Shard {} stopped", index);
}
