use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio::time::timeout;

use poolbench_common::{BenchError, ResourceClient, Result, Sample};

use crate::buffer::{SampleBuffer, SlotIssuer};
use crate::config::RunConfig;
use crate::progress::{progress_line, ProgressReporter};
use crate::report::BenchmarkReport;

type ProgressSink = Arc<dyn Fn(u32) + Send + Sync>;

/// Perform one acquire + execute cycle and time each phase.
///
/// Failures are captured in the returned sample and logged with the slot id;
/// they never propagate. `total_time` is the sum of both phases either way.
pub async fn run_one<C: ResourceClient>(client: &C, operation: &str, slot: usize) -> Sample {
    let acquire_start = Instant::now();
    let handle = match client.acquire().await {
        Ok(handle) => handle,
        Err(e) => {
            let connection_nanos = elapsed_nanos(acquire_start);
            tracing::warn!(slot, error = %e, "Request {slot} failed: {e}");
            return Sample::new(connection_nanos, 0, false);
        }
    };
    let connection_nanos = elapsed_nanos(acquire_start);

    let query_start = Instant::now();
    let outcome = client.execute(handle, operation).await;
    let query_nanos = elapsed_nanos(query_start);

    if let Err(e) = &outcome {
        tracing::warn!(slot, error = %e, "Request {slot} failed: {e}");
    }
    Sample::new(connection_nanos, query_nanos, outcome.is_ok())
}

fn elapsed_nanos(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

/// Runs `total_requests` request cycles on `threads` concurrent workers.
pub struct Dispatcher<C> {
    client: Arc<C>,
    config: RunConfig,
    on_progress: ProgressSink,
}

impl<C: ResourceClient> Dispatcher<C> {
    /// Progress thresholds are printed to stdout as `Progress: N%` unless
    /// replaced with [`Dispatcher::on_progress`].
    pub fn new(client: Arc<C>, config: RunConfig) -> Self {
        Self {
            client,
            config,
            on_progress: Arc::new(|percent: u32| println!("{}", progress_line(percent))),
        }
    }

    pub fn on_progress(mut self, sink: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_progress = Arc::new(sink);
        self
    }

    /// Drive the run to completion.
    ///
    /// Returns [`BenchError::TimedOut`] if the workers outlive `config.timeout`
    /// and [`BenchError::Interrupted`] if `shutdown` resolves first. Either way
    /// no new slots are issued and in-flight workers are aborted; the partial
    /// buffer is discarded.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<BenchmarkReport> {
        let total = self.config.total_requests as usize;
        let buffer = Arc::new(SampleBuffer::new(total));
        let progress = Arc::new(ProgressReporter::new(total as u64));
        let slots = Arc::new(SlotIssuer::new(total));
        let operation: Arc<str> = Arc::from(self.config.operation.as_str());

        tracing::info!(
            threads = self.config.threads,
            total_requests = total,
            operation = %operation,
            "starting benchmark"
        );

        let started = Instant::now();
        let mut workers = JoinSet::new();
        for _ in 0..self.config.threads {
            workers.spawn(drain_slots(
                self.client.clone(),
                operation.clone(),
                slots.clone(),
                buffer.clone(),
                progress.clone(),
                self.on_progress.clone(),
            ));
        }

        let ceiling = self.config.timeout;
        let outcome = tokio::select! {
            finished = timeout(ceiling, join_all(&mut workers)) => {
                finished.unwrap_or(Err(BenchError::TimedOut(ceiling.as_secs())))
            }
            _ = shutdown => Err(BenchError::Interrupted),
        };

        if let Err(e) = outcome {
            slots.close();
            workers.abort_all();
            while workers.join_next().await.is_some() {}
            tracing::error!(
                completed = progress.completed(),
                total_requests = total,
                "{e}"
            );
            return Err(e);
        }

        tracing::info!(written = buffer.written_count(), "benchmark finished");
        Ok(BenchmarkReport {
            total_requests: self.config.total_requests,
            samples: buffer.snapshot(),
            elapsed: started.elapsed(),
        })
    }
}

/// Worker loop: claim slots until none are left, one full cycle per slot.
/// The sample is written before progress is counted.
async fn drain_slots<C: ResourceClient>(
    client: Arc<C>,
    operation: Arc<str>,
    slots: Arc<SlotIssuer>,
    buffer: Arc<SampleBuffer>,
    progress: Arc<ProgressReporter>,
    on_progress: ProgressSink,
) -> Result<()> {
    while let Some(slot) = slots.next_slot() {
        let sample = run_one(client.as_ref(), &operation, slot).await;
        buffer.record(slot, sample)?;
        progress.on_completion_with(|percent| on_progress(percent));
    }
    Ok(())
}

async fn join_all(workers: &mut JoinSet<Result<()>>) -> Result<()> {
    while let Some(joined) = workers.join_next().await {
        joined.map_err(|e| BenchError::WorkerFailed(e.to_string()))??;
    }
    Ok(())
}
