use poolbench_common::{BenchError, Result, DEFAULT_RUN_TIMEOUT_SECS};
use std::time::Duration;

/// How the request count was given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestCount {
    /// Each worker's share; the run total is `threads × n`.
    PerThread(i64),
    /// Flat total across all workers.
    Total(i64),
}

/// Validated parameters of one benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub threads: u32,
    /// Pool size. Only used to warn about contention.
    pub connections: u32,
    pub total_requests: u32,
    pub operation: String,
    /// Ceiling on how long the driver waits for the workers.
    pub timeout: Duration,
}

impl RunConfig {
    /// Validate raw counts. `threads` defaults to `connections` when absent.
    pub fn new(
        connections: i64,
        threads: Option<i64>,
        requests: RequestCount,
        operation: impl Into<String>,
    ) -> Result<Self> {
        let connections = parse_positive(connections, "connections")?;
        let threads = match threads {
            Some(t) => parse_positive(t, "threads")?,
            None => connections,
        };
        let total_requests = match requests {
            RequestCount::PerThread(n) => {
                let per_thread = parse_positive(n, "requests per thread")?;
                threads.checked_mul(per_thread).ok_or(BenchError::InvalidCount {
                    name: "total requests",
                    value: i64::from(threads) * i64::from(per_thread),
                })?
            }
            RequestCount::Total(n) => parse_positive(n, "total requests")?,
        };

        let operation = operation.into();
        if operation.trim().is_empty() {
            return Err(BenchError::InvalidConfig("query must not be empty".to_string()));
        }

        Ok(Self {
            threads,
            connections,
            total_requests,
            operation,
            timeout: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Warning printed before the run when workers outnumber pooled connections.
    pub fn contention_warning(&self) -> Option<String> {
        (self.threads > self.connections).then(|| {
            format!(
                "Warning: threads ({}) exceed pool size ({}). This may cause contention.",
                self.threads, self.connections
            )
        })
    }
}

/// Accept `value` only if it is a positive count that fits in a `u32`.
pub fn parse_positive(value: i64, name: &'static str) -> Result<u32> {
    match u32::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(BenchError::InvalidCount { name, value }),
    }
}
