use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Percentile ranks reported for every channel, in print order.
pub const PERCENTILES: [u32; 5] = [50, 75, 90, 95, 99];

/// How long the driver waits for the worker pool before giving up.
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 3_600;

pub const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Errors reported by a resource client for a single acquisition or execution.
/// These never abort a run; they become `success = false` samples.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientError {
    #[error("Timed out after {0} ms waiting for a connection")]
    AcquireTimeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}: {1}")]
    Status(u16, String),

    #[error("Connection validation failed: {0}")]
    Validation(String),
}

/// Configuration and run-level failures. Anything here ends the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BenchError {
    #[error("Invalid {name} value: {value}")]
    InvalidCount { name: &'static str, value: i64 },

    #[error("Invalid datasource configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read properties file: {0}")]
    Io(String),

    #[error("Sample slot {0} was written twice")]
    SlotAlreadyWritten(usize),

    #[error("Sample slot {0} is outside the buffer")]
    SlotOutOfRange(usize),

    #[error("Worker failed: {0}")]
    WorkerFailed(String),

    #[error("Execution timed out after {0} s.")]
    TimedOut(u64),

    #[error("Execution interrupted.")]
    Interrupted,
}

impl BenchError {
    /// Process exit status for this failure: 2 for usage/validation problems,
    /// 1 for everything that went wrong after the configuration was accepted.
    pub fn exit_code(&self) -> i32 {
        match self {
            BenchError::InvalidCount { .. } | BenchError::InvalidConfig(_) => 2,
            _ => 1,
        }
    }
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// One measured phase of a request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Connection,
    Query,
    Total,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Connection, Channel::Query, Channel::Total];

    pub fn title(&self) -> &'static str {
        match self {
            Channel::Connection => "Connection acquisition",
            Channel::Query => "Query execution",
            Channel::Total => "Total time",
        }
    }
}

/// Outcome of one request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sample {
    pub connection_time_nanos: u64,
    pub query_time_nanos: u64,
    /// Always `connection_time_nanos + query_time_nanos`, even for failures.
    pub total_time_nanos: u64,
    pub success: bool,
}

impl Sample {
    pub fn new(connection_time_nanos: u64, query_time_nanos: u64, success: bool) -> Self {
        Self {
            connection_time_nanos,
            query_time_nanos,
            total_time_nanos: connection_time_nanos.saturating_add(query_time_nanos),
            success,
        }
    }

    pub fn nanos(&self, channel: Channel) -> u64 {
        match channel {
            Channel::Connection => self.connection_time_nanos,
            Channel::Query => self.query_time_nanos,
            Channel::Total => self.total_time_nanos,
        }
    }
}

/// The narrow slice of a resource pool the harness measures.
///
/// `acquire` hands out a unit of work; dropping the handle returns it to the
/// pool. `execute` must fully consume whatever the operation produces so the
/// measured time reflects the real cost.
pub trait ResourceClient: Send + Sync + 'static {
    type Handle: Send;

    fn acquire(&self) -> impl Future<Output = std::result::Result<Self::Handle, ClientError>> + Send;

    fn execute(
        &self,
        handle: Self::Handle,
        operation: &str,
    ) -> impl Future<Output = std::result::Result<(), ClientError>> + Send;
}
