use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

/// Distance between two announced thresholds, in percent.
pub const PROGRESS_STEP: u32 = 10;
const FINAL_THRESHOLD: u32 = 100;

/// The stdout line announcing a reached threshold.
pub fn progress_line(percent: u32) -> String {
    format!("Progress: {percent}%")
}

/// Counts finished requests and announces each 10% threshold exactly once.
///
/// Thresholds are claimed with a compare-and-swap on `next_threshold`, so each
/// one is owned by exactly one caller. Claiming and emitting happen under
/// `emit_lock`, which keeps announcements from concurrent workers in increasing
/// order on the output. Calls that cross no threshold never take the lock.
pub struct ProgressReporter {
    total: u64,
    completed: AtomicU64,
    next_threshold: AtomicU32,
    emit_lock: Mutex<()>,
}

impl ProgressReporter {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            completed: AtomicU64::new(0),
            next_threshold: AtomicU32::new(PROGRESS_STEP),
            emit_lock: Mutex::new(()),
        }
    }

    /// Record one finished request and return the thresholds this call claimed.
    pub fn on_completion(&self) -> Vec<u32> {
        let mut claimed = Vec::new();
        self.on_completion_with(|threshold| claimed.push(threshold));
        claimed
    }

    /// Record one finished request and pass every newly crossed threshold to
    /// `emit`, lowest first. A jump over several thresholds emits all of them.
    pub fn on_completion_with(&self, mut emit: impl FnMut(u32)) {
        let done = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        if self.total == 0 {
            return;
        }
        let percent = (done.min(self.total) * 100 / self.total) as u32;
        if percent < self.next_threshold.load(Ordering::Acquire) {
            return;
        }

        let _guard = self.emit_lock.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            let target = self.next_threshold.load(Ordering::Acquire);
            if target > FINAL_THRESHOLD || target > percent {
                break;
            }
            if self
                .next_threshold
                .compare_exchange(target, target + PROGRESS_STEP, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                emit(target);
            }
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}
