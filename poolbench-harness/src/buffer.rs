use poolbench_common::{BenchError, Result, Sample};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Fixed-capacity store of per-request samples, one slot per request.
///
/// Slots are write-once. Every slot index comes from a [`SlotIssuer`], which
/// hands each index out exactly once, so concurrent workers never target the
/// same cell and no lock is needed around individual writes. A second write to
/// a slot is still rejected rather than silently overwriting the first.
pub struct SampleBuffer {
    slots: Box<[OnceLock<Sample>]>,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| OnceLock::new()).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Store `sample` at `slot`. Fails if the slot is outside the buffer or
    /// already holds a sample.
    pub fn record(&self, slot: usize, sample: Sample) -> Result<()> {
        self.slots
            .get(slot)
            .ok_or(BenchError::SlotOutOfRange(slot))?
            .set(sample)
            .map_err(|_| BenchError::SlotAlreadyWritten(slot))
    }

    pub fn get(&self, slot: usize) -> Option<&Sample> {
        self.slots.get(slot).and_then(OnceLock::get)
    }

    /// Written samples in slot order. Unwritten slots (left behind by a
    /// cancelled run) are skipped, never reported as zero-latency failures.
    pub fn written(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.slots.iter().filter_map(OnceLock::get)
    }

    pub fn written_count(&self) -> usize {
        self.written().count()
    }

    /// Copy of every written sample, in slot order.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.written().copied().collect()
    }
}

/// Hands out slot indices `0..total`, each exactly once, in first-come order.
pub struct SlotIssuer {
    next: AtomicUsize,
    total: usize,
    closed: AtomicBool,
}

impl SlotIssuer {
    pub fn new(total: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            total,
            closed: AtomicBool::new(false),
        }
    }

    /// Claim the next free slot, or `None` once all slots are issued or the
    /// issuer has been closed.
    pub fn next_slot(&self) -> Option<usize> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        let slot = self.next.fetch_add(1, Ordering::AcqRel);
        (slot < self.total).then_some(slot)
    }

    /// Stop issuing slots. Requests already in flight keep their index.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of slots handed out so far.
    pub fn issued(&self) -> usize {
        self.next.load(Ordering::Acquire).min(self.total)
    }
}
