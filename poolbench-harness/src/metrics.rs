use poolbench_common::{Channel, Sample, NANOS_PER_MILLI, PERCENTILES};

/// Latency statistics for one channel, in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStats {
    pub count: usize,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    /// `(rank, value)` in the order the ranks were requested.
    pub percentiles: Vec<(u32, f64)>,
}

impl ChannelStats {
    pub fn percentile(&self, rank: u32) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|(r, _)| *r == rank)
            .map(|(_, v)| *v)
    }
}

/// Statistics over the successful samples of `channel` for the default ranks.
/// Returns `None` when no sample succeeded.
pub fn aggregate(samples: &[Sample], channel: Channel) -> Option<ChannelStats> {
    aggregate_with(samples, channel, &PERCENTILES)
}

pub fn aggregate_with(samples: &[Sample], channel: Channel, ranks: &[u32]) -> Option<ChannelStats> {
    let mut values: Vec<f64> = samples
        .iter()
        .filter(|s| s.success)
        .map(|s| s.nanos(channel) as f64 / NANOS_PER_MILLI)
        .collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let count = values.len();
    // Summed in sorted order so the mean does not depend on input order.
    let mean_ms = values.iter().sum::<f64>() / count as f64;

    Some(ChannelStats {
        count,
        min_ms: values[0],
        max_ms: values[count - 1],
        mean_ms,
        percentiles: ranks.iter().map(|&r| (r, percentile(&values, r))).collect(),
    })
}

/// Linear interpolation between order statistics of an ascending slice.
///
/// The position is `rank / 100 * (n - 1)`; the result lies between the values
/// at `floor(pos)` and `ceil(pos)`, weighted by the fractional part. Ranks
/// above 100 are clamped. Returns 0 for an empty slice.
pub fn percentile(sorted: &[f64], rank: u32) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = f64::from(rank.min(100)) / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}

pub fn success_count(samples: &[Sample]) -> usize {
    samples.iter().filter(|s| s.success).count()
}

/// Successes as a percentage of the *planned* request count, so unfinished
/// requests count against the run.
pub fn success_percent(success_count: usize, total_requests: u32) -> f64 {
    if total_requests == 0 {
        return 0.0;
    }
    success_count as f64 * 100.0 / f64::from(total_requests)
}
