use crate::metrics::{self, ChannelStats};
use poolbench_common::{Channel, Sample};
use std::io::{self, Write};
use std::time::Duration;

/// Result of a run that finished before the ceiling.
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    /// Requests the run was configured for; the success-rate denominator.
    pub total_requests: u32,
    /// Written samples, in slot order.
    pub samples: Vec<Sample>,
    /// Wall time from the first spawned worker to the last one joining.
    pub elapsed: Duration,
}

impl BenchmarkReport {
    pub fn success_count(&self) -> usize {
        metrics::success_count(&self.samples)
    }

    pub fn success_percent(&self) -> f64 {
        metrics::success_percent(self.success_count(), self.total_requests)
    }

    /// Written samples per second of wall time. 0 for an instant run.
    pub fn throughput_rps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.samples.len() as f64 / secs
    }

    pub fn channel(&self, channel: Channel) -> Option<ChannelStats> {
        metrics::aggregate(&self.samples, channel)
    }

    /// Render the success summary followed by one block per channel.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out)?;
        writeln!(
            out,
            "Successful requests: {}/{} ({:.2}%)",
            self.success_count(),
            self.total_requests,
            self.success_percent()
        )?;
        for channel in Channel::ALL {
            write_channel(out, channel.title(), &self.samples, self.channel(channel))?;
        }
        Ok(())
    }
}

fn write_channel<W: Write>(
    out: &mut W,
    title: &str,
    samples: &[Sample],
    stats: Option<ChannelStats>,
) -> io::Result<()> {
    if samples.is_empty() {
        return writeln!(out, "{title}: no samples collected.");
    }
    let Some(stats) = stats else {
        return writeln!(out, "{title}: no successful samples to report.");
    };

    writeln!(out)?;
    writeln!(out, "{title}:")?;
    writeln!(out, "  min: {:.3} ms", stats.min_ms)?;
    writeln!(out, "  max: {:.3} ms", stats.max_ms)?;
    writeln!(out, "  avg: {:.3} ms", stats.mean_ms)?;
    for (rank, value) in &stats.percentiles {
        writeln!(out, "  p{rank}: {value:.3} ms")?;
    }
    Ok(())
}
