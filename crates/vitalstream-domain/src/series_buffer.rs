use crate::sample::{Sample, SeriesKey};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Process-wide accumulation buffer keyed by (device, sensor kind).
///
/// Flushing is opportunistic: it is evaluated on every append rather than
/// on a timer, and when it fires the ENTIRE buffer is flushed, not just the
/// series that triggered it. Every buffered series is downsampled and
/// emitted on the same clock.
pub struct SeriesBuffer {
    series: HashMap<SeriesKey, Vec<Sample>>,
    target_count: usize,
    flush_interval: Duration,
    last_flush: Instant,
}

impl SeriesBuffer {
    pub fn new(target_count: usize, flush_interval: Duration) -> Self {
        Self {
            series: HashMap::new(),
            target_count: target_count.max(1),
            flush_interval,
            last_flush: Instant::now(),
        }
    }

    /// Append one sample to its series, preserving receipt order.
    pub fn append(&mut self, sample: Sample) {
        self.series.entry(sample.series_key()).or_default().push(sample);
    }

    /// Flush if the interval since the last flush has elapsed.
    pub fn flush_due(&mut self) -> Option<Vec<Sample>> {
        if self.last_flush.elapsed() >= self.flush_interval {
            Some(self.flush_now())
        } else {
            None
        }
    }

    /// Downsample every buffered series, clear the whole buffer and reset
    /// the flush clock.
    pub fn flush_now(&mut self) -> Vec<Sample> {
        let mut emitted = Vec::new();
        for samples in self.series.values() {
            emitted.extend(downsample(samples, self.target_count));
        }
        self.series.clear();
        self.last_flush = Instant::now();
        emitted
    }

    /// Number of distinct buffered series.
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Total buffered samples across all series.
    pub fn buffered_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }
}

/// Reduce one series to at most `target` representative points.
///
/// Picks evenly stepped samples starting at the first, then forces the last
/// emitted sample to equal the most recent reading so recency is never lost.
pub fn downsample(samples: &[Sample], target: usize) -> Vec<Sample> {
    if samples.len() <= target {
        return samples.to_vec();
    }
    let step = samples.len() / target;
    let mut picked: Vec<Sample> = samples.iter().step_by(step).take(target).cloned().collect();
    if let (Some(slot), Some(newest)) = (picked.last_mut(), samples.last()) {
        *slot = newest.clone();
    }
    picked
}
