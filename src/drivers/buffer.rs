use std::collections::VecDeque;
use crate::drivers::PipelineError;
/// Rolling window of the most recent display points, one series per channel.
///
/// Series are pushed and evicted together so every channel always shares the
/// same x axis.
pub struct DisplayBuffer {
    per_channel: Vec<VecDeque<[f64; 2]>>, // channel -> (x seconds, y)
    channel_names: Vec<String>,
    max_size: usize,
}
impl DisplayBuffer {
    pub fn new(channel_names: Vec<String>, max_size: usize) -> Self {
        let per_channel = channel_names
            .iter()
            .map(|_| VecDeque::with_capacity(max_size + 1))
            .collect();
        Self {
            per_channel,
            channel_names,
            max_size,
        }
    }
    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }
    pub fn len(&self) -> usize {
        self.per_channel.first().map(VecDeque::len).unwrap_or(0)
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn push(&mut self, time_ms: u64, values: &[f32]) -> Result<(), PipelineError> {
        if values.len() != self.per_channel.len() {
            return Err(PipelineError::ChannelCountMismatch {
                expected: self.per_channel.len(),
                actual: values.len(),
            });
        }
        let x = time_ms as f64 / 1000.0;
        for (series, &y) in self.per_channel.iter_mut().zip(values) {
            series.push_back([x, f64::from(y)]);
        }
        if self.len() > self.max_size {
            for series in &mut self.per_channel {
                series.pop_front();
            }
        }
        Ok(())
    }
    /// Newest point of every series, if any.
    pub fn latest(&self) -> Option<Vec<[f64; 2]>> {
        self.per_channel
            .iter()
            .map(|series| series.back().copied())
            .collect()
    }
    pub fn snapshot(&self) -> Vec<Vec<[f64; 2]>> {
        self.per_channel
            .iter()
            .map(|series| series.iter().copied().collect())
            .collect()
    }
}
