use crate::types::{DisplayPoint, Sample};
/// Rate gate between the acquisition loop and the display.
///
/// Every sample is offered; only every `stride()`-th one comes back out as a
/// [`DisplayPoint`]. The stride is `update_rate / sensor_rate`, clamped to 1.
#[derive(Debug)]
pub struct Downsampler {
    stride: u64,
    counter: u64,
    update_rate_ms: u64,
    device_timestamps: bool,
    clock_ms: u64,
}
impl Downsampler {
    pub fn new(update_rate_ms: u64, sensor_rate_ms: u64, device_timestamps: bool) -> Self {
        let stride = if sensor_rate_ms == 0 {
            1
        } else {
            (update_rate_ms / sensor_rate_ms).max(1)
        };
        Self {
            stride,
            counter: 0,
            update_rate_ms,
            device_timestamps,
            clock_ms: 0,
        }
    }
    pub fn stride(&self) -> u64 {
        self.stride
    }
    pub fn offer(&mut self, sample: &Sample) -> Option<DisplayPoint> {
        self.counter += 1;
        if self.counter < self.stride {
            return None;
        }
        self.counter = 0;
        let time_ms = if self.device_timestamps {
            sample.timestamp_ms
        } else {
            // Synthesized clock, one update period per forwarded point.
            self.clock_ms += self.update_rate_ms;
            self.clock_ms
        };
        Some(DisplayPoint {
            time_ms,
            values: sample.channels.clone(),
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn steady(n: u64) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample::new(i * 10, vec![i as f32]))
            .collect()
    }
    #[test]
    fn forwards_floor_total_over_stride() {
        for (update, sensor, total) in [(50, 10, 10), (50, 10, 13), (25, 10, 7), (100, 30, 31)] {
            let mut ds = Downsampler::new(update, sensor, true);
            let forwarded = steady(total).iter().filter_map(|s| ds.offer(s)).count() as u64;
            assert_eq!(forwarded, total / ds.stride(), "update={update} sensor={sensor}");
        }
    }
    #[test]
    fn stride_clamps_to_one_when_display_is_faster() {
        let mut ds = Downsampler::new(5, 10, true);
        assert_eq!(ds.stride(), 1);
        assert_eq!(steady(4).iter().filter_map(|s| ds.offer(s)).count(), 4);
    }
    #[test]
    fn device_timestamp_is_used_as_is() {
        let mut ds = Downsampler::new(50, 10, true);
        let times: Vec<u64> = steady(10)
            .iter()
            .filter_map(|s| ds.offer(s))
            .map(|p| p.time_ms)
            .collect();
        assert_eq!(times, vec![40, 90]);
    }
    #[test]
    fn synthesized_clock_advances_per_forward() {
        let mut ds = Downsampler::new(50, 10, false);
        let points: Vec<DisplayPoint> = steady(15).iter().filter_map(|s| ds.offer(s)).collect();
        let times: Vec<u64> = points.iter().map(|p| p.time_ms).collect();
        assert_eq!(times, vec![50, 100, 150]);
        // Values still come from the 5th, 10th and 15th samples.
        assert_eq!(points[0].values, vec![4.0]);
        assert_eq!(points[2].values, vec![14.0]);
    }
}
