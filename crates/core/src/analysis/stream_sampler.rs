/// Once-per-second sampling tick for one logical video stream.
///
/// Owned by whoever feeds the stream; give each stream its own sampler so
/// their cadences stay independent. The tick only ever increases.
#[derive(Debug, Default)]
pub struct StreamSampler {
    tick: u64,
}

impl StreamSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one frame and report whether this frame should be analysed:
    /// true when the new tick is a multiple of `round(fps)`. An fps below 1
    /// samples every frame.
    pub fn tick(&mut self, fps: f64) -> bool {
        self.tick += 1;
        self.tick % sample_interval(fps) == 0
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }
}

/// Frames between samples at `fps`, at least 1.
pub fn sample_interval(fps: f64) -> u64 {
    if fps.is_finite() && fps >= 1.0 {
        fps.round() as u64
    } else {
        1
    }
}
