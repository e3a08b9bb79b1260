use bytemuck::{Pod, Zeroable};

use crate::time::TimeSample;

/// Frame uniform block shared by every playground shader.
///
/// The layout must match the `FrameParams` block injected by the fragment
/// prelude in `compile.rs`: std140, a vec2 followed by the wrapped time in
/// milliseconds and one pad float.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct FrameParams {
    resolution: [f32; 2],
    time: f32,
    _pad0: f32,
}

unsafe impl Zeroable for FrameParams {}
unsafe impl Pod for FrameParams {}

impl FrameParams {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            time: 0.0,
            _pad0: 0.0,
        }
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.resolution = [width as f32, height as f32];
    }

    pub fn set_time(&mut self, sample: TimeSample) {
        self.time = sample.uniform_millis();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_std140_block() {
        assert_eq!(std::mem::size_of::<FrameParams>(), 16);
        assert_eq!(std::mem::align_of::<FrameParams>(), 16);
    }

    #[test]
    fn time_uniform_is_wrapped() {
        let mut params = FrameParams::new(640, 480);
        params.set_time(TimeSample::new(12_345.0));
        assert_eq!(params.time, 2_345.0);
    }
}
