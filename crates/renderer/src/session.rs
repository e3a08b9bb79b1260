use anyhow::Result;
use tracing::{debug, info};
use winit::dpi::PhysicalSize;

use crate::diagnostics::DiagnosticsSink;
use crate::export::{CapturedFrame, FrameCaptureSession};
use crate::gpu::{GpuContext, SurfaceState};
use crate::time::TimeSource;
use crate::types::{CaptureSettings, StageKind, SurfaceRole};

/// Error surface of the capture sequencer.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// A capture session is already borrowing the capture surface. The
    /// request is rejected rather than queued so two sequencers can never
    /// interleave frames.
    #[error("a capture session is already in progress")]
    Busy,
    #[error("frame readback failed")]
    Readback(#[from] anyhow::Error),
}

/// Exclusive-borrow flag for the capture surface's draw calls.
///
/// While held, the render loop must not draw the capture surface; the
/// sequencer owns it. A plain flag is adequate because everything runs on
/// one cooperative thread.
#[derive(Debug, Default)]
struct CaptureGate {
    held: bool,
}

impl CaptureGate {
    fn try_begin(&mut self) -> Result<(), CaptureError> {
        if self.held {
            return Err(CaptureError::Busy);
        }
        self.held = true;
        Ok(())
    }

    fn end(&mut self) {
        self.held = false;
    }

    fn is_held(&self) -> bool {
        self.held
    }
}

/// Owns both playground surfaces and the capture-borrow state.
///
/// This is the single shader-source-of-truth point: every source change
/// flows through [`apply_fragment_source`] into both surfaces' compilers,
/// and every draw flows through [`render_tick`] or the capture sequencer.
///
/// [`apply_fragment_source`]: RenderingSession::apply_fragment_source
/// [`render_tick`]: RenderingSession::render_tick
pub struct RenderingSession {
    live: SurfaceState,
    capture: SurfaceState,
    gate: CaptureGate,
    settings: CaptureSettings,
}

impl RenderingSession {
    pub(crate) fn new(live: SurfaceState, capture: SurfaceState, settings: CaptureSettings) -> Self {
        Self {
            live,
            capture,
            gate: CaptureGate::default(),
            settings,
        }
    }

    /// Builds a session whose both surfaces are offscreen textures.
    ///
    /// The windowed playground goes through `window::run_playground`
    /// instead; this constructor serves headless use and integration
    /// tests, where no swapchain exists.
    pub fn offscreen_pair(
        live_size: (u32, u32),
        capture_size: (u32, u32),
        settings: CaptureSettings,
    ) -> Result<Self> {
        let live = SurfaceState::new(
            GpuContext::offscreen(PhysicalSize::new(live_size.0, live_size.1))?,
            SurfaceRole::Live,
        );
        let capture = SurfaceState::new(
            GpuContext::offscreen(PhysicalSize::new(capture_size.0, capture_size.1))?,
            SurfaceRole::Capture,
        );
        Ok(Self::new(live, capture, settings))
    }

    /// Recompiles both surfaces from one fragment source, live first.
    ///
    /// Both compilations always run: a failure on the live surface never
    /// blocks the capture surface's attempt. Stage diagnostics are
    /// published to the sink after each surface, so the sink ends up
    /// showing the capture surface's (identical-source) result.
    pub fn apply_fragment_source(&mut self, fragment_source: &str, sink: &mut dyn DiagnosticsSink) {
        for surface in [&mut self.live, &mut self.capture] {
            let role = surface.role();
            let diagnostics = surface.recompile(fragment_source);
            debug!(surface = %role, clean = diagnostics.is_clean(), "recompiled program");
            for stage in [StageKind::Vertex, StageKind::Fragment] {
                sink.publish(stage, diagnostics.message(stage));
            }
        }
    }

    /// One scheduling tick of the render loop: draw the live surface, then
    /// the capture surface unless a sequencer currently borrows it.
    pub fn render_tick(&mut self, time: &mut dyn TimeSource) -> Result<(), wgpu::SurfaceError> {
        self.live.render(time.sample())?;
        if !self.gate.is_held() {
            self.capture.render(time.sample())?;
        }
        Ok(())
    }

    /// Runs one frame-capture session on the capture surface.
    ///
    /// Draws exactly `frame_count` frames back-to-back, re-reading the
    /// clock before each draw and reading pixels back eagerly per
    /// iteration, so frame order and timestamps are independent of
    /// whatever the encoder does later. Rejects with [`CaptureError::Busy`]
    /// while another session holds the surface.
    pub fn capture(
        &mut self,
        time: &mut dyn TimeSource,
    ) -> Result<FrameCaptureSession, CaptureError> {
        self.gate.try_begin()?;
        let result = self.capture_frames(time);
        self.gate.end();

        let frames = result?;
        info!(frames = frames.len(), "capture session complete");
        Ok(FrameCaptureSession::new(frames, self.settings.frame_delay))
    }

    /// Whether the capture surface is currently borrowed by a sequencer.
    pub fn is_capturing(&self) -> bool {
        self.gate.is_held()
    }

    pub fn live_diagnostics(&self) -> &crate::diagnostics::CompileDiagnostics {
        self.live.diagnostics()
    }

    pub fn capture_diagnostics(&self) -> &crate::diagnostics::CompileDiagnostics {
        self.capture.diagnostics()
    }

    pub fn resize_live(&mut self, size: PhysicalSize<u32>) {
        self.live.resize(size);
    }

    fn capture_frames(&mut self, time: &mut dyn TimeSource) -> Result<Vec<CapturedFrame>> {
        let mut frames = Vec::with_capacity(self.settings.frame_count);
        for _ in 0..self.settings.frame_count {
            let sample = time.sample();
            let image = self.capture.render_to_image(sample)?;
            frames.push(CapturedFrame {
                image,
                timestamp_millis: sample.millis,
            });
        }
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_rejects_second_borrow() {
        let mut gate = CaptureGate::default();
        gate.try_begin().expect("first borrow");
        assert!(gate.is_held());
        assert!(matches!(gate.try_begin(), Err(CaptureError::Busy)));
    }

    #[test]
    fn gate_reopens_after_release() {
        let mut gate = CaptureGate::default();
        gate.try_begin().expect("first borrow");
        gate.end();
        assert!(!gate.is_held());
        gate.try_begin().expect("borrow after release");
    }
}
