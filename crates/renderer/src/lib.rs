//! Renderer crate for fraglab, a live GLSL fragment-shader playground.
//!
//! Two surfaces — the full-window preview and a small offscreen capture
//! target — are driven by one fragment source of truth. The flow is:
//!
//! ```text
//!   editor file ──▶ FragmentSource ──▶ RenderingSession::apply_fragment_source
//!                                              │ (live, then capture)
//!                                              ▼
//!                         per-surface compile_program ──▶ DiagnosticsSink
//!
//!   winit tick ──▶ RenderingSession::render_tick ──▶ live draw [+ capture draw]
//!   `g` key    ──▶ RenderingSession::capture ──▶ 10 × draw+readback ──▶ GifExporter
//! ```
//!
//! Shader edits recompile both surfaces without interrupting rendering: a
//! broken edit keeps the previous program drawing and surfaces its
//! compiler log through the diagnostics sink. The capture sequencer
//! borrows the capture surface from the render loop for exactly one
//! 10-frame burst, then hands the frames to the GIF encoder.

mod compile;
mod diagnostics;
mod export;
mod gpu;
mod session;
mod source;
mod time;
mod types;
mod window;

pub use diagnostics::{format_stage_error, CompileDiagnostics, DiagnosticsSink, NullSink};
pub use export::{CapturedFrame, FrameCaptureSession, GifExporter};
pub use session::{CaptureError, RenderingSession};
pub use source::{FragmentSource, StaticSource, WatchedFile};
pub use time::{
    BoxedTimeSource, FixedTimeSource, SteppingTimeSource, SystemTimeSource, TimeSample,
    TimeSource, TIME_WRAP_MILLIS,
};
pub use types::{CaptureSettings, PlaygroundConfig, StageKind, SurfaceRole};
pub use window::run_playground;
