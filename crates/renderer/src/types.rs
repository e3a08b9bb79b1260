use std::path::PathBuf;
use std::time::Duration;

/// Identifies which of the two playground surfaces a value belongs to.
///
/// The playground owns exactly two surfaces for its whole lifetime: the
/// full-window preview and the small offscreen target that GIF frames are
/// read back from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRole {
    Live,
    Capture,
}

impl std::fmt::Display for SurfaceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceRole::Live => f.write_str("live"),
            SurfaceRole::Capture => f.write_str("capture"),
        }
    }
}

/// One half of a shader program. Drives diagnostic-slot selection and
/// log-prefix formatting instead of branching on raw stage constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl StageKind {
    pub fn label(self) -> &'static str {
        match self {
            StageKind::Vertex => "vertex",
            StageKind::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed parameters of a frame-capture run.
///
/// The frame count bounds how long the capture sequencer may borrow the
/// capture surface; the delay is export metadata only and never paces the
/// draw+readback loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Number of frames recorded per capture session.
    pub frame_count: usize,
    /// Frame delay stamped into the exported animation.
    pub frame_delay: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            frame_count: 10,
            frame_delay: Duration::from_millis(100),
        }
    }
}

/// Immutable configuration passed to the playground at start-up.
#[derive(Debug, Clone)]
pub struct PlaygroundConfig {
    /// Preview window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Offscreen capture surface size; fixed for the process lifetime.
    pub capture_size: (u32, u32),
    /// Destination path for exported GIFs.
    pub gif_path: PathBuf,
    /// Optional FPS cap for the preview window; `None` renders every
    /// host callback.
    pub target_fps: Option<f32>,
    /// Capture sequencer parameters.
    pub capture: CaptureSettings,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            surface_size: (1024, 768),
            capture_size: (200, 200),
            gif_path: PathBuf::from("fraglab.gif"),
            target_fps: None,
            capture: CaptureSettings::default(),
        }
    }
}
