//! GPU plumbing for the two playground surfaces.
//!
//! - `context` owns wgpu instance/device wiring for one surface — windowed
//!   swapchain or fixed-size offscreen target — and brings it into a known
//!   drawable state (clear parameters, depth target, quad upload).
//! - `pipeline` compiles both GLSL stages inside validation error scopes
//!   and links them into a render pipeline, harvesting per-stage logs.
//! - `uniforms` mirrors the injected `FrameParams` block.
//! - `state` glues them into `SurfaceState`: per-frame draw encoding and
//!   the synchronous readback path used by frame capture.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub(crate) use context::GpuContext;
pub(crate) use state::SurfaceState;
