use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use tracing::{error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::Key;
use winit::window::WindowBuilder;

use crate::diagnostics::DiagnosticsSink;
use crate::export::GifExporter;
use crate::gpu::{GpuContext, SurfaceState};
use crate::session::{CaptureError, RenderingSession};
use crate::source::FragmentSource;
use crate::time::SystemTimeSource;
use crate::types::{PlaygroundConfig, SurfaceRole};

/// How often the editor collaborator is polled for changes.
const SOURCE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Runs the playground until the preview window closes.
///
/// The winit loop is the host frame scheduler: every `RedrawRequested` is
/// one render-loop tick, `AboutToWait` is the cooperative point where the
/// fragment source is polled and recompiles happen. Everything — draws,
/// recompilation, capture — executes on this one thread.
///
/// Pressing `g` in the preview window starts a capture session and
/// exports the resulting GIF to the configured path.
pub fn run_playground(
    config: PlaygroundConfig,
    mut source: Box<dyn FragmentSource>,
    mut sink: Box<dyn DiagnosticsSink>,
) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title("fraglab")
        .with_inner_size(PhysicalSize::new(
            config.surface_size.0,
            config.surface_size.1,
        ))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let live = SurfaceState::new(
        GpuContext::for_window(window.as_ref(), window.inner_size())?,
        SurfaceRole::Live,
    );
    let capture = SurfaceState::new(
        GpuContext::offscreen(PhysicalSize::new(
            config.capture_size.0,
            config.capture_size.1,
        ))?,
        SurfaceRole::Capture,
    );
    let mut session = RenderingSession::new(live, capture, config.capture);

    // Establish the first program on both surfaces before any frame is
    // drawn.
    let initial = source.current()?;
    session.apply_fragment_source(&initial, sink.as_mut());

    let mut time = SystemTimeSource::new();
    let exporter = GifExporter::default();
    let frame_budget = config
        .target_fps
        .filter(|fps| *fps > 0.0)
        .map(|fps| Duration::from_secs_f32(1.0 / fps));
    let mut next_frame_at = Instant::now();
    let mut last_source_poll = Instant::now();

    window.request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                }
                WindowEvent::Resized(new_size) => {
                    session.resize_live(new_size);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let is_capture_key = matches!(
                        event.logical_key,
                        Key::Character(ref value) if value.eq_ignore_ascii_case("g")
                    );
                    if event.state == ElementState::Pressed && !event.repeat && is_capture_key {
                        match session.capture(&mut time) {
                            Ok(frames) => {
                                if let Err(err) = exporter.export_to_path(&frames, &config.gif_path)
                                {
                                    error!(error = %err, "GIF export failed");
                                }
                            }
                            Err(CaptureError::Busy) => {
                                warn!("capture already in progress; request rejected");
                            }
                            Err(err) => {
                                error!(error = %err, "capture session failed");
                            }
                        }
                    }
                }
                WindowEvent::RedrawRequested => {
                    match session.render_tick(&mut time) {
                        Ok(()) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            session.resize_live(window.inner_size());
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            error!("surface out of memory; shutting down");
                            elwt.exit();
                        }
                        Err(err) => {
                            warn!(error = %err, "frame skipped");
                        }
                    }
                    if let Some(budget) = frame_budget {
                        next_frame_at = Instant::now() + budget;
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                if last_source_poll.elapsed() >= SOURCE_POLL_INTERVAL {
                    last_source_poll = Instant::now();
                    poll_source(source.as_mut(), &mut session, sink.as_mut());
                }

                let now = Instant::now();
                if now >= next_frame_at {
                    window.request_redraw();
                    elwt.set_control_flow(ControlFlow::Poll);
                } else {
                    // Wake early enough to keep polling the editor.
                    let wake_at = next_frame_at.min(now + SOURCE_POLL_INTERVAL);
                    elwt.set_control_flow(ControlFlow::WaitUntil(wake_at));
                }
            }
            _ => {}
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}

/// Checks the editor collaborator and recompiles both surfaces when it
/// reports an edit. Transient read failures (editor mid-save, file briefly
/// missing) are logged and retried on the next poll.
fn poll_source(
    source: &mut dyn FragmentSource,
    session: &mut RenderingSession,
    sink: &mut dyn DiagnosticsSink,
) {
    match source.poll_changed() {
        Ok(false) => {}
        Ok(true) => match source.current() {
            Ok(text) => {
                info!("fragment source changed; recompiling");
                session.apply_fragment_source(&text, sink);
            }
            Err(err) => warn!(error = %err, "failed to read fragment source"),
        },
        Err(err) => warn!(error = %err, "failed to poll fragment source"),
    }
}
