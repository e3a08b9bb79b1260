use anyhow::{anyhow, Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub(crate) const CAPTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub(crate) const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// The only geometry the playground ever draws: a 4-vertex triangle strip
/// covering normalized device coordinates on both axes, 3 floats per
/// vertex for the `position` attribute.
const QUAD_VERTICES: [f32; 12] = [
    -1.0, -1.0, 0.0, //
    -1.0, 1.0, 0.0, //
    1.0, -1.0, 0.0, //
    1.0, 1.0, 0.0, //
];

pub(crate) const QUAD_VERTEX_COUNT: u32 = 4;

/// Where a context's color output lands.
enum RenderTarget {
    /// Swapchain bound to a visible window.
    Swapchain {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    /// Fixed-size texture for synchronous readback.
    Offscreen {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
}

/// One frame's color attachment, presented when it came from a swapchain.
pub(crate) struct AcquiredFrame {
    pub view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl AcquiredFrame {
    pub fn present(self) {
        if let Some(frame) = self.surface_texture {
            frame.present();
        }
    }
}

struct DepthTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthTarget {
    fn new(device: &wgpu::Device, size: PhysicalSize<u32>) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth target"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// A rendering surface brought into a known drawable state: device and
/// queue, clear parameters, depth testing with nearer-or-equal compare,
/// and the uploaded full-screen quad.
///
/// Each playground surface owns its own `GpuContext`; the two never share
/// a device, so a failure poisoning one context cannot reach the other.
pub(crate) struct GpuContext {
    _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub size: PhysicalSize<u32>,
    pub format: wgpu::TextureFormat,
    pub quad_vertices: wgpu::Buffer,
    target: RenderTarget,
    depth: DepthTarget,
}

impl GpuContext {
    /// Initialises a context backed by a visible window surface.
    ///
    /// Fatal when no adapter or device can be acquired; there is no
    /// software-rendering fallback beyond whatever adapter wgpu selects.
    pub(crate) fn for_window<T>(target: &T, initial_size: PhysicalSize<u32>) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = new_instance();

        let window_handle = target
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;

        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = request_device(&adapter)?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Shader output is gamma-encoded already, so prefer a non-sRGB
        // swapchain format.
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .unwrap_or(surface_caps.present_modes[0]);

        let size = PhysicalSize::new(initial_size.width.max(1), initial_size.height.max(1));
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        tracing::debug!(?format, ?present_mode, "configured window surface");

        let depth = DepthTarget::new(&device, size);
        let quad_vertices = upload_quad(&device);
        let context = Self {
            _instance: instance,
            device,
            queue,
            size,
            format,
            quad_vertices,
            target: RenderTarget::Swapchain { surface, config },
            depth,
        };
        context.initial_clear();
        Ok(context)
    }

    /// Initialises a headless context rendering into a fixed-size texture
    /// that supports readback.
    pub(crate) fn offscreen(size: PhysicalSize<u32>) -> Result<Self> {
        let instance = new_instance();

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = request_device(&adapter)?;

        let size = PhysicalSize::new(size.width.max(1), size.height.max(1));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen color target"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CAPTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let depth = DepthTarget::new(&device, size);
        let quad_vertices = upload_quad(&device);
        let context = Self {
            _instance: instance,
            device,
            queue,
            size,
            format: CAPTURE_FORMAT,
            quad_vertices,
            target: RenderTarget::Offscreen { texture, view },
            depth,
        };
        context.initial_clear();
        Ok(context)
    }

    /// Acquires this frame's color attachment.
    pub(crate) fn begin_frame(&self) -> Result<AcquiredFrame, wgpu::SurfaceError> {
        match &self.target {
            RenderTarget::Swapchain { surface, .. } => {
                let frame = surface.get_current_texture()?;
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(AcquiredFrame {
                    view,
                    surface_texture: Some(frame),
                })
            }
            RenderTarget::Offscreen { view, .. } => Ok(AcquiredFrame {
                view: view.clone(),
                surface_texture: None,
            }),
        }
    }

    pub(crate) fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth.view
    }

    /// The offscreen color texture, when this context has one.
    pub(crate) fn readback_texture(&self) -> Option<&wgpu::Texture> {
        match &self.target {
            RenderTarget::Offscreen { texture, .. } => Some(texture),
            RenderTarget::Swapchain { .. } => None,
        }
    }

    /// Reconfigures the swapchain and depth target after a window resize.
    /// Offscreen contexts keep their fixed size.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        match &mut self.target {
            RenderTarget::Swapchain { surface, config } => {
                self.size = new_size;
                config.width = new_size.width;
                config.height = new_size.height;
                surface.configure(&self.device, config);
                self.depth = DepthTarget::new(&self.device, new_size);
            }
            RenderTarget::Offscreen { .. } => {
                tracing::debug!("ignoring resize of fixed-size offscreen context");
            }
        }
    }

    /// One clear pass before any program exists, so the surface shows the
    /// background color rather than stale memory.
    fn initial_clear(&self) {
        let frame = match self.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                // The first real frame clears anyway.
                tracing::warn!(error = %err, "skipping initial clear");
                return;
            }
        };
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("initial clear"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("initial clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}

fn new_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        backend_options: wgpu::BackendOptions::default(),
    })
}

fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
    let adapter_info = adapter.get_info();
    tracing::debug!(
        name = %adapter_info.name,
        backend = ?adapter_info.backend,
        device_type = ?adapter_info.device_type,
        "selected GPU adapter"
    );
    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("fraglab device"),
        required_features: wgpu::Features::empty(),
        required_limits: adapter.limits(),
        memory_hints: wgpu::MemoryHints::MemoryUsage,
        trace: wgpu::Trace::default(),
    }))
    .context("failed to create GPU device")
}

fn upload_quad(device: &wgpu::Device) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("fullscreen quad"),
        contents: bytemuck::cast_slice(&QUAD_VERTICES),
        usage: wgpu::BufferUsages::VERTEX,
    })
}
