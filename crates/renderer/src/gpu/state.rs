use anyhow::{bail, Context as AnyhowContext, Result};
use image::RgbaImage;
use winit::dpi::PhysicalSize;

use crate::diagnostics::CompileDiagnostics;
use crate::time::TimeSample;
use crate::types::SurfaceRole;

use super::context::{AcquiredFrame, GpuContext, CLEAR_COLOR, QUAD_VERTEX_COUNT};
use super::pipeline::{compile_program, PipelineLayouts, ShaderProgram};
use super::uniforms::FrameParams;

/// One playground surface: a context brought into drawable state, the
/// currently linked program (absent until the first clean compile), and
/// the uniform plumbing every draw shares.
pub(crate) struct SurfaceState {
    context: GpuContext,
    layouts: PipelineLayouts,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniforms: FrameParams,
    program: Option<ShaderProgram>,
    diagnostics: CompileDiagnostics,
    role: SurfaceRole,
}

impl SurfaceState {
    pub(crate) fn new(context: GpuContext, role: SurfaceRole) -> Self {
        let layouts = PipelineLayouts::new(&context.device);
        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame uniform buffer"),
            size: std::mem::size_of::<FrameParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("frame uniform bind group"),
                layout: &layouts.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });
        let uniforms = FrameParams::new(context.size.width, context.size.height);

        Self {
            context,
            layouts,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
            program: None,
            diagnostics: CompileDiagnostics::default(),
            role,
        }
    }

    pub(crate) fn role(&self) -> SurfaceRole {
        self.role
    }

    pub(crate) fn diagnostics(&self) -> &CompileDiagnostics {
        &self.diagnostics
    }

    /// Recompiles this surface's program from the fixed vertex source and
    /// the given fragment source.
    ///
    /// The previous program is replaced only when the new one linked, so a
    /// broken edit keeps the last good program on screen. Diagnostics are
    /// overwritten on every attempt either way.
    pub(crate) fn recompile(&mut self, fragment_source: &str) -> &CompileDiagnostics {
        let build = compile_program(
            &self.context.device,
            &self.layouts,
            self.context.format,
            self.role,
            fragment_source,
        );
        self.diagnostics = build.diagnostics;
        if let Some(program) = build.program {
            self.program = Some(program);
        }
        &self.diagnostics
    }

    /// Draws one frame with the time uniform taken from `sample`.
    ///
    /// With no linked program yet the pass still clears, keeping the
    /// surface in a defined state.
    pub(crate) fn render(&mut self, sample: TimeSample) -> Result<(), wgpu::SurfaceError> {
        self.update_uniforms(sample);
        let frame = self.context.begin_frame()?;
        self.encode_and_submit(&frame);
        frame.present();
        Ok(())
    }

    /// Draws one frame and synchronously reads the color target back.
    ///
    /// Only offscreen surfaces support this; the capture sequencer calls
    /// it back-to-back without pacing, so the copy/map round trip blocks
    /// until the GPU catches up.
    pub(crate) fn render_to_image(&mut self, sample: TimeSample) -> Result<RgbaImage> {
        self.update_uniforms(sample);
        let Some(texture) = self.context.readback_texture() else {
            bail!("surface {} has no readback target", self.role);
        };

        let width = self.context.size.width;
        let height = self.context.size.height;
        let bytes_per_pixel = 4u32;
        let unpadded_bytes_per_row = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let staging = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame readback staging"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let frame = self
            .context
            .begin_frame()
            .map_err(|err| anyhow::anyhow!("failed to acquire capture frame: {err}"))?;
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("capture encoder"),
                });
        self.encode_draw(&mut encoder, &frame.view);
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (map_tx, map_rx) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = map_tx.send(result);
        });
        self.context
            .device
            .poll(wgpu::PollType::Wait)
            .context("device poll failed during readback")?;
        map_rx
            .recv()
            .context("readback mapping callback dropped")?
            .context("failed to map readback buffer")?;

        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in 0..height {
                let start = (row * padded_bytes_per_row) as usize;
                let end = start + unpadded_bytes_per_row as usize;
                pixels.extend_from_slice(&mapped[start..end]);
            }
        }
        staging.unmap();

        RgbaImage::from_raw(width, height, pixels)
            .context("readback produced a short pixel buffer")
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    fn update_uniforms(&mut self, sample: TimeSample) {
        self.uniforms
            .set_resolution(self.context.size.width, self.context.size.height);
        self.uniforms.set_time(sample);
        self.context.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&self.uniforms),
        );
    }

    fn encode_and_submit(&mut self, frame: &AcquiredFrame) {
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });
        self.encode_draw(&mut encoder, &frame.view);
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }

    fn encode_draw(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("render pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.context.depth_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_viewport(
            0.0,
            0.0,
            self.context.size.width as f32,
            self.context.size.height as f32,
            0.0,
            1.0,
        );
        if let Some(program) = &self.program {
            render_pass.set_pipeline(&program.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.context.quad_vertices.slice(..));
            render_pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
        }
    }
}
