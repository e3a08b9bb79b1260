use tracing::warn;

use crate::compile::{create_fragment_module, create_vertex_module};
use crate::diagnostics::CompileDiagnostics;
use crate::types::{StageKind, SurfaceRole};

use super::context::DEPTH_FORMAT;

/// Bind group layout shared by every program compiled for one surface.
pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        Self { uniform_layout }
    }
}

/// The linked result of one vertex stage and one fragment stage, bound to
/// one surface's context. Replaced wholesale on every successful
/// recompile; never mutated.
pub(crate) struct ShaderProgram {
    pub pipeline: wgpu::RenderPipeline,
}

/// Outcome of one recompilation attempt.
///
/// `program` is `Some` only when both stages compiled and the link
/// succeeded; the diagnostics slots are filled either way.
pub(crate) struct ProgramBuild {
    pub program: Option<ShaderProgram>,
    pub diagnostics: CompileDiagnostics,
}

/// Compiles both shader stages and links them into a render pipeline.
///
/// Mirrors the permissive GL flow: each stage compiles independently with
/// its log captured into the matching diagnostic slot, and linking is
/// attempted even when a stage failed, so the link error scope reports the
/// failure in its own channel. Stage diagnostics go to the caller; link
/// diagnostics are logged only.
pub(crate) fn compile_program(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    color_format: wgpu::TextureFormat,
    role: SurfaceRole,
    fragment_source: &str,
) -> ProgramBuild {
    let mut diagnostics = CompileDiagnostics::default();

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let vertex_module = create_vertex_module(device);
    let vertex_error = pollster::block_on(device.pop_error_scope());
    record_stage(&mut diagnostics, StageKind::Vertex, role, vertex_error);

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let fragment_module = create_fragment_module(device, fragment_source);
    let fragment_error = pollster::block_on(device.pop_error_scope());
    record_stage(&mut diagnostics, StageKind::Fragment, role, fragment_error);

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("program layout"),
        bind_group_layouts: &[&layouts.uniform_layout],
        push_constant_ranges: &[],
    });

    // Link regardless of stage outcomes; a broken module simply makes the
    // link fail with its own diagnostic.
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("playground program"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &vertex_module,
            entry_point: Some("main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: (3 * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x3],
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });
    let link_error = pollster::block_on(device.pop_error_scope());

    let program = match link_error {
        Some(err) => {
            warn!(surface = %role, error = %err, "program link failed");
            None
        }
        None => Some(ShaderProgram { pipeline }),
    };

    ProgramBuild {
        program,
        diagnostics,
    }
}

fn record_stage(
    diagnostics: &mut CompileDiagnostics,
    stage: StageKind,
    role: SurfaceRole,
    error: Option<wgpu::Error>,
) {
    match error {
        Some(err) => {
            let log = err.to_string();
            warn!(surface = %role, stage = %stage, "shader stage failed to compile");
            diagnostics.record(stage, Some(&log));
        }
        None => diagnostics.record(stage, None),
    }
}
