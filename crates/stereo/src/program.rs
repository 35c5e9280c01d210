use shadertoy::VariableTable;
use tracing::{debug, warn};

use crate::compile::{compile_vertex_shader, create_scene_module, dump_wrapped, wrap_scene_fragment};
use crate::uniforms::uniform_layout;

/// Layouts and the shared fullscreen vertex stage for scene shaders.
pub(crate) struct ToyLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub vertex_module: wgpu::ShaderModule,
}

impl ToyLayouts {
    pub(crate) fn new(device: &wgpu::Device, channel_layout: &wgpu::BindGroupLayout) -> Self {
        let uniform = uniform_layout(device, "scene uniforms");
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene pipeline layout"),
            bind_group_layouts: &[&uniform, channel_layout],
            push_constant_ranges: &[],
        });
        let vertex_module = compile_vertex_shader(device);

        Self {
            uniform_layout: uniform,
            pipeline_layout,
            vertex_module,
        }
    }
}

/// A compiled scene shader, in flat and fulldome projection variants.
///
/// Both variants compile eagerly when the source changes. A variant that
/// fails validation is logged and left empty; drawing through it is a no-op
/// until the next successful compile.
pub(crate) struct ToyProgram {
    flat: Option<wgpu::RenderPipeline>,
    fulldome: Option<wgpu::RenderPipeline>,
}

impl ToyProgram {
    pub(crate) fn compile(
        device: &wgpu::Device,
        layouts: &ToyLayouts,
        label: &str,
        source: &str,
        table: &VariableTable,
        format: wgpu::TextureFormat,
    ) -> Self {
        let flat = compile_variant(device, layouts, label, source, table, format, false);
        let fulldome = compile_variant(device, layouts, label, source, table, format, true);
        if flat.is_some() && fulldome.is_some() {
            debug!(shader = label, "compiled scene shader");
        }

        Self { flat, fulldome }
    }

    /// No compiled code at all; used before the first source arrives.
    pub(crate) fn empty() -> Self {
        Self {
            flat: None,
            fulldome: None,
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.flat.is_some() || self.fulldome.is_some()
    }

    pub(crate) fn has_fulldome(&self) -> bool {
        self.fulldome.is_some()
    }

    /// The pipeline for the requested projection, falling back to the flat
    /// variant rather than dropping the scene entirely.
    pub(crate) fn pipeline(&self, fulldome: bool) -> Option<&wgpu::RenderPipeline> {
        if fulldome {
            self.fulldome.as_ref().or(self.flat.as_ref())
        } else {
            self.flat.as_ref()
        }
    }
}

fn compile_variant(
    device: &wgpu::Device,
    layouts: &ToyLayouts,
    label: &str,
    source: &str,
    table: &VariableTable,
    format: wgpu::TextureFormat,
    dome: bool,
) -> Option<wgpu::RenderPipeline> {
    let wrapped = wrap_scene_fragment(source, table, dome);
    let variant = if dome {
        format!("{label}.dome")
    } else {
        label.to_string()
    };

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = create_scene_module(device, &variant, &wrapped);
    let pipeline = fullscreen_pipeline(
        device,
        &layouts.pipeline_layout,
        &layouts.vertex_module,
        &module,
        format,
        &variant,
    );
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        warn!(
            shader = %variant,
            %error,
            "scene shader failed to compile; scene will not draw"
        );
        dump_wrapped(&variant, &wrapped);
        return None;
    }

    Some(pipeline)
}

pub(crate) fn fullscreen_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}
