pub(crate) mod cue;
pub(crate) mod dashboard;
pub(crate) mod floor;
pub(crate) mod gallery;
pub(crate) mod raymarch;

use shadertoy::{VariableTable, TEXTURE_CHANNELS};
use wgpu::naga::ShaderStage;
use wgpu::util::DeviceExt;

use crate::chassis::EyeCamera;
use crate::compile::create_glsl_module;
use crate::program::ToyProgram;
use crate::scene::{EyeDraw, SceneContext};
use crate::uniforms::{uniform_layout, ObjectUniforms, PerEyeUniform, ToyUniforms};

/// One compiled ray shader plus the per-eye uniforms and channel textures
/// it samples. Shared by the raymarch and gallery scenes.
pub(crate) struct ToyPass {
    label: String,
    program: ToyProgram,
    uniforms: PerEyeUniform<ToyUniforms>,
    channels: wgpu::BindGroup,
}

impl ToyPass {
    pub(crate) fn new(
        ctx: &mut SceneContext<'_>,
        label: &str,
        source: &str,
        table: &VariableTable,
    ) -> Self {
        let program = ToyProgram::compile(
            ctx.device,
            ctx.layouts,
            label,
            source,
            table,
            ctx.color_format,
        );
        let uniforms = PerEyeUniform::new(ctx.device, &ctx.layouts.uniform_layout, label);
        let channels = bind_table_channels(ctx, table);

        Self {
            label: label.to_string(),
            program,
            uniforms,
            channels,
        }
    }

    /// Recompiles both projection variants and rebinds channel textures.
    pub(crate) fn replace_source(
        &mut self,
        ctx: &mut SceneContext<'_>,
        label: &str,
        source: &str,
        table: &VariableTable,
    ) {
        self.label = label.to_string();
        self.program = ToyProgram::compile(
            ctx.device,
            ctx.layouts,
            label,
            source,
            table,
            ctx.color_format,
        );
        self.channels = bind_table_channels(ctx, table);
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.program.is_valid()
    }

    pub(crate) fn fulldome_ready(&self) -> bool {
        self.program.has_fulldome()
    }

    /// Draws the fullscreen triangle for one eye. A failed compile leaves
    /// no pipeline, and the draw quietly does nothing.
    pub(crate) fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'static>,
        draw: &EyeDraw<'_>,
        camera: &EyeCamera,
        table: &VariableTable,
    ) {
        let Some(pipeline) = self.program.pipeline(draw.fulldome) else {
            return;
        };

        let mut block = ToyUniforms::new();
        block.set_viewport(
            draw.viewport.x as f32,
            draw.viewport.y as f32,
            draw.viewport.width as f32,
            draw.viewport.height as f32,
        );
        block.set_camera(camera, draw.time);
        block.set_tunables(table);
        self.uniforms.write(draw.queue, draw.eye, &block);

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, self.uniforms.bind_group(draw.eye), &[]);
        pass.set_bind_group(1, &self.channels, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn bind_table_channels(ctx: &mut SceneContext<'_>, table: &VariableTable) -> wgpu::BindGroup {
    let names: [String; TEXTURE_CHANNELS] =
        std::array::from_fn(|channel| table.texture_filename(channel));
    ctx.textures.bind_channels(ctx.device, ctx.queue, &names)
}

/// Fixed-geometry pipeline used by the floor, dashboard, and cue scenes:
/// one vertex buffer, one uniform block, flat tint, alpha blended.
pub(crate) struct ObjectPipeline {
    pipeline: wgpu::RenderPipeline,
    uniforms: PerEyeUniform<ObjectUniforms>,
    vertices: wgpu::Buffer,
    vertex_count: u32,
}

impl ObjectPipeline {
    pub(crate) fn new(
        ctx: &SceneContext<'_>,
        label: &str,
        vertices: &[[f32; 3]],
        topology: wgpu::PrimitiveTopology,
    ) -> Self {
        let layout = uniform_layout(ctx.device, label);
        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });
        let vertex = create_glsl_module(ctx.device, label, OBJECT_VERTEX_GLSL, ShaderStage::Vertex);
        let fragment =
            create_glsl_module(ctx.device, label, OBJECT_FRAGMENT_GLSL, ShaderStage::Fragment);

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: Some("main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: 12,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x3,
                            offset: 0,
                            shader_location: 0,
                        }],
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology,
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
                    module: &fragment,
                    entry_point: Some("main"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.color_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            });

        let vertices_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        Self {
            pipeline,
            uniforms: PerEyeUniform::new(ctx.device, &layout, label),
            vertices: vertices_buffer,
            vertex_count: vertices.len() as u32,
        }
    }

    pub(crate) fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'static>,
        draw: &EyeDraw<'_>,
        block: &ObjectUniforms,
    ) {
        self.uniforms.write(draw.queue, draw.eye, block);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, self.uniforms.bind_group(draw.eye), &[]);
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.draw(0..self.vertex_count, 0..1);
    }
}

const OBJECT_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec3 position;

layout(std140, set = 0, binding = 0) uniform ObjectParams {
    mat4 _mvp;
    vec4 _tint;
    vec4 _params;
} ubo;

void main() {
    gl_Position = ubo._mvp * vec4(position, 1.0);
}
";

const OBJECT_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform ObjectParams {
    mat4 _mvp;
    vec4 _tint;
    vec4 _params;
} ubo;

void main() {
    outColor = ubo._tint;
}
";
