use bytemuck::{Pod, Zeroable};
use tracing::{info, warn};
use wgpu::naga::ShaderStage;
use wgpu::util::DeviceExt;

use hmd::{DistortionMesh, Eye, HmdDevice, HmdError, MESH_GRID};

use crate::compile::{compile_vertex_shader, create_glsl_module};
use crate::program::fullscreen_pipeline;
use crate::target::{eye_viewport, RenderTarget};
use crate::types::PresenterKind;
use crate::uniforms::{uniform_layout, MeshUniforms, PerEyeUniform};

/// Final hop from the shared render target to the window surface.
///
/// Implementations record exactly one render pass; the caller owns the
/// encoder and submits everything in one go.
pub(crate) trait Presenter {
    fn kind(&self) -> &'static str;

    /// The render target was recreated; sampling bind groups must follow.
    fn rebind_target(&mut self, device: &wgpu::Device, target: &RenderTarget);

    fn present(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        surface_view: &wgpu::TextureView,
        target_size: (u32, u32),
        cinemascope: f32,
    );
}

/// Picks the presentation path for the attached device.
///
/// `Auto` takes the runtime compositor when the device has one, otherwise
/// the client warp mesh. A mesh request without a usable lens profile falls
/// back to the plain blit with a warning rather than failing the viewer.
pub(crate) fn negotiate(
    kind: PresenterKind,
    hmd: &dyn HmdDevice,
    device: &wgpu::Device,
    surface_format: wgpu::TextureFormat,
    target: &RenderTarget,
) -> Box<dyn Presenter> {
    let caps = hmd.capabilities();
    let want_mesh = match kind {
        PresenterKind::Mesh => true,
        PresenterKind::Compositor => false,
        PresenterKind::Auto => !caps.compositor && caps.mesh_profile,
    };

    let presenter: Box<dyn Presenter> = if want_mesh {
        match MeshPresenter::new(device, surface_format, target, hmd) {
            Ok(mesh) => Box::new(mesh),
            Err(err) => {
                warn!(error = %err, "warp mesh unavailable; falling back to fullscreen blit");
                Box::new(CompositorPresenter::new(device, surface_format, target))
            }
        }
    } else {
        Box::new(CompositorPresenter::new(device, surface_format, target))
    };
    info!(hmd = %caps.name, presenter = presenter.kind(), "presentation path selected");
    presenter
}

fn target_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("present sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

fn target_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("present target layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

fn bind_target(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    target: &RenderTarget,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("present target"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&target.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn surface_pass<'enc>(
    encoder: &'enc mut wgpu::CommandEncoder,
    surface_view: &'enc wgpu::TextureView,
    label: &str,
) -> wgpu::RenderPass<'enc> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: surface_view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

/// Hands the side-by-side target to the display as-is; lens correction is
/// the runtime compositor's job (or absent, for a flat desktop window).
pub(crate) struct CompositorPresenter {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    bind_group: wgpu::BindGroup,
}

impl CompositorPresenter {
    pub(crate) fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        target: &RenderTarget,
    ) -> Self {
        let layout = target_layout(device);
        let sampler = target_sampler(device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("compositor blit"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let vertex = compile_vertex_shader(device);
        let fragment = create_glsl_module(
            device,
            "compositor blit fragment",
            BLIT_FRAGMENT_GLSL,
            ShaderStage::Fragment,
        );
        let pipeline = fullscreen_pipeline(
            device,
            &pipeline_layout,
            &vertex,
            &fragment,
            surface_format,
            "compositor blit",
        );
        let bind_group = bind_target(device, &layout, &sampler, target);

        Self {
            pipeline,
            layout,
            sampler,
            bind_group,
        }
    }
}

impl Presenter for CompositorPresenter {
    fn kind(&self) -> &'static str {
        "compositor blit"
    }

    fn rebind_target(&mut self, device: &wgpu::Device, target: &RenderTarget) {
        self.bind_group = bind_target(device, &self.layout, &self.sampler, target);
    }

    fn present(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        _queue: &wgpu::Queue,
        surface_view: &wgpu::TextureView,
        _target_size: (u32, u32),
        _cinemascope: f32,
    ) {
        let mut pass = surface_pass(encoder, surface_view, "blit pass");
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

/// GPU copy of one eye's warp mesh.
struct EyeMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct WarpVertex {
    position: [f32; 2],
    uv_red: [f32; 2],
    uv_green: [f32; 2],
    uv_blue: [f32; 2],
    vignette: f32,
}

unsafe impl Zeroable for WarpVertex {}
unsafe impl Pod for WarpVertex {}

/// Client-side lens correction: per-eye precomputed warp meshes with
/// chromatic aberration baked into three UV channels.
pub(crate) struct MeshPresenter {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    bind_group: wgpu::BindGroup,
    uniforms: PerEyeUniform<MeshUniforms>,
    eyes: Vec<EyeMesh>,
}

impl MeshPresenter {
    pub(crate) fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        target: &RenderTarget,
        hmd: &dyn HmdDevice,
    ) -> Result<Self, HmdError> {
        let mut eyes = Vec::with_capacity(Eye::COUNT);
        for eye in Eye::pair() {
            let profile = hmd.distortion_profile(eye)?;
            let mesh = DistortionMesh::for_profile(&profile, MESH_GRID);
            eyes.push(upload_mesh(device, eye, &mesh));
        }

        let uniform = uniform_layout(device, "warp params");
        let layout = target_layout(device);
        let sampler = target_sampler(device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("warp mesh"),
            bind_group_layouts: &[&uniform, &layout],
            push_constant_ranges: &[],
        });
        let vertex =
            create_glsl_module(device, "warp vertex", WARP_VERTEX_GLSL, ShaderStage::Vertex);
        let fragment = create_glsl_module(
            device,
            "warp fragment",
            WARP_FRAGMENT_GLSL,
            ShaderStage::Fragment,
        );
        let pipeline = warp_pipeline(device, &pipeline_layout, &vertex, &fragment, surface_format);
        let bind_group = bind_target(device, &layout, &sampler, target);

        Ok(Self {
            pipeline,
            layout,
            sampler,
            bind_group,
            uniforms: PerEyeUniform::new(device, &uniform, "warp params"),
            eyes,
        })
    }
}

impl Presenter for MeshPresenter {
    fn kind(&self) -> &'static str {
        "warp mesh"
    }

    fn rebind_target(&mut self, device: &wgpu::Device, target: &RenderTarget) {
        self.bind_group = bind_target(device, &self.layout, &self.sampler, target);
    }

    fn present(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        surface_view: &wgpu::TextureView,
        target_size: (u32, u32),
        cinemascope: f32,
    ) {
        for eye in Eye::pair() {
            let block = mesh_uniforms(eye, target_size, cinemascope);
            self.uniforms.write(queue, eye, &block);
        }

        let mut pass = surface_pass(encoder, surface_view, "warp pass");
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(1, &self.bind_group, &[]);
        for (eye, mesh) in Eye::pair().into_iter().zip(&self.eyes) {
            pass.set_bind_group(0, self.uniforms.bind_group(eye), &[]);
            pass.set_vertex_buffer(0, mesh.vertices.slice(..));
            pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}

/// Maps warp-mesh UVs and NDC into this eye's share of target and surface.
///
/// The UV v-axis flips because mesh UVs grow upward while texture
/// coordinates grow downward.
fn mesh_uniforms(eye: Eye, target: (u32, u32), cinemascope: f32) -> MeshUniforms {
    let vp = eye_viewport(target, eye, cinemascope);
    let width = target.0 as f32;
    let height = target.1 as f32;

    MeshUniforms {
        uv_scale: [vp.width as f32 / width, -(vp.height as f32) / height],
        uv_offset: [
            vp.x as f32 / width,
            (vp.y + vp.height) as f32 / height,
        ],
        ndc_scale: [0.5, 1.0],
        ndc_offset: [eye.side() * 0.5, 0.0],
    }
}

fn upload_mesh(device: &wgpu::Device, eye: Eye, mesh: &DistortionMesh) -> EyeMesh {
    let packed: Vec<WarpVertex> = mesh
        .vertices
        .iter()
        .map(|v| WarpVertex {
            position: v.position,
            uv_red: v.uv_red,
            uv_green: v.uv_green,
            uv_blue: v.uv_blue,
            vignette: v.vignette,
        })
        .collect();
    let label = match eye {
        Eye::Left => "warp mesh left",
        Eye::Right => "warp mesh right",
    };

    EyeMesh {
        vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&packed),
            usage: wgpu::BufferUsages::VERTEX,
        }),
        indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        }),
        index_count: mesh.indices.len() as u32,
    }
}

fn warp_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("warp mesh"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<WarpVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x2,
                        offset: 0,
                        shader_location: 0,
                    },
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x2,
                        offset: 8,
                        shader_location: 1,
                    },
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x2,
                        offset: 16,
                        shader_location: 2,
                    },
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x2,
                        offset: 24,
                        shader_location: 3,
                    },
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32,
                        offset: 32,
                        shader_location: 4,
                    },
                ],
            }],
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

const BLIT_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(set = 0, binding = 0) uniform texture2D blit_texture;
layout(set = 0, binding = 1) uniform sampler blit_sampler;

void main() {
    vec2 uv = vec2(v_uv.x, 1.0 - v_uv.y);
    outColor = texture(sampler2D(blit_texture, blit_sampler), uv);
}
";

const WARP_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec2 position;
layout(location = 1) in vec2 uv_red;
layout(location = 2) in vec2 uv_green;
layout(location = 3) in vec2 uv_blue;
layout(location = 4) in float vignette;

layout(location = 0) out vec2 v_uv_red;
layout(location = 1) out vec2 v_uv_green;
layout(location = 2) out vec2 v_uv_blue;
layout(location = 3) out float v_vignette;

layout(std140, set = 0, binding = 0) uniform MeshParams {
    vec2 _uvScale;
    vec2 _uvOffset;
    vec2 _ndcScale;
    vec2 _ndcOffset;
} ubo;

void main() {
    v_uv_red = uv_red * ubo._uvScale + ubo._uvOffset;
    v_uv_green = uv_green * ubo._uvScale + ubo._uvOffset;
    v_uv_blue = uv_blue * ubo._uvScale + ubo._uvOffset;
    v_vignette = vignette;
    vec2 ndc = position * ubo._ndcScale + ubo._ndcOffset;
    gl_Position = vec4(ndc, 0.0, 1.0);
}
";

const WARP_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv_red;
layout(location = 1) in vec2 v_uv_green;
layout(location = 2) in vec2 v_uv_blue;
layout(location = 3) in float v_vignette;
layout(location = 0) out vec4 outColor;

layout(set = 1, binding = 0) uniform texture2D warp_texture;
layout(set = 1, binding = 1) uniform sampler warp_sampler;

void main() {
    float red = texture(sampler2D(warp_texture, warp_sampler), v_uv_red).r;
    float green = texture(sampler2D(warp_texture, warp_sampler), v_uv_green).g;
    float blue = texture(sampler2D(warp_texture, warp_sampler), v_uv_blue).b;
    outColor = vec4(vec3(red, green, blue) * v_vignette, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_uvs_map_into_their_half_of_the_target() {
        let left = mesh_uniforms(Eye::Left, (1920, 1080), 0.0);
        assert_eq!(left.uv_scale[0], 0.5);
        assert_eq!(left.uv_offset[0], 0.0);

        let right = mesh_uniforms(Eye::Right, (1920, 1080), 0.0);
        assert_eq!(right.uv_offset[0], 0.5);
    }

    #[test]
    fn uv_v_axis_is_flipped() {
        let block = mesh_uniforms(Eye::Left, (1920, 1080), 0.0);
        assert_eq!(block.uv_scale[1], -1.0);
        assert_eq!(block.uv_offset[1], 1.0);
    }

    #[test]
    fn letterbox_insets_the_sampled_band() {
        let block = mesh_uniforms(Eye::Left, (1000, 1000), 0.2);
        assert_eq!(block.uv_scale[1], -0.8);
        assert_eq!(block.uv_offset[1], 0.9);
    }

    #[test]
    fn eyes_land_in_their_half_of_the_surface() {
        let left = mesh_uniforms(Eye::Left, (1920, 1080), 0.0);
        assert_eq!(left.ndc_offset[0], -0.5);
        let right = mesh_uniforms(Eye::Right, (1920, 1080), 0.0);
        assert_eq!(right.ndc_offset[0], 0.5);
        assert_eq!(right.ndc_scale, [0.5, 1.0]);
    }
}
