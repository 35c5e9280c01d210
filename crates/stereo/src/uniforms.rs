use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use hmd::Eye;
use shadertoy::VariableTable;

use crate::chassis::EyeCamera;

/// Tunable slots available to one shader. Declarations beyond this are
/// ignored with a warning at compile time.
pub(crate) const MAX_TUNABLES: usize = 16;

/// Per-eye block consumed by wrapped scene shaders.
///
/// Field order must match the `SceneParams` block in `compile.rs`.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct ToyUniforms {
    /// Eye sub-rect in target pixels: x, y, width, height.
    pub viewport: [f32; 4],
    /// Eye origin in the render frame; w carries the scene time.
    pub origin_time: [f32; 4],
    /// Rotation-only eye transform, view to render frame.
    pub rotation: [[f32; 4]; 4],
    /// Frustum half-tangents: left, right, down, up.
    pub fov: [f32; 4],
    pub tunables: [[f32; 4]; MAX_TUNABLES],
}

unsafe impl Zeroable for ToyUniforms {}
unsafe impl Pod for ToyUniforms {}

impl ToyUniforms {
    pub fn new() -> Self {
        let mut uniforms = Self::zeroed();
        uniforms.rotation = Mat4::IDENTITY.to_cols_array_2d();
        uniforms.fov = [1.0, 1.0, 1.0, 1.0];
        uniforms
    }

    pub fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.viewport = [x, y, width, height];
    }

    pub fn set_camera(&mut self, camera: &EyeCamera, time: f32) {
        self.origin_time = [
            camera.position.x,
            camera.position.y,
            camera.position.z,
            time,
        ];
        self.rotation = Mat4::from_quat(camera.orientation).to_cols_array_2d();
        self.fov = [
            camera.fov.left_tan,
            camera.fov.right_tan,
            camera.fov.down_tan,
            camera.fov.up_tan,
        ];
    }

    pub fn set_tunables(&mut self, table: &VariableTable) {
        for (slot, (_, var)) in self.tunables.iter_mut().zip(table.vars()) {
            *slot = var.as_uniform().to_array();
        }
    }
}

/// Per-eye block for the lens warp pass.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct MeshUniforms {
    /// Maps warped unit UVs into the eye's share of the render target.
    pub uv_scale: [f32; 2],
    pub uv_offset: [f32; 2],
    /// Maps mesh NDC into the eye's half of the window surface.
    pub ndc_scale: [f32; 2],
    pub ndc_offset: [f32; 2],
}

unsafe impl Zeroable for MeshUniforms {}
unsafe impl Pod for MeshUniforms {}

/// Per-eye block for the fixed-geometry scenes.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct ObjectUniforms {
    pub mvp: [[f32; 4]; 4],
    pub tint: [f32; 4],
    /// Free slot for scene-specific values, gaze cues mostly.
    pub params: [f32; 4],
}

unsafe impl Zeroable for ObjectUniforms {}
unsafe impl Pod for ObjectUniforms {}

/// Single uniform-buffer bind group layout shared by every pass.
pub(crate) fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
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
    })
}

/// Byte stride between per-eye slots, padded for offset alignment.
pub(crate) fn eye_slot_stride<T>() -> u64 {
    (std::mem::size_of::<T>() as u64).div_ceil(256) * 256
}

/// One uniform buffer holding a slot per eye, with a bind group per slot.
///
/// Both eyes draw from one submit, so each eye writes its own region
/// instead of overwriting a shared one mid-frame.
pub(crate) struct PerEyeUniform<T> {
    buffer: wgpu::Buffer,
    bind_groups: [wgpu::BindGroup; Eye::COUNT],
    _marker: PhantomData<T>,
}

impl<T: Pod> PerEyeUniform<T> {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let stride = eye_slot_stride::<T>();
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: stride * Eye::COUNT as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_groups = Eye::pair().map(|eye| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &buffer,
                        offset: stride * eye.index() as u64,
                        size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
                    }),
                }],
            })
        });

        Self {
            buffer,
            bind_groups,
            _marker: PhantomData,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, eye: Eye, value: &T) {
        queue.write_buffer(
            &self.buffer,
            eye_slot_stride::<T>() * eye.index() as u64,
            bytemuck::bytes_of(value),
        );
    }

    pub fn bind_group(&self, eye: Eye) -> &wgpu::BindGroup {
        &self.bind_groups[eye.index()]
    }
}
