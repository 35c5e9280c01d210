use glam::Vec3;
use tracing::{debug, info};

use hmd::{Eye, HmdDevice};

use crate::chassis::{eye_frame, ChassisPose, EyeFrame, GazeRay};
use crate::context::GpuContext;
use crate::present::{negotiate, Presenter};
use crate::program::ToyLayouts;
use crate::scene::{EyeDraw, SceneContext, SceneRegistry, SceneUpdate};
use crate::target::{eye_viewport, scaled_target_size, RenderTarget};
use crate::textures::TextureLibrary;
use crate::types::ViewerOptions;

const FBO_SCALE_STEP: f32 = 0.05;

/// Per-eye pose data captured while recording the draw, handed to scenes on
/// the next timestep.
#[derive(Clone, Copy)]
struct EyeScratch {
    world: GazeRay,
    local: GazeRay,
}

impl Default for EyeScratch {
    fn default() -> Self {
        Self {
            world: GazeRay::FORWARD,
            local: GazeRay::FORWARD,
        }
    }
}

impl EyeScratch {
    fn from_frame(frame: &EyeFrame) -> Self {
        Self {
            world: GazeRay {
                origin: frame.world.position,
                dir: frame.world.orientation * Vec3::NEG_Z,
            },
            local: GazeRay {
                origin: frame.local.position,
                dir: frame.local.orientation * Vec3::NEG_Z,
            },
        }
    }
}

/// Head-centre rays from the two cached eye rays: origins average out the
/// eye separation, directions are shared.
fn averaged_rays(left: &EyeScratch, right: &EyeScratch) -> (GazeRay, GazeRay) {
    (
        GazeRay {
            origin: (left.world.origin + right.world.origin) * 0.5,
            dir: left.world.dir,
        },
        GazeRay {
            origin: (left.local.origin + right.local.origin) * 0.5,
            dir: left.local.dir,
        },
    )
}

fn clamp_scale(scale: f32, min_scale: f32) -> f32 {
    scale.clamp(min_scale, 1.0)
}

/// Renders both eyes into one shared target, then presents.
///
/// Frame order is fixed: apply a pending target resize, step every scene,
/// sample the head pose once, draw left then right into the per-eye
/// sub-rects, run the presenter pass, submit, present.
pub(crate) struct StereoRenderPipeline {
    target: RenderTarget,
    native: (u32, u32),
    fbo_scale: f32,
    fbo_min_scale: f32,
    pending_scale: Option<f32>,
    cinemascope: f32,
    fulldome: bool,
    head_size: f32,
    layouts: ToyLayouts,
    textures: TextureLibrary,
    registry: SceneRegistry,
    presenter: Box<dyn Presenter>,
    scratch: [EyeScratch; Eye::COUNT],
}

impl StereoRenderPipeline {
    pub(crate) fn new(
        context: &GpuContext,
        hmd: &dyn HmdDevice,
        options: &ViewerOptions,
        mut registry: SceneRegistry,
    ) -> Self {
        let native = hmd.native_resolution();
        let fbo_min_scale = options.fbo_min_scale;
        let fbo_scale = clamp_scale(options.fbo_scale, fbo_min_scale);
        let target = RenderTarget::new(
            &context.device,
            context.surface_format,
            scaled_target_size(native, fbo_scale),
        );
        let mut textures = TextureLibrary::new(
            &context.device,
            &context.queue,
            Some(options.texture_dir.clone()),
        );
        let layouts = ToyLayouts::new(&context.device, textures.layout());

        {
            let mut ctx = SceneContext {
                device: &context.device,
                queue: &context.queue,
                color_format: context.surface_format,
                layouts: &layouts,
                textures: &mut textures,
            };
            registry.init_all(&mut ctx);
        }

        let presenter = negotiate(
            options.presenter,
            hmd,
            &context.device,
            context.surface_format,
            &target,
        );

        Self {
            target,
            native,
            fbo_scale,
            fbo_min_scale,
            pending_scale: None,
            cinemascope: options.cinemascope,
            fulldome: options.fulldome,
            head_size: 1.0,
            layouts,
            textures,
            registry,
            presenter,
            scratch: [EyeScratch::default(); Eye::COUNT],
        }
    }

    pub(crate) fn registry_mut(&mut self) -> &mut SceneRegistry {
        &mut self.registry
    }

    /// Runs `f` with a scene GPU context and the registry, for operations
    /// that recompile or rebind (shader switches, settings reloads).
    pub(crate) fn with_scenes<R>(
        &mut self,
        context: &GpuContext,
        f: impl FnOnce(&mut SceneContext<'_>, &mut SceneRegistry) -> R,
    ) -> R {
        let mut ctx = SceneContext {
            device: &context.device,
            queue: &context.queue,
            color_format: self.target.format,
            layouts: &self.layouts,
            textures: &mut self.textures,
        };
        f(&mut ctx, &mut self.registry)
    }

    pub(crate) fn fbo_scale(&self) -> f32 {
        self.fbo_scale
    }

    /// Queues a render-scale change; the target is recreated at the start
    /// of the next frame, never mid-frame.
    pub(crate) fn request_fbo_scale(&mut self, scale: f32) {
        let clamped = clamp_scale(scale, self.fbo_min_scale);
        if (clamped - self.fbo_scale).abs() > f32::EPSILON {
            self.pending_scale = Some(clamped);
            info!(scale = clamped, "render scale change queued");
        }
    }

    pub(crate) fn nudge_fbo_scale(&mut self, steps: f32) {
        self.request_fbo_scale(self.fbo_scale + steps * FBO_SCALE_STEP);
    }

    pub(crate) fn toggle_fulldome(&mut self) -> bool {
        self.fulldome = !self.fulldome;
        self.fulldome
    }

    pub(crate) fn fulldome(&self) -> bool {
        self.fulldome
    }

    pub(crate) fn set_head_size(&mut self, head_size: f32) {
        self.head_size = head_size.max(0.05);
    }

    pub(crate) fn render_frame(
        &mut self,
        context: &GpuContext,
        hmd: &mut dyn HmdDevice,
        chassis: &ChassisPose,
        time: f32,
        dt: f32,
    ) -> Result<(), wgpu::SurfaceError> {
        if let Some(scale) = self.pending_scale.take() {
            let size = scaled_target_size(self.native, scale);
            self.target = RenderTarget::new(&context.device, self.target.format, size);
            self.fbo_scale = scale;
            self.presenter.rebind_target(&context.device, &self.target);
            debug!(scale, width = size.0, height = size.1, "recreated render target");
        }

        let (world_gaze, local_gaze) = averaged_rays(&self.scratch[0], &self.scratch[1]);
        let update = SceneUpdate {
            time,
            dt,
            world_gaze,
            local_gaze,
        };
        self.registry.step_all(&update);

        let sample = hmd.sample_pose(time as f64);

        let frame = context.surface.get_current_texture()?;
        let surface_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("stereo frame"),
            });

        self.registry.prepass_all(&mut encoder, &context.queue);

        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("scene pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &self.target.view,
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
                .forget_lifetime();

            // Left first, then right, inside one pass on the shared target.
            for eye in Eye::pair() {
                let viewport = eye_viewport(self.target.size, eye, self.cinemascope);
                pass.set_viewport(
                    viewport.x as f32,
                    viewport.y as f32,
                    viewport.width as f32,
                    viewport.height as f32,
                    0.0,
                    1.0,
                );
                pass.set_scissor_rect(viewport.x, viewport.y, viewport.width, viewport.height);

                let desc = hmd.eye_render_desc(eye);
                let eye_cameras = eye_frame(chassis, &sample.pose, &desc, self.head_size);
                let draw = EyeDraw {
                    queue: &context.queue,
                    eye,
                    viewport,
                    time,
                    fulldome: self.fulldome,
                };
                self.registry.draw_all(&mut pass, &draw, &eye_cameras);
                self.scratch[eye.index()] = EyeScratch::from_frame(&eye_cameras);
            }
        }

        self.presenter.present(
            &mut encoder,
            &context.queue,
            &surface_view,
            self.target.size,
            self.cinemascope,
        );

        context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_clamps_to_the_configured_floor_and_native() {
        assert_eq!(clamp_scale(1.5, 0.25), 1.0);
        assert_eq!(clamp_scale(0.1, 0.25), 0.25);
        assert_eq!(clamp_scale(0.7, 0.25), 0.7);
    }

    #[test]
    fn averaged_rays_meet_between_the_eyes() {
        let left = EyeScratch {
            world: GazeRay {
                origin: Vec3::new(-0.032, 1.6, 0.0),
                dir: Vec3::NEG_Z,
            },
            local: GazeRay {
                origin: Vec3::new(-0.032, 0.0, 0.0),
                dir: Vec3::NEG_Z,
            },
        };
        let right = EyeScratch {
            world: GazeRay {
                origin: Vec3::new(0.032, 1.6, 0.0),
                dir: Vec3::NEG_Z,
            },
            local: GazeRay {
                origin: Vec3::new(0.032, 0.0, 0.0),
                dir: Vec3::NEG_Z,
            },
        };

        let (world, local) = averaged_rays(&left, &right);
        assert_eq!(world.origin, Vec3::new(0.0, 1.6, 0.0));
        assert_eq!(local.origin, Vec3::ZERO);
        assert_eq!(world.dir, Vec3::NEG_Z);
    }
}
