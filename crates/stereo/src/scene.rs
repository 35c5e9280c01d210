use std::any::Any;

use hmd::Eye;
use tracing::warn;

use crate::chassis::{EyeCamera, EyeFrame, GazeRay};
use crate::program::ToyLayouts;
use crate::target::Viewport;
use crate::textures::TextureLibrary;

/// Everything a scene needs to build its GPU resources.
pub(crate) struct SceneContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub color_format: wgpu::TextureFormat,
    pub layouts: &'a ToyLayouts,
    pub textures: &'a mut TextureLibrary,
}

/// Per-frame simulation inputs, identical for every scene.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SceneUpdate {
    pub time: f32,
    pub dt: f32,
    /// Gaze in world space, chassis and head composed.
    pub world_gaze: GazeRay,
    /// Gaze in chassis-local space, head only.
    pub local_gaze: GazeRay,
}

/// Per-eye draw inputs shared by every scene in the pass.
pub(crate) struct EyeDraw<'a> {
    pub queue: &'a wgpu::Queue,
    pub eye: Eye,
    pub viewport: Viewport,
    pub time: f32,
    pub fulldome: bool,
}

pub(crate) trait Scene {
    fn label(&self) -> &str;

    /// Builds pipelines, buffers, and textures. An error here hides the
    /// scene for the rest of the session; the viewer keeps running.
    fn init_gpu(&mut self, ctx: &mut SceneContext<'_>) -> anyhow::Result<()>;

    /// Advances simulation state. Called every frame, visible or not.
    fn timestep(&mut self, update: &SceneUpdate);

    /// Frame-level hook between stepping and the eye pass, for scenes that
    /// record preparatory GPU work of their own. Default does nothing.
    fn encode_prepass(&mut self, _encoder: &mut wgpu::CommandEncoder, _queue: &wgpu::Queue) {}

    /// Records draw commands for one eye. The viewport and scissor are
    /// already set; implementations must not touch them.
    fn render_for_eye(
        &mut self,
        pass: &mut wgpu::RenderPass<'static>,
        draw: &EyeDraw<'_>,
        camera: &EyeCamera,
    );

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SceneId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ShaderWorld {
    Raymarch,
    Gallery,
}

struct SceneEntry {
    visible: bool,
    /// Follows the chassis instead of sitting in the world.
    chassis_local: bool,
    scene: Box<dyn Scene>,
}

/// Ordered collection of scenes. Registration order is draw order and
/// never changes afterwards.
#[derive(Default)]
pub(crate) struct SceneRegistry {
    entries: Vec<SceneEntry>,
    raymarch: Option<SceneId>,
    gallery: Option<SceneId>,
}

impl SceneRegistry {
    pub(crate) fn register(
        &mut self,
        scene: Box<dyn Scene>,
        visible: bool,
        chassis_local: bool,
    ) -> SceneId {
        let id = SceneId(self.entries.len());
        self.entries.push(SceneEntry {
            visible,
            chassis_local,
            scene,
        });
        id
    }

    /// Marks which two scenes the shader-world toggle alternates between.
    pub(crate) fn set_shader_worlds(&mut self, raymarch: SceneId, gallery: SceneId) {
        self.raymarch = Some(raymarch);
        self.gallery = Some(gallery);
    }

    pub(crate) fn init_all(&mut self, ctx: &mut SceneContext<'_>) {
        for entry in &mut self.entries {
            if let Err(err) = entry.scene.init_gpu(ctx) {
                warn!(
                    scene = entry.scene.label(),
                    error = %err,
                    "scene failed to initialise; it stays hidden"
                );
                entry.visible = false;
            }
        }
    }

    /// Steps every scene, hidden ones included, so their state stays
    /// continuous across visibility toggles.
    pub(crate) fn step_all(&mut self, update: &SceneUpdate) {
        for entry in &mut self.entries {
            entry.scene.timestep(update);
        }
    }

    /// Runs the pre-pass hook on visible scenes only, in registration order.
    pub(crate) fn prepass_all(&mut self, encoder: &mut wgpu::CommandEncoder, queue: &wgpu::Queue) {
        for entry in &mut self.entries {
            if entry.visible {
                entry.scene.encode_prepass(encoder, queue);
            }
        }
    }

    pub(crate) fn draw_all(
        &mut self,
        pass: &mut wgpu::RenderPass<'static>,
        draw: &EyeDraw<'_>,
        frame: &EyeFrame,
    ) {
        for entry in &mut self.entries {
            if !entry.visible {
                continue;
            }
            let camera = if entry.chassis_local {
                &frame.local
            } else {
                &frame.world
            };
            entry.scene.render_for_eye(pass, draw, camera);
        }
    }

    /// Swaps which shader world is visible. Only the two world scenes are
    /// touched; nothing is re-initialised.
    pub(crate) fn toggle_shader_world(&mut self) -> Option<ShaderWorld> {
        let (raymarch, gallery) = (self.raymarch?, self.gallery?);
        let entering = if self.is_visible(gallery) {
            ShaderWorld::Raymarch
        } else {
            ShaderWorld::Gallery
        };
        self.set_visible(raymarch, entering == ShaderWorld::Raymarch);
        self.set_visible(gallery, entering == ShaderWorld::Gallery);
        Some(entering)
    }

    pub(crate) fn active_world(&self) -> Option<ShaderWorld> {
        let (raymarch, gallery) = (self.raymarch?, self.gallery?);
        if self.is_visible(gallery) {
            Some(ShaderWorld::Gallery)
        } else if self.is_visible(raymarch) {
            Some(ShaderWorld::Raymarch)
        } else {
            None
        }
    }

    pub(crate) fn set_visible(&mut self, id: SceneId, visible: bool) {
        if let Some(entry) = self.entries.get_mut(id.0) {
            entry.visible = visible;
        }
    }

    pub(crate) fn is_visible(&self, id: SceneId) -> bool {
        self.entries.get(id.0).is_some_and(|entry| entry.visible)
    }

    pub(crate) fn scene_mut<T: Scene + 'static>(&mut self, id: SceneId) -> Option<&mut T> {
        self.entries
            .get_mut(id.0)
            .and_then(|entry| entry.scene.as_any_mut().downcast_mut::<T>())
    }

    #[cfg(test)]
    fn visible_labels(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.visible)
            .map(|entry| entry.scene.label())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    struct Probe {
        label: &'static str,
        steps: u32,
    }

    impl Probe {
        fn boxed(label: &'static str) -> Box<Self> {
            Box::new(Self { label, steps: 0 })
        }
    }

    impl Scene for Probe {
        fn label(&self) -> &str {
            self.label
        }

        fn init_gpu(&mut self, _ctx: &mut SceneContext<'_>) -> anyhow::Result<()> {
            Ok(())
        }

        fn timestep(&mut self, _update: &SceneUpdate) {
            self.steps += 1;
        }

        fn render_for_eye(
            &mut self,
            _pass: &mut wgpu::RenderPass<'static>,
            _draw: &EyeDraw<'_>,
            _camera: &EyeCamera,
        ) {
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn update() -> SceneUpdate {
        let gaze = GazeRay {
            origin: Vec3::ZERO,
            dir: Vec3::NEG_Z,
        };
        SceneUpdate {
            time: 0.0,
            dt: 1.0 / 90.0,
            world_gaze: gaze,
            local_gaze: gaze,
        }
    }

    fn registry_with_worlds() -> (SceneRegistry, SceneId, SceneId, SceneId) {
        let mut registry = SceneRegistry::default();
        let raymarch = registry.register(Probe::boxed("raymarch"), true, false);
        let gallery = registry.register(Probe::boxed("gallery"), false, false);
        let floor = registry.register(Probe::boxed("floor"), true, false);
        registry.set_shader_worlds(raymarch, gallery);
        (registry, raymarch, gallery, floor)
    }

    #[test]
    fn visibility_filter_keeps_registration_order() {
        let mut registry = SceneRegistry::default();
        let a = registry.register(Probe::boxed("a"), true, false);
        let b = registry.register(Probe::boxed("b"), true, false);
        registry.register(Probe::boxed("c"), true, false);

        registry.set_visible(b, false);
        assert_eq!(registry.visible_labels(), vec!["a", "c"]);

        registry.set_visible(b, true);
        registry.set_visible(a, false);
        assert_eq!(registry.visible_labels(), vec!["b", "c"]);
    }

    #[test]
    fn toggle_alternates_between_the_two_worlds() {
        let (mut registry, raymarch, gallery, _) = registry_with_worlds();

        assert_eq!(registry.active_world(), Some(ShaderWorld::Raymarch));
        assert_eq!(registry.toggle_shader_world(), Some(ShaderWorld::Gallery));
        assert!(registry.is_visible(gallery));
        assert!(!registry.is_visible(raymarch));

        assert_eq!(registry.toggle_shader_world(), Some(ShaderWorld::Raymarch));
        assert!(registry.is_visible(raymarch));
        assert!(!registry.is_visible(gallery));
    }

    #[test]
    fn double_toggle_restores_the_starting_state() {
        let (mut registry, raymarch, gallery, _) = registry_with_worlds();
        registry.toggle_shader_world();
        registry.toggle_shader_world();
        assert!(registry.is_visible(raymarch));
        assert!(!registry.is_visible(gallery));
    }

    #[test]
    fn toggle_leaves_unrelated_scenes_alone() {
        let (mut registry, _, _, floor) = registry_with_worlds();
        registry.set_visible(floor, true);
        registry.toggle_shader_world();
        assert!(registry.is_visible(floor));
    }

    #[test]
    fn toggle_without_worlds_is_a_no_op() {
        let mut registry = SceneRegistry::default();
        let only = registry.register(Probe::boxed("only"), true, false);
        assert_eq!(registry.toggle_shader_world(), None);
        assert!(registry.is_visible(only));
    }

    #[test]
    fn hidden_scenes_still_step() {
        let (mut registry, raymarch, gallery, _) = registry_with_worlds();
        registry.step_all(&update());
        registry.step_all(&update());

        let hidden = registry.scene_mut::<Probe>(gallery).unwrap();
        assert_eq!(hidden.steps, 2);
        let shown = registry.scene_mut::<Probe>(raymarch).unwrap();
        assert_eq!(shown.steps, 2);
    }

    #[test]
    fn scene_mut_downcasts_by_id() {
        let mut registry = SceneRegistry::default();
        let id = registry.register(Probe::boxed("only"), true, false);
        assert!(registry.scene_mut::<Probe>(id).is_some());
    }
}
