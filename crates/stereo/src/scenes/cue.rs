use std::any::Any;
use std::f32::consts::TAU;

use crate::chassis::EyeCamera;
use crate::scene::{EyeDraw, Scene, SceneContext, SceneUpdate};
use crate::scenes::ObjectPipeline;
use crate::uniforms::ObjectUniforms;

const NEAR_HALF: f32 = 0.12;
const NEAR_Z: f32 = -0.35;
const FAR_HALF: f32 = 0.8;
const FAR_Z: f32 = -2.2;
const PULSE_HZ: f32 = 0.4;

/// Chassis-local wireframe frustum marking the tracked volume in front of
/// the viewer. Pulses gently so it reads as an overlay, not geometry.
#[derive(Default)]
pub(crate) struct CueScene {
    pipeline: Option<ObjectPipeline>,
    alpha: f32,
}

fn rect(half: f32, z: f32) -> [[f32; 3]; 4] {
    [
        [-half, -half, z],
        [half, -half, z],
        [half, half, z],
        [-half, half, z],
    ]
}

fn frustum_vertices() -> Vec<[f32; 3]> {
    let near = rect(NEAR_HALF, NEAR_Z);
    let far = rect(FAR_HALF, FAR_Z);
    let mut vertices = Vec::with_capacity(24);
    for i in 0..4 {
        let j = (i + 1) % 4;
        vertices.push(near[i]);
        vertices.push(near[j]);
        vertices.push(far[i]);
        vertices.push(far[j]);
        vertices.push(near[i]);
        vertices.push(far[i]);
    }
    vertices
}

fn pulse_alpha(time: f32) -> f32 {
    0.25 + 0.12 * (TAU * PULSE_HZ * time).sin()
}

impl Scene for CueScene {
    fn label(&self) -> &str {
        "hmd cue"
    }

    fn init_gpu(&mut self, ctx: &mut SceneContext<'_>) -> anyhow::Result<()> {
        self.pipeline = Some(ObjectPipeline::new(
            ctx,
            "hmd cue",
            &frustum_vertices(),
            wgpu::PrimitiveTopology::LineList,
        ));
        Ok(())
    }

    fn timestep(&mut self, update: &SceneUpdate) {
        self.alpha = pulse_alpha(update.time);
    }

    fn render_for_eye(
        &mut self,
        pass: &mut wgpu::RenderPass<'static>,
        draw: &EyeDraw<'_>,
        camera: &EyeCamera,
    ) {
        if let Some(pipeline) = &self.pipeline {
            let block = ObjectUniforms {
                mvp: (camera.proj * camera.view).to_cols_array_2d(),
                tint: [0.4, 0.9, 0.85, self.alpha],
                params: [0.0; 4],
            };
            pipeline.draw(pass, draw, &block);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
