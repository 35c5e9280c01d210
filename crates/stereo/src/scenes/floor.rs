use std::any::Any;

use crate::chassis::EyeCamera;
use crate::scene::{EyeDraw, Scene, SceneContext, SceneUpdate};
use crate::scenes::ObjectPipeline;
use crate::uniforms::ObjectUniforms;

const HALF_EXTENT: i32 = 20;
const TINT: [f32; 4] = [0.32, 0.36, 0.42, 0.85];

/// World-anchored reference grid on the y = 0 plane.
#[derive(Default)]
pub(crate) struct FloorScene {
    pipeline: Option<ObjectPipeline>,
}

fn grid_vertices(half_extent: i32) -> Vec<[f32; 3]> {
    let extent = half_extent as f32;
    let mut vertices = Vec::with_capacity(((half_extent * 2 + 1) * 4) as usize);
    for i in -half_extent..=half_extent {
        let t = i as f32;
        vertices.push([t, 0.0, -extent]);
        vertices.push([t, 0.0, extent]);
        vertices.push([-extent, 0.0, t]);
        vertices.push([extent, 0.0, t]);
    }
    vertices
}

impl Scene for FloorScene {
    fn label(&self) -> &str {
        "floor"
    }

    fn init_gpu(&mut self, ctx: &mut SceneContext<'_>) -> anyhow::Result<()> {
        self.pipeline = Some(ObjectPipeline::new(
            ctx,
            "floor grid",
            &grid_vertices(HALF_EXTENT),
            wgpu::PrimitiveTopology::LineList,
        ));
        Ok(())
    }

    fn timestep(&mut self, _update: &SceneUpdate) {}

    fn render_for_eye(
        &mut self,
        pass: &mut wgpu::RenderPass<'static>,
        draw: &EyeDraw<'_>,
        camera: &EyeCamera,
    ) {
        if let Some(pipeline) = &self.pipeline {
            let block = ObjectUniforms {
                mvp: (camera.proj * camera.view).to_cols_array_2d(),
                tint: TINT,
                params: [0.0; 4],
            };
            pipeline.draw(pass, draw, &block);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
