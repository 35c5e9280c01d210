use std::any::Any;

use glam::Vec3;

use crate::chassis::{EyeCamera, GazeRay};
use crate::scene::{EyeDraw, Scene, SceneContext, SceneUpdate};
use crate::scenes::ObjectPipeline;
use crate::uniforms::ObjectUniforms;

const PANEL_CENTER: Vec3 = Vec3::new(0.0, -0.25, -0.8);
const PANEL_HALF_WIDTH: f32 = 0.45;
const PANEL_HALF_HEIGHT: f32 = 0.25;

const TINT: [f32; 4] = [0.05, 0.08, 0.12, 0.72];
const TINT_HOVERED: [f32; 4] = [0.10, 0.16, 0.24, 0.82];

/// Chassis-local status panel floating below the forward gaze. Brightens
/// when the gaze ray crosses it, using the ray cached from the previous
/// frame's draw.
#[derive(Default)]
pub(crate) struct DashboardScene {
    pipeline: Option<ObjectPipeline>,
    hovered: bool,
}

fn panel_vertices() -> [[f32; 3]; 6] {
    let (cx, cy, cz) = (PANEL_CENTER.x, PANEL_CENTER.y, PANEL_CENTER.z);
    let (hw, hh) = (PANEL_HALF_WIDTH, PANEL_HALF_HEIGHT);
    [
        [cx - hw, cy - hh, cz],
        [cx + hw, cy - hh, cz],
        [cx + hw, cy + hh, cz],
        [cx - hw, cy - hh, cz],
        [cx + hw, cy + hh, cz],
        [cx - hw, cy + hh, cz],
    ]
}

/// Intersects a chassis-local gaze ray with the panel plane.
fn gaze_hits_panel(gaze: &GazeRay) -> bool {
    if gaze.dir.z >= -1e-5 {
        return false;
    }
    let t = (PANEL_CENTER.z - gaze.origin.z) / gaze.dir.z;
    if t <= 0.0 {
        return false;
    }
    let hit = gaze.origin + gaze.dir * t;
    (hit.x - PANEL_CENTER.x).abs() <= PANEL_HALF_WIDTH
        && (hit.y - PANEL_CENTER.y).abs() <= PANEL_HALF_HEIGHT
}

impl Scene for DashboardScene {
    fn label(&self) -> &str {
        "dashboard"
    }

    fn init_gpu(&mut self, ctx: &mut SceneContext<'_>) -> anyhow::Result<()> {
        self.pipeline = Some(ObjectPipeline::new(
            ctx,
            "dashboard panel",
            &panel_vertices(),
            wgpu::PrimitiveTopology::TriangleList,
        ));
        Ok(())
    }

    fn timestep(&mut self, update: &SceneUpdate) {
        self.hovered = gaze_hits_panel(&update.local_gaze);
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
                tint: if self.hovered { TINT_HOVERED } else { TINT },
                params: [0.0; 4],
            };
            pipeline.draw(pass, draw, &block);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downward_gaze_hits_the_panel() {
        let gaze = GazeRay {
            origin: Vec3::ZERO,
            dir: Vec3::new(0.0, -0.3, -1.0).normalize(),
        };
        assert!(gaze_hits_panel(&gaze));
    }

    #[test]
    fn level_gaze_grazes_the_top_edge_only() {
        let at_edge = GazeRay {
            origin: Vec3::ZERO,
            dir: Vec3::NEG_Z,
        };
        assert!(gaze_hits_panel(&at_edge));

        let above = GazeRay {
            origin: Vec3::new(0.0, 0.5, 0.0),
            dir: Vec3::NEG_Z,
        };
        assert!(!gaze_hits_panel(&above));
    }

    #[test]
    fn sideways_and_backward_gazes_miss() {
        let sideways = GazeRay {
            origin: Vec3::ZERO,
            dir: Vec3::X,
        };
        assert!(!gaze_hits_panel(&sideways));

        let backward = GazeRay {
            origin: Vec3::ZERO,
            dir: Vec3::Z,
        };
        assert!(!gaze_hits_panel(&backward));
    }
}
