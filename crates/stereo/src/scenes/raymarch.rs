use std::any::Any;

use glam::Vec3;
use shadertoy::VariableTable;

use crate::chassis::EyeCamera;
use crate::scene::{EyeDraw, Scene, SceneContext, SceneUpdate};
use crate::scenes::ToyPass;

/// The built-in raymarched world: bobbing spheres over a checkered plane.
///
/// Ships embedded so the viewer always has somewhere to stand, even with an
/// empty shader directory.
pub(crate) struct RaymarchScene {
    table: VariableTable,
    toy: Option<ToyPass>,
}

impl RaymarchScene {
    pub(crate) fn new() -> Self {
        Self {
            table: VariableTable::from_source(DEFAULT_SCENE),
            toy: None,
        }
    }

    /// Spawn point declared by the shader, applied when entering this world.
    pub(crate) fn head_pos(&self) -> Vec3 {
        self.table.head_pos()
    }

    pub(crate) fn head_size(&self) -> f32 {
        self.table.head_size()
    }

    pub(crate) fn table_mut(&mut self) -> &mut VariableTable {
        &mut self.table
    }

    pub(crate) fn table(&self) -> &VariableTable {
        &self.table
    }

    pub(crate) fn fulldome_ready(&self) -> bool {
        self.toy.as_ref().is_some_and(ToyPass::fulldome_ready)
    }
}

impl Scene for RaymarchScene {
    fn label(&self) -> &str {
        "raymarch"
    }

    fn init_gpu(&mut self, ctx: &mut SceneContext<'_>) -> anyhow::Result<()> {
        self.toy = Some(ToyPass::new(ctx, "raymarch", DEFAULT_SCENE, &self.table));
        Ok(())
    }

    fn timestep(&mut self, _update: &SceneUpdate) {}

    fn render_for_eye(
        &mut self,
        pass: &mut wgpu::RenderPass<'static>,
        draw: &EyeDraw<'_>,
        camera: &EyeCamera,
    ) {
        if let Some(toy) = &self.toy {
            toy.draw(pass, draw, camera, &self.table);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

const DEFAULT_SCENE: &str = r"// Bobbing spheres over a checkered ground plane.
// @var vec3 lightDir 0.4 0.8 0.3 dir
// @var vec3 skyColor 0.45 0.65 0.95 color
// @var float sphereRadius 0.8 0.2 2.0 0.05
// @var float glowGain 0.35 0.0 1.0 0.05
// @var eyePos 0.0 1.6 4.5
// @var headSize 1.0

float sdSphere(vec3 p, float r) {
    return length(p) - r;
}

float map(vec3 p) {
    vec3 q = p;
    q.x = mod(q.x + 2.0, 4.0) - 2.0;
    q.z = mod(q.z + 2.0, 4.0) - 2.0;
    float cell = floor((p.x + 2.0) / 4.0) + floor((p.z + 2.0) / 4.0);
    float bob = sin(iTime * 0.7 + cell * 1.3) * 0.25;
    float spheres = sdSphere(q - vec3(0.0, sphereRadius + 0.35 + bob, 0.0), sphereRadius);
    return min(spheres, p.y);
}

vec3 normalAt(vec3 p) {
    vec2 e = vec2(0.001, 0.0);
    return normalize(vec3(
        map(p + e.xyy) - map(p - e.xyy),
        map(p + e.yxy) - map(p - e.yxy),
        map(p + e.yyx) - map(p - e.yyx)));
}

vec3 getSceneColor(in vec3 ro, in vec3 rd) {
    float t = 0.0;
    for (int i = 0; i < 96; i++) {
        vec3 p = ro + rd * t;
        float d = map(p);
        if (d < 0.001) {
            vec3 n = normalAt(p);
            float diffuse = max(dot(n, normalize(lightDir)), 0.0);
            float checker = mod(floor(p.x) + floor(p.z), 2.0);
            vec3 base = p.y < 0.01
                ? vec3(0.22 + 0.24 * checker)
                : vec3(0.85, 0.32, 0.25);
            vec3 color = base * (0.15 + 0.85 * diffuse);
            return mix(color, skyColor, smoothstep(12.0, 40.0, t));
        }
        t += d;
        if (t > 40.0) {
            break;
        }
    }
    float halo = pow(max(dot(rd, normalize(lightDir)), 0.0), 8.0);
    return skyColor + glowGain * halo;
}
";
