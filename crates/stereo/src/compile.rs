use std::borrow::Cow;
use std::fmt::Write as _;

use tracing::warn;
use wgpu::naga::ShaderStage;

use shadertoy::{VariableKind, VariableTable};

use crate::uniforms::MAX_TUNABLES;

/// Compiles a GLSL module for the given stage.
pub(crate) fn create_glsl_module(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    stage: ShaderStage,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_string()),
            stage,
            defines: &[],
        },
    })
}

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    create_glsl_module(
        device,
        "fullscreen triangle vertex",
        VERTEX_SHADER_GLSL,
        ShaderStage::Vertex,
    )
}

/// Creates the fragment module for an already wrapped scene shader.
///
/// Callers run this inside a validation error scope; a bad shader reports
/// there instead of panicking.
pub(crate) fn create_scene_module(
    device: &wgpu::Device,
    label: &str,
    wrapped: &str,
) -> wgpu::ShaderModule {
    create_glsl_module(device, label, wrapped, ShaderStage::Fragment)
}

/// Produces a self-contained GLSL fragment shader from a ray scene source.
///
/// Steps performed:
///
/// 1. Strip `#version` directives and loose uniform declarations we redefine,
///    so the injected prelude owns those names.
/// 2. Prepend [`HEADER`] (uniform block, channel bindings, builtin aliases)
///    plus one macro per tunable pointing into the tunable slot array.
/// 3. Append [`FOOTER`], which derives the per-pixel eye ray and hands it to
///    the scene's `getSceneColor(ro, rd)`.
///
/// With `fulldome` set the footer's fisheye branch is selected instead of
/// the perspective one; everything else stays identical.
pub(crate) fn wrap_scene_fragment(source: &str, table: &VariableTable, fulldome: bool) -> String {
    let sanitized = sanitize(source, table);
    let defines = tunable_defines(table);
    let dome = if fulldome {
        "#define USE_FULLDOME_PROJECTION\n"
    } else {
        ""
    };

    format!("{HEADER}\n{defines}{dome}#line 1\n{sanitized}{FOOTER}")
}

/// Dumps a wrapped shader for offline inspection when compilation fails.
pub(crate) fn dump_wrapped(label: &str, wrapped: &str) {
    let path = format!("/tmp/parallax_{label}.frag");
    if let Err(err) = std::fs::write(&path, wrapped) {
        eprintln!("[parallax] failed to dump wrapped shader to {path}: {err}");
    }
}

fn sanitize(source: &str, table: &VariableTable) -> String {
    let mut sanitized = String::new();
    let mut skipped_version = false;
    for line in source.lines() {
        if !skipped_version && line.trim_start().starts_with("#version") {
            skipped_version = true;
            continue;
        }
        let trimmed = line.trim_start();
        if trimmed.starts_with("uniform ") {
            let redefined = BUILTIN_NAMES.iter().any(|name| trimmed.contains(name))
                || table.names().any(|name| trimmed.contains(name));
            if redefined {
                continue;
            }
        }
        sanitized.push_str(line);
        sanitized.push('\n');
    }
    sanitized
}

/// Names the prelude defines; matching loose uniforms are stripped.
const BUILTIN_NAMES: &[&str] = &["iResolution", "iTime", "eyePos", "iChannel"];

fn tunable_defines(table: &VariableTable) -> String {
    let mut defines = String::new();
    for (index, (name, var)) in table.vars().enumerate() {
        if index >= MAX_TUNABLES {
            warn!(
                name,
                limit = MAX_TUNABLES,
                "too many tunables; later declarations are not bound"
            );
            break;
        }
        let swizzle = match var.kind {
            VariableKind::Scalar => "x",
            VariableKind::Direction | VariableKind::Color => "xyz",
        };
        let _ = writeln!(defines, "#define {name} (ubo._tunables[{index}].{swizzle})");
    }
    defines
}

/// GLSL prologue injected ahead of every scene shader.
///
/// The uniform block layout must match `ToyUniforms` in `uniforms.rs`.
const HEADER: &str = r"#version 450
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform SceneParams {
    vec4 _viewport;
    vec4 _originTime;
    mat4 _eyeRotation;
    vec4 _fovTangents;
    vec4 _tunables[16];
} ubo;

#define iTime (ubo._originTime.w)
#define iResolution vec3(ubo._viewport.zw, 1.0)
#define eyePos (ubo._originTime.xyz)

layout(set = 1, binding = 0) uniform texture2D parallax_channel0_texture;
layout(set = 1, binding = 1) uniform sampler parallax_channel0_sampler;
layout(set = 1, binding = 2) uniform texture2D parallax_channel1_texture;
layout(set = 1, binding = 3) uniform sampler parallax_channel1_sampler;
layout(set = 1, binding = 4) uniform texture2D parallax_channel2_texture;
layout(set = 1, binding = 5) uniform sampler parallax_channel2_sampler;
layout(set = 1, binding = 6) uniform texture2D parallax_channel3_texture;
layout(set = 1, binding = 7) uniform sampler parallax_channel3_sampler;

#define iChannel0 sampler2D(parallax_channel0_texture, parallax_channel0_sampler)
#define iChannel1 sampler2D(parallax_channel1_texture, parallax_channel1_sampler)
#define iChannel2 sampler2D(parallax_channel2_texture, parallax_channel2_sampler)
#define iChannel3 sampler2D(parallax_channel3_texture, parallax_channel3_sampler)
";

/// GLSL epilogue that builds the per-pixel eye ray and calls the scene.
///
/// The perspective branch spans the asymmetric frustum tangents so rays
/// agree exactly with the projection matrix used by geometry scenes. The
/// fulldome branch is a 180 degree fisheye around the view axis.
const FOOTER: &str = r"void main() {
    vec2 frag = vec2(gl_FragCoord.x, gl_FragCoord.y);
    vec2 uv = (frag - ubo._viewport.xy) / ubo._viewport.zw;
    uv.y = 1.0 - uv.y;
    vec3 ro = ubo._originTime.xyz;
#ifdef USE_FULLDOME_PROJECTION
    vec2 ndc = uv * 2.0 - 1.0;
    float r = length(ndc);
    if (r > 1.0) {
        outColor = vec4(0.0, 0.0, 0.0, 1.0);
        return;
    }
    float theta = r * 1.5707963;
    float phi = atan(ndc.y, ndc.x);
    vec3 viewDir = vec3(sin(theta) * cos(phi), sin(theta) * sin(phi), -cos(theta));
#else
    vec3 viewDir = vec3(
        mix(-ubo._fovTangents.x, ubo._fovTangents.y, uv.x),
        mix(-ubo._fovTangents.z, ubo._fovTangents.w, uv.y),
        -1.0);
#endif
    vec3 rd = normalize((ubo._eyeRotation * vec4(viewDir, 0.0)).xyz);
    outColor = vec4(getSceneColor(ro, rd), 1.0);
}
";

/// Minimal full-screen triangle vertex shader.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"
#version 330
uniform vec3 lightDir;
uniform float iTime;
// @var vec3 lightDir 0 1 0 dir
// @var float gain 0.5 0.0 1.0 0.01
vec3 getSceneColor(in vec3 ro, in vec3 rd) {
    return rd * gain + lightDir;
}
"#;

    #[test]
    fn wrap_strips_redeclared_uniforms() {
        let table = VariableTable::from_source(SCENE);
        let wrapped = wrap_scene_fragment(SCENE, &table, false);
        assert!(!wrapped.contains("uniform vec3 lightDir"));
        assert!(!wrapped.contains("uniform float iTime"));
        assert!(!wrapped.contains("#version 330"));
        assert!(wrapped.contains("getSceneColor"));
    }

    #[test]
    fn wrap_defines_tunables_in_table_order() {
        let table = VariableTable::from_source(SCENE);
        let wrapped = wrap_scene_fragment(SCENE, &table, false);
        // BTreeMap order: gain before lightDir.
        assert!(wrapped.contains("#define gain (ubo._tunables[0].x)"));
        assert!(wrapped.contains("#define lightDir (ubo._tunables[1].xyz)"));
    }

    #[test]
    fn fulldome_selects_the_fisheye_branch() {
        let table = VariableTable::from_source(SCENE);
        let flat = wrap_scene_fragment(SCENE, &table, false);
        let dome = wrap_scene_fragment(SCENE, &table, true);
        assert!(!flat.contains("#define USE_FULLDOME_PROJECTION"));
        assert!(dome.contains("#define USE_FULLDOME_PROJECTION"));
    }

    #[test]
    fn tunables_beyond_the_slot_array_are_not_bound() {
        let mut source = String::new();
        for index in 0..(MAX_TUNABLES + 1) {
            let _ = writeln!(source, "// @var float v{index:02} 1.0");
        }
        let table = VariableTable::from_source(&source);
        let wrapped = wrap_scene_fragment(&source, &table, false);
        assert!(wrapped.contains("#define v15 (ubo._tunables[15].x)"));
        assert!(!wrapped.contains("#define v16"));
    }

    #[test]
    fn only_the_first_version_directive_is_dropped() {
        let table = VariableTable::default();
        let wrapped = wrap_scene_fragment("#version 330\nfloat a;\n#version 100\n", &table, false);
        assert!(!wrapped.contains("#version 330"));
        assert!(wrapped.contains("#version 100"));
        assert!(wrapped.starts_with("#version 450"));
    }
}
