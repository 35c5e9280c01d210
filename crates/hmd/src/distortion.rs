use glam::Vec2;

/// Default warp-mesh tessellation per eye. Rebuilt only when the HMD profile
/// changes, so the density is not a per-frame cost.
pub const MESH_GRID: u32 = 32;

/// Radial lens distortion with per-channel chromatic correction.
///
/// The radial polynomial follows the classic headset form
/// `f(r²) = k0 + k1·r² + k2·r⁴ + k3·r⁶` evaluated around `lens_center`, and
/// `chroma` holds `[red0, red1, blue0, blue1]` so red and blue sample at
/// `f·(c0 + c1·r²)` while green uses `f` directly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistortionProfile {
    pub k: [f32; 4],
    pub chroma: [f32; 4],
    /// Lens center offset from the eye-viewport center, NDC units.
    pub lens_center: Vec2,
    /// Radius from the lens center that should land exactly on the viewport
    /// edge after warping; controls the overall fit scale.
    pub fit_radius: f32,
}

impl DistortionProfile {
    pub fn distortion_factor(&self, r_sq: f32) -> f32 {
        self.k[0] + r_sq * (self.k[1] + r_sq * (self.k[2] + r_sq * self.k[3]))
    }

    /// Scale that maps the fit radius back onto the viewport edge.
    pub fn fit_scale(&self) -> f32 {
        1.0 / self.distortion_factor(self.fit_radius * self.fit_radius)
    }
}

/// One warp-mesh vertex: a fixed output position plus three source UVs (one
/// per color channel) and an edge-fade factor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistortionVertex {
    pub position: [f32; 2],
    pub uv_red: [f32; 2],
    pub uv_green: [f32; 2],
    pub uv_blue: [f32; 2],
    pub vignette: f32,
}

/// Precomputed per-eye warp geometry for the client presentation path.
#[derive(Clone, Debug)]
pub struct DistortionMesh {
    pub vertices: Vec<DistortionVertex>,
    pub indices: Vec<u16>,
}

impl DistortionMesh {
    /// Builds the warp mesh for one eye over a regular `grid`×`grid` quad
    /// lattice in output NDC. UVs are eye-local in `[0, 1]`; the presenter
    /// remaps them into the shared render target.
    pub fn for_profile(profile: &DistortionProfile, grid: u32) -> Self {
        let grid = grid.max(1);
        let stride = grid + 1;
        let fit = profile.fit_scale();

        let mut vertices = Vec::with_capacity((stride * stride) as usize);
        for row in 0..stride {
            for col in 0..stride {
                let ndc = Vec2::new(
                    col as f32 / grid as f32 * 2.0 - 1.0,
                    row as f32 / grid as f32 * 2.0 - 1.0,
                );
                let d = ndc - profile.lens_center;
                let r_sq = d.length_squared();
                let f = profile.distortion_factor(r_sq) * fit;
                let red = profile.chroma[0] + profile.chroma[1] * r_sq;
                let blue = profile.chroma[2] + profile.chroma[3] * r_sq;

                let uv_green = to_uv(profile.lens_center + d * f);
                let uv_red = to_uv(profile.lens_center + d * f * red);
                let uv_blue = to_uv(profile.lens_center + d * f * blue);

                vertices.push(DistortionVertex {
                    position: ndc.to_array(),
                    uv_red: uv_red.to_array(),
                    uv_green: uv_green.to_array(),
                    uv_blue: uv_blue.to_array(),
                    vignette: edge_fade(uv_green),
                });
            }
        }

        let mut indices = Vec::with_capacity((grid * grid * 6) as usize);
        for row in 0..grid {
            for col in 0..grid {
                let i = row * stride + col;
                indices.extend_from_slice(&[
                    i as u16,
                    (i + 1) as u16,
                    (i + stride) as u16,
                    (i + 1) as u16,
                    (i + stride + 1) as u16,
                    (i + stride) as u16,
                ]);
            }
        }

        Self { vertices, indices }
    }
}

fn to_uv(ndc: Vec2) -> Vec2 {
    ndc * 0.5 + Vec2::splat(0.5)
}

/// Fades to black over the last few percent before the sample position walks
/// off the source texture, hiding clamp artifacts at the warp boundary.
fn edge_fade(uv: Vec2) -> f32 {
    const FADE_BAND: f32 = 0.05;
    let edge = uv.x.min(1.0 - uv.x).min(uv.y).min(1.0 - uv.y);
    (edge / FADE_BAND).clamp(0.0, 1.0)
}
