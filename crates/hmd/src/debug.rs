use glam::{Quat, Vec2, Vec3};

use crate::device::{EyeRenderDesc, FovPort, HeadPose, HmdCapabilities, HmdDevice, PoseSample};
use crate::distortion::DistortionProfile;
use crate::{Eye, HmdError};

const IPD_METERS: f32 = 0.063;
const NATIVE_RESOLUTION: (u32, u32) = (1920, 1080);

/// Synthetic HMD used when no hardware runtime is present.
///
/// Reports a fixed 1080p dual-eye panel with a mild asymmetric FOV and a
/// plausible barrel-distortion profile, so both the compositor and the
/// warp-mesh presentation paths run unmodified. With `sway` enabled the pose
/// drifts on slow sinusoids to make head-tracking-dependent code observable
/// without a tracker.
pub struct DebugHmd {
    caps: HmdCapabilities,
    sway: bool,
    last_raw: HeadPose,
    origin_position: Vec3,
    origin_yaw: f32,
}

impl DebugHmd {
    pub fn new(sway: bool) -> Self {
        Self {
            caps: HmdCapabilities {
                name: "debug".to_string(),
                compositor: true,
                mesh_profile: true,
                debug: true,
            },
            sway,
            last_raw: HeadPose::IDENTITY,
            origin_position: Vec3::ZERO,
            origin_yaw: 0.0,
        }
    }

    fn raw_pose(&self, time: f64) -> HeadPose {
        if !self.sway {
            return HeadPose::IDENTITY;
        }
        let t = time as f32;
        let position = Vec3::new(
            0.012 * (0.23 * t).sin(),
            0.020 * (0.50 * t).sin(),
            0.008 * (0.31 * t).cos(),
        );
        let yaw = 0.05 * (0.11 * t).sin();
        let pitch = 0.03 * (0.17 * t).sin();
        HeadPose {
            position,
            orientation: Quat::from_rotation_y(yaw) * Quat::from_rotation_x(pitch),
        }
    }

    fn fov_for(eye: Eye) -> FovPort {
        // Slightly wider on the temporal side, as real panels are.
        let nasal = 1.058;
        let temporal = 1.092;
        let (left, right) = match eye {
            Eye::Left => (temporal, nasal),
            Eye::Right => (nasal, temporal),
        };
        FovPort {
            up_tan: 1.329,
            down_tan: 1.329,
            left_tan: left,
            right_tan: right,
        }
    }
}

impl HmdDevice for DebugHmd {
    fn capabilities(&self) -> &HmdCapabilities {
        &self.caps
    }

    fn native_resolution(&self) -> (u32, u32) {
        NATIVE_RESOLUTION
    }

    fn eye_render_desc(&self, eye: Eye) -> EyeRenderDesc {
        EyeRenderDesc {
            eye,
            fov: Self::fov_for(eye),
            offset: Vec3::new(eye.side() * IPD_METERS * 0.5, 0.0, 0.0),
            target_size: (NATIVE_RESOLUTION.0 / 2, NATIVE_RESOLUTION.1),
        }
    }

    fn sample_pose(&mut self, time: f64) -> PoseSample {
        let raw = self.raw_pose(time);
        self.last_raw = raw;

        // Recenter removes yaw and position only; gravity keeps the horizon.
        let unyaw = Quat::from_rotation_y(-self.origin_yaw);
        let pose = HeadPose {
            position: unyaw * (raw.position - self.origin_position),
            orientation: unyaw * raw.orientation,
        };
        PoseSample { pose, time }
    }

    fn recenter(&mut self) {
        self.origin_position = self.last_raw.position;
        self.origin_yaw = yaw_of(self.last_raw.orientation);
    }

    fn distortion_profile(&self, eye: Eye) -> Result<DistortionProfile, HmdError> {
        Ok(DistortionProfile {
            k: [1.0, 0.22, 0.24, 0.0],
            chroma: [0.996, -0.004, 1.014, 0.0],
            // Lens centers sit nose-ward of each viewport center.
            lens_center: Vec2::new(-eye.side() * 0.152, 0.0),
            fit_radius: 1.0,
        })
    }
}

fn yaw_of(orientation: Quat) -> f32 {
    let forward = orientation * Vec3::NEG_Z;
    (-forward.x).atan2(-forward.z)
}
