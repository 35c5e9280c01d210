use glam::{Mat4, Quat, Vec3, Vec4};
use thiserror::Error;

use crate::distortion::DistortionProfile;
use crate::Eye;

#[derive(Debug, Error)]
pub enum HmdError {
    #[error("no head-mounted display runtime available")]
    NotFound,
    #[error("no distortion profile available for {eye:?}")]
    ProfileUnavailable { eye: Eye },
}

/// Field of view expressed as tangents of the four half-angles.
///
/// Tangents rather than angles because the projection and the distortion fit
/// both consume them directly; the tangent form also survives asymmetric
/// (nose-ward shifted) frusta without special cases.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FovPort {
    pub up_tan: f32,
    pub down_tan: f32,
    pub left_tan: f32,
    pub right_tan: f32,
}

impl FovPort {
    pub fn symmetric(half_angle_deg: f32) -> Self {
        let t = half_angle_deg.to_radians().tan();
        Self {
            up_tan: t,
            down_tan: t,
            left_tan: t,
            right_tan: t,
        }
    }

    /// Off-center perspective projection, right-handed, depth mapped to
    /// `[0, 1]` as the render backend expects.
    pub fn projection(&self, z_near: f32, z_far: f32) -> Mat4 {
        let width = self.left_tan + self.right_tan;
        let height = self.up_tan + self.down_tan;
        Mat4::from_cols(
            Vec4::new(2.0 / width, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 / height, 0.0, 0.0),
            Vec4::new(
                (self.right_tan - self.left_tan) / width,
                (self.up_tan - self.down_tan) / height,
                z_far / (z_near - z_far),
                -1.0,
            ),
            Vec4::new(0.0, 0.0, z_near * z_far / (z_near - z_far), 0.0),
        )
    }

    /// Tangents of the half extents, used by shader-side ray construction.
    pub fn half_tan(&self) -> (f32, f32) {
        (
            0.5 * (self.left_tan + self.right_tan),
            0.5 * (self.up_tan + self.down_tan),
        )
    }
}

/// A tracked head pose relative to the tracking origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeadPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl HeadPose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }
}

impl Default for HeadPose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A pose sample with the prediction time it was queried for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseSample {
    pub pose: HeadPose,
    pub time: f64,
}

/// Per-eye rendering parameters delivered by the device.
#[derive(Clone, Copy, Debug)]
pub struct EyeRenderDesc {
    pub eye: Eye,
    pub fov: FovPort,
    /// Eye-from-head translation; mirrored across the nose for the two eyes.
    pub offset: Vec3,
    /// Recommended per-eye render size at unit scale.
    pub target_size: (u32, u32),
}

/// What the attached device can do, queried once at startup.
#[derive(Clone, Debug)]
pub struct HmdCapabilities {
    pub name: String,
    /// Runtime-side distortion and compositing is available.
    pub compositor: bool,
    /// The device can describe its lens distortion for client-side meshes.
    pub mesh_profile: bool,
    /// Synthetic device standing in for missing hardware.
    pub debug: bool,
}

/// The device contract the viewer drives each frame.
///
/// `sample_pose` takes `&mut self` so implementations can keep tracking
/// state (filter history, last raw pose for `recenter`).
pub trait HmdDevice {
    fn capabilities(&self) -> &HmdCapabilities;

    /// Full display resolution covering both eyes.
    fn native_resolution(&self) -> (u32, u32);

    fn eye_render_desc(&self, eye: Eye) -> EyeRenderDesc;

    /// Head pose predicted for `time` (seconds on the caller's clock).
    fn sample_pose(&mut self, time: f64) -> PoseSample;

    /// Makes the current physical head pose the new tracking origin.
    fn recenter(&mut self);

    /// Lens distortion description for the client presentation path.
    fn distortion_profile(&self, eye: Eye) -> Result<DistortionProfile, HmdError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_projection_has_no_offset_terms() {
        let fov = FovPort::symmetric(45.0);
        let proj = fov.projection(0.1, 100.0);
        assert!(proj.z_axis.x.abs() < 1e-6);
        assert!(proj.z_axis.y.abs() < 1e-6);
    }

    #[test]
    fn projection_maps_near_to_zero_and_far_to_one() {
        let fov = FovPort::symmetric(50.0);
        let proj = fov.projection(0.5, 200.0);

        let near = proj * Vec4::new(0.0, 0.0, -0.5, 1.0);
        assert!((near.z / near.w).abs() < 1e-5);

        let far = proj * Vec4::new(0.0, 0.0, -200.0, 1.0);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn asymmetric_fov_shifts_the_frustum() {
        let fov = FovPort {
            up_tan: 1.0,
            down_tan: 1.0,
            left_tan: 0.8,
            right_tan: 1.2,
        };
        let proj = fov.projection(0.1, 100.0);
        assert!(proj.z_axis.x > 0.0);
    }

    #[test]
    fn head_pose_matrix_round_trips_position() {
        let pose = HeadPose {
            position: Vec3::new(1.0, 2.0, 3.0),
            orientation: Quat::from_rotation_y(0.7),
        };
        let restored = pose.to_matrix().transform_point3(Vec3::ZERO);
        assert!((restored - pose.position).length() < 1e-6);
    }
}
