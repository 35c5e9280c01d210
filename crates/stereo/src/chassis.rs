//! The chassis transform and per-eye camera derivation.
//!
//! The chassis is the virtual vehicle the viewer steers through the scene:
//! every movement and look input lands here, never in the head pose. Eye
//! cameras compose chassis, tracked head pose, and per-eye offset, so the
//! two eyes of a frame differ only by that offset.

use glam::{EulerRot, Mat4, Quat, Vec3};

use hmd::{EyeRenderDesc, FovPort, HeadPose};

pub(crate) const Z_NEAR: f32 = 0.05;
pub(crate) const Z_FAR: f32 = 500.0;

/// Keeps pitch shy of straight up or down so yaw stays well defined.
const MAX_PITCH: f32 = 1.55;

/// Accumulated vehicle transform: translation plus yaw/pitch/roll.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChassisPose {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Default for ChassisPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
        }
    }
}

impl ChassisPose {
    /// Drops every accumulated transformation, returning to the origin.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, self.roll)
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation(), self.position)
    }

    /// Translates along the heading. Only yaw rotates the step, so looking
    /// down while walking forward does not sink the chassis.
    pub fn walk(&mut self, step: Vec3) {
        self.position += Quat::from_rotation_y(self.yaw) * step;
    }

    pub fn turn(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw = wrap_angle(self.yaw + delta_yaw);
        self.pitch = (self.pitch + delta_pitch).clamp(-MAX_PITCH, MAX_PITCH);
    }
}

fn wrap_angle(angle: f32) -> f32 {
    (angle + std::f32::consts::PI).rem_euclid(std::f32::consts::TAU) - std::f32::consts::PI
}

/// A gaze ray in some reference frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GazeRay {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl GazeRay {
    pub const FORWARD: GazeRay = GazeRay {
        origin: Vec3::ZERO,
        dir: Vec3::NEG_Z,
    };
}

/// Everything a scene needs to render one eye in one reference frame.
#[derive(Clone, Copy, Debug)]
pub struct EyeCamera {
    pub view: Mat4,
    pub proj: Mat4,
    pub position: Vec3,
    pub orientation: Quat,
    pub fov: FovPort,
}

/// The same eye expressed in world space and in the chassis frame.
///
/// Scenes anchored to the vehicle (dashboards, cues) render with `local`;
/// everything else renders with `world`.
#[derive(Clone, Copy, Debug)]
pub struct EyeFrame {
    pub world: EyeCamera,
    pub local: EyeCamera,
}

/// Composes chassis, head pose, and eye offset into the frame's cameras.
///
/// `head_size` scales the head translation and the eye offset together,
/// shrinking or growing the viewer relative to the scene. It never touches
/// the projection.
pub fn eye_frame(
    chassis: &ChassisPose,
    head: &HeadPose,
    desc: &EyeRenderDesc,
    head_size: f32,
) -> EyeFrame {
    let proj = desc.fov.projection(Z_NEAR, Z_FAR);

    let local_position = head.position * head_size + head.orientation * (desc.offset * head_size);
    let local_orientation = head.orientation;
    let local = EyeCamera {
        view: Mat4::from_rotation_translation(local_orientation, local_position).inverse(),
        proj,
        position: local_position,
        orientation: local_orientation,
        fov: desc.fov,
    };

    let chassis_orientation = chassis.orientation();
    let world_position = chassis.position + chassis_orientation * local_position;
    let world_orientation = chassis_orientation * local_orientation;
    let world = EyeCamera {
        view: Mat4::from_rotation_translation(world_orientation, world_position).inverse(),
        proj,
        position: world_position,
        orientation: world_orientation,
        fov: desc.fov,
    };

    EyeFrame { world, local }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::f32::consts::{FRAC_PI_2, PI};

    use hmd::Eye;

    fn desc_for(eye: Eye) -> EyeRenderDesc {
        EyeRenderDesc {
            eye,
            fov: FovPort::symmetric(45.0),
            offset: Vec3::new(eye.side() * 0.032, 0.0, 0.0),
            target_size: (960, 1080),
        }
    }

    #[test]
    fn reset_returns_to_identity() {
        let mut chassis = ChassisPose {
            position: Vec3::new(4.0, -1.0, 9.0),
            yaw: 1.2,
            pitch: -0.4,
            roll: 0.1,
        };
        chassis.reset();
        assert_eq!(chassis, ChassisPose::default());
        assert!(chassis
            .to_matrix()
            .abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn walking_follows_yaw_but_not_pitch() {
        let mut chassis = ChassisPose::default();
        chassis.turn(FRAC_PI_2, -0.6);
        chassis.walk(Vec3::new(0.0, 0.0, -1.0));
        assert!(chassis.position.abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn turning_wraps_yaw_and_clamps_pitch() {
        let mut chassis = ChassisPose::default();
        chassis.turn(PI + 0.25, 4.0);
        assert!(chassis.yaw < PI && chassis.yaw > -PI);
        assert!((chassis.yaw - (0.25 - PI)).abs() < 1e-5);
        assert!(chassis.pitch <= 1.55);
    }

    #[test]
    fn eyes_differ_only_by_their_offset() {
        let chassis = ChassisPose {
            position: Vec3::new(2.0, 1.0, -3.0),
            yaw: 0.8,
            pitch: 0.1,
            roll: 0.0,
        };
        let head = HeadPose::IDENTITY;

        let left = eye_frame(&chassis, &head, &desc_for(Eye::Left), 1.0);
        let right = eye_frame(&chassis, &head, &desc_for(Eye::Right), 1.0);

        assert!(left
            .world
            .orientation
            .abs_diff_eq(right.world.orientation, 1e-6));
        let separation = right.world.position - left.world.position;
        let expected = chassis.orientation() * Vec3::new(0.064, 0.0, 0.0);
        assert!(separation.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn head_size_scales_eye_separation() {
        let chassis = ChassisPose::default();
        let head = HeadPose::IDENTITY;

        let near = eye_frame(&chassis, &head, &desc_for(Eye::Right), 1.0);
        let giant = eye_frame(&chassis, &head, &desc_for(Eye::Right), 3.0);
        assert!((giant.world.position.x - 3.0 * near.world.position.x).abs() < 1e-6);
        assert_eq!(near.world.proj, giant.world.proj);
    }

    #[test]
    fn view_maps_the_eye_position_to_the_origin() {
        let chassis = ChassisPose {
            position: Vec3::new(1.0, 2.0, 3.0),
            yaw: -0.4,
            pitch: 0.2,
            roll: 0.05,
        };
        let head = HeadPose {
            position: Vec3::new(0.1, -0.05, 0.2),
            orientation: Quat::from_rotation_y(0.3),
        };
        let frame = eye_frame(&chassis, &head, &desc_for(Eye::Left), 1.0);

        let at_origin = frame.world.view.transform_point3(frame.world.position);
        assert!(at_origin.abs_diff_eq(Vec3::ZERO, 1e-4));
    }
}
