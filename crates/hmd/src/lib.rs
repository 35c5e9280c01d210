//! Head-mounted-display abstraction for the stereo viewer.
//!
//! The crate models the narrow slice of an HMD runtime the renderer needs:
//! per-eye field-of-view and render descriptions, timestamped head poses, a
//! recenter operation, and lens-distortion profiles from which the client
//! presentation path builds its warp meshes. No vendor runtime is linked;
//! [`detect`] falls back to the synthetic [`DebugHmd`] so every code path
//! stays exercisable on a bare desktop.

mod debug;
mod device;
mod distortion;

pub use debug::DebugHmd;
pub use device::{
    EyeRenderDesc, FovPort, HeadPose, HmdCapabilities, HmdDevice, HmdError, PoseSample,
};
pub use distortion::{DistortionMesh, DistortionProfile, DistortionVertex, MESH_GRID};

/// Eye selector. Rendering always walks eyes in `pair()` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const COUNT: usize = 2;

    pub fn pair() -> [Eye; 2] {
        [Eye::Left, Eye::Right]
    }

    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }

    /// -1 for the left eye, +1 for the right; handy for mirrored offsets.
    pub fn side(self) -> f32 {
        match self {
            Eye::Left => -1.0,
            Eye::Right => 1.0,
        }
    }
}

/// Probes for an attached HMD and falls back to the debug device.
///
/// No vendor runtime ships with this build, so the probe currently always
/// resolves to [`DebugHmd`]; the call site still goes through the capability
/// query so a real runtime can slot in behind the same trait.
pub fn detect(sway: bool) -> Box<dyn HmdDevice> {
    tracing::info!(sway, "no HMD runtime linked; using debug HMD profile");
    Box::new(DebugHmd::new(sway))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_indices_are_stable() {
        assert_eq!(Eye::Left.index(), 0);
        assert_eq!(Eye::Right.index(), 1);
        assert_eq!(Eye::pair()[0], Eye::Left);
    }

    #[test]
    fn detect_always_yields_a_device() {
        let device = detect(false);
        assert!(device.capabilities().debug);
    }
}
