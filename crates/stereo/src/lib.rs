//! Stereo viewer core for Parallax.
//!
//! The crate glues the winit window, the `wgpu` stereo pipeline, and the
//! shader-toy scene worlds together. The overall flow per frame is:
//!
//! ```text
//!   parallax CLI
//!        │ ViewerOptions
//!        ▼
//!   stereo::run ──▶ winit event loop ──▶ StereoRenderPipeline::render_frame
//!                                               │
//!                        step_all ◀── cached gaze (previous frame)
//!                                               │
//!                        draw_all ──▶ left eye, right eye ──▶ presenter pass
//! ```
//!
//! Both eyes render into one shared offscreen target, split into side-by-side
//! viewports; a presenter then carries the target to the window surface,
//! either as a plain blit (compositor path) or through the HMD's distortion
//! mesh. Scenes live in a registry whose registration order is draw order;
//! the raymarch and gallery shader worlds toggle visibility, everything else
//! overlays them.

mod chassis;
mod compile;
mod context;
mod input;
mod pipeline;
mod present;
mod program;
mod scene;
mod scenes;
mod target;
mod textures;
mod types;
mod uniforms;
mod viewer;

pub use types::{PresenterKind, ViewerOptions};
pub use viewer::{run, ViewerError};
