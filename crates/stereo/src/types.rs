use std::path::PathBuf;

/// Which output path carries the warped image to the display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PresenterKind {
    /// Pick from the device capabilities, compositor first.
    #[default]
    Auto,
    Compositor,
    Mesh,
}

/// Resolved launch parameters for the viewer.
///
/// Callers merge config files and command-line flags before handing this
/// over; nothing in here is re-read from disk afterwards.
#[derive(Clone, Debug)]
pub struct ViewerOptions {
    pub window_size: (u32, u32),
    pub shader_dir: PathBuf,
    pub texture_dir: PathBuf,
    /// File stem of the gallery shader to start on.
    pub initial_shader: Option<String>,
    pub fbo_scale: f32,
    pub fbo_min_scale: f32,
    pub cinemascope: f32,
    pub vsync: bool,
    pub fulldome: bool,
    pub presenter: PresenterKind,
    pub sway: bool,
    /// Walk speed in metres per second.
    pub speed: f32,
    /// Radians of look rotation per pixel of mouse drag.
    pub mouse_sensitivity: f32,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            window_size: (1920, 1080),
            shader_dir: PathBuf::from("shaders"),
            texture_dir: PathBuf::from("textures"),
            initial_shader: None,
            fbo_scale: 1.0,
            fbo_min_scale: 0.25,
            cinemascope: 0.0,
            vsync: true,
            fulldome: false,
            presenter: PresenterKind::Auto,
            sway: false,
            speed: 3.0,
            mouse_sensitivity: 0.005,
        }
    }
}
