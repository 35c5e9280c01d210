use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which presentation path to use for the warped output.
///
/// `Auto` defers to the capabilities the display device reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenterMode {
    #[default]
    Auto,
    Compositor,
    Mesh,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewerConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub directories: Directories,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub movement: MovementSettings,
    #[serde(default)]
    pub hmd: HmdSettings,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Directories {
    pub shaders: Option<PathBuf>,
    pub textures: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderSettings {
    /// Render target scale relative to the device's native resolution.
    /// Out-of-range values are clamped at use, not rejected here.
    #[serde(default = "default_fbo_scale")]
    pub fbo_scale: f32,
    /// Lower bound the runtime clamps `fbo_scale` against.
    #[serde(default = "default_fbo_min_scale")]
    pub fbo_min_scale: f32,
    /// Vertical letterbox fraction, `0.0` for none. Clamped at use.
    #[serde(default)]
    pub cinemascope: f32,
    #[serde(default = "default_true")]
    pub vsync: bool,
    /// Start with the fulldome projection variant where shaders provide one.
    #[serde(default)]
    pub fulldome: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MovementSettings {
    /// Walk speed in metres per second.
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Radians of look rotation per pixel of mouse drag.
    #[serde(default = "default_mouse_sensitivity")]
    pub mouse_sensitivity: f32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HmdSettings {
    #[serde(default)]
    pub presenter: PresenterMode,
    /// Animate the synthetic debug device with a gentle idle sway.
    #[serde(default)]
    pub sway: bool,
}

fn default_version() -> u32 {
    1
}

fn default_fbo_scale() -> f32 {
    1.0
}

fn default_fbo_min_scale() -> f32 {
    0.25
}

fn default_true() -> bool {
    true
}

fn default_speed() -> f32 {
    3.0
}

fn default_mouse_sensitivity() -> f32 {
    0.005
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            directories: Directories::default(),
            render: RenderSettings::default(),
            movement: MovementSettings::default(),
            hmd: HmdSettings::default(),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            fbo_scale: default_fbo_scale(),
            fbo_min_scale: default_fbo_min_scale(),
            cinemascope: 0.0,
            vsync: default_true(),
            fulldome: false,
        }
    }
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            mouse_sensitivity: default_mouse_sensitivity(),
        }
    }
}

impl ViewerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: ViewerConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads `path` when it exists; a missing file yields the defaults.
    pub fn load_or_default(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_toml_str(&contents)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if !(self.movement.speed > 0.0) {
            return Err(ConfigError::Invalid(
                "movement.speed must be greater than zero".into(),
            ));
        }

        if !(self.movement.mouse_sensitivity > 0.0) {
            return Err(ConfigError::Invalid(
                "movement.mouse_sensitivity must be greater than zero".into(),
            ));
        }

        if !(self.render.fbo_min_scale > 0.0 && self.render.fbo_min_scale <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "render.fbo_min_scale must be within (0, 1], got {}",
                self.render.fbo_min_scale
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[directories]
shaders = "/data/shaders"
textures = "/data/textures"

[render]
fbo_scale = 0.8
fbo_min_scale = 0.5
cinemascope = 0.12
vsync = false
fulldome = true

[movement]
speed = 2.0
mouse_sensitivity = 0.01

[hmd]
presenter = "mesh"
sway = true
"#;

    #[test]
    fn parses_sample_config() {
        let config = ViewerConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.version, 1);
        assert_eq!(
            config.directories.shaders.as_deref(),
            Some(std::path::Path::new("/data/shaders"))
        );
        assert_eq!(config.render.fbo_scale, 0.8);
        assert_eq!(config.render.cinemascope, 0.12);
        assert!(!config.render.vsync);
        assert!(config.render.fulldome);
        assert_eq!(config.movement.speed, 2.0);
        assert_eq!(config.hmd.presenter, PresenterMode::Mesh);
        assert!(config.hmd.sway);
    }

    #[test]
    fn empty_input_yields_defaults() {
        let config = ViewerConfig::from_toml_str("").expect("parse empty config");
        assert_eq!(config.version, 1);
        assert_eq!(config.render.fbo_scale, 1.0);
        assert_eq!(config.render.fbo_min_scale, 0.25);
        assert_eq!(config.render.cinemascope, 0.0);
        assert!(config.render.vsync);
        assert_eq!(config.hmd.presenter, PresenterMode::Auto);
        assert!(config.directories.shaders.is_none());
    }

    #[test]
    fn rejects_unknown_version() {
        let err = ViewerConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_non_positive_speed() {
        let err = ViewerConfig::from_toml_str("[movement]\nspeed = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_out_of_range_fbo_min_scale() {
        let err = ViewerConfig::from_toml_str("[render]\nfbo_min_scale = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn overscaled_fbo_passes_validation() {
        // Out-of-range scale and letterbox values are clamped by the
        // renderer, never rejected at parse time.
        let config =
            ViewerConfig::from_toml_str("[render]\nfbo_scale = 4.0\ncinemascope = 3.0")
                .expect("parse config");
        assert_eq!(config.render.fbo_scale, 4.0);
        assert_eq!(config.render.cinemascope, 3.0);
    }

    #[test]
    fn load_or_default_handles_a_missing_file() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let config =
            ViewerConfig::load_or_default(&dir.path().join("absent.toml")).expect("load config");
        assert_eq!(config.movement.speed, 3.0);
    }

    #[test]
    fn load_or_default_reads_an_existing_file() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("viewer.toml");
        fs::write(&path, "[movement]\nspeed = 5.0").expect("write config");
        let config = ViewerConfig::load_or_default(&path).expect("load config");
        assert_eq!(config.movement.speed, 5.0);
    }
}
