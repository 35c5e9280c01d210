use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "PARALLAX_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "PARALLAX_DATA_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Parallax";
const APPLICATION: &str = "parallax";

/// Resolved configuration and data locations for this run.
#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    /// Environment overrides take priority over the platform directories.
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;

        Ok(Self {
            config_dir: resolve_directory(ENV_CONFIG_DIR, project_dirs.config_dir()),
            data_dir: resolve_directory(ENV_DATA_DIR, project_dirs.data_dir()),
        })
    }

    #[cfg(test)]
    pub fn from_dirs(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            config_dir,
            data_dir,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("parallax.toml")
    }

    pub fn default_shader_dir(&self) -> PathBuf {
        self.data_dir.join("shaders")
    }

    pub fn default_texture_dir(&self) -> PathBuf {
        self.data_dir.join("textures")
    }

    /// Anchors a relative configured directory under the data dir.
    pub fn resolve_data_relative(&self, dir: PathBuf) -> PathBuf {
        if dir.is_absolute() {
            dir
        } else {
            self.data_dir.join(dir)
        }
    }
}

fn resolve_directory(env_var: &str, fallback: &Path) -> PathBuf {
    match env::var_os(env_var) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => fallback.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_directories_anchor_under_data() {
        let paths = AppPaths::from_dirs(PathBuf::from("/cfg"), PathBuf::from("/data"));
        assert_eq!(
            paths.resolve_data_relative(PathBuf::from("gallery")),
            PathBuf::from("/data/gallery")
        );
        assert_eq!(
            paths.resolve_data_relative(PathBuf::from("/abs/gallery")),
            PathBuf::from("/abs/gallery")
        );
    }

    #[test]
    fn config_file_lives_in_the_config_dir() {
        let paths = AppPaths::from_dirs(PathBuf::from("/cfg"), PathBuf::from("/data"));
        assert_eq!(paths.config_file(), PathBuf::from("/cfg/parallax.toml"));
    }
}
