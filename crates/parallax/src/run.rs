use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use shadertoy::ShaderLibrary;
use stereo::{PresenterKind, ViewerOptions};
use viewconfig::{PresenterMode, ViewerConfig};

use crate::cli::RunArgs;
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Merges the config file and command-line flags into launch options.
/// Flags win over file values; file values win over built-in defaults.
pub fn resolve_options(args: &RunArgs, paths: &AppPaths) -> Result<ViewerOptions> {
    let config_path = args.config.clone().unwrap_or_else(|| paths.config_file());
    let config = ViewerConfig::load_or_default(&config_path).with_context(|| {
        format!(
            "failed to load configuration from {}",
            config_path.display()
        )
    })?;

    let shader_dir = args
        .shader_dir
        .clone()
        .or_else(|| {
            config
                .directories
                .shaders
                .clone()
                .map(|dir| paths.resolve_data_relative(dir))
        })
        .unwrap_or_else(|| paths.default_shader_dir());
    let texture_dir = args
        .texture_dir
        .clone()
        .or_else(|| {
            config
                .directories
                .textures
                .clone()
                .map(|dir| paths.resolve_data_relative(dir))
        })
        .unwrap_or_else(|| paths.default_texture_dir());

    let defaults = ViewerOptions::default();
    Ok(ViewerOptions {
        window_size: args.size.unwrap_or(defaults.window_size),
        shader_dir,
        texture_dir,
        initial_shader: args.shader.clone(),
        fbo_scale: args.fbo_scale.unwrap_or(config.render.fbo_scale),
        fbo_min_scale: config.render.fbo_min_scale,
        cinemascope: args.cinemascope.unwrap_or(config.render.cinemascope),
        vsync: !args.no_vsync && config.render.vsync,
        fulldome: args.fulldome || config.render.fulldome,
        presenter: args
            .presenter
            .unwrap_or_else(|| presenter_kind(config.hmd.presenter)),
        sway: args.sway || config.hmd.sway,
        speed: config.movement.speed,
        mouse_sensitivity: config.movement.mouse_sensitivity,
    })
}

fn presenter_kind(mode: PresenterMode) -> PresenterKind {
    match mode {
        PresenterMode::Auto => PresenterKind::Auto,
        PresenterMode::Compositor => PresenterKind::Compositor,
        PresenterMode::Mesh => PresenterKind::Mesh,
    }
}

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let options = resolve_options(&args, &paths)?;
    info!(
        shaders = %options.shader_dir.display(),
        textures = %options.texture_dir.display(),
        "starting viewer"
    );
    stereo::run(options).context("viewer terminated with an error")
}

pub fn list_shaders(args: &RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let options = resolve_options(args, &paths)?;
    let library = ShaderLibrary::discover(&options.shader_dir);
    if library.is_empty() {
        println!("No shaders found in {}", options.shader_dir.display());
        return Ok(());
    }

    println!("Shaders in {}:", options.shader_dir.display());
    for entry in library.entries() {
        let settings = if entry.settings_path.exists() {
            "saved settings"
        } else {
            "defaults"
        };
        println!("  {:<24} [{settings}]", entry.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use clap::Parser;

    fn args_from(argv: &[&str]) -> RunArgs {
        let mut full = vec!["parallax"];
        full.extend_from_slice(argv);
        RunArgs::try_parse_from(full).expect("parse args")
    }

    fn test_paths(root: &std::path::Path) -> AppPaths {
        AppPaths::from_dirs(root.join("config"), root.join("data"))
    }

    #[test]
    fn flags_override_file_values() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_path = dir.path().join("parallax.toml");
        fs::write(
            &config_path,
            "[render]\nfbo_scale = 0.5\n[movement]\nspeed = 2.0\n",
        )
        .unwrap();

        let args = args_from(&[
            "--config",
            config_path.to_str().unwrap(),
            "--fbo-scale",
            "0.8",
        ]);
        let options = resolve_options(&args, &test_paths(dir.path())).unwrap();

        assert_eq!(options.fbo_scale, 0.8);
        assert_eq!(options.speed, 2.0);
    }

    #[test]
    fn relative_config_directories_anchor_under_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_path = dir.path().join("parallax.toml");
        fs::write(&config_path, "[directories]\nshaders = \"gallery\"\n").unwrap();

        let args = args_from(&["--config", config_path.to_str().unwrap()]);
        let options = resolve_options(&args, &test_paths(dir.path())).unwrap();

        assert_eq!(options.shader_dir, dir.path().join("data").join("gallery"));
        assert_eq!(
            options.texture_dir,
            dir.path().join("data").join("textures")
        );
    }

    #[test]
    fn no_vsync_flag_wins_over_the_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_path = dir.path().join("parallax.toml");
        fs::write(&config_path, "[render]\nvsync = true\n").unwrap();

        let args = args_from(&["--config", config_path.to_str().unwrap(), "--no-vsync"]);
        let options = resolve_options(&args, &test_paths(dir.path())).unwrap();
        assert!(!options.vsync);
    }

    #[test]
    fn presenter_flag_and_positional_shader_carry_through() {
        let dir = tempfile::TempDir::new().unwrap();
        let args = args_from(&["cave", "--presenter", "mesh"]);
        let options = resolve_options(&args, &test_paths(dir.path())).unwrap();

        assert_eq!(options.presenter, PresenterKind::Mesh);
        assert_eq!(options.initial_shader.as_deref(), Some("cave"));
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let args = args_from(&[]);
        let options = resolve_options(&args, &test_paths(dir.path())).unwrap();

        assert_eq!(options.fbo_scale, 1.0);
        assert_eq!(options.shader_dir, dir.path().join("data").join("shaders"));
        assert_eq!(
            options.texture_dir,
            dir.path().join("data").join("textures")
        );
    }
}
