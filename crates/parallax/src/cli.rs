use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stereo::PresenterKind;

#[derive(Parser, Debug)]
#[command(
    name = "parallax",
    author,
    version,
    about = "Stereoscopic shader world viewer",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// File stem of the gallery shader to start on (e.g. `cave`).
    #[arg(value_name = "SHADER")]
    pub shader: Option<String>,

    /// Directory holding the gallery shader sources; can also be supplied
    /// via the `PARALLAX_SHADER_DIR` env var.
    #[arg(long, value_name = "DIR", env = "PARALLAX_SHADER_DIR")]
    pub shader_dir: Option<PathBuf>,

    /// Directory holding textures referenced through `texN` variables.
    #[arg(long, value_name = "DIR")]
    pub texture_dir: Option<PathBuf>,

    /// Configuration file to read instead of the discovered one.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Window size (e.g. `1920x1080`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Render target scale relative to the device's native resolution.
    #[arg(long, value_name = "SCALE")]
    pub fbo_scale: Option<f32>,

    /// Vertical letterbox fraction of each eye image (0 disables).
    #[arg(long, value_name = "FRACTION")]
    pub cinemascope: Option<f32>,

    /// Presentation path: `auto`, `compositor`, or `mesh`.
    #[arg(long, value_name = "MODE", value_parser = parse_presenter)]
    pub presenter: Option<PresenterKind>,

    /// Present as fast as possible instead of waiting for vblank.
    #[arg(long)]
    pub no_vsync: bool,

    /// Start in the fulldome projection where shaders provide the variant.
    #[arg(long)]
    pub fulldome: bool,

    /// Animate the synthetic debug device with a gentle idle sway.
    #[arg(long)]
    pub sway: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the shaders the gallery would cycle through, then exit.
    List,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let Some((width, height)) = trimmed.split_once(['x', 'X']) else {
        return Err(format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"));
    };
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err("size components must be positive".into());
    }
    Ok((width, height))
}

pub fn parse_presenter(value: &str) -> Result<PresenterKind, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "auto" => Ok(PresenterKind::Auto),
        "compositor" | "blit" => Ok(PresenterKind::Compositor),
        "mesh" | "warp" => Ok(PresenterKind::Mesh),
        other => Err(format!(
            "invalid presenter '{other}'; use auto, compositor, or mesh"
        )),
    }
}
