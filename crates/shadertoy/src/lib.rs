mod library;
mod table;
mod variable;

pub use library::{ShaderEntry, ShaderLibrary, ShaderLibraryError};
pub use table::VariableTable;
pub use variable::{ShaderVariable, VariableKind};

use std::path::{Path, PathBuf};

/// Number of texture channels a shader can bind through `texN` directives.
pub const TEXTURE_CHANNELS: usize = 4;

/// Derives the settings sibling for a shader source path by swapping the last
/// four characters of the file name, so `cave.glsl` pairs with `cave.sett`.
/// Names too short for the swap take a `sett` extension instead.
pub fn settings_path(source: &Path) -> PathBuf {
    let Some(name) = source.file_name().and_then(|name| name.to_str()) else {
        return source.with_extension("sett");
    };
    if name.len() > 4 && name.is_char_boundary(name.len() - 4) {
        let mut swapped = name[..name.len() - 4].to_string();
        swapped.push_str("sett");
        source.with_file_name(swapped)
    } else {
        source.with_extension("sett")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_sibling_swaps_the_glsl_suffix() {
        assert_eq!(
            settings_path(Path::new("/shaders/cave.glsl")),
            PathBuf::from("/shaders/cave.sett")
        );
    }

    #[test]
    fn settings_sibling_keeps_extra_dots() {
        assert_eq!(
            settings_path(Path::new("two.pass.glsl")),
            PathBuf::from("two.pass.sett")
        );
    }

    #[test]
    fn settings_sibling_swaps_other_suffixes_too() {
        assert_eq!(
            settings_path(Path::new("toy.frag")),
            PathBuf::from("toy.sett")
        );
    }

    #[test]
    fn short_names_fall_back_to_an_extension() {
        assert_eq!(settings_path(Path::new("a.fs")), PathBuf::from("a.sett"));
    }
}
