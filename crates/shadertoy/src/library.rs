//! Shader discovery and the source/settings file pair.
//!
//! A shader on disk is a `.glsl` file plus an optional settings sibling
//! produced by [`crate::settings_path`]. The library walks a root directory
//! once at startup; callers cycle through the resulting entries by index.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::settings_path;
use crate::table::VariableTable;

#[derive(Debug, Error)]
pub enum ShaderLibraryError {
    #[error("failed to read shader source {path}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write shader settings {path}")]
    WriteSettings {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One discovered shader: the GLSL source and its settings sibling path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderEntry {
    pub name: String,
    pub source_path: PathBuf,
    pub settings_path: PathBuf,
}

impl ShaderEntry {
    pub fn from_source_path(source_path: PathBuf) -> Self {
        let name = source_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let settings_path = settings_path(&source_path);
        Self {
            name,
            source_path,
            settings_path,
        }
    }

    pub fn read_source(&self) -> Result<String, ShaderLibraryError> {
        fs::read_to_string(&self.source_path).map_err(|source| ShaderLibraryError::ReadSource {
            path: self.source_path.clone(),
            source,
        })
    }

    /// Parses `source` and overlays the settings sibling when it exists.
    ///
    /// A missing settings file is the normal case for a fresh shader; any
    /// other read failure is reported and the source declarations stand.
    pub fn load_table(&self, source: &str) -> VariableTable {
        let mut table = VariableTable::from_source(source);
        match fs::read_to_string(&self.settings_path) {
            Ok(text) => table.merge_settings(&text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(
                    path = %self.settings_path.display(),
                    "no settings file; using source declarations"
                );
            }
            Err(err) => {
                warn!(
                    path = %self.settings_path.display(),
                    error = %err,
                    "failed to read settings file; using source declarations"
                );
            }
        }
        table
    }

    pub fn save_settings(&self, table: &VariableTable) -> Result<(), ShaderLibraryError> {
        fs::write(&self.settings_path, table.serialize()).map_err(|source| {
            ShaderLibraryError::WriteSettings {
                path: self.settings_path.clone(),
                source,
            }
        })
    }
}

/// Every `.glsl` file under a root, in stable path order.
#[derive(Clone, Debug, Default)]
pub struct ShaderLibrary {
    entries: Vec<ShaderEntry>,
}

impl ShaderLibrary {
    /// Walks `root` recursively for `.glsl` sources.
    ///
    /// A missing root yields an empty library with a notice rather than an
    /// error, so a viewer without any shaders installed still starts.
    pub fn discover(root: &Path) -> Self {
        if !root.is_dir() {
            warn!(path = %root.display(), "shader directory missing; library is empty");
            return Self::default();
        }

        let mut sources = Vec::new();
        collect_sources(root, &mut sources);
        sources.sort();

        debug!(
            count = sources.len(),
            root = %root.display(),
            "discovered shaders"
        );

        Self {
            entries: sources.into_iter().map(ShaderEntry::from_source_path).collect(),
        }
    }

    pub fn entries(&self) -> &[ShaderEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ShaderEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the entry whose file stem equals `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }
}

fn collect_sources(dir: &Path, out: &mut Vec<PathBuf>) {
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(err) => {
            warn!(path = %dir.display(), error = %err, "failed to list shader directory");
            return;
        }
    };

    for entry in read.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_sources(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "glsl") {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) -> PathBuf {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write fixture");
        path
    }

    #[test]
    fn discover_finds_nested_sources_in_path_order() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "b.glsl", "// b");
        write(dir.path(), "a.glsl", "// a");
        write(dir.path(), "nested/c.glsl", "// c");
        write(dir.path(), "notes.txt", "not a shader");

        let library = ShaderLibrary::discover(dir.path());
        let names: Vec<&str> = library
            .entries()
            .iter()
            .map(|entry| entry.name.as_str())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(library.index_of("c"), Some(2));
    }

    #[test]
    fn discover_on_missing_root_is_empty() {
        let dir = TempDir::new().expect("tempdir");
        let library = ShaderLibrary::discover(&dir.path().join("absent"));
        assert!(library.is_empty());
    }

    #[test]
    fn entry_pairs_source_with_settings_sibling() {
        let entry = ShaderEntry::from_source_path(PathBuf::from("/shaders/cave.glsl"));
        assert_eq!(entry.name, "cave");
        assert_eq!(entry.settings_path, PathBuf::from("/shaders/cave.sett"));
    }

    #[test]
    fn load_table_without_settings_uses_source_declarations() {
        let dir = TempDir::new().expect("tempdir");
        let path = write(dir.path(), "toy.glsl", "// @var float gain 0.5 0.0 1.0 0.1");
        let entry = ShaderEntry::from_source_path(path);

        let source = entry.read_source().expect("read source");
        let table = entry.load_table(&source);
        assert_eq!(table.get("gain").expect("gain").scalar_value(), 0.5);
    }

    #[test]
    fn load_table_overlays_saved_settings() {
        let dir = TempDir::new().expect("tempdir");
        let path = write(dir.path(), "toy.glsl", "// @var float gain 0.5 0.0 1.0 0.1");
        write(dir.path(), "toy.sett", "@var float gain 0.9 0 0 0");
        let entry = ShaderEntry::from_source_path(path);

        let source = entry.read_source().expect("read source");
        let table = entry.load_table(&source);
        let gain = table.get("gain").expect("gain");
        assert_eq!(gain.scalar_value(), 0.9);
        assert_eq!(gain.initial.x, 0.5);
    }

    #[test]
    fn save_settings_round_trips_through_load() {
        let dir = TempDir::new().expect("tempdir");
        let path = write(dir.path(), "toy.glsl", "// @var float gain 0.5 0.0 1.0 0.1");
        let entry = ShaderEntry::from_source_path(path);

        let source = entry.read_source().expect("read source");
        let mut table = entry.load_table(&source);
        table.get_mut("gain").expect("gain").value.x = 0.75;
        entry.save_settings(&table).expect("save settings");

        let reloaded = entry.load_table(&source);
        assert_eq!(reloaded.get("gain").expect("gain").scalar_value(), 0.75);
    }

    #[test]
    fn read_source_reports_the_failing_path() {
        let entry = ShaderEntry::from_source_path(PathBuf::from("/definitely/absent.glsl"));
        let err = entry.read_source().expect_err("missing file");
        assert!(err.to_string().contains("absent.glsl"));
    }
}
