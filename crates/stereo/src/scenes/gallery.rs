use std::any::Any;
use std::path::Path;

use glam::Vec3;
use shadertoy::{ShaderLibrary, VariableTable};
use tracing::{info, warn};

use crate::chassis::EyeCamera;
use crate::scene::{EyeDraw, Scene, SceneContext, SceneUpdate};
use crate::scenes::ToyPass;

/// The shader-gallery world: one shader from the library at a time, with
/// next/previous cycling and tunable editing against the active table.
pub(crate) struct GalleryScene {
    library: ShaderLibrary,
    active: usize,
    table: VariableTable,
    toy: Option<ToyPass>,
}

impl GalleryScene {
    pub(crate) fn new(shader_dir: &Path, initial: Option<&str>) -> Self {
        let library = ShaderLibrary::discover(shader_dir);
        let active = match initial {
            Some(name) => library.index_of(name).unwrap_or_else(|| {
                warn!(shader = name, "requested shader not found; starting at the first");
                0
            }),
            None => 0,
        };

        Self {
            library,
            active,
            table: VariableTable::default(),
            toy: None,
        }
    }

    pub(crate) fn shader_count(&self) -> usize {
        self.library.len()
    }

    pub(crate) fn active_name(&self) -> Option<&str> {
        self.library.get(self.active).map(|entry| entry.name.as_str())
    }

    /// Cycles to the neighbouring shader and recompiles. Wraps at both ends.
    pub(crate) fn advance(&mut self, ctx: &mut SceneContext<'_>, forward: bool) {
        let count = self.library.len();
        if count == 0 {
            warn!("shader gallery is empty; nothing to switch to");
            return;
        }
        self.active = if forward {
            (self.active + 1) % count
        } else {
            (self.active + count - 1) % count
        };
        self.load_active(ctx);
        if let Some(name) = self.active_name() {
            info!(shader = name, "switched gallery shader");
        }
    }

    pub(crate) fn save_settings(&self) {
        let Some(entry) = self.library.get(self.active) else {
            warn!("no active shader; nothing to save");
            return;
        };
        match entry.save_settings(&self.table) {
            Ok(()) => info!(
                shader = %entry.name,
                path = %entry.settings_path.display(),
                "saved shader settings"
            ),
            Err(err) => warn!(shader = %entry.name, error = %err, "failed to save settings"),
        }
    }

    pub(crate) fn head_pos(&self) -> Vec3 {
        self.table.head_pos()
    }

    pub(crate) fn head_size(&self) -> f32 {
        self.table.head_size()
    }

    pub(crate) fn table(&self) -> &VariableTable {
        &self.table
    }

    pub(crate) fn table_mut(&mut self) -> &mut VariableTable {
        &mut self.table
    }

    pub(crate) fn fulldome_ready(&self) -> bool {
        self.toy.as_ref().is_some_and(ToyPass::fulldome_ready)
    }

    /// Reads, parses, and compiles the active entry. A read failure leaves
    /// the previous shader in place.
    fn load_active(&mut self, ctx: &mut SceneContext<'_>) {
        let Some(entry) = self.library.get(self.active) else {
            return;
        };
        let source = match entry.read_source() {
            Ok(source) => source,
            Err(err) => {
                warn!(shader = %entry.name, error = %err, "failed to read shader source");
                return;
            }
        };

        self.table = entry.load_table(&source);
        match &mut self.toy {
            Some(toy) => toy.replace_source(ctx, &entry.name, &source, &self.table),
            None => self.toy = Some(ToyPass::new(ctx, &entry.name, &source, &self.table)),
        }
    }
}

impl Scene for GalleryScene {
    fn label(&self) -> &str {
        "gallery"
    }

    fn init_gpu(&mut self, ctx: &mut SceneContext<'_>) -> anyhow::Result<()> {
        if self.library.is_empty() {
            warn!("shader gallery is empty; the gallery world will be black");
            return Ok(());
        }
        self.load_active(ctx);
        Ok(())
    }

    fn timestep(&mut self, _update: &SceneUpdate) {}

    fn render_for_eye(
        &mut self,
        pass: &mut wgpu::RenderPass<'static>,
        draw: &EyeDraw<'_>,
        camera: &EyeCamera,
    ) {
        if let Some(toy) = &self.toy {
            toy.draw(pass, draw, camera, &self.table);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn gallery_dir(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            fs::write(
                dir.path().join(format!("{name}.glsl")),
                "vec3 getSceneColor(in vec3 ro, in vec3 rd) { return rd; }\n",
            )
            .unwrap();
        }
        dir
    }

    #[test]
    fn starts_at_the_requested_shader() {
        let dir = gallery_dir(&["aurora", "cave", "dunes"]);
        let gallery = GalleryScene::new(dir.path(), Some("cave"));
        assert_eq!(gallery.active_name(), Some("cave"));
    }

    #[test]
    fn unknown_initial_shader_falls_back_to_the_first() {
        let dir = gallery_dir(&["aurora", "cave"]);
        let gallery = GalleryScene::new(dir.path(), Some("missing"));
        assert_eq!(gallery.active_name(), Some("aurora"));
    }

    #[test]
    fn empty_directory_yields_an_empty_gallery() {
        let dir = TempDir::new().unwrap();
        let gallery = GalleryScene::new(dir.path(), None);
        assert_eq!(gallery.shader_count(), 0);
        assert_eq!(gallery.active_name(), None);
    }
}
