use std::collections::HashMap;
use std::path::{Path, PathBuf};

use shadertoy::TEXTURE_CHANNELS;
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

const EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

struct LoadedTexture {
    view: wgpu::TextureView,
}

/// Loads and caches channel textures by the names a shader references.
///
/// Every lookup succeeds: a missing directory, file, or decode failure is
/// logged once and answered with a 1x1 placeholder so the scene still draws.
pub(crate) struct TextureLibrary {
    dir: Option<PathBuf>,
    cache: HashMap<String, LoadedTexture>,
    placeholder: LoadedTexture,
    sampler: wgpu::Sampler,
    layout: wgpu::BindGroupLayout,
}

impl TextureLibrary {
    pub(crate) fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        dir: Option<PathBuf>,
    ) -> Self {
        let placeholder = LoadedTexture {
            view: upload_rgba(device, queue, "placeholder", 1, 1, &[128, 128, 128, 255]),
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("channel sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let layout = channel_layout(device);

        Self {
            dir,
            cache: HashMap::new(),
            placeholder,
            sampler,
            layout,
        }
    }

    pub(crate) fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Builds the channel bind group for the given per-channel filenames.
    /// Empty names fall through to the placeholder without a warning.
    pub(crate) fn bind_channels(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        names: &[String; TEXTURE_CHANNELS],
    ) -> wgpu::BindGroup {
        for name in names {
            self.ensure_loaded(device, queue, name);
        }

        let mut entries = Vec::with_capacity(TEXTURE_CHANNELS * 2);
        for (channel, name) in names.iter().enumerate() {
            let view = self
                .cache
                .get(name.as_str())
                .map(|loaded| &loaded.view)
                .unwrap_or(&self.placeholder.view);
            entries.push(wgpu::BindGroupEntry {
                binding: (channel * 2) as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: (channel * 2 + 1) as u32,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            });
        }

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("channel bind group"),
            layout: &self.layout,
            entries: &entries,
        })
    }

    fn ensure_loaded(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, name: &str) {
        if name.is_empty() || self.cache.contains_key(name) {
            return;
        }

        let Some(dir) = self.dir.as_deref() else {
            warn!(name, "no texture directory configured; using placeholder");
            return;
        };
        let Some(path) = resolve_path(dir, name) else {
            warn!(name, dir = %dir.display(), "texture not found; using placeholder");
            return;
        };

        match load_image(device, queue, &path) {
            Ok(view) => {
                debug!(name, path = %path.display(), "loaded channel texture");
                self.cache.insert(name.to_string(), LoadedTexture { view });
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to load texture; using placeholder"
                );
            }
        }
    }
}

/// Texture/sampler pairs for every channel, interleaved on bindings 0..8.
fn channel_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let mut entries = Vec::with_capacity(TEXTURE_CHANNELS * 2);
    for channel in 0..TEXTURE_CHANNELS {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: (channel * 2) as u32,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: (channel * 2 + 1) as u32,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("channel layout"),
        entries: &entries,
    })
}

fn resolve_path(dir: &Path, name: &str) -> Option<PathBuf> {
    let direct = dir.join(name);
    if direct.is_file() {
        return Some(direct);
    }
    if Path::new(name).extension().is_none() {
        for ext in EXTENSIONS {
            let candidate = dir.join(format!("{name}.{ext}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

fn load_image(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
) -> Result<wgpu::TextureView, image::ImageError> {
    let mut rgba = image::open(path)?.to_rgba8();
    // GLSL shaders sample with a bottom-left origin.
    image::imageops::flip_vertical_in_place(&mut rgba);
    let (width, height) = rgba.dimensions();
    let label = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("texture");
    Ok(upload_rgba(device, queue, label, width, height, &rgba))
}

fn upload_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    data: &[u8],
) -> wgpu::TextureView {
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        data,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn resolve_prefers_the_exact_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("rock.png"), b"junk").unwrap();
        let found = resolve_path(dir.path(), "rock.png").unwrap();
        assert_eq!(found, dir.path().join("rock.png"));
    }

    #[test]
    fn resolve_tries_known_extensions_for_bare_stems() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("rock.jpg"), b"junk").unwrap();
        let found = resolve_path(dir.path(), "rock").unwrap();
        assert_eq!(found, dir.path().join("rock.jpg"));
    }

    #[test]
    fn resolve_reports_missing_files() {
        let dir = TempDir::new().unwrap();
        assert!(resolve_path(dir.path(), "nothing").is_none());
    }
}
