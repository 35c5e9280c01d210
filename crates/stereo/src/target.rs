use hmd::Eye;

/// Letterbox fractions above this leave too little image to be useful.
const CINEMASCOPE_MAX: f32 = 0.95;

/// An eye's sub-rect of the shared render target, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Target dimensions for a native panel size and a render scale.
pub(crate) fn scaled_target_size(native: (u32, u32), scale: f32) -> (u32, u32) {
    let width = (native.0 as f32 * scale).round().max(1.0) as u32;
    let height = (native.1 as f32 * scale).round().max(1.0) as u32;
    (width, height)
}

/// Splits the target into side-by-side eye rects, with an optional
/// cinemascope letterbox carving equal bands off the top and bottom.
pub(crate) fn eye_viewport(target: (u32, u32), eye: Eye, cinemascope: f32) -> Viewport {
    let (width, height) = target;
    let half = width / 2;
    let (x, eye_width) = match eye {
        Eye::Left => (0, half),
        Eye::Right => (half, width - half),
    };

    let fraction = cinemascope.clamp(0.0, CINEMASCOPE_MAX);
    let band = (height as f32 * fraction * 0.5).round() as u32;
    let eye_height = (height - 2 * band).max(1);

    Viewport {
        x,
        y: band,
        width: eye_width.max(1),
        height: eye_height,
    }
}

/// The off-screen texture both eyes render into.
///
/// One texture, two viewports; the presenter samples it afterwards, so the
/// usage carries `TEXTURE_BINDING` alongside the attachment bit.
pub(crate) struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: (u32, u32),
    pub format: wgpu::TextureFormat,
}

impl RenderTarget {
    pub(crate) fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: (u32, u32),
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("stereo render target"),
            size: wgpu::Extent3d {
                width: size.0.max(1),
                height: size.1.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            size,
            format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eyes_split_the_target_side_by_side() {
        let left = eye_viewport((1920, 1080), Eye::Left, 0.0);
        let right = eye_viewport((1920, 1080), Eye::Right, 0.0);
        assert_eq!(
            left,
            Viewport {
                x: 0,
                y: 0,
                width: 960,
                height: 1080
            }
        );
        assert_eq!(
            right,
            Viewport {
                x: 960,
                y: 0,
                width: 960,
                height: 1080
            }
        );
    }

    #[test]
    fn odd_widths_leave_no_gap() {
        let left = eye_viewport((1921, 1080), Eye::Left, 0.0);
        let right = eye_viewport((1921, 1080), Eye::Right, 0.0);
        assert_eq!(left.width + right.width, 1921);
        assert_eq!(right.x, left.width);
    }

    #[test]
    fn cinemascope_carves_equal_bands() {
        let vp = eye_viewport((1920, 1000), Eye::Left, 0.2);
        assert_eq!(vp.y, 100);
        assert_eq!(vp.height, 800);
    }

    #[test]
    fn cinemascope_clamps_instead_of_vanishing() {
        let vp = eye_viewport((1920, 1000), Eye::Left, 7.5);
        assert!(vp.height >= 1);

        let negative = eye_viewport((1920, 1000), Eye::Left, -3.0);
        assert_eq!(negative.height, 1000);
    }

    #[test]
    fn target_size_scales_and_rounds() {
        assert_eq!(scaled_target_size((1920, 1080), 1.0), (1920, 1080));
        assert_eq!(scaled_target_size((1920, 1080), 0.5), (960, 540));
        assert_eq!(scaled_target_size((1920, 1080), 0.33), (634, 356));
        assert_eq!(scaled_target_size((4, 4), 0.01), (1, 1));
    }
}
