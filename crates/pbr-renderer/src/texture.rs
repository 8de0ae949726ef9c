//! GPU textures, shared samplers and fallback bindings

use std::path::Path;

use pbr_core::{AssetError, TextureId, TextureKind, TextureRef};

/// Color format of every float render target produced by the bake passes
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Two-channel format of the BRDF lookup texture
pub const BRDF_LUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg16Float;

/// Format of offscreen frames; the programs apply gamma themselves
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Format of the shadow and scene depth buffers
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// A GPU texture tagged with its semantic kind
///
/// Owned by the component that created it; scenes only hold the
/// [`TextureRef`] returned by [`GpuTexture::reference`].
pub struct GpuTexture {
    reference: TextureRef,
    /// GPU texture object
    pub texture: wgpu::Texture,
    /// View covering every mip and layer (cube view for cubemaps)
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    /// Wrap `texture` under a freshly generated reference
    pub fn new(kind: TextureKind, texture: wgpu::Texture, view: wgpu::TextureView) -> Self {
        Self {
            reference: TextureRef::generated(kind),
            texture,
            view,
        }
    }

    /// Wrap `texture` decoded from `path`
    pub fn from_file(
        kind: TextureKind,
        path: &Path,
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    ) -> Self {
        Self {
            reference: TextureRef::from_file(kind, path),
            texture,
            view,
        }
    }

    /// Reference handed to scenes
    pub fn reference(&self) -> &TextureRef {
        &self.reference
    }

    /// Handle identity
    pub fn id(&self) -> TextureId {
        self.reference.id
    }

    /// Semantic kind
    pub fn kind(&self) -> TextureKind {
        self.reference.kind
    }

    /// Width of mip 0
    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    /// Height of mip 0
    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    /// Number of mip levels
    pub fn mip_level_count(&self) -> u32 {
        self.texture.mip_level_count()
    }

    /// Single-layer, single-mip 2D view for rendering into cube face `layer`
    pub fn face_view(&self, layer: u32, mip: u32) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("face view"),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_mip_level: mip,
            mip_level_count: Some(1),
            base_array_layer: layer,
            array_layer_count: Some(1),
            ..Default::default()
        })
    }

    /// Free the GPU memory now instead of when the last handle drops
    pub fn destroy(self) {
        tracing::debug!("Destroying {:?} texture {}", self.kind(), self.id());
        self.texture.destroy();
    }
}

/// Create a cube texture usable as render target and sampled texture
pub fn create_cube_texture(
    device: &wgpu::Device,
    label: &str,
    kind: TextureKind,
    size: u32,
    mip_level_count: u32,
) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 6,
        },
        mip_level_count,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: HDR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some(label),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    });
    GpuTexture::new(kind, texture, view)
}

/// Samplers shared by every program
pub struct Samplers {
    /// Trilinear, clamped to edge
    pub linear: wgpu::Sampler,
    /// Depth comparison for shadow lookups
    pub shadow: wgpu::Sampler,
}

impl Samplers {
    /// Create the shared samplers
    pub fn new(device: &wgpu::Device) -> Self {
        let linear = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Out-of-map lookups are treated as lit in the shader
        let shadow = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        Self { linear, shadow }
    }
}

/// 1x1 stand-ins bound in slots that have no texture this draw
pub struct FallbackTextures {
    /// White 2D texture
    pub white: wgpu::TextureView,
    /// Black cube texture
    pub black_cube: wgpu::TextureView,
    /// Depth texture cleared to the far plane
    pub depth: wgpu::TextureView,
}

impl FallbackTextures {
    /// Create and initialize the fallbacks
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let extent = |layers| wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: layers,
        };

        let white = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Fallback White"),
            size: extent(1),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &white,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255, 255, 255, 255],
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            extent(1),
        );

        // Zero-initialized by wgpu
        let black_cube = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Fallback Black Cube"),
            size: extent(6),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HDR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Fallback Depth"),
            size: extent(1),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Fallback Clear Encoder"),
        });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Fallback Depth Clear"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        queue.submit(Some(encoder.finish()));

        Self {
            white: white.create_view(&wgpu::TextureViewDescriptor::default()),
            black_cube: black_cube.create_view(&wgpu::TextureViewDescriptor {
                dimension: Some(wgpu::TextureViewDimension::Cube),
                ..Default::default()
            }),
            depth: depth_view,
        }
    }
}

/// Decode an 8-bit material texture from disk and upload it
pub fn load_material_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    reference: &TextureRef,
) -> Result<GpuTexture, AssetError> {
    let path = reference.path.as_path();
    let image = image::open(path)
        .map_err(|e| AssetError::Decode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?
        .to_rgba8();
    let (width, height) = image.dimensions();

    // Color maps are authored in sRGB, data maps are linear
    let format = match reference.kind {
        TextureKind::Diffuse | TextureKind::Emissive => wgpu::TextureFormat::Rgba8UnormSrgb,
        _ => wgpu::TextureFormat::Rgba8Unorm,
    };

    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&format!("{:?} Texture", reference.kind)),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &image,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    tracing::debug!("Loaded {:?} texture {} ({}x{})", reference.kind, path.display(), width, height);
    Ok(GpuTexture {
        reference: reference.clone(),
        texture,
        view,
    })
}
