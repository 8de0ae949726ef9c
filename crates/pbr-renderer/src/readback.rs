//! Copy textures back to the CPU for verification and export

use std::path::Path;

use crate::context::GpuContext;
use crate::error::RenderError;

/// Row pitch of a buffer copy, padded to the wgpu alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDimensions {
    /// Texels per row
    pub width: u32,
    /// Rows
    pub height: u32,
    /// Tightly packed row size in bytes
    pub unpadded_bytes_per_row: u32,
    /// Row size in the staging buffer
    pub padded_bytes_per_row: u32,
}

impl BufferDimensions {
    /// Dimensions of a `width` x `height` copy with `bytes_per_texel` texels
    pub fn new(width: u32, height: u32, bytes_per_texel: u32) -> Self {
        let unpadded_bytes_per_row = width * bytes_per_texel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;
        Self {
            width,
            height,
            unpadded_bytes_per_row,
            padded_bytes_per_row,
        }
    }
}

fn bytes_per_texel(format: wgpu::TextureFormat) -> Result<u32, RenderError> {
    use wgpu::TextureFormat::*;
    match format {
        Rgba8Unorm | Rgba8UnormSrgb | Bgra8Unorm | Bgra8UnormSrgb => Ok(4),
        Rg16Float => Ok(4),
        Rgba16Float => Ok(8),
        Rgba32Float => Ok(16),
        Depth32Float | R32Float => Ok(4),
        other => Err(RenderError::Readback(format!("unsupported format {other:?}"))),
    }
}

/// Tightly packed bytes of one layer and mip of `texture`
pub fn read_texture_bytes(
    ctx: &GpuContext,
    texture: &wgpu::Texture,
    layer: u32,
    mip: u32,
) -> Result<Vec<u8>, RenderError> {
    if layer >= texture.depth_or_array_layers() || mip >= texture.mip_level_count() {
        return Err(RenderError::Readback(format!(
            "layer {layer} mip {mip} out of range"
        )));
    }
    let format = texture.format();
    let width = (texture.width() >> mip).max(1);
    let height = (texture.height() >> mip).max(1);
    let dimensions = BufferDimensions::new(width, height, bytes_per_texel(format)?);

    let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size: dimensions.padded_bytes_per_row as u64 * height as u64,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let aspect = if format.has_depth_aspect() {
        wgpu::TextureAspect::DepthOnly
    } else {
        wgpu::TextureAspect::All
    };
    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: mip,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect,
        },
        wgpu::ImageCopyBuffer {
            buffer: &staging,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(dimensions.padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    ctx.queue.submit(Some(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    ctx.device.poll(wgpu::Maintain::Wait);
    receiver
        .recv()
        .map_err(|e| RenderError::Readback(e.to_string()))?
        .map_err(|e| RenderError::Readback(e.to_string()))?;

    let padded = slice.get_mapped_range();
    let mut bytes = Vec::with_capacity((dimensions.unpadded_bytes_per_row * height) as usize);
    for row in padded.chunks(dimensions.padded_bytes_per_row as usize) {
        bytes.extend_from_slice(&row[..dimensions.unpadded_bytes_per_row as usize]);
    }
    drop(padded);
    staging.unmap();
    Ok(bytes)
}

/// Texels of one layer and mip as linear RGBA floats
///
/// Two-channel textures fill blue with 0 and alpha with 1; depth textures
/// repeat the depth in RGB. 8-bit values are returned as stored.
pub fn read_texture_rgba_f32(
    ctx: &GpuContext,
    texture: &wgpu::Texture,
    layer: u32,
    mip: u32,
) -> Result<Vec<[f32; 4]>, RenderError> {
    let bytes = read_texture_bytes(ctx, texture, layer, mip)?;
    use wgpu::TextureFormat::*;
    let texels = match texture.format() {
        Rgba16Float => bytemuck::pod_collect_to_vec::<u8, half::f16>(&bytes)
            .chunks_exact(4)
            .map(|c| [c[0].to_f32(), c[1].to_f32(), c[2].to_f32(), c[3].to_f32()])
            .collect(),
        Rg16Float => bytemuck::pod_collect_to_vec::<u8, half::f16>(&bytes)
            .chunks_exact(2)
            .map(|c| [c[0].to_f32(), c[1].to_f32(), 0.0, 1.0])
            .collect(),
        Rgba32Float => bytemuck::pod_collect_to_vec::<u8, f32>(&bytes)
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect(),
        Depth32Float | R32Float => bytemuck::pod_collect_to_vec::<u8, f32>(&bytes)
            .into_iter()
            .map(|d| [d, d, d, 1.0])
            .collect(),
        Bgra8Unorm | Bgra8UnormSrgb => bytes
            .chunks_exact(4)
            .map(|c| [c[2], c[1], c[0], c[3]].map(|v| v as f32 / 255.0))
            .collect(),
        _ => bytes
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]].map(|v| v as f32 / 255.0))
            .collect(),
    };
    Ok(texels)
}

/// Write an 8-bit RGBA texture to a PNG file
pub fn save_png(
    ctx: &GpuContext,
    texture: &wgpu::Texture,
    path: impl AsRef<Path>,
) -> Result<(), RenderError> {
    let path = path.as_ref();
    let bytes = match texture.format() {
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => {
            read_texture_bytes(ctx, texture, 0, 0)?
        }
        other => {
            return Err(RenderError::Readback(format!(
                "PNG export needs an RGBA8 texture, got {other:?}"
            )));
        }
    };
    let image = image::RgbaImage::from_raw(texture.width(), texture.height(), bytes)
        .ok_or_else(|| RenderError::Readback("texel count mismatch".to_string()))?;
    image
        .save(path)
        .map_err(|e| RenderError::Readback(format!("{}: {e}", path.display())))?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}

/// Write one layer and mip of a float texture to a Radiance HDR file
pub fn save_hdr(
    ctx: &GpuContext,
    texture: &wgpu::Texture,
    layer: u32,
    mip: u32,
    path: impl AsRef<Path>,
) -> Result<(), RenderError> {
    let path = path.as_ref();
    let texels = read_texture_rgba_f32(ctx, texture, layer, mip)?;
    let width = (texture.width() >> mip).max(1);
    let height = (texture.height() >> mip).max(1);
    let rgb: Vec<f32> = texels.iter().flat_map(|t| [t[0], t[1], t[2]]).collect();
    let image = image::Rgb32FImage::from_raw(width, height, rgb)
        .ok_or_else(|| RenderError::Readback("texel count mismatch".to_string()))?;
    image::DynamicImage::ImageRgb32F(image)
        .save(path)
        .map_err(|e| RenderError::Readback(format!("{}: {e}", path.display())))?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;

    #[test]
    fn test_rows_are_padded_to_copy_alignment() {
        let dims = BufferDimensions::new(3, 2, 8);
        assert_eq!(dims.unpadded_bytes_per_row, 24);
        assert_eq!(dims.padded_bytes_per_row, 256);

        let dims = BufferDimensions::new(64, 1, 4);
        assert_eq!(dims.padded_bytes_per_row, 256);
    }

    #[test]
    fn test_unsupported_format_is_rejected() {
        assert!(matches!(
            bytes_per_texel(wgpu::TextureFormat::Bc1RgbaUnorm),
            Err(RenderError::Readback(_))
        ));
    }

    #[test]
    fn test_read_back_uploaded_texels() {
        let Some(ctx) = test_context() else { return };
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("readback test"),
            size: wgpu::Extent3d {
                width: 3,
                height: 2,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let data: Vec<u8> = (0..24).collect();
        ctx.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(12),
                rows_per_image: Some(2),
            },
            texture.size(),
        );

        let bytes = read_texture_bytes(&ctx, &texture, 0, 0).unwrap();
        assert_eq!(bytes, data);
        assert!(read_texture_bytes(&ctx, &texture, 1, 0).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        save_png(&ctx, &texture, &path).unwrap();
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.into_raw(), data);
    }
}
