//! Image-based-lighting environment processor
//!
//! Turns an equirectangular HDR image into the four textures the model
//! programs sample for ambient lighting:
//!
//! - the environment cubemap (with a full mip chain),
//! - the diffuse irradiance cubemap,
//! - the GGX prefiltered cubemap, one roughness level per mip,
//! - the split-sum BRDF lookup texture.
//!
//! The processor also owns the skybox program that displays one of the cubes.

mod bake;
mod skybox;

pub use bake::{BakeParams, BakePipelines};
pub use skybox::{SkyboxFrame, SkyboxRenderer};

use std::path::{Path, PathBuf};

use pbr_core::capture::{full_mip_count, mip_size};
use pbr_core::{AssetError, CubeFace, SkyboxTexture, TextureKind, TextureRef};

use crate::config::EnvironmentConfig;
use crate::context::GpuContext;
use crate::error::RenderError;
use crate::geometry::GeometryBuffers;
use crate::texture::{BRDF_LUT_FORMAT, GpuTexture, HDR_FORMAT, create_cube_texture};

/// The textures derived from one HDR environment
pub struct EnvironmentMaps {
    path: PathBuf,
    /// Source image converted to a cubemap
    pub environment: GpuTexture,
    /// Diffuse irradiance cubemap
    pub irradiance: GpuTexture,
    /// Specular prefiltered cubemap
    pub prefiltered: GpuTexture,
    /// BRDF integration lookup texture
    pub brdf_lookup: GpuTexture,
    display: SkyboxTexture,
    mip_level: u32,
}

impl EnvironmentMaps {
    /// HDR file the maps were baked from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// References attached to the scene for ambient lighting
    pub fn references(&self) -> [TextureRef; 3] {
        [
            self.irradiance.reference().clone(),
            self.prefiltered.reference().clone(),
            self.brdf_lookup.reference().clone(),
        ]
    }

    /// All four textures
    pub fn textures(&self) -> [&GpuTexture; 4] {
        [
            &self.environment,
            &self.irradiance,
            &self.prefiltered,
            &self.brdf_lookup,
        ]
    }

    /// Choose which cubemap the skybox shows
    pub fn set_texture_to_display(&mut self, texture: SkyboxTexture) {
        tracing::debug!("Skybox shows {:?}", texture);
        self.display = texture;
    }

    /// Cubemap currently shown by the skybox
    pub fn texture_to_display(&self) -> SkyboxTexture {
        self.display
    }

    /// Set the prefiltered mip shown by the skybox, clamped to the chain
    pub fn set_mip_level(&mut self, level: u32) {
        let max = self.prefiltered.mip_level_count().saturating_sub(1);
        if level > max {
            tracing::warn!("Mip level {} out of range, clamped to {}", level, max);
        }
        self.mip_level = level.min(max);
    }

    /// Selected mip level
    pub fn mip_level(&self) -> u32 {
        self.mip_level
    }

    /// Texture and mip level the skybox samples
    ///
    /// The mip level only applies to the prefiltered map.
    pub fn displayed(&self) -> (&GpuTexture, f32) {
        match self.display {
            SkyboxTexture::Environment => (&self.environment, 0.0),
            SkyboxTexture::Irradiance => (&self.irradiance, 0.0),
            SkyboxTexture::PreFilteredEnvironment => (&self.prefiltered, self.mip_level as f32),
        }
    }

    /// Release the GPU memory of every map
    pub fn destroy(self) {
        tracing::info!("Releasing environment {}", self.path.display());
        self.environment.destroy();
        self.irradiance.destroy();
        self.prefiltered.destroy();
        self.brdf_lookup.destroy();
    }
}

/// Runs the precomputation passes and draws the skybox
pub struct EnvironmentProcessor {
    config: EnvironmentConfig,
    pipelines: BakePipelines,
    sampler: wgpu::Sampler,
    skybox: SkyboxRenderer,
}

/// Reject images the device cannot hold in a single 2D texture
fn check_image_size(path: &Path, width: u32, height: u32, limit: u32) -> Result<(), AssetError> {
    if width == 0 || height == 0 || width > limit || height > limit {
        return Err(AssetError::Decode {
            path: path.display().to_string(),
            reason: format!("{width}x{height} image exceeds the {limit} texel texture limit"),
        });
    }
    Ok(())
}

impl EnvironmentProcessor {
    /// Compile the bake pipelines and the skybox program for `format` targets
    pub fn new(
        device: &wgpu::Device,
        config: EnvironmentConfig,
        format: wgpu::TextureFormat,
    ) -> Result<Self, RenderError> {
        config.validate().map_err(|e| {
            tracing::error!("{}", e);
            RenderError::Precondition(e.to_string())
        })?;
        let pipelines = BakePipelines::new(device)?;
        let skybox = SkyboxRenderer::new(device, format)?;
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment Bake Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Ok(Self {
            config,
            pipelines,
            sampler,
            skybox,
        })
    }

    /// Bake settings in use
    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Decode an HDR image and upload it as a float texture
    ///
    /// Rows are flipped so that v = 0 is the bottom of the image.
    pub fn load_equirectangular(
        &self,
        ctx: &GpuContext,
        path: &Path,
    ) -> Result<GpuTexture, AssetError> {
        if !path.exists() {
            let err = AssetError::Io(format!("{} does not exist", path.display()));
            tracing::error!("{}", err);
            return Err(err);
        }
        let image = image::open(path)
            .map_err(|e| {
                let err = AssetError::Decode {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                };
                tracing::error!("{}", err);
                err
            })?
            .flipv()
            .to_rgb32f();
        let (width, height) = image.dimensions();
        check_image_size(path, width, height, ctx.device.limits().max_texture_dimension_2d)
            .inspect_err(|e| tracing::error!("{}", e))?;

        let texels: Vec<half::f16> = image
            .pixels()
            .flat_map(|p| [p[0], p[1], p[2], 1.0])
            .map(half::f16::from_f32)
            .collect();

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Equirectangular Environment"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HDR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        ctx.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&texels),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width * 8),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        tracing::info!("Loaded {} ({}x{})", path.display(), width, height);
        Ok(GpuTexture::from_file(
            TextureKind::Equirectangular,
            path,
            texture,
            view,
        ))
    }

    /// Render the equirectangular image into the six faces of a cubemap
    pub fn convert_equirectangular_to_cubemap(
        &self,
        ctx: &GpuContext,
        geometry: &GeometryBuffers,
        source: &GpuTexture,
    ) -> GpuTexture {
        let size = self.config.face_size;
        let cube = create_cube_texture(
            &ctx.device,
            "Environment Cubemap",
            TextureKind::Environment,
            size,
            full_mip_count(size),
        );

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Equirectangular To Cubemap Encoder"),
        });
        for face in CubeFace::ALL {
            self.pipelines.equirect_to_cube.record(
                &ctx.device,
                &mut encoder,
                geometry,
                &cube.face_view(face.layer(), 0),
                &BakeParams::for_face(face),
                Some((&source.view, &self.sampler)),
            );
        }
        self.record_mip_chain(&ctx.device, &mut encoder, geometry, &cube);
        ctx.queue.submit(Some(encoder.finish()));

        tracing::debug!("Environment cubemap {}x{}, {} mips", size, size, cube.mip_level_count());
        cube
    }

    /// Fill mips 1.. of every face by downsampling the previous mip
    fn record_mip_chain(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        geometry: &GeometryBuffers,
        cube: &GpuTexture,
    ) {
        for mip in 1..cube.mip_level_count() {
            for face in CubeFace::ALL {
                let source = cube.face_view(face.layer(), mip - 1);
                self.pipelines.downsample.record(
                    device,
                    encoder,
                    geometry,
                    &cube.face_view(face.layer(), mip),
                    &BakeParams::quad(),
                    Some((&source, &self.sampler)),
                );
            }
        }
    }

    /// Convolve the environment into a diffuse irradiance cubemap
    pub fn create_irradiance_texture(
        &self,
        ctx: &GpuContext,
        geometry: &GeometryBuffers,
        environment: &GpuTexture,
    ) -> GpuTexture {
        let size = self.config.irradiance_size;
        let cube = create_cube_texture(
            &ctx.device,
            "Irradiance Cubemap",
            TextureKind::Irradiance,
            size,
            1,
        );

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Irradiance Encoder"),
        });
        for face in CubeFace::ALL {
            let params = BakeParams {
                sample_delta: self.config.irradiance_sample_delta,
                ..BakeParams::for_face(face)
            };
            self.pipelines.irradiance.record(
                &ctx.device,
                &mut encoder,
                geometry,
                &cube.face_view(face.layer(), 0),
                &params,
                Some((&environment.view, &self.sampler)),
            );
        }
        ctx.queue.submit(Some(encoder.finish()));

        tracing::debug!("Irradiance cubemap {}x{}", size, size);
        cube
    }

    /// Prefilter the environment with GGX, one roughness level per mip
    ///
    /// Mip `m` holds roughness `m / (levels - 1)` at `size * 0.5^m` texels.
    pub fn create_prefiltered_environment_map(
        &self,
        ctx: &GpuContext,
        geometry: &GeometryBuffers,
        environment: &GpuTexture,
    ) -> GpuTexture {
        let size = self.config.prefilter_size;
        let levels = self
            .config
            .prefilter_mip_levels
            .clamp(1, full_mip_count(size));
        let cube = create_cube_texture(
            &ctx.device,
            "Prefiltered Environment Cubemap",
            TextureKind::PreFilteredEnvironment,
            size,
            levels,
        );

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Prefilter Encoder"),
        });
        for mip in 0..levels {
            let roughness = if levels > 1 {
                mip as f32 / (levels - 1) as f32
            } else {
                0.0
            };
            tracing::debug!(
                "Prefiltering mip {} ({}px, roughness {:.2})",
                mip,
                mip_size(size, mip),
                roughness
            );
            for face in CubeFace::ALL {
                let params = BakeParams {
                    roughness,
                    sample_count: self.config.sample_count,
                    source_resolution: environment.width() as f32,
                    ..BakeParams::for_face(face)
                };
                self.pipelines.prefilter.record(
                    &ctx.device,
                    &mut encoder,
                    geometry,
                    &cube.face_view(face.layer(), mip),
                    &params,
                    Some((&environment.view, &self.sampler)),
                );
            }
        }
        ctx.queue.submit(Some(encoder.finish()));
        cube
    }

    /// Integrate the split-sum BRDF into a (scale, bias) lookup texture
    pub fn create_brdf_lookup_texture(
        &self,
        ctx: &GpuContext,
        geometry: &GeometryBuffers,
    ) -> GpuTexture {
        let size = self.config.brdf_lut_size;
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("BRDF Lookup Texture"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: BRDF_LUT_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("BRDF Lookup Encoder"),
        });
        let params = BakeParams {
            sample_count: self.config.sample_count,
            ..BakeParams::quad()
        };
        self.pipelines
            .brdf_lut
            .record(&ctx.device, &mut encoder, geometry, &view, &params, None);
        ctx.queue.submit(Some(encoder.finish()));

        tracing::debug!("BRDF lookup texture {}x{}", size, size);
        GpuTexture::new(TextureKind::BrdfLookup, texture, view)
    }

    /// Load `path` and bake every map
    ///
    /// On failure nothing created by this call survives.
    pub fn init(
        &self,
        ctx: &GpuContext,
        geometry: &GeometryBuffers,
        path: &Path,
    ) -> Result<EnvironmentMaps, RenderError> {
        tracing::info!("Baking environment {}", path.display());
        let equirectangular = self.load_equirectangular(ctx, path)?;

        ctx.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let environment = self.convert_equirectangular_to_cubemap(ctx, geometry, &equirectangular);
        let irradiance = self.create_irradiance_texture(ctx, geometry, &environment);
        let prefiltered = self.create_prefiltered_environment_map(ctx, geometry, &environment);
        let brdf_lookup = self.create_brdf_lookup_texture(ctx, geometry);
        let validation = pollster::block_on(ctx.device.pop_error_scope());
        let out_of_memory = pollster::block_on(ctx.device.pop_error_scope());

        ctx.wait_idle();
        equirectangular.destroy();

        if let Some(error) = validation.or(out_of_memory) {
            tracing::error!("Environment bake failed: {}", error);
            environment.destroy();
            irradiance.destroy();
            prefiltered.destroy();
            brdf_lookup.destroy();
            return Err(RenderError::Bake(error.to_string()));
        }

        tracing::info!("Environment {} ready", path.display());
        Ok(EnvironmentMaps {
            path: path.to_path_buf(),
            environment,
            irradiance,
            prefiltered,
            brdf_lookup,
            display: SkyboxTexture::Environment,
            mip_level: 0,
        })
    }

    /// Reset per-frame uniform slots
    pub fn begin_frame(&mut self) {
        self.skybox.begin_frame();
    }

    /// Draw the cubemap selected on `maps` behind the scene
    pub fn draw_skybox(
        &mut self,
        ctx: &GpuContext,
        pass: &mut wgpu::RenderPass<'_>,
        geometry: &GeometryBuffers,
        maps: &EnvironmentMaps,
        frame: &SkyboxFrame,
    ) {
        let (texture, mip_level) = maps.displayed();
        self.skybox.draw(
            &ctx.device,
            &ctx.queue,
            pass,
            geometry,
            texture,
            mip_level,
            &self.sampler,
            frame,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::readback::read_texture_rgba_f32;
    use crate::texture::COLOR_FORMAT;

    fn small_config() -> EnvironmentConfig {
        EnvironmentConfig {
            face_size: 16,
            irradiance_size: 4,
            prefilter_size: 16,
            prefilter_mip_levels: 5,
            brdf_lut_size: 16,
            sample_count: 64,
            irradiance_sample_delta: 0.1,
        }
    }

    fn write_constant_hdr(dir: &Path, color: [f32; 3]) -> PathBuf {
        let path = dir.join("constant.hdr");
        let image = image::Rgb32FImage::from_pixel(4, 2, image::Rgb(color));
        image::DynamicImage::ImageRgb32F(image)
            .save(&path)
            .expect("write hdr");
        path
    }

    #[test]
    fn test_missing_file_is_reported() {
        let Some(ctx) = test_context() else { return };
        let processor = EnvironmentProcessor::new(&ctx.device, small_config(), COLOR_FORMAT).expect("processor");
        let geometry = GeometryBuffers::new(&ctx.device);
        let result = processor.init(&ctx, &geometry, Path::new("/no/such/sky.hdr"));
        assert!(matches!(result, Err(RenderError::Asset(AssetError::Io(_)))));
    }

    #[test]
    fn test_undecodable_file_is_reported() {
        let Some(ctx) = test_context() else { return };
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("garbage.hdr");
        std::fs::write(&path, b"not an image").expect("write");
        let processor = EnvironmentProcessor::new(&ctx.device, small_config(), COLOR_FORMAT).expect("processor");
        let result = processor.load_equirectangular(&ctx, &path);
        assert!(matches!(result, Err(AssetError::Decode { .. })));
    }

    #[test]
    fn test_oversized_image_is_an_asset_error() {
        let path = Path::new("wide.hdr");
        assert!(check_image_size(path, 8192, 4096, 8192).is_ok());
        assert!(matches!(
            check_image_size(path, 16384, 8192, 8192),
            Err(AssetError::Decode { ref reason, .. }) if reason.contains("16384x8192")
        ));
        assert!(check_image_size(path, 4, 0, 8192).is_err());
    }

    #[test]
    fn test_image_beyond_device_limit_fails_before_upload() {
        let Some(ctx) = test_context() else { return };
        let limit = ctx.device.limits().max_texture_dimension_2d;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wide.hdr");
        let image = image::Rgb32FImage::from_pixel(limit + 1, 1, image::Rgb([1.0, 1.0, 1.0]));
        image::DynamicImage::ImageRgb32F(image)
            .save(&path)
            .expect("write hdr");

        let processor = EnvironmentProcessor::new(&ctx.device, small_config(), COLOR_FORMAT).expect("processor");
        let geometry = GeometryBuffers::new(&ctx.device);
        let result = processor.init(&ctx, &geometry, &path);
        assert!(matches!(result, Err(RenderError::Asset(AssetError::Decode { .. }))));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let Some(ctx) = test_context() else { return };
        let config = EnvironmentConfig {
            irradiance_sample_delta: 0.0,
            ..small_config()
        };
        let result = EnvironmentProcessor::new(&ctx.device, config, COLOR_FORMAT);
        assert!(matches!(result, Err(RenderError::Precondition(_))));
    }

    #[test]
    fn test_failed_bake_returns_error() {
        let Some(ctx) = test_context() else { return };
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_constant_hdr(dir.path(), [1.0, 1.0, 1.0]);
        let config = EnvironmentConfig {
            face_size: ctx.device.limits().max_texture_dimension_2d * 2,
            ..small_config()
        };
        let processor = EnvironmentProcessor::new(&ctx.device, config, COLOR_FORMAT).expect("processor");
        let geometry = GeometryBuffers::new(&ctx.device);
        let result = processor.init(&ctx, &geometry, &path);
        assert!(matches!(result, Err(RenderError::Bake(_))));
    }

    #[test]
    fn test_constant_environment_bakes_to_constant_maps() {
        let Some(ctx) = test_context() else { return };
        let dir = tempfile::tempdir().expect("tempdir");
        let color = [0.5, 0.25, 1.0];
        let path = write_constant_hdr(dir.path(), color);

        let processor = EnvironmentProcessor::new(&ctx.device, small_config(), COLOR_FORMAT).expect("processor");
        let geometry = GeometryBuffers::new(&ctx.device);
        let maps = processor.init(&ctx, &geometry, &path).expect("bake");

        assert_eq!(maps.environment.width(), 16);
        assert_eq!(maps.environment.mip_level_count(), 5);
        assert_eq!(maps.irradiance.width(), 4);
        assert_eq!(maps.prefiltered.mip_level_count(), 5);
        assert_eq!(maps.brdf_lookup.width(), 16);

        for face in CubeFace::ALL {
            let texels = read_texture_rgba_f32(&ctx, &maps.environment.texture, face.layer(), 0)
                .expect("environment readback");
            for texel in texels {
                for c in 0..3 {
                    assert!((texel[c] - color[c]).abs() < 0.01, "environment {texel:?}");
                }
            }

            let texels = read_texture_rgba_f32(&ctx, &maps.irradiance.texture, face.layer(), 0)
                .expect("irradiance readback");
            for texel in texels {
                for c in 0..3 {
                    assert!((texel[c] - color[c]).abs() < 0.05 * color[c] + 0.01, "irradiance {texel:?}");
                }
            }

            let texels = read_texture_rgba_f32(&ctx, &maps.prefiltered.texture, face.layer(), 4)
                .expect("prefiltered readback");
            assert_eq!(texels.len(), 1);
            for c in 0..3 {
                assert!((texels[0][c] - color[c]).abs() < 0.02, "prefiltered {:?}", texels[0]);
            }
        }

        let mut maps = maps;
        maps.set_texture_to_display(SkyboxTexture::PreFilteredEnvironment);
        maps.set_mip_level(9);
        assert_eq!(maps.mip_level(), 4);
        assert_eq!(maps.displayed().1, 4.0);
        maps.set_texture_to_display(SkyboxTexture::Irradiance);
        assert_eq!(maps.displayed().1, 0.0);
        maps.destroy();
    }

    #[test]
    fn test_repeated_init_gives_independent_maps() {
        let Some(ctx) = test_context() else { return };
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_constant_hdr(dir.path(), [0.2, 0.4, 0.6]);
        let processor = EnvironmentProcessor::new(&ctx.device, small_config(), COLOR_FORMAT).expect("processor");
        let geometry = GeometryBuffers::new(&ctx.device);

        let first = processor.init(&ctx, &geometry, &path).expect("first bake");
        let second = processor.init(&ctx, &geometry, &path).expect("second bake");
        for (a, b) in first.references().iter().zip(second.references().iter()) {
            assert_ne!(a.id, b.id);
            assert_eq!(a.kind, b.kind);
        }

        let layer = CubeFace::PositiveY.layer();
        let before = read_texture_rgba_f32(&ctx, &second.irradiance.texture, layer, 0).expect("readback");
        first.destroy();
        let after = read_texture_rgba_f32(&ctx, &second.irradiance.texture, layer, 0).expect("readback");
        assert_eq!(before, after);
        second.destroy();
    }

    #[test]
    fn test_brdf_lookup_matches_cpu_integral() {
        let Some(ctx) = test_context() else { return };
        let processor = EnvironmentProcessor::new(&ctx.device, small_config(), COLOR_FORMAT).expect("processor");
        let geometry = GeometryBuffers::new(&ctx.device);
        let lut = processor.create_brdf_lookup_texture(&ctx, &geometry);
        let texels = read_texture_rgba_f32(&ctx, &lut.texture, 0, 0).expect("lut readback");

        let size = 16;
        for (row, col) in [(0, 15), (8, 8), (15, 2)] {
            let n_dot_v = (col as f32 + 0.5) / size as f32;
            let roughness = (row as f32 + 0.5) / size as f32;
            let expected = pbr_core::ibl::integrate_brdf(n_dot_v, roughness, 64);
            let texel = texels[row * size + col];
            assert!((texel[0] - expected.x).abs() < 0.02, "scale {texel:?} vs {expected:?}");
            assert!((texel[1] - expected.y).abs() < 0.02, "bias {texel:?} vs {expected:?}");
        }
        lut.destroy();
    }
}
