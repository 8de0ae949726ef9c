//! Offscreen renderer composing every component.
//!
//! The [`Renderer`] owns the GPU context and the components:
//! - [`EnvironmentProcessor`] and the current [`EnvironmentMaps`]
//! - [`SelfShadowGenerator`]: per-light depth maps
//! - [`ShadingPrograms`] driven by the [`ShadingDispatcher`]
//! - [`LightRenderResources`]: light markers
//! - [`Scene`]: the loaded model and the textures lent to it
//!
//! Textures are owned by the component that created them. The scene only
//! holds references; they are detached before the owner destroys them.

mod light_markers;
mod render_pass;

pub use light_markers::LightRenderResources;
pub use render_pass::{MainPassParams, MainPassPrograms, render_main_pass};

use std::path::Path;

use glam::Vec3;
use pbr_core::{FrameInputs, LightSet, ShadingDispatcher, load_obj};

use crate::camera::ArcballCamera;
use crate::config::ViewerConfig;
use crate::context::GpuContext;
use crate::environment::{EnvironmentMaps, EnvironmentProcessor};
use crate::error::RenderError;
use crate::geometry::GeometryBuffers;
use crate::material::{MaterialResources, TextureViews, material_bind_group_layout};
use crate::readback;
use crate::scene::Scene;
use crate::shading::ShadingPrograms;
use crate::shadows::SelfShadowGenerator;
use crate::texture::{COLOR_FORMAT, DEPTH_FORMAT, FallbackTextures, Samplers};

/// Color and depth attachments of the offscreen frame
struct RenderTarget {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
}

impl RenderTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Frame Color"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Frame Depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Self {
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            color,
        }
    }
}

/// Headless PBR renderer.
pub struct Renderer {
    ctx: GpuContext,
    config: ViewerConfig,
    geometry: GeometryBuffers,
    samplers: Samplers,
    fallbacks: FallbackTextures,
    material_layout: wgpu::BindGroupLayout,
    environment: EnvironmentProcessor,
    environment_maps: Option<EnvironmentMaps>,
    shadows: SelfShadowGenerator,
    programs: ShadingPrograms,
    markers: LightRenderResources,
    dispatcher: ShadingDispatcher,
    lights: LightSet,
    camera: ArcballCamera,
    scene: Scene,
    target: RenderTarget,
}

impl Renderer {
    /// Create a renderer drawing `width` x `height` frames
    pub fn new(
        ctx: GpuContext,
        config: ViewerConfig,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let device = &ctx.device;
        let geometry = GeometryBuffers::new(device);
        let samplers = Samplers::new(device);
        let fallbacks = FallbackTextures::new(device, &ctx.queue);
        let environment = EnvironmentProcessor::new(device, config.environment.clone(), COLOR_FORMAT)?;
        let shadows = SelfShadowGenerator::new(device, &config.shadow)?;
        let material_layout = material_bind_group_layout(device);
        let programs = ShadingPrograms::new(device, COLOR_FORMAT, &material_layout)?;
        let markers = LightRenderResources::new(device, COLOR_FORMAT)?;
        let target = RenderTarget::new(device, width, height);

        let mut lights = LightSet::new();
        lights.set_color(Vec3::from(config.lights.color));
        for &slot in &config.lights.active {
            lights.set_active(slot, true);
        }

        let camera = ArcballCamera::new(&config.camera, width, height);
        let dispatcher = ShadingDispatcher::with_parameters(config.shading.clone());

        tracing::info!("Renderer ready ({}x{})", width, height);
        Ok(Self {
            ctx,
            config,
            geometry,
            samplers,
            fallbacks,
            material_layout,
            environment,
            environment_maps: None,
            shadows,
            programs,
            markers,
            dispatcher,
            lights,
            camera,
            scene: Scene::new(),
            target,
        })
    }

    /// Device and queue
    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    /// Active configuration
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Shading parameters and variant selection
    pub fn dispatcher(&self) -> &ShadingDispatcher {
        &self.dispatcher
    }

    /// Mutable access to the shading parameters
    pub fn dispatcher_mut(&mut self) -> &mut ShadingDispatcher {
        &mut self.dispatcher
    }

    /// Lights of the session
    pub fn lights(&self) -> &LightSet {
        &self.lights
    }

    /// Mutable access to the lights
    pub fn lights_mut(&mut self) -> &mut LightSet {
        &mut self.lights
    }

    /// Camera
    pub fn camera_mut(&mut self) -> &mut ArcballCamera {
        &mut self.camera
    }

    /// Loaded scene
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable access to the scene transform and references
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Baked environment, if any
    pub fn environment_maps(&self) -> Option<&EnvironmentMaps> {
        self.environment_maps.as_ref()
    }

    /// Mutable access to the skybox display settings
    pub fn environment_maps_mut(&mut self) -> Option<&mut EnvironmentMaps> {
        self.environment_maps.as_mut()
    }

    /// Shadow generator
    pub fn shadows(&self) -> &SelfShadowGenerator {
        &self.shadows
    }

    /// Replace the scene with the OBJ model at `path`
    ///
    /// The environment maps are attached to the new scene and the shadow
    /// maps are reallocated for it. On failure the previous scene stays.
    pub fn load_model(&mut self, path: &Path) -> Result<(), RenderError> {
        let mut model = load_obj(path).inspect_err(|e| tracing::error!("{}", e))?;
        if self.config.scene.fit_radius > 0.0 {
            model.fit_to_radius(self.config.scene.fit_radius);
        }

        let mut scene = Scene::from_model(&self.ctx, &model);
        if let Some(maps) = &self.environment_maps {
            for reference in maps.references() {
                scene.add_texture_reference(reference);
            }
        }

        let previous = std::mem::replace(&mut self.scene, scene);
        previous.destroy();

        let size = self.config.shadow.map_size;
        self.shadows
            .create_self_shadowing_textures(&self.ctx.device, self.lights.len(), size, size);
        tracing::info!("Loaded model {}", path.display());
        Ok(())
    }

    /// Drop the scene and its shadow maps
    pub fn clear_model(&mut self) {
        let previous = std::mem::take(&mut self.scene);
        previous.destroy();
        self.shadows.release_textures();
    }

    /// Bake the environment at `path` and attach it to the scene
    ///
    /// The previous environment is detached and destroyed only once the new
    /// one is ready; on failure it stays in place.
    pub fn load_skybox(&mut self, path: &Path) -> Result<(), RenderError> {
        let maps = self.environment.init(&self.ctx, &self.geometry, path)?;
        self.clear_skybox();
        for reference in maps.references() {
            self.scene.add_texture_reference(reference);
        }
        self.environment_maps = Some(maps);
        Ok(())
    }

    /// Detach and destroy the current environment
    pub fn clear_skybox(&mut self) {
        if let Some(maps) = self.environment_maps.take() {
            for reference in maps.references() {
                self.scene.remove_texture_reference(reference.id);
            }
            maps.destroy();
        }
    }

    /// Render one frame into the offscreen target
    pub fn render_frame(&mut self) -> Result<(), RenderError> {
        self.programs.begin_frame();
        self.markers.begin_frame();
        self.environment.begin_frame();

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        // Shadow maps are lent to the scene only for the frame that drew them
        let shadows_enabled = self.dispatcher.parameters().shadows_enabled
            && !self.shadows.textures().is_empty();
        if shadows_enabled {
            self.shadows
                .calculate_self_shadowing(&self.ctx, &mut encoder, &self.scene, &self.lights)?;
            for reference in self.shadows.references() {
                self.scene.add_texture_reference(reference);
            }
        }

        let mut views = TextureViews::new();
        views.extend(self.scene.textures());
        views.extend(self.shadows.textures());
        if let Some(maps) = &self.environment_maps {
            views.extend(maps.textures());
        }
        let resources = MaterialResources {
            layout: &self.material_layout,
            samplers: &self.samplers,
            fallbacks: &self.fallbacks,
            views: &views,
        };

        let [r, g, b, a] = self.config.scene.background_color.map(f64::from);
        let params = MainPassParams {
            ctx: &self.ctx,
            geometry: &self.geometry,
            scene: &self.scene,
            lights: &self.lights,
            dispatcher: &self.dispatcher,
            frame: FrameInputs {
                model: self.scene.model_transform(),
                view: self.camera.view_matrix(),
                projection: self.camera.projection_matrix(),
                camera_position: self.camera.position,
            },
            shadow_projection: self.shadows.shadow_projection_matrix(),
            resources: &resources,
            environment_maps: self.environment_maps.as_ref(),
            color_view: &self.target.color_view,
            depth_view: &self.target.depth_view,
            clear_color: wgpu::Color { r, g, b, a },
        };
        render_main_pass(
            &mut encoder,
            &params,
            MainPassPrograms {
                shading: &mut self.programs,
                markers: &mut self.markers,
                environment: &mut self.environment,
            },
        );

        if shadows_enabled {
            for reference in self.shadows.references() {
                self.scene.remove_texture_reference(reference.id);
            }
        }

        self.ctx.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    /// Texture holding the last rendered frame
    pub fn frame_texture(&self) -> &wgpu::Texture {
        &self.target.color
    }

    /// Write the last rendered frame to a PNG file
    pub fn save_frame(&self, path: &Path) -> Result<(), RenderError> {
        readback::save_png(&self.ctx, &self.target.color, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::readback::read_texture_rgba_f32;
    use pbr_core::{AssetError, LightingVariant};

    const WIDTH: u32 = 64;
    const HEIGHT: u32 = 48;

    fn test_renderer() -> Option<Renderer> {
        let ctx = test_context()?;
        let mut config = ViewerConfig::default();
        config.shadow.map_size = 128;
        config.lights.active = vec![0, 1];
        Some(Renderer::new(ctx, config, WIDTH, HEIGHT).expect("renderer"))
    }

    fn write_triangle(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("triangle.obj");
        std::fs::write(
            &path,
            "o triangle\nv -0.5 -0.5 0.0\nv 0.5 -0.5 0.0\nv 0.0 0.5 0.0\nf 1 2 3\n",
        )
        .unwrap();
        path
    }

    fn pixel(texels: &[[f32; 4]], x: u32, y: u32) -> [f32; 4] {
        texels[(y * WIDTH + x) as usize]
    }

    #[test]
    fn test_render_model_over_background() {
        let Some(mut renderer) = test_renderer() else { return };
        let dir = tempfile::tempdir().unwrap();
        renderer.load_model(&write_triangle(dir.path())).unwrap();
        assert_eq!(renderer.shadows().textures().len(), renderer.lights().len());

        for variant in [LightingVariant::NoLighting, LightingVariant::CookTorrance] {
            renderer.dispatcher_mut().select(variant);
            renderer.render_frame().unwrap();
            let texels = read_texture_rgba_f32(renderer.context(), renderer.frame_texture(), 0, 0)
                .unwrap();

            let corner = pixel(&texels, 0, 0);
            assert!((corner[0] - 0.1).abs() < 0.01, "{variant:?} corner {corner:?}");
            let center = pixel(&texels, WIDTH / 2, HEIGHT / 2);
            assert!(center[0] > corner[0], "{variant:?} center {center:?}");
        }

        // Shadow maps are lent for one frame only
        assert!(renderer.scene().texture_references().is_empty());

        let out = dir.path().join("frame.png");
        renderer.save_frame(&out).unwrap();
        let image = image::open(&out).unwrap();
        assert_eq!((image.width(), image.height()), (WIDTH, HEIGHT));
    }

    #[test]
    fn test_failed_loads_keep_previous_state() {
        let Some(mut renderer) = test_renderer() else { return };
        let dir = tempfile::tempdir().unwrap();
        let model = write_triangle(dir.path());
        renderer.load_model(&model).unwrap();

        let result = renderer.load_model(&dir.path().join("missing.obj"));
        assert!(matches!(result, Err(RenderError::Asset(AssetError::Io(_)))));
        assert_eq!(renderer.scene().path(), Some(model.as_path()));

        let result = renderer.load_skybox(&dir.path().join("missing.hdr"));
        assert!(matches!(result, Err(RenderError::Asset(AssetError::Io(_)))));
        assert!(renderer.environment_maps().is_none());
        assert!(renderer.scene().texture_references().is_empty());

        renderer.clear_model();
        assert!(renderer.scene().meshes().is_empty());
        assert!(renderer.shadows().textures().is_empty());
        // Shadows are skipped rather than failing once the maps are released
        renderer.render_frame().unwrap();
    }

    #[test]
    fn test_failed_bake_keeps_previous_environment() {
        let Some(ctx) = test_context() else { return };
        let mut config = ViewerConfig::default();
        config.shadow.map_size = 128;
        config.environment = crate::config::EnvironmentConfig {
            face_size: 16,
            irradiance_size: 4,
            prefilter_size: 16,
            prefilter_mip_levels: 5,
            brdf_lut_size: 16,
            sample_count: 64,
            irradiance_sample_delta: 0.1,
        };
        let mut renderer = Renderer::new(ctx, config.clone(), WIDTH, HEIGHT).expect("renderer");

        let dir = tempfile::tempdir().unwrap();
        let sky = dir.path().join("sky.hdr");
        let image = image::Rgb32FImage::from_pixel(4, 2, image::Rgb([0.5, 0.5, 0.5]));
        image::DynamicImage::ImageRgb32F(image).save(&sky).unwrap();
        renderer.load_model(&write_triangle(dir.path())).unwrap();
        renderer.load_skybox(&sky).unwrap();
        let references = renderer.environment_maps().unwrap().references();

        // Same settings except a face size no device accepts
        let mut oversized = config.environment.clone();
        oversized.face_size = renderer.context().device.limits().max_texture_dimension_2d * 2;
        renderer.environment =
            EnvironmentProcessor::new(&renderer.ctx.device, oversized, COLOR_FORMAT).unwrap();

        let result = renderer.load_skybox(&sky);
        assert!(matches!(result, Err(RenderError::Bake(_))));

        let maps = renderer.environment_maps().expect("previous environment kept");
        assert_eq!(maps.path(), sky.as_path());
        for (kept, attached) in maps.references().iter().zip(references.iter()) {
            assert_eq!(kept.id, attached.id);
        }
        assert_eq!(renderer.scene().texture_references().len(), references.len());
        for reference in &references {
            assert!(renderer.scene().texture_references().iter().any(|r| r.id == reference.id));
        }

        renderer.render_frame().unwrap();
        let irradiance = read_texture_rgba_f32(
            renderer.context(),
            &renderer.environment_maps().unwrap().irradiance.texture,
            0,
            0,
        )
        .unwrap();
        assert!(irradiance.iter().all(|t| (t[0] - 0.5).abs() < 0.05));
    }
}
