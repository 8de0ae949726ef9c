//! PBR viewer command line entry point
//!
//! `bake` precomputes the image-based-lighting maps of an HDR environment and
//! writes them to disk; `render` draws a model offscreen with a chosen
//! lighting variant and saves the frame as PNG.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pbr_core::{CubeFace, LightingVariant, SkyboxTexture};
use pbr_renderer::geometry::GeometryBuffers;
use pbr_renderer::readback::{read_texture_rgba_f32, save_hdr};
use pbr_renderer::texture::COLOR_FORMAT;
use pbr_renderer::{
    ConfigError, EnvironmentMaps, EnvironmentProcessor, GpuContext, RenderError, Renderer,
    ViewerConfig,
};

#[derive(Debug, thiserror::Error)]
enum ViewerError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Verification failed: {0}")]
    Verify(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Variant {
    None,
    BlinnPhong,
    CookTorrance,
    OrenNayar,
    AshikhminShirley,
    Debug,
    Disney,
}

impl From<Variant> for LightingVariant {
    fn from(variant: Variant) -> Self {
        match variant {
            Variant::None => LightingVariant::NoLighting,
            Variant::BlinnPhong => LightingVariant::BlinnPhong,
            Variant::CookTorrance => LightingVariant::CookTorrance,
            Variant::OrenNayar => LightingVariant::OrenNayar,
            Variant::AshikhminShirley => LightingVariant::AshikhminShirley,
            Variant::Debug => LightingVariant::Debug,
            Variant::Disney => LightingVariant::Disney,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Sky {
    Environment,
    Irradiance,
    Prefiltered,
}

impl From<Sky> for SkyboxTexture {
    fn from(sky: Sky) -> Self {
        match sky {
            Sky::Environment => SkyboxTexture::Environment,
            Sky::Irradiance => SkyboxTexture::Irradiance,
            Sky::Prefiltered => SkyboxTexture::PreFilteredEnvironment,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct BakeArgs {
    /// Equirectangular HDR environment
    hdr: PathBuf,
    /// Directory receiving the baked maps
    #[arg(short, long)]
    out: PathBuf,
    /// Check the baked maps for invalid values
    #[arg(long)]
    verify: bool,
}

#[derive(Debug, Clone, Args)]
struct RenderArgs {
    /// OBJ model
    obj: PathBuf,
    /// Equirectangular HDR environment for ambient lighting and the skybox
    #[arg(short, long)]
    environment: Option<PathBuf>,
    /// Lighting model
    #[arg(short, long, value_enum, default_value = "cook-torrance")]
    variant: Variant,
    /// Light slots to switch on (defaults to the configuration)
    #[arg(short, long, value_delimiter = ',')]
    lights: Vec<usize>,
    /// Disable self-shadowing
    #[arg(long)]
    no_shadows: bool,
    /// Cubemap shown behind the model
    #[arg(long, value_enum, default_value = "environment")]
    sky: Sky,
    /// Prefiltered mip shown when `--sky prefiltered`
    #[arg(long, default_value = "0")]
    mip: u32,
    /// Frame width
    #[arg(long, default_value = "1280")]
    width: u32,
    /// Frame height
    #[arg(long, default_value = "720")]
    height: u32,
    /// Output PNG
    #[arg(short, long, default_value = "frame.png")]
    out: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Precompute the IBL maps of an environment
    Bake(BakeArgs),
    /// Render a model offscreen
    Render(RenderArgs),
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// RON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

fn load_config(path: Option<&Path>) -> Result<ViewerConfig, ViewerError> {
    match path {
        Some(path) => {
            let config = ViewerConfig::load(path)?;
            tracing::info!("Loaded configuration {}", path.display());
            Ok(config)
        }
        None => Ok(ViewerConfig::default()),
    }
}

fn write_maps(ctx: &GpuContext, maps: &EnvironmentMaps, out: &Path) -> Result<(), ViewerError> {
    std::fs::create_dir_all(out).map_err(|e| ViewerError::Io(e.to_string()))?;

    for face in CubeFace::ALL {
        // "+X" -> "px", "-Y" -> "ny"
        let name = face.label().replace('+', "p").replace('-', "n").to_lowercase();
        save_hdr(
            ctx,
            &maps.environment.texture,
            face.layer(),
            0,
            out.join(format!("environment_{name}.hdr")),
        )?;
        save_hdr(
            ctx,
            &maps.irradiance.texture,
            face.layer(),
            0,
            out.join(format!("irradiance_{name}.hdr")),
        )?;
        for mip in 0..maps.prefiltered.mip_level_count() {
            save_hdr(
                ctx,
                &maps.prefiltered.texture,
                face.layer(),
                mip,
                out.join(format!("prefiltered_{name}_mip{mip}.hdr")),
            )?;
        }
    }
    save_hdr(ctx, &maps.brdf_lookup.texture, 0, 0, out.join("brdf_lut.hdr"))?;
    Ok(())
}

fn verify_maps(ctx: &GpuContext, maps: &EnvironmentMaps) -> Result<(), ViewerError> {
    let check = |label: &str,
                 texture: &wgpu::Texture,
                 layer: u32,
                 mip: u32,
                 max: f32|
     -> Result<(), ViewerError> {
        let texels = read_texture_rgba_f32(ctx, texture, layer, mip)?;
        match texels
            .iter()
            .flat_map(|t| &t[..3])
            .find(|v| !v.is_finite() || **v < 0.0 || **v > max)
        {
            Some(v) => Err(ViewerError::Verify(format!("{label} holds {v}"))),
            None => Ok(()),
        }
    };

    for face in CubeFace::ALL {
        check("irradiance", &maps.irradiance.texture, face.layer(), 0, f32::MAX)?;
        for mip in 0..maps.prefiltered.mip_level_count() {
            check("prefiltered", &maps.prefiltered.texture, face.layer(), mip, f32::MAX)?;
        }
    }
    // Scale plus bias never exceeds one beyond sampling noise
    check("brdf lookup", &maps.brdf_lookup.texture, 0, 0, 1.05)?;
    tracing::info!("Baked maps verified");
    Ok(())
}

fn bake(config: ViewerConfig, args: BakeArgs) -> Result<(), ViewerError> {
    let ctx = GpuContext::new_headless()?;
    let processor = EnvironmentProcessor::new(&ctx.device, config.environment, COLOR_FORMAT)?;
    let geometry = GeometryBuffers::new(&ctx.device);
    let maps = processor.init(&ctx, &geometry, &args.hdr)?;

    let result = write_maps(&ctx, &maps, &args.out).and_then(|()| {
        if args.verify {
            verify_maps(&ctx, &maps)
        } else {
            Ok(())
        }
    });
    maps.destroy();
    result
}

fn render(config: ViewerConfig, args: RenderArgs) -> Result<(), ViewerError> {
    let ctx = GpuContext::new_headless()?;
    let mut renderer = Renderer::new(ctx, config, args.width, args.height)?;

    if let Some(environment) = &args.environment {
        renderer.load_skybox(environment)?;
        if let Some(maps) = renderer.environment_maps_mut() {
            maps.set_texture_to_display(args.sky.into());
            maps.set_mip_level(args.mip);
        }
    }
    renderer.load_model(&args.obj)?;

    if !args.lights.is_empty() {
        let lights = renderer.lights_mut();
        for slot in 0..lights.len() {
            lights.set_active(slot, args.lights.contains(&slot));
        }
    }

    let dispatcher = renderer.dispatcher_mut();
    dispatcher.select(args.variant.into());
    if args.no_shadows {
        dispatcher.set_shadows_enabled(false);
    }

    renderer.render_frame()?;
    renderer.save_frame(&args.out)?;
    Ok(())
}

fn main() -> ExitCode {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pbr_viewer=debug,pbr_renderer=debug,pbr_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Command::Bake(args) => bake(config, args),
        Command::Render(args) => render(config, args),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_render_arguments() {
        let cli = Cli::parse_from([
            "pbr-viewer",
            "render",
            "model.obj",
            "--variant",
            "disney",
            "--lights",
            "0,2",
            "--out",
            "out.png",
        ]);
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(LightingVariant::from(args.variant), LightingVariant::Disney);
        assert_eq!(args.lights, vec![0, 2]);
        assert_eq!(args.out, PathBuf::from("out.png"));
        assert!(args.environment.is_none());
    }

    #[test]
    fn test_bake_arguments() {
        let cli = Cli::parse_from(["pbr-viewer", "bake", "sky.hdr", "--out", "maps", "--verify"]);
        let Command::Bake(args) = cli.command else {
            panic!("expected bake");
        };
        assert_eq!(args.hdr, PathBuf::from("sky.hdr"));
        assert!(args.verify);
    }

    #[test]
    fn test_missing_config_is_an_error() {
        assert!(matches!(
            load_config(Some(Path::new("no/such/viewer.ron"))),
            Err(ViewerError::Config(ConfigError::Io(_)))
        ));
    }
}
