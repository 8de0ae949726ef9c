//! Model programs, one per lighting variant family
//!
//! Every program shares the vertex stage, the `ShadingUniforms` block and the
//! material bind group from `model.wgsl`; only the fragment stage differs.

use std::sync::Arc;

use pbr_core::ProgramKind;
use pbr_core::shading::shading_layout;

use crate::error::RenderError;
use crate::program::{GpuProgram, PipelineConfig, uniform_bind_group_layout};
use crate::texture::DEPTH_FORMAT;
use crate::vertex::model_vertex_layout;

/// Initial uniform slots per program and frame; one per mesh draw, grown on demand
const DRAWS_PER_FRAME: u32 = 1024;

macro_rules! model_shader {
    ($fragment:literal) => {
        concat!(
            include_str!("shaders/model.wgsl"),
            include_str!("shaders/microfacet.wgsl"),
            include_str!(concat!("shaders/", $fragment)),
        )
    };
}

/// Complete WGSL source of `kind`
pub fn shader_source(kind: ProgramKind) -> &'static str {
    match kind {
        ProgramKind::Unlit => model_shader!("unlit.wgsl"),
        ProgramKind::BlinnPhong => model_shader!("blinn_phong.wgsl"),
        ProgramKind::CookTorrance => model_shader!("cook_torrance.wgsl"),
        ProgramKind::OrenNayar => model_shader!("oren_nayar.wgsl"),
        ProgramKind::AshikhminShirley => model_shader!("ashikhmin_shirley.wgsl"),
        ProgramKind::Debug => model_shader!("debug.wgsl"),
        ProgramKind::Disney => model_shader!("disney.wgsl"),
    }
}

/// The seven model programs
pub struct ShadingPrograms {
    programs: Vec<(ProgramKind, GpuProgram)>,
}

impl ShadingPrograms {
    /// Compile every model program for `format` color targets
    ///
    /// `material_layout` is the group 1 layout the caller builds material
    /// bind groups against.
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        material_layout: &wgpu::BindGroupLayout,
    ) -> Result<Self, RenderError> {
        let layout = Arc::new(shading_layout());

        let mut programs = Vec::with_capacity(ProgramKind::ALL.len());
        for kind in ProgramKind::ALL {
            let label = kind.label();
            let uniform_layout =
                uniform_bind_group_layout(device, "Shading Uniform Layout", layout.size() as u64);
            let layouts = [&uniform_layout, material_layout];
            let pipeline = PipelineConfig::new(label, shader_source(kind), Some(format), &layouts)
                .with_vertex_layouts(vec![model_vertex_layout()])
                .with_cull_mode(Some(wgpu::Face::Back))
                .with_depth(DEPTH_FORMAT, true, wgpu::CompareFunction::Less)
                .build(device)?;
            let program = GpuProgram::new(
                device,
                label,
                pipeline,
                layout.clone(),
                uniform_layout,
                DRAWS_PER_FRAME,
            );
            programs.push((kind, program));
            tracing::debug!("Compiled model program {}", label);
        }

        Ok(Self { programs })
    }

    /// Program for `kind`
    pub fn program_mut(&mut self, kind: ProgramKind) -> Option<&mut GpuProgram> {
        self.programs
            .iter_mut()
            .find(|(k, _)| *k == kind)
            .map(|(_, program)| program)
    }

    /// Reset the uniform rings of every program
    pub fn begin_frame(&mut self) {
        for (_, program) in &mut self.programs {
            program.begin_frame();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::material::material_bind_group_layout;
    use crate::texture::COLOR_FORMAT;

    #[test]
    fn test_every_program_has_a_source() {
        for kind in ProgramKind::ALL {
            let source = shader_source(kind);
            assert!(source.contains("fn vs_main"), "{kind:?}");
            assert_eq!(source.matches("fn fs_main").count(), 1, "{kind:?}");
        }
    }

    #[test]
    fn test_model_programs_compile() {
        let Some(ctx) = test_context() else { return };
        let material_layout = material_bind_group_layout(&ctx.device);
        let mut programs =
            ShadingPrograms::new(&ctx.device, COLOR_FORMAT, &material_layout).expect("model programs");
        for kind in ProgramKind::ALL {
            let program = programs.program_mut(kind).expect("program");
            assert_eq!(program.label(), kind.label());
        }
    }
}
