use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
    },
    pipelines::{
        Layouts,
        basic::{PipelineOptions, mk_pipeline_layout, mk_render_pipeline},
    },
};

/// Lit, textured objects.
///
/// Bind groups: 0 material, 1 camera, 2 lights, 3 environment cubemap.
/// With `mirrored` set the pipeline expects a camera whose view contains a
/// reflection matrix and flips the front face accordingly.
pub fn mk_phong_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layouts: &Layouts,
    mirrored: bool,
) -> wgpu::RenderPipeline {
    let layout = mk_pipeline_layout(
        device,
        "Phong Pipeline Layout",
        &[
            &layouts.material,
            &layouts.camera,
            &layouts.lights,
            &layouts.environment,
        ],
    );
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Phong Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("phong.wgsl").into()),
    };
    let (label, options) = if mirrored {
        ("Reflected Phong Pipeline", PipelineOptions::mirrored())
    } else {
        ("Phong Pipeline", PipelineOptions::default())
    };

    mk_render_pipeline(
        device,
        label,
        &layout,
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
        options.with_color(color_format),
    )
}
