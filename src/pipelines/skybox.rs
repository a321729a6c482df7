use crate::{
    data_structures::{
        mesh_data::MeshData,
        model::{Mesh, ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::{
        Layouts,
        basic::{PipelineOptions, mk_pipeline_layout, mk_render_pipeline},
    },
};

/// Colour of the placeholder cubemap bound while a scene has no environment.
const EMPTY_ENVIRONMENT: [u8; 4] = [26, 26, 26, 255];

/// The cubemap lit objects reflect and the skybox draws.
///
/// There always is a cubemap bound so the Phong pipeline layout stays the
/// same; `has_skybox` tells whether it is a real one worth drawing.
pub struct EnvironmentResources {
    pub texture: Texture,
    pub bind_group: wgpu::BindGroup,
    pub quad: Mesh,
    pub has_skybox: bool,
}

impl EnvironmentResources {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> anyhow::Result<Self> {
        let texture = Texture::solid_cubemap(device, queue, EMPTY_ENVIRONMENT)?;
        let bind_group = mk_bind_group(device, layout, &texture)?;
        let quad = MeshData::plane().upload(device)?;
        Ok(Self {
            texture,
            bind_group,
            quad,
            has_skybox: false,
        })
    }

    /// Use `cubemap` as skybox and as reflection source from the next frame on.
    pub fn set_cubemap(
        &mut self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        cubemap: Texture,
    ) -> anyhow::Result<()> {
        self.bind_group = mk_bind_group(device, layout, &cubemap)?;
        self.texture = cubemap;
        self.has_skybox = true;
        log::info!("Environment cubemap set");
        Ok(())
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::Cube,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("environment_bind_group_layout"),
    })
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    cubemap: &Texture,
) -> anyhow::Result<wgpu::BindGroup> {
    let sampler = cubemap
        .sampler
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Cubemap texture has no sampler"))?;
    Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&cubemap.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("environment_bind_group"),
    }))
}

pub fn mk_skybox_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layouts: &Layouts,
) -> wgpu::RenderPipeline {
    let layout = mk_pipeline_layout(
        device,
        "Skybox Pipeline Layout",
        &[&layouts.camera, &layouts.environment],
    );
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Skybox Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("skybox.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        "Skybox Pipeline",
        &layout,
        &[ModelVertex::desc()],
        shader,
        PipelineOptions::background().with_color(color_format),
    )
}
