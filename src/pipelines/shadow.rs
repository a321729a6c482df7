use cgmath::{EuclideanSpace, Matrix4, Point3, Rad, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::{
    camera::CameraBinding,
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::{
        Layouts,
        basic::{PipelineOptions, mk_pipeline_layout, mk_render_pipeline},
    },
};

/// How the shadow map is rendered. Part of [`crate::context::RenderSettings`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowSettings {
    /// Width and height of the square depth map.
    pub resolution: u32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    /// Subtracted from a fragment's light-space depth before comparing.
    pub depth_bias: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            resolution: 256,
            fovy: Rad(std::f32::consts::PI / 7.0),
            znear: 0.1,
            zfar: 200.0,
            depth_bias: 0.002,
        }
    }
}

/// Where the shadow-casting light sits and what it looks at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowLight {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl Default for ShadowLight {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 100.0, 50.0),
            target: Point3::origin(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowUniform {
    light_view_proj: [[f32; 4]; 4],
    light_position: [f32; 4],
    // depth bias, disabled flag, unused x2
    params: [f32; 4],
}

/// The depth map rendered from the light plus everything the mirror needs
/// to look it up.
pub struct ShadowResources {
    pub map: Texture,
    pub light: ShadowLight,
    pub light_camera: CameraBinding,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    resolution: u32,
}

impl ShadowResources {
    pub fn new(device: &wgpu::Device, layouts: &Layouts, resolution: u32) -> Self {
        let map = mk_shadow_map(device, resolution);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Shadow Buffer"),
            contents: bytemuck::cast_slice(&[ShadowUniform {
                light_view_proj: Matrix4::identity().into(),
                light_position: [0.0; 4],
                params: [0.0, 1.0, 0.0, 0.0],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = mk_bind_group(device, &layouts.shadow, &map, &buffer);
        let light_camera = CameraBinding::new(device, &layouts.camera, "Light Camera");
        Self {
            map,
            light: ShadowLight::default(),
            light_camera,
            buffer,
            bind_group,
            resolution,
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Recreate the depth map if the configured resolution changed.
    pub fn ensure_resolution(&mut self, device: &wgpu::Device, layouts: &Layouts, resolution: u32) {
        if resolution == self.resolution {
            return;
        }
        log::info!("Shadow map resolution {} -> {}", self.resolution, resolution);
        self.map = mk_shadow_map(device, resolution);
        self.bind_group = mk_bind_group(device, &layouts.shadow, &self.map, &self.buffer);
        self.resolution = resolution;
    }

    /// Point the light camera at the target and upload both uniforms.
    ///
    /// With `settings: None` the mirror is told to treat everything as lit.
    pub fn write(&mut self, queue: &wgpu::Queue, settings: Option<&ShadowSettings>) {
        let disabled = if settings.is_some() { 0.0 } else { 1.0 };
        let settings = settings.copied().unwrap_or_default();
        let light_view_proj = self.light_camera.uniform.update_light(
            self.light.position,
            self.light.target,
            settings.fovy,
            settings.znear,
            settings.zfar,
        );
        self.light_camera.write(queue);
        let uniform = ShadowUniform {
            light_view_proj: light_view_proj.into(),
            light_position: self.light.position.to_homogeneous().into(),
            params: [settings.depth_bias, disabled, 0.0, 0.0],
        };
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
    }
}

fn mk_shadow_map(device: &wgpu::Device, resolution: u32) -> Texture {
    Texture::create_depth_texture(device, [resolution, resolution], "shadow_map")
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("shadow_bind_group_layout"),
    })
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    map: &Texture,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    // Depth textures always carry the comparison sampler.
    let sampler = map
        .sampler
        .clone()
        .unwrap_or_else(|| crate::data_structures::texture::create_shadow_sampler(device));
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&map.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: buffer.as_entire_binding(),
            },
        ],
        label: Some("shadow_bind_group"),
    })
}

/// Depth-only pipeline. Culling front faces keeps the caster's lit side from
/// shadowing itself.
pub fn mk_shadow_pipeline(device: &wgpu::Device, layouts: &Layouts) -> wgpu::RenderPipeline {
    let layout = mk_pipeline_layout(device, "Shadow Pipeline Layout", &[&layouts.camera]);
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Shadow Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        "Shadow Pipeline",
        &layout,
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
        PipelineOptions {
            cull_mode: Some(wgpu::Face::Front),
            ..Default::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<ShadowUniform>(), 96);
    }

    #[test]
    fn default_map_is_small() {
        let settings = ShadowSettings::default();
        assert_eq!(settings.resolution, 256);
        assert!(settings.znear < settings.zfar);
    }
}
