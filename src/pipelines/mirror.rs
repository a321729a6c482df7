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

/// Surface parameters of the mirror.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MirrorSettings {
    pub base_color: [f32; 4],
    pub ambient_color: [f32; 3],
    /// 0 shows only the lit surface, 1 only the reflection.
    pub reflectivity: f32,
    /// Lower bound of the diffuse term inside the shadow.
    pub shadow_floor: f32,
    pub specular_power: f32,
    pub specular_intensity: f32,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            base_color: [1.0; 4],
            ambient_color: [0.2; 3],
            reflectivity: 0.5,
            shadow_floor: 0.2,
            specular_power: 100.0,
            specular_intensity: 0.7,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MirrorUniform {
    base_color: [f32; 4],
    ambient_color: [f32; 4],
    params: [f32; 4],
    viewport: [f32; 4],
}

impl MirrorUniform {
    pub fn new(settings: &MirrorSettings, surface_size: [u32; 2]) -> Self {
        let [r, g, b] = settings.ambient_color;
        Self {
            base_color: settings.base_color,
            ambient_color: [r, g, b, 1.0],
            params: [
                settings.reflectivity.clamp(0.0, 1.0),
                settings.shadow_floor,
                settings.specular_power,
                settings.specular_intensity,
            ],
            viewport: [
                1.0 / surface_size[0].max(1) as f32,
                1.0 / surface_size[1].max(1) as f32,
                0.0,
                0.0,
            ],
        }
    }
}

/// Size of the reflection render target for a surface of `surface_size`.
pub fn target_size(surface_size: [u32; 2], scale: f32) -> [u32; 2] {
    let scale = if scale.is_finite() && scale > 0.0 { scale.min(1.0) } else { 1.0 };
    surface_size.map(|side| ((side as f32 * scale).round() as u32).max(1))
}

/// The reflection render target, the mirrored camera that renders into it and
/// the mirror surface's own uniform.
pub struct MirrorResources {
    pub settings: MirrorSettings,
    pub target: Texture,
    pub depth: Texture,
    pub camera: CameraBinding,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    color_format: wgpu::TextureFormat,
}

impl MirrorResources {
    pub fn new(
        device: &wgpu::Device,
        layouts: &Layouts,
        color_format: wgpu::TextureFormat,
        size: [u32; 2],
    ) -> Self {
        let settings = MirrorSettings::default();
        let target = Texture::create_render_target(device, size, color_format, "reflection_target");
        let depth = Texture::create_depth_texture(device, size, "reflection_depth");
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mirror Buffer"),
            contents: bytemuck::cast_slice(&[MirrorUniform::new(&settings, size)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = mk_bind_group(device, &layouts.mirror, &target, &buffer);
        let camera = CameraBinding::new(device, &layouts.camera, "Reflection Camera");
        Self {
            settings,
            target,
            depth,
            camera,
            buffer,
            bind_group,
            color_format,
        }
    }

    pub fn size(&self) -> [u32; 2] {
        let size = self.target.texture.size();
        [size.width, size.height]
    }

    pub fn resize(&mut self, device: &wgpu::Device, layouts: &Layouts, size: [u32; 2]) {
        if size == self.size() {
            return;
        }
        self.target =
            Texture::create_render_target(device, size, self.color_format, "reflection_target");
        self.depth = Texture::create_depth_texture(device, size, "reflection_depth");
        self.bind_group = mk_bind_group(device, &layouts.mirror, &self.target, &self.buffer);
    }

    pub fn write(&self, queue: &wgpu::Queue, surface_size: [u32; 2]) {
        let uniform = MirrorUniform::new(&self.settings, surface_size);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
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
                    view_dimension: wgpu::TextureViewDimension::D2,
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
        label: Some("mirror_bind_group_layout"),
    })
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    target: &Texture,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    let sampler = target
        .sampler
        .clone()
        .unwrap_or_else(|| crate::data_structures::texture::create_default_sampler(device));
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&target.view),
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
        label: Some("mirror_bind_group"),
    })
}

/// Bind groups: 0 camera, 1 shadow map, 2 reflection target + mirror uniform.
pub fn mk_mirror_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layouts: &Layouts,
) -> wgpu::RenderPipeline {
    let layout = mk_pipeline_layout(
        device,
        "Mirror Pipeline Layout",
        &[&layouts.camera, &layouts.shadow, &layouts.mirror],
    );
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Mirror Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("mirror.wgsl").into()),
    };
    // The plane is seen from both sides while the camera orbits.
    mk_render_pipeline(
        device,
        "Mirror Pipeline",
        &layout,
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
        PipelineOptions {
            cull_mode: None,
            ..PipelineOptions::default().with_color(color_format)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<MirrorUniform>(), 64);
    }

    #[test]
    fn target_scales_with_surface() {
        assert_eq!(target_size([800, 600], 1.0), [800, 600]);
        assert_eq!(target_size([800, 600], 0.5), [400, 300]);
        assert_eq!(target_size([1, 1], 0.25), [1, 1]);
    }

    #[test]
    fn bad_scales_fall_back_to_full_size() {
        assert_eq!(target_size([640, 480], 0.0), [640, 480]);
        assert_eq!(target_size([640, 480], f32::NAN), [640, 480]);
        assert_eq!(target_size([640, 480], 3.0), [640, 480]);
    }

    #[test]
    fn uniform_carries_inverse_viewport() {
        let uniform = MirrorUniform::new(&MirrorSettings::default(), [200, 100]);
        assert_eq!(uniform.viewport, [0.005, 0.01, 0.0, 0.0]);
        assert_eq!(uniform.params[0], 0.5);
    }
}
