use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::Texture,
    pipelines::{
        Layouts,
        basic::{PipelineOptions, mk_pipeline_layout, mk_render_pipeline},
    },
};

/// Parameters of the post-processing pass. Part of
/// [`crate::context::RenderSettings`]; `None` there skips the pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PostSettings {
    /// Distance from the camera that stays sharp.
    pub focus_distance: f32,
    /// How far from the focal plane the blur reaches its maximum.
    pub focus_range: f32,
    /// Blur radius in pixels at full defocus. 0 disables depth of field.
    pub max_blur: f32,
    pub fog_color: [f32; 3],
    pub fog_density: f32,
    /// Distance from the camera where fog starts.
    pub fog_start: f32,
    /// 1 leaves colours alone.
    pub contrast: f32,
    /// 0 disables the vignette.
    pub vignette: f32,
}

impl Default for PostSettings {
    fn default() -> Self {
        Self {
            focus_distance: 140.0,
            focus_range: 60.0,
            max_blur: 4.0,
            fog_color: [0.9, 0.8, 0.85],
            fog_density: 0.01,
            fog_start: 150.0,
            contrast: 1.1,
            vignette: 0.4,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PostUniform {
    fog_color: [f32; 4],
    dof: [f32; 4],
    fog: [f32; 4],
    grade: [f32; 4],
}

impl PostUniform {
    pub fn new(settings: &PostSettings, znear: f32, zfar: f32, size: [u32; 2]) -> Self {
        let [r, g, b] = settings.fog_color;
        Self {
            fog_color: [r, g, b, 1.0],
            dof: [
                settings.focus_distance,
                settings.focus_range,
                settings.max_blur.max(0.0),
                0.0,
            ],
            fog: [settings.fog_density.max(0.0), settings.fog_start, znear, zfar],
            grade: [
                settings.contrast,
                settings.vignette.clamp(0.0, 1.0),
                1.0 / size[0].max(1) as f32,
                1.0 / size[1].max(1) as f32,
            ],
        }
    }
}

/// Distance from the camera for a value read from a depth buffer written
/// through [`crate::camera::Projection::calc_matrix`].
pub fn linearize_depth(depth: f32, znear: f32, zfar: f32) -> f32 {
    znear * zfar / (zfar - depth * (zfar - znear))
}

/// The offscreen colour target the main pass renders into while
/// post-processing is on, plus the pass's bind group.
pub struct PostResources {
    pub scene_target: Texture,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    color_format: wgpu::TextureFormat,
}

impl PostResources {
    pub fn new(
        device: &wgpu::Device,
        layouts: &Layouts,
        color_format: wgpu::TextureFormat,
        size: [u32; 2],
        depth: &Texture,
    ) -> Self {
        let scene_target = Texture::create_render_target(device, size, color_format, "post_scene");
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Post Buffer"),
            contents: bytemuck::cast_slice(&[PostUniform::new(
                &PostSettings::default(),
                0.1,
                100.0,
                size,
            )]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = mk_bind_group(device, &layouts.post, &scene_target, depth, &buffer);
        Self {
            scene_target,
            buffer,
            bind_group,
            color_format,
        }
    }

    /// Recreate the scene target; `depth` is the freshly resized main depth texture.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        layouts: &Layouts,
        size: [u32; 2],
        depth: &Texture,
    ) {
        self.scene_target =
            Texture::create_render_target(device, size, self.color_format, "post_scene");
        self.bind_group = mk_bind_group(device, &layouts.post, &self.scene_target, depth, &self.buffer);
    }

    pub fn write(
        &self,
        queue: &wgpu::Queue,
        settings: &PostSettings,
        znear: f32,
        zfar: f32,
        size: [u32; 2],
    ) {
        let uniform = PostUniform::new(settings, znear, zfar, size);
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
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("post_bind_group_layout"),
    })
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    scene: &Texture,
    depth: &Texture,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    let sampler = scene
        .sampler
        .clone()
        .unwrap_or_else(|| crate::data_structures::texture::create_default_sampler(device));
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&scene.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&depth.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: buffer.as_entire_binding(),
            },
        ],
        label: Some("post_bind_group"),
    })
}

pub fn mk_post_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layouts: &Layouts,
) -> wgpu::RenderPipeline {
    let layout = mk_pipeline_layout(device, "Post Pipeline Layout", &[&layouts.post]);
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Post Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("post.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        "Post Pipeline",
        &layout,
        &[],
        shader,
        PipelineOptions {
            depth_format: None,
            ..PipelineOptions::background().with_color(color_format)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close_rel(a: f32, b: f32, tolerance: f32) -> bool {
        (a - b).abs() <= tolerance * b.abs().max(1e-6)
    }

    #[test]
    fn uniform_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<PostUniform>(), 64);
    }

    #[test]
    fn depth_range_ends_map_to_clip_planes() {
        assert!(close_rel(linearize_depth(0.0, 0.1, 220.0), 0.1, 1e-4));
        assert!(close_rel(linearize_depth(1.0, 0.1, 220.0), 220.0, 1e-3));
    }

    #[test]
    fn linearized_depth_matches_projection() {
        use crate::camera::Projection;
        use cgmath::{Rad, Vector4};

        let projection = Projection::new(800, 600, Rad(std::f32::consts::PI / 7.0), 0.1, 220.0);
        let clip = projection.calc_matrix() * Vector4::new(0.0, 0.0, -150.0, 1.0);
        let depth = clip.z / clip.w;
        assert!(close_rel(linearize_depth(depth, 0.1, 220.0), 150.0, 5e-3));
    }

    #[test]
    fn vignette_is_clamped() {
        let settings = PostSettings {
            vignette: 3.0,
            ..Default::default()
        };
        let uniform = PostUniform::new(&settings, 0.1, 100.0, [100, 50]);
        assert_eq!(uniform.grade, [1.1, 1.0, 0.01, 0.02]);
    }
}
