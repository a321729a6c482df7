//! Render pipelines and the GPU resources that belong to a single pass.

pub mod basic;
pub mod light;
pub mod mirror;
pub mod phong;
pub mod post;
pub mod shadow;
pub mod skybox;

use crate::{camera, data_structures::model};

/// Every bind group layout the pipelines are built against.
pub struct Layouts {
    pub material: wgpu::BindGroupLayout,
    pub camera: wgpu::BindGroupLayout,
    pub lights: wgpu::BindGroupLayout,
    pub environment: wgpu::BindGroupLayout,
    pub shadow: wgpu::BindGroupLayout,
    pub mirror: wgpu::BindGroupLayout,
    pub post: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            material: model::material_layout(device),
            camera: camera::mk_bind_group_layout(device),
            lights: light::mk_bind_group_layout(device),
            environment: skybox::mk_bind_group_layout(device),
            shadow: shadow::mk_bind_group_layout(device),
            mirror: mirror::mk_bind_group_layout(device),
            post: post::mk_bind_group_layout(device),
        }
    }
}

/// All pipelines, created once per surface format.
pub struct Pipelines {
    pub phong: wgpu::RenderPipeline,
    pub phong_reflected: wgpu::RenderPipeline,
    pub skybox: wgpu::RenderPipeline,
    pub mirror: wgpu::RenderPipeline,
    pub shadow: wgpu::RenderPipeline,
    pub post: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        layouts: &Layouts,
    ) -> Self {
        Self {
            phong: phong::mk_phong_pipeline(device, color_format, layouts, false),
            phong_reflected: phong::mk_phong_pipeline(device, color_format, layouts, true),
            skybox: skybox::mk_skybox_pipeline(device, color_format, layouts),
            mirror: mirror::mk_mirror_pipeline(device, color_format, layouts),
            shadow: shadow::mk_shadow_pipeline(device, layouts),
            post: post::mk_post_pipeline(device, color_format, layouts),
        }
    }
}
