//! Meshes, materials and models as they live on the GPU.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::data_structures::texture::Texture;

/// Describes how a vertex type is laid out in a vertex buffer.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Which specular highlight a material uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Specular {
    /// `reflect(-l, n) · v`
    #[default]
    Phong,
    /// `normalize(l + v) · n`
    BlinnPhong,
}

/// Surface parameters of a lit material. The defaults are a matte white surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialParams {
    pub base_color: [f32; 3],
    pub ambient_intensity: f32,
    pub diffuse_intensity: f32,
    pub specular_intensity: f32,
    pub specular_power: f32,
    /// 0 tints highlights white, 1 tints them with the base colour.
    pub metalness: f32,
    /// How much of the environment cubemap is mixed into the texture colour.
    pub environment_mix: f32,
    pub specular: Specular,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            base_color: [1.0; 3],
            ambient_intensity: 0.5,
            diffuse_intensity: 0.8,
            specular_intensity: 0.0,
            specular_power: 20.0,
            metalness: 0.0,
            environment_mix: 0.0,
            specular: Specular::Phong,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    base_color: [f32; 4],
    // ambient, diffuse, specular intensity, specular power
    intensities: [f32; 4],
    // metalness, environment mix, blinn (0 or 1), unused
    extra: [f32; 4],
}

impl From<&MaterialParams> for MaterialUniform {
    fn from(p: &MaterialParams) -> Self {
        let [r, g, b] = p.base_color;
        Self {
            base_color: [r, g, b, 1.0],
            intensities: [
                p.ambient_intensity,
                p.diffuse_intensity,
                p.specular_intensity,
                p.specular_power,
            ],
            extra: [
                p.metalness,
                p.environment_mix,
                match p.specular {
                    Specular::Phong => 0.0,
                    Specular::BlinnPhong => 1.0,
                },
                0.0,
            ],
        }
    }
}

pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
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
        label: Some("material_bind_group_layout"),
    })
}

pub struct Material {
    pub name: String,
    pub diffuse_texture: Texture,
    pub params: MaterialParams,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse_texture: Texture,
        params: MaterialParams,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Material Buffer")),
            contents: bytemuck::cast_slice(&[MaterialUniform::from(&params)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = diffuse_texture
            .sampler
            .clone()
            .unwrap_or_else(|| crate::data_structures::texture::create_default_sampler(device));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse_texture.view),
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
            label: Some(name),
        });

        Self {
            name: name.to_string(),
            diffuse_texture,
            params,
            buffer,
            bind_group,
        }
    }

    /// Push changed parameters (e.g. an animated base colour) to the GPU.
    pub fn set_params(&mut self, queue: &wgpu::Queue, params: MaterialParams) {
        self.params = params;
        queue.write_buffer(
            &self.buffer,
            0,
            bytemuck::cast_slice(&[MaterialUniform::from(&self.params)]),
        );
    }
}

pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: usize,
}

pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    /// A mesh's material, falling back to the first one when the index is out of range.
    pub fn material_for(&self, mesh: &Mesh) -> Option<&Material> {
        self.materials
            .get(mesh.material)
            .or_else(|| self.materials.first())
    }
}

/// Draw calls for models on a render pass.
///
/// The lit variants bind the mesh's material at group 0; the geometry-only
/// variants (shadow pass, mirror surface) only set buffers.
pub trait DrawModel<'a> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'a Mesh,
        material: &'a Material,
        instances: Range<u32>,
    );
    fn draw_model_instanced(&mut self, model: &'a Model, instances: Range<u32>);
    fn draw_mesh_geometry(&mut self, mesh: &'a Mesh, instances: Range<u32>);
    fn draw_model_geometry(&mut self, model: &'a Model, instances: Range<u32>);
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'b Mesh,
        material: &'b Material,
        instances: Range<u32>,
    ) {
        self.set_bind_group(0, &material.bind_group, &[]);
        self.draw_mesh_geometry(mesh, instances);
    }

    fn draw_model_instanced(&mut self, model: &'b Model, instances: Range<u32>) {
        for mesh in &model.meshes {
            match model.material_for(mesh) {
                Some(material) => self.draw_mesh_instanced(mesh, material, instances.clone()),
                None => log::warn!("Mesh {} has no material and is skipped", mesh.name),
            }
        }
    }

    fn draw_mesh_geometry(&mut self, mesh: &'b Mesh, instances: Range<u32>) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_model_geometry(&mut self, model: &'b Model, instances: Range<u32>) {
        for mesh in &model.meshes {
            self.draw_mesh_geometry(mesh, instances.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_covers_the_whole_struct() {
        let desc = ModelVertex::desc();
        assert_eq!(desc.array_stride, 32);
        let last = desc.attributes.last().unwrap();
        assert_eq!(last.offset + last.format.size(), desc.array_stride);
    }

    #[test]
    fn material_uniform_packs_blinn_flag() {
        let params = MaterialParams {
            specular: Specular::BlinnPhong,
            environment_mix: 0.2,
            ..Default::default()
        };
        let uniform = MaterialUniform::from(&params);
        assert_eq!(uniform.extra, [0.0, 0.2, 1.0, 0.0]);
        assert_eq!(uniform.base_color, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 48);
    }
}
