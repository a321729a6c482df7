//! CPU-side mesh data.
//!
//! [`MeshData`] holds the flat arrays mesh exporters produce (positions,
//! normals, uvs, indices) before they are interleaved into [`ModelVertex`]es
//! and uploaded. Loaders for `.obj` and glTF both produce it, and so do the
//! procedural primitives.

use anyhow::{Result, ensure};
use wgpu::util::DeviceExt;

use crate::data_structures::model::{Mesh, ModelVertex};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub name: String,
    /// xyz triples
    pub positions: Vec<f32>,
    /// xyz triples, empty or one per position
    pub normals: Vec<f32>,
    /// uv pairs, empty or one per position
    pub uvs: Vec<f32>,
    /// triangle list
    pub indices: Vec<u32>,
    pub material: usize,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// No vertices or no triangles; such meshes come from faceless OBJ groups
    /// and cannot be drawn.
    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0 || self.triangle_count() == 0
    }

    /// Check that the arrays describe a well-formed, non-empty indexed
    /// triangle list.
    pub fn validate(&self) -> Result<()> {
        let name = &self.name;
        ensure!(!self.is_empty(), "Mesh {name} has no triangles to draw");
        ensure!(
            self.positions.len() % 3 == 0,
            "Mesh {name}: {} position floats is not a multiple of 3",
            self.positions.len()
        );
        let vertices = self.vertex_count();
        ensure!(
            self.normals.is_empty() || self.normals.len() == vertices * 3,
            "Mesh {name}: {} normal floats for {vertices} vertices",
            self.normals.len()
        );
        ensure!(
            self.uvs.is_empty() || self.uvs.len() == vertices * 2,
            "Mesh {name}: {} uv floats for {vertices} vertices",
            self.uvs.len()
        );
        ensure!(
            self.indices.len() % 3 == 0,
            "Mesh {name}: {} indices do not form whole triangles",
            self.indices.len()
        );
        if let Some(max) = self.indices.iter().max() {
            ensure!(
                (*max as usize) < vertices,
                "Mesh {name}: index {max} is out of bounds for {vertices} vertices"
            );
        }
        Ok(())
    }

    /// Interleave the arrays into vertices. Missing normals or uvs become zero.
    pub fn vertices(&self) -> Vec<ModelVertex> {
        (0..self.vertex_count())
            .map(|i| ModelVertex {
                position: [
                    self.positions[i * 3],
                    self.positions[i * 3 + 1],
                    self.positions[i * 3 + 2],
                ],
                tex_coords: [
                    self.uvs.get(i * 2).map_or(0.0, |f| *f),
                    self.uvs.get(i * 2 + 1).map_or(0.0, |f| *f),
                ],
                normal: [
                    self.normals.get(i * 3).map_or(0.0, |f| *f),
                    self.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                    self.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
                ],
            })
            .collect()
    }

    /// Flip the v coordinate of every uv; image rows start at the top, while
    /// most exporters put v = 0 at the bottom.
    pub fn flip_v(mut self) -> Self {
        self.uvs
            .iter_mut()
            .skip(1)
            .step_by(2)
            .for_each(|v| *v = 1.0 - *v);
        self
    }

    /// Validate and upload to vertex and index buffers.
    pub fn upload(&self, device: &wgpu::Device) -> Result<Mesh> {
        self.validate()?;
        let vertices = self.vertices();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", self.name)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", self.name)),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Ok(Mesh {
            name: self.name.clone(),
            vertex_buffer,
            index_buffer,
            num_elements: self.indices.len() as u32,
            material: self.material,
        })
    }

    /// A 2x2 quad in the XZ plane centred on the origin, facing +Y.
    ///
    /// Used as the mirror surface and, with its xz coordinates as clip-space
    /// xy, as the full-screen skybox quad.
    pub fn plane() -> Self {
        Self {
            name: "plane".to_string(),
            positions: vec![
                -1.0, 0.0, -1.0, //
                -1.0, 0.0, 1.0, //
                1.0, 0.0, 1.0, //
                1.0, 0.0, -1.0,
            ],
            normals: [0.0, 1.0, 0.0].repeat(4),
            uvs: vec![
                0.0, 0.0, //
                0.0, 1.0, //
                1.0, 1.0, //
                1.0, 0.0,
            ],
            // counter-clockwise seen from above
            indices: vec![0, 1, 2, 0, 2, 3],
            material: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3};

    fn triangle() -> MeshData {
        MeshData {
            name: "tri".to_string(),
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: vec![],
            uvs: vec![0.0, 0.25, 1.0, 0.25, 0.0, 1.0],
            indices: vec![0, 1, 2],
            material: 0,
        }
    }

    #[test]
    fn rejects_empty_mesh() {
        assert!(MeshData::default().is_empty());
        assert!(MeshData::default().validate().is_err());

        let vertices_only = MeshData {
            indices: Vec::new(),
            ..triangle()
        };
        assert!(vertices_only.is_empty());
        assert!(vertices_only.validate().is_err());
        assert!(!triangle().is_empty());
    }

    #[test]
    fn accepts_mesh_without_normals() {
        let mesh = triangle();
        mesh.validate().unwrap();
        let vertices = mesh.vertices();
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[1].normal, [0.0; 3]);
        assert_eq!(vertices[2].tex_coords, [0.0, 1.0]);
    }

    #[test]
    fn rejects_out_of_bounds_index() {
        let mut mesh = triangle();
        mesh.indices = vec![0, 1, 3];
        let err = mesh.validate().unwrap_err().to_string();
        assert!(err.contains("index 3"), "{err}");
    }

    #[test]
    fn rejects_partial_triangles_and_ragged_attributes() {
        let mut mesh = triangle();
        mesh.indices.push(0);
        assert!(mesh.validate().is_err());

        let mut mesh = triangle();
        mesh.normals = vec![0.0, 0.0, 1.0];
        assert!(mesh.validate().is_err());

        let mut mesh = triangle();
        mesh.positions.pop();
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn flip_v_only_touches_v() {
        let mesh = triangle().flip_v();
        assert_eq!(mesh.uvs, vec![0.0, 0.75, 1.0, 0.75, 0.0, 0.0]);
    }

    #[test]
    fn plane_faces_up_with_ccw_winding() {
        let plane = MeshData::plane();
        plane.validate().unwrap();
        assert_eq!(plane.triangle_count(), 2);
        let v = plane.vertices();
        for tri in plane.indices.chunks(3) {
            let a: Vector3<f32> = v[tri[0] as usize].position.into();
            let b: Vector3<f32> = v[tri[1] as usize].position.into();
            let c: Vector3<f32> = v[tri[2] as usize].position.into();
            let face_normal = (b - a).cross(c - a).normalize();
            assert_eq!(face_normal, Vector3::unit_y());
        }
    }
}
