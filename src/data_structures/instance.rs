//! Instance transformation data for GPU rendering.
//!
//! Per-instance data like position, rotation, and scale is stored as
//! GPU buffers and passed to shaders, so the same model can be drawn several
//! times (or once, mirrored) without touching its vertex data.

use cgmath::One;

use crate::{data_structures::model, math};

/// Per-instance transformation: position, rotation (as quaternion), and scale.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        math::from_rotation_translation_scale(self.rotation, self.position, self.scale)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        let model = self.to_matrix();
        InstanceRaw {
            model: model.into(),
            normal: math::normal_matrix(&model).into(),
        }
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/// What the instance buffer holds per instance.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
}

impl InstanceRaw {
    // The model matrix takes locations 5-8, the normal matrix 9-11.
    const ATTRIBUTES: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        9 => Float32x3,
        10 => Float32x3,
        11 => Float32x3,
    ];
}

impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::model::Vertex;
    use cgmath::{Matrix4, SquareMatrix};

    #[test]
    fn identity_instance_has_identity_matrices() {
        let raw = Instance::new().to_raw();
        let model: [[f32; 4]; 4] = Matrix4::identity().into();
        assert_eq!(raw.model, model);
        assert_eq!(raw.normal, [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
    }

    #[test]
    fn translation_lands_in_last_column() {
        let raw = Instance::from(cgmath::Vector3::new(2.0, 0.0, 0.0)).to_raw();
        assert_eq!(raw.model[3], [2.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn layout_matches_raw_size() {
        let desc = InstanceRaw::desc();
        assert_eq!(desc.array_stride as usize, std::mem::size_of::<InstanceRaw>());
        let last = desc.attributes.last().unwrap();
        assert_eq!(last.offset + last.format.size(), desc.array_stride);
    }
}
