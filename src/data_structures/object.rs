use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::{Instance, InstanceRaw},
        model::Model,
    },
    render::Instanced,
};

/**
 * A `SceneObject` is a model together with the transforms it is drawn with.
 *
 * Scenes mutate `instances` every frame and call `write_to_buffer` afterwards;
 * nothing reaches the GPU before that.
 */
pub struct SceneObject {
    pub model: Model,
    pub instances: Vec<Instance>,
    pub instance_buffer: wgpu::Buffer,
}

impl SceneObject {
    pub fn new(device: &wgpu::Device, model: Model, instances: Vec<Instance>) -> Self {
        let instance_data = instances.iter().map(Instance::to_raw).collect::<Vec<_>>();
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Buffer"),
            contents: bytemuck::cast_slice(&instance_data),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            model,
            instances,
            instance_buffer,
        }
    }

    /// A single instance with identity transform.
    pub fn single(device: &wgpu::Device, model: Model) -> Self {
        Self::new(device, model, vec![Instance::new()])
    }

    pub fn write_to_buffer(&self, queue: &wgpu::Queue) {
        let instance_data = self
            .instances
            .iter()
            .map(Instance::to_raw)
            .collect::<Vec<InstanceRaw>>();
        let bytes: &[u8] = bytemuck::cast_slice(&instance_data);
        if bytes.len() as wgpu::BufferAddress > self.instance_buffer.size() {
            log::warn!(
                "Instance buffer holds {} bytes but {} were written; extra instances are dropped",
                self.instance_buffer.size(),
                bytes.len()
            );
            queue.write_buffer(
                &self.instance_buffer,
                0,
                &bytes[..self.instance_buffer.size() as usize],
            );
        } else {
            queue.write_buffer(&self.instance_buffer, 0, bytes);
        }
    }

    /// How many instances fit into the buffer allocated at construction.
    pub fn capacity(&self) -> usize {
        self.instance_buffer.size() as usize / std::mem::size_of::<InstanceRaw>()
    }

    pub fn instanced(&self) -> Instanced<'_> {
        Instanced {
            instance: &self.instance_buffer,
            model: &self.model,
            amount: self.instances.len().min(self.capacity()),
        }
    }
}

impl<'a> From<&'a SceneObject> for Instanced<'a> {
    fn from(object: &'a SceneObject) -> Self {
        object.instanced()
    }
}
