use cgmath::Vector3;
use wgpu::util::DeviceExt;

/// The shaders loop over a fixed-size array; extra lights are ignored.
pub const MAX_POINT_LIGHTS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vector3<f32>,
    pub color: [f32; 3],
}

impl PointLight {
    pub fn new<P: Into<Vector3<f32>>>(position: P, color: [f32; 3]) -> Self {
        Self {
            position: position.into(),
            color,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct PointLightRaw {
    // w unused, vec3s in uniform arrays are padded to 16 bytes anyway
    position: [f32; 4],
    color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    ambient: [f32; 4],
    lights: [PointLightRaw; MAX_POINT_LIGHTS],
    count: u32,
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: [u32; 3],
}

impl LightsUniform {
    /// Lights past [`MAX_POINT_LIGHTS`] are dropped.
    pub fn new(ambient: [f32; 3], lights: &[PointLight]) -> Self {
        let mut raw = [PointLightRaw::default(); MAX_POINT_LIGHTS];
        for (slot, light) in raw.iter_mut().zip(lights) {
            slot.position = light.position.extend(1.0).into();
            let [r, g, b] = light.color;
            slot.color = [r, g, b, 1.0];
        }
        let [r, g, b] = ambient;
        Self {
            ambient: [r, g, b, 1.0],
            lights: raw,
            count: lights.len().min(MAX_POINT_LIGHTS) as u32,
            _padding: [0; 3],
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Remembers whether a scene ever set more lights than the shaders take, so
/// the overflow is reported once instead of every frame.
#[derive(Debug, Default)]
pub struct LightOverflow {
    reported: bool,
}

impl LightOverflow {
    /// True only for the first call with more than [`MAX_POINT_LIGHTS`] lights.
    pub fn first_overflow(&mut self, count: usize) -> bool {
        let overflow = count > MAX_POINT_LIGHTS && !self.reported;
        self.reported |= overflow;
        overflow
    }
}

/// Ambient colour and point lights shared by every lit object.
#[derive(Debug)]
pub struct LightResources {
    pub ambient: [f32; 3],
    pub lights: Vec<PointLight>,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl LightResources {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        ambient: [f32; 3],
        lights: Vec<PointLight>,
    ) -> Self {
        let buffer = mk_buffer(device, LightsUniform::new(ambient, &lights));
        let bind_group = mk_bind_group(device, layout, &buffer);
        Self {
            ambient,
            lights,
            buffer,
            bind_group,
        }
    }

    pub fn uniform(&self) -> LightsUniform {
        LightsUniform::new(self.ambient, &self.lights)
    }

    pub fn write(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform()]));
    }
}

pub fn mk_buffer(device: &wgpu::Device, lights_uniform: LightsUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Lights Buffer"),
        contents: bytemuck::cast_slice(&[lights_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("lights_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("lights_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<LightsUniform>(), 160);
    }

    #[test]
    fn extra_lights_are_dropped() {
        let lights = vec![PointLight::new([1.0, 2.0, 3.0], [1.0, 0.0, 0.0]); 6];
        let uniform = LightsUniform::new([0.5; 3], &lights);
        assert_eq!(uniform.count(), MAX_POINT_LIGHTS as u32);
        assert_eq!(uniform.lights[3].position, [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn unused_slots_stay_zeroed() {
        let lights = [PointLight::new([0.0, 5.0, 2.0], [1.0, 0.2, 0.8])];
        let uniform = LightsUniform::new([0.5; 3], &lights);
        assert_eq!(uniform.count(), 1);
        assert_eq!(uniform.lights[0].color, [1.0, 0.2, 0.8, 1.0]);
        assert_eq!(uniform.lights[1].color, [0.0; 4]);
        assert_eq!(uniform.ambient, [0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn overflow_is_reported_once() {
        let mut overflow = LightOverflow::default();
        assert!(!overflow.first_overflow(MAX_POINT_LIGHTS));
        assert!(overflow.first_overflow(MAX_POINT_LIGHTS + 1));
        assert!(!overflow.first_overflow(MAX_POINT_LIGHTS + 2));
        assert!(!overflow.first_overflow(0));
    }
}
