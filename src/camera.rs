//! Cameras, projections and the per-pass camera uniforms.
//!
//! Every render pass looks at the scene through a [`CameraUniform`]: the main
//! pass through the animated scene camera, the reflection pass through the
//! same camera mirrored across the mirror plane, and the shadow pass through
//! the light. Each of them gets its own [`CameraBinding`] so all three can be
//! written before a single queue submission.

use cgmath::{
    EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, Vector4, perspective,
};
use wgpu::util::DeviceExt;
use winit::event::{MouseScrollDelta, WindowEvent};

use crate::math::Plane;

/// cgmath builds OpenGL style clip space (z in [-1, 1]); wgpu wants z in [0, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// A look-at camera. Scenes move `eye` and `target` every frame.
#[derive(Clone, Debug)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<E: Into<Point3<f32>>, T: Into<Point3<f32>>>(eye: E, target: T) -> Self {
        Self {
            eye: eye.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye, self.target, self.up)
    }
}

#[derive(Clone, Debug)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// What the shaders see of a camera. Layout matches `struct Camera` in the WGSL files.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
    inv_view_proj: [[f32; 4]; 4],
    // Fragments with dot(clip_plane.xyz, world) + clip_plane.w < 0 are discarded.
    clip_plane: [f32; 4],
}

impl CameraUniform {
    /// A plane that never clips: `0·x + 1 >= 0` everywhere.
    const NO_CLIP: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
            inv_view_proj: Matrix4::identity().into(),
            clip_plane: Self::NO_CLIP,
        }
    }

    fn set_matrices(&mut self, eye: Point3<f32>, view_proj: Matrix4<f32>) {
        self.view_position = eye.to_homogeneous().into();
        self.view_proj = view_proj.into();
        self.inv_view_proj = view_proj
            .invert()
            .unwrap_or_else(Matrix4::identity)
            .into();
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        let view_proj = projection.calc_matrix() * camera.view_matrix();
        self.set_matrices(camera.eye, view_proj);
        self.clip_plane = Self::NO_CLIP;
    }

    /// Look at the scene as mirrored by `plane`: the view matrix is multiplied
    /// by the plane's reflection, the eye is mirrored, and everything behind
    /// the mirror gets clipped away.
    pub fn update_reflected(&mut self, camera: &Camera, projection: &Projection, plane: &Plane) {
        let view_proj = projection.calc_matrix() * camera.view_matrix() * plane.reflection_matrix();
        self.set_matrices(plane.reflect_point(camera.eye), view_proj);
        self.clip_plane = plane.as_vec4().into();
    }

    /// Look from a light position towards `target` with a square perspective frustum.
    pub fn update_light(
        &mut self,
        position: Point3<f32>,
        target: Point3<f32>,
        fovy: Rad<f32>,
        znear: f32,
        zfar: f32,
    ) -> Matrix4<f32> {
        let view = Matrix4::look_at_rh(position, target, Vector3::unit_y());
        let view_proj = OPENGL_TO_WGPU_MATRIX * perspective(fovy, 1.0, znear, zfar) * view;
        self.set_matrices(position, view_proj);
        self.clip_plane = Self::NO_CLIP;
        view_proj
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.view_proj.into()
    }

    pub fn clip_plane(&self) -> Vector4<f32> {
        self.clip_plane.into()
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
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
        label: Some("camera_bind_group_layout"),
    })
}

/// A camera uniform together with its GPU buffer and bind group.
#[derive(Debug)]
pub struct CameraBinding {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl CameraBinding {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let uniform = CameraUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Buffer")),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(&format!("{label} Bind Group")),
        });
        Self {
            uniform,
            buffer,
            bind_group,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

/// Lets the user look around an animated camera: right-drag orbits the eye
/// around the target, the scroll wheel moves it closer or further away.
#[derive(Clone, Debug)]
pub struct OrbitController {
    yaw: Rad<f32>,
    pitch: Rad<f32>,
    zoom: f32,
    sensitivity: f32,
    dragging: bool,
}

impl OrbitController {
    const MIN_ZOOM: f32 = 0.2;
    const MAX_ZOOM: f32 = 5.0;
    const MAX_PITCH: Rad<f32> = Rad(85.0 * std::f32::consts::PI / 180.0);

    pub fn new(sensitivity: f32) -> Self {
        Self {
            yaw: Rad(0.0),
            pitch: Rad(0.0),
            zoom: 1.0,
            sensitivity,
            dragging: false,
        }
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                if *button == winit::event::MouseButton::Right {
                    self.dragging = state.is_pressed();
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.zoom(scroll);
            }
            _ => (),
        }
    }

    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        if !self.dragging {
            return;
        }
        self.yaw += Rad(dx as f32 * self.sensitivity);
        self.pitch = Rad((self.pitch.0 + dy as f32 * self.sensitivity)
            .clamp(-Self::MAX_PITCH.0, Self::MAX_PITCH.0));
    }

    pub fn zoom(&mut self, scroll: f32) {
        self.zoom = (self.zoom * (1.0 - scroll * 0.1)).clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
    }

    /// Rotate and scale the eye's offset from the target by the user's input.
    pub fn apply(&self, camera: &mut Camera) {
        if self.yaw.0 == 0.0 && self.pitch.0 == 0.0 && self.zoom == 1.0 {
            return;
        }
        let offset = camera.eye - camera.target;
        let distance = offset.magnitude();
        if distance <= f32::EPSILON {
            return;
        }
        let yaw = Rad(offset.x.atan2(offset.z)) + self.yaw;
        let pitch = Rad((offset.y / distance).asin() + self.pitch.0)
            .0
            .clamp(-Self::MAX_PITCH.0, Self::MAX_PITCH.0);
        let distance = distance * self.zoom;
        let (sin_yaw, cos_yaw) = yaw.0.sin_cos();
        let (sin_pitch, cos_pitch) = pitch.sin_cos();
        let offset = Vector3::new(sin_yaw * cos_pitch, sin_pitch, cos_yaw * cos_pitch) * distance;
        camera.eye = Point3::from_vec(camera.target.to_vec() + offset);
    }
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new(0.004)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Transform};

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn uniform_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 160);
        assert_eq!(std::mem::size_of::<CameraUniform>() % 16, 0);
    }

    #[test]
    fn projection_maps_near_and_far_to_wgpu_depth_range() {
        let projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);
        let m = projection.calc_matrix();
        let near = m * Vector4::new(0.0, 0.0, -0.1, 1.0);
        let far = m * Vector4::new(0.0, 0.0, -100.0, 1.0);
        assert!(close(near.z / near.w, 0.0));
        assert!(close(far.z / far.w, 1.0));
    }

    #[test]
    fn projection_resize_ignores_zero_height() {
        let mut projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);
        projection.resize(640, 0);
        assert!(projection.aspect.is_finite());
        assert!(close(projection.aspect, 640.0));
    }

    #[test]
    fn reflected_camera_mirrors_eye_and_sets_clip_plane() {
        let camera = Camera::new((0.0, 10.0, 20.0), (0.0, 0.0, 0.0));
        let projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);
        let plane = Plane::default();
        let mut uniform = CameraUniform::new();
        uniform.update_reflected(&camera, &projection, &plane);

        assert_eq!(uniform.view_position, [0.0, -10.0, 20.0, 1.0]);
        assert_eq!(uniform.clip_plane(), Vector4::new(0.0, 1.0, 0.0, 0.0));

        // A point on the mirror projects to the same pixel in both cameras.
        let mut direct = CameraUniform::new();
        direct.update_view_proj(&camera, &projection);
        let on_mirror = Point3::new(1.5, 0.0, -2.0);
        let a = direct.view_proj().transform_point(on_mirror);
        let b = uniform.view_proj().transform_point(on_mirror);
        assert!(close(a.x, b.x) && close(a.y, b.y) && close(a.z, b.z));
    }

    #[test]
    fn light_camera_looks_at_target() {
        let mut uniform = CameraUniform::new();
        let view_proj = uniform.update_light(
            Point3::new(0.0, 100.0, 50.0),
            Point3::new(-2.5, -1.0, 15.0),
            Rad(std::f32::consts::PI / 7.0),
            0.1,
            200.0,
        );
        let target = view_proj.transform_point(Point3::new(-2.5, -1.0, 15.0));
        assert!(close(target.x, 0.0) && close(target.y, 0.0));
        assert!(target.z > 0.0 && target.z < 1.0);
    }

    #[test]
    fn orbit_controller_keeps_distance_without_zoom() {
        let mut camera = Camera::new((0.0, 20.0, 150.0), (0.0, -0.5, 0.0));
        let before = (camera.eye - camera.target).magnitude();
        let mut controller = OrbitController::default();
        controller.dragging = true;
        controller.handle_mouse(120.0, -40.0);
        controller.apply(&mut camera);
        let after = (camera.eye - camera.target).magnitude();
        assert!(close(before, after));
    }

    #[test]
    fn orbit_controller_ignores_motion_without_drag() {
        let mut camera = Camera::new((0.0, 0.0, 10.0), (0.0, 0.0, 0.0));
        let mut controller = OrbitController::default();
        controller.handle_mouse(500.0, 500.0);
        controller.apply(&mut camera);
        assert!(close(camera.eye.x, 0.0) && close(camera.eye.z, 10.0));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut controller = OrbitController::default();
        for _ in 0..200 {
            controller.zoom(5.0);
        }
        let mut camera = Camera::new((0.0, 0.0, 10.0), (0.0, 0.0, 0.0));
        controller.apply(&mut camera);
        assert!(close(camera.eye.z, 10.0 * OrbitController::MIN_ZOOM));
    }
}
