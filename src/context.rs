use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraBinding, OrbitController, Projection},
    data_structures::texture::Texture,
    pipelines::{
        Layouts, Pipelines,
        light::{LightOverflow, LightResources, MAX_POINT_LIGHTS, PointLight},
        mirror::{self, MirrorResources},
        post::{PostResources, PostSettings},
        shadow::{ShadowResources, ShadowSettings},
        skybox::EnvironmentResources,
    },
};

/// Which effects the frame passes render.
///
/// Flows change these in `on_init` or through `Out::Configure`; targets whose
/// size depends on a setting are recreated on the next frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSettings {
    /// `None` turns the shadow pass off and the mirror is lit everywhere.
    pub shadows: Option<ShadowSettings>,
    /// `None` renders the main pass straight to the surface.
    pub post: Option<PostSettings>,
    /// Reflection target size relative to the surface, in (0, 1].
    pub mirror_resolution_scale: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shadows: Some(ShadowSettings::default()),
            post: None,
            mirror_resolution_scale: 1.0,
        }
    }
}

/// Central GPU state shared by every flow.
///
/// Owns the surface and device, the camera and everything a frame renders
/// with. Flows get `&mut Context` in `on_init` and `on_update` to animate
/// the camera, the lights and the effect settings.
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: Texture,
    light_overflow: LightOverflow,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    /// The animated camera. User orbit/zoom input is applied on top of it
    /// each frame without changing it.
    pub camera: Camera,
    pub controller: OrbitController,
    pub projection: Projection,
    pub main_camera: CameraBinding,
    pub lights: LightResources,
    pub shadow: ShadowResources,
    pub mirror: MirrorResources,
    pub post: PostResources,
    pub environment: EnvironmentResources,
    pub layouts: Layouts,
    pub pipelines: Pipelines,
    pub settings: RenderSettings,
    pub clear_colour: wgpu::Color,
    pub tick_duration_millis: u64,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Cannot create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No GPU adapter can present to this window")?;
        log::info!("Adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                ..Default::default()
            })
            .await
            .context("Cannot open the GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders write linear colour and rely on an sRGB surface.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("The surface reports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        log::info!("Pipelines for {:?}", surface_format);
        let settings = RenderSettings::default();
        let layouts = Layouts::new(&device);
        let pipelines = Pipelines::new(&device, surface_format, &layouts);

        let camera = Camera::new((0.0, 0.0, 10.0), (0.0, 0.0, 0.0));
        let projection = Projection::new(width, height, cgmath::Deg(45.0), 0.1, 100.0);
        let mut main_camera = CameraBinding::new(&device, &layouts.camera, "Main Camera");
        main_camera.uniform.update_view_proj(&camera, &projection);
        main_camera.write(&queue);

        let depth_texture = Texture::create_depth_texture(&device, [width, height], "depth_texture");
        let lights = LightResources::new(&device, &layouts.lights, [0.2; 3], Vec::new());
        let shadow_resolution = settings.shadows.unwrap_or_default().resolution;
        let shadow = ShadowResources::new(&device, &layouts, shadow_resolution);
        let mirror = MirrorResources::new(
            &device,
            &layouts,
            surface_format,
            mirror::target_size([width, height], settings.mirror_resolution_scale),
        );
        let post = PostResources::new(
            &device,
            &layouts,
            surface_format,
            [width, height],
            &depth_texture,
        );
        let environment = EnvironmentResources::new(&device, &queue, &layouts.environment)?;

        Ok(Self {
            window,
            depth_texture,
            light_overflow: LightOverflow::default(),
            surface,
            device,
            queue,
            config,
            camera,
            controller: OrbitController::default(),
            projection,
            main_camera,
            lights,
            shadow,
            mirror,
            post,
            environment,
            layouts,
            pipelines,
            settings,
            clear_colour: wgpu::Color::BLACK,
            tick_duration_millis: 500,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn surface_size(&self) -> [u32; 2] {
        [self.config.width, self.config.height]
    }

    /// Reconfigure the surface and recreate every target that follows its
    /// size. Zero-sized requests (minimised windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.projection.resize(width, height);
        self.depth_texture =
            Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        self.post
            .resize(&self.device, &self.layouts, [width, height], &self.depth_texture);
        let mirror_size = mirror::target_size([width, height], self.settings.mirror_resolution_scale);
        self.mirror.resize(&self.device, &self.layouts, mirror_size);
        true
    }

    /// Show `cubemap` as skybox and let lit materials reflect it.
    pub fn set_skybox(&mut self, cubemap: Texture) -> anyhow::Result<()> {
        self.environment
            .set_cubemap(&self.device, &self.layouts.environment, cubemap)
    }

    /// Replace the scene lights; they are uploaded with the next frame.
    /// Passing more than [`MAX_POINT_LIGHTS`] is reported the first time only.
    pub fn set_lights(&mut self, ambient: [f32; 3], lights: Vec<PointLight>) {
        if self.light_overflow.first_overflow(lights.len()) {
            log::warn!(
                "{} point lights set but only the first {} are used",
                lights.len(),
                MAX_POINT_LIGHTS
            );
        }
        self.lights.ambient = ambient;
        self.lights.lights = lights;
    }
}

/// The parts of [`Context`] async flow constructors need to upload their
/// models while the window is still being set up.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub format: wgpu::TextureFormat,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        // Device and queue are reference counted, cloning only clones the handle.
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            format: ctx.config.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_render_shadows_without_post() {
        let settings = RenderSettings::default();
        assert_eq!(settings.shadows, Some(ShadowSettings::default()));
        assert!(settings.post.is_none());
        assert_eq!(settings.mirror_resolution_scale, 1.0);
    }
}
