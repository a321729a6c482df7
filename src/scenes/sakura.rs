//! The kuma in a cherry-blossom skybox, floating over a tilted mirror that
//! catches its shadow. Every effect the engine has is switched on here.

use cgmath::{Point3, Rad, Vector3};
use instant::Duration;

use crate::{
    camera::Camera,
    context::{Context, InitContext},
    data_structures::{
        instance::Instance,
        mesh_data::MeshData,
        model::{MaterialParams, Specular},
        object::SceneObject,
        texture::Texture,
    },
    flow::{FlowConstructor, GraphicsFlow, Out},
    math::{self, Plane},
    pipelines::{
        light::PointLight,
        mirror::MirrorSettings,
        post::PostSettings,
        shadow::{ShadowLight, ShadowSettings},
    },
    render::{MirrorSurface, Render},
    resources::{self, CubemapFaces},
};

/// Everything that defines the scene; the defaults reproduce the demo.
#[derive(Clone, Debug, PartialEq)]
pub struct SakuraParams {
    pub mesh: String,
    pub texture: String,
    pub skybox: CubemapFaces,
    /// Pink; also the clear colour and, scaled by 0.4, the mirror's ambient term.
    pub background: [f32; 3],
    pub ambient: [f32; 3],
    pub light_colors: Vec<[f32; 3]>,
    pub light_positions: Vec<Vector3<f32>>,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub post: PostSettings,
}

impl Default for SakuraParams {
    fn default() -> Self {
        Self {
            mesh: "kuma.obj".to_string(),
            texture: "kumaColors.png".to_string(),
            skybox: CubemapFaces {
                pos_x: "sakuraFront.jpg".to_string(),
                neg_x: "sakuraBack.jpg".to_string(),
                pos_y: "sakuraTop.jpg".to_string(),
                neg_y: "sakuraBottom.jpg".to_string(),
                pos_z: "sakuraRight.jpg".to_string(),
                neg_z: "sakuraLeft.jpg".to_string(),
            },
            background: [0.98, 0.27, 0.85],
            ambient: [0.98, 0.27, 0.85],
            // light violet layered with white
            light_colors: vec![[0.62, 0.41, 0.7], [1.0, 1.0, 1.0]],
            light_positions: vec![Vector3::new(10.0, -5.0, 10.0), Vector3::new(20.0, 20.0, 0.0)],
            fovy: Rad(std::f32::consts::PI / 7.0),
            znear: 0.1,
            zfar: 220.0,
            post: PostSettings::default(),
        }
    }
}

impl SakuraParams {
    fn kuma_material(&self) -> MaterialParams {
        MaterialParams {
            base_color: [1.0; 3],
            ambient_intensity: 0.5,
            diffuse_intensity: 0.6,
            specular_intensity: 0.0,
            specular_power: 20.0,
            metalness: 0.0,
            environment_mix: 0.2,
            specular: Specular::BlinnPhong,
        }
    }

    fn mirror_settings(&self) -> MirrorSettings {
        MirrorSettings {
            base_color: [1.0; 4],
            ambient_color: self.background.map(|c| c * 0.4),
            ..Default::default()
        }
    }

    fn clear_colour(&self) -> wgpu::Color {
        let [r, g, b] = self.background;
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        }
    }
}

/// Where everything is at one point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct SakuraPose {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub kuma: Instance,
    pub mirror: Instance,
    pub shadow_light: ShadowLight,
    pub lights: Vec<PointLight>,
}

const KUMA_POSITION: Vector3<f32> = Vector3 {
    x: -2.5,
    y: -1.0,
    z: 15.0,
};

/// The scene at animation time `t`, which advances by 0.02 per millisecond.
pub fn animate(params: &SakuraParams, t: f32) -> SakuraPose {
    let wobble = (t / 30.0).sin() / 6.0;

    // circular rotation, then up and down movement
    let orbit = math::rotate_y_about_origin(Vector3::new(0.0, 20.0, 150.0), t * 0.01);
    let eye = math::rotate_z_about_origin(orbit, wobble);

    let kuma = Instance {
        position: KUMA_POSITION,
        rotation: math::quat_from_euler_deg(-90.0, -90.0, -5.0 * (t * 0.2).cos()),
        scale: Vector3::new(0.85, 1.0, 1.1),
    };
    let mirror = Instance {
        position: Vector3::new(0.0, -25.0, 10.0),
        rotation: math::quat_from_euler_deg(0.0, 10.0, wobble),
        scale: Vector3::new(45.0, 2.0, 45.0),
    };
    let shadow_light = ShadowLight {
        position: Point3::new(-50.0 * (t * 0.01).sin(), 100.0, 50.0 * (t * 0.01).cos()),
        target: Point3::new(KUMA_POSITION.x, KUMA_POSITION.y, KUMA_POSITION.z),
    };
    let lights = params
        .light_positions
        .iter()
        .zip(&params.light_colors)
        .map(|(position, color)| {
            PointLight::new(math::rotate_y_about_origin(*position, t * 0.05), *color)
        })
        .collect();

    SakuraPose {
        eye: Point3::new(eye.x, eye.y, eye.z),
        target: Point3::new(0.0, -0.5, 0.0),
        kuma,
        mirror,
        shadow_light,
        lights,
    }
}

/// The world-space plane of a mirror drawn from [`MeshData::plane`] with `instance`.
pub fn mirror_plane(instance: &Instance) -> Plane {
    Plane::from_transform(&instance.to_matrix(), Vector3::unit_y())
}

pub struct SakuraScene {
    params: SakuraParams,
    kuma: SceneObject,
    mirror: SceneObject,
    plane: Plane,
    skybox: Option<Texture>,
    elapsed: Duration,
}

impl SakuraScene {
    pub async fn new(ctx: &InitContext, params: SakuraParams) -> anyhow::Result<Self> {
        let kuma = resources::load_model(
            &params.mesh,
            &params.texture,
            params.kuma_material(),
            &ctx.device,
            &ctx.queue,
        )
        .await?;

        let white = Texture::create_solid(&ctx.device, &ctx.queue, [255; 4], "mirror");
        let mirror = resources::build_model(
            &ctx.device,
            &[MeshData::plane()],
            "mirror",
            white,
            MaterialParams::default(),
        )?;

        let skybox = resources::load_cubemap(&params.skybox, &ctx.device, &ctx.queue).await?;

        let pose = animate(&params, 0.0);
        Ok(Self {
            kuma: SceneObject::new(&ctx.device, kuma, vec![pose.kuma]),
            plane: mirror_plane(&pose.mirror),
            mirror: SceneObject::new(&ctx.device, mirror, vec![pose.mirror]),
            skybox: Some(skybox),
            params,
            elapsed: Duration::ZERO,
        })
    }

    fn apply(&mut self, ctx: &mut Context, pose: SakuraPose) {
        ctx.camera = Camera::new(pose.eye, pose.target);
        ctx.shadow.light = pose.shadow_light;
        ctx.set_lights(self.params.ambient, pose.lights);
        self.plane = mirror_plane(&pose.mirror);
        self.kuma.instances = vec![pose.kuma];
        self.mirror.instances = vec![pose.mirror];
        self.kuma.write_to_buffer(&ctx.queue);
        self.mirror.write_to_buffer(&ctx.queue);
    }
}

impl<S, E> GraphicsFlow<S, E> for SakuraScene {
    fn on_init(&mut self, ctx: &mut Context, _: &mut S) -> Out<S, E> {
        if let Some(skybox) = self.skybox.take() {
            if let Err(e) = ctx.set_skybox(skybox) {
                log::error!("Cannot use the sakura skybox: {:#}", e);
            }
        }
        ctx.projection.fovy = self.params.fovy;
        ctx.projection.znear = self.params.znear;
        ctx.projection.zfar = self.params.zfar;
        ctx.mirror.settings = self.params.mirror_settings();
        ctx.settings.shadows = Some(ShadowSettings::default());
        ctx.settings.post = Some(self.params.post);
        ctx.clear_colour = self.params.clear_colour();
        self.apply(ctx, animate(&self.params, 0.0));
        Out::Empty
    }

    fn on_update(&mut self, ctx: &mut Context, _: &mut S, dt: Duration) -> Out<S, E> {
        self.elapsed += dt;
        let t = self.elapsed.as_secs_f32() * 1000.0 * 0.02;
        self.apply(ctx, animate(&self.params, t));
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        Render::Composed(vec![
            Render::Mirror(MirrorSurface {
                instanced: self.mirror.instanced(),
                plane: self.plane,
            }),
            Render::Lit(self.kuma.instanced()),
        ])
    }
}

pub fn constructor<S: 'static, E: 'static>(params: SakuraParams) -> FlowConstructor<S, E> {
    Box::new(|ctx| {
        Box::pin(async move {
            let scene = SakuraScene::new(&ctx, params).await?;
            anyhow::Ok(Box::new(scene) as Box<dyn GraphicsFlow<S, E>>)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, MetricSpace};

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn camera_starts_behind_the_kuma() {
        let pose = animate(&SakuraParams::default(), 0.0);
        assert!(close(pose.eye.x, 0.0));
        assert!(close(pose.eye.y, 20.0));
        assert!(close(pose.eye.z, 150.0));
        assert_eq!(pose.target, Point3::new(0.0, -0.5, 0.0));
    }

    #[test]
    fn camera_orbit_keeps_its_distance() {
        let start = animate(&SakuraParams::default(), 0.0).eye;
        let later = animate(&SakuraParams::default(), 4321.0).eye;
        let origin = Point3::new(0.0, 0.0, 0.0);
        assert!(close(start.distance(origin), later.distance(origin)));
    }

    #[test]
    fn shadow_light_circles_above_and_targets_the_kuma() {
        let params = SakuraParams::default();
        for t in [0.0, 50.0, 157.0] {
            let light = animate(&params, t).shadow_light;
            assert!(close(light.position.y, 100.0));
            let radius = Vector3::new(light.position.x, 0.0, light.position.z).magnitude();
            assert!(close(radius, 50.0));
            assert_eq!(light.target, Point3::new(-2.5, -1.0, 15.0));
        }
    }

    #[test]
    fn mirror_lies_below_the_kuma_facing_up() {
        let pose = animate(&SakuraParams::default(), 0.0);
        let plane = mirror_plane(&pose.mirror);
        assert!(plane.normal.y > 0.99);
        let kuma = Point3::new(-2.5, -1.0, 15.0);
        assert!(close(plane.signed_distance(kuma), 24.0));
        assert!(plane.signed_distance(pose.eye) > 0.0);
    }

    #[test]
    fn point_lights_turn_about_y_and_keep_height() {
        let params = SakuraParams::default();
        let lights = animate(&params, 200.0).lights;
        assert_eq!(lights.len(), 2);
        for (light, initial) in lights.iter().zip(&params.light_positions) {
            assert!(close(light.position.y, initial.y));
            let r = |v: Vector3<f32>| (v.x * v.x + v.z * v.z).sqrt();
            assert!(close(r(light.position), r(*initial)));
        }
    }

    #[test]
    fn mirror_ambient_is_dimmed_background() {
        let settings = SakuraParams::default().mirror_settings();
        assert!(close(settings.ambient_color[0], 0.392));
        assert!(close(settings.ambient_color[1], 0.108));
        assert!(close(settings.ambient_color[2], 0.34));
    }
}
