//! Two textured monkeys lit by three coloured point lights circling the
//! view axis.

use cgmath::{Point3, Rad, Vector3};
use instant::Duration;

use crate::{
    camera::Camera,
    context::{Context, InitContext},
    data_structures::{
        instance::Instance,
        model::{MaterialParams, Specular},
        object::SceneObject,
    },
    flow::{FlowConstructor, GraphicsFlow, Out},
    math,
    pipelines::light::PointLight,
    render::Render,
    resources,
};

/// Everything that defines the scene; the defaults reproduce the demo.
#[derive(Clone, Debug, PartialEq)]
pub struct LightingParams {
    pub mesh: String,
    /// Texture and base colour of the monkey at x = +2 and x = -2.
    pub materials: [(String, [f32; 3]); 2],
    pub ambient: [f32; 3],
    pub light_colors: Vec<[f32; 3]>,
    pub light_positions: Vec<Vector3<f32>>,
    pub camera_eye: Point3<f32>,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for LightingParams {
    fn default() -> Self {
        Self {
            mesh: "monkey.obj".to_string(),
            materials: [
                // light blue
                ("diamond.jpg".to_string(), [0.6, 0.8, 1.0]),
                // gold
                ("gold.jpg".to_string(), [0.8, 0.8, 0.3]),
            ],
            ambient: [0.5; 3],
            // pink, green, white
            light_colors: vec![[1.0, 0.2, 0.8], [0.1, 1.0, 0.3], [1.0, 1.0, 1.0]],
            light_positions: vec![
                Vector3::new(0.0, 5.0, 2.0),
                Vector3::new(0.0, -5.0, 2.0),
                Vector3::new(0.0, 10.0, -20.0),
            ],
            camera_eye: Point3::new(0.0, -4.0, 1.0),
            fovy: Rad(std::f32::consts::FRAC_PI_4),
            znear: 0.1,
            zfar: 100.0,
        }
    }
}

impl LightingParams {
    fn material(&self, base_color: [f32; 3]) -> MaterialParams {
        MaterialParams {
            base_color,
            ambient_intensity: 0.5,
            diffuse_intensity: 0.8,
            specular_intensity: 5.0,
            specular_power: 100.0,
            metalness: 0.7,
            environment_mix: 0.0,
            specular: Specular::Phong,
        }
    }
}

/// The point lights `seconds` after the start: every light turns about the
/// Z axis by one radian per second.
pub fn animate(params: &LightingParams, seconds: f32) -> Vec<PointLight> {
    params
        .light_positions
        .iter()
        .zip(&params.light_colors)
        .map(|(position, color)| {
            PointLight::new(math::rotate_z_about_origin(*position, seconds), *color)
        })
        .collect()
}

pub struct LightingScene {
    params: LightingParams,
    monkeys: Vec<SceneObject>,
    elapsed: Duration,
}

impl LightingScene {
    pub async fn new(ctx: &InitContext, params: LightingParams) -> anyhow::Result<Self> {
        let mut monkeys = Vec::with_capacity(params.materials.len());
        for ((texture, base_color), x) in params.materials.iter().zip([2.0, -2.0]) {
            let model = resources::load_model(
                &params.mesh,
                texture,
                params.material(*base_color),
                &ctx.device,
                &ctx.queue,
            )
            .await?;
            let instance = Instance {
                position: Vector3::new(x, 0.0, 0.0),
                ..Instance::new()
            };
            monkeys.push(SceneObject::new(&ctx.device, model, vec![instance]));
        }
        Ok(Self {
            params,
            monkeys,
            elapsed: Duration::ZERO,
        })
    }
}

impl<S, E> GraphicsFlow<S, E> for LightingScene {
    fn on_init(&mut self, ctx: &mut Context, _: &mut S) -> Out<S, E> {
        ctx.camera = Camera::new(self.params.camera_eye, (0.0, 0.0, 0.0));
        ctx.projection.fovy = self.params.fovy;
        ctx.projection.znear = self.params.znear;
        ctx.projection.zfar = self.params.zfar;
        ctx.set_lights(self.params.ambient, animate(&self.params, 0.0));
        ctx.settings.shadows = None;
        ctx.settings.post = None;
        ctx.clear_colour = wgpu::Color::BLACK;
        Out::Empty
    }

    fn on_update(&mut self, ctx: &mut Context, _: &mut S, dt: Duration) -> Out<S, E> {
        self.elapsed += dt;
        ctx.set_lights(self.params.ambient, animate(&self.params, self.elapsed.as_secs_f32()));
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        Render::Lits(self.monkeys.iter().map(SceneObject::instanced).collect())
    }
}

pub fn constructor<S: 'static, E: 'static>(params: LightingParams) -> FlowConstructor<S, E> {
    Box::new(|ctx| {
        Box::pin(async move {
            let scene = LightingScene::new(&ctx, params).await?;
            anyhow::Ok(Box::new(scene) as Box<dyn GraphicsFlow<S, E>>)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn lights_start_at_their_initial_positions() {
        let params = LightingParams::default();
        let lights = animate(&params, 0.0);
        assert_eq!(lights.len(), 3);
        for (light, initial) in lights.iter().zip(&params.light_positions) {
            assert!(close(light.position.x, initial.x));
            assert!(close(light.position.y, initial.y));
            assert!(close(light.position.z, initial.z));
        }
    }

    #[test]
    fn lights_circle_the_z_axis() {
        let params = LightingParams::default();
        let half_turn = animate(&params, std::f32::consts::PI);
        // (0, 5, 2) ends up at (0, -5, 2)
        assert!(close(half_turn[0].position.x, 0.0));
        assert!(close(half_turn[0].position.y, -5.0));
        assert!(close(half_turn[0].position.z, 2.0));

        let quarter_turn = animate(&params, std::f32::consts::FRAC_PI_2);
        assert!(close(quarter_turn[0].position.x, -5.0));
        assert!(close(quarter_turn[0].position.y, 0.0));
    }

    #[test]
    fn lights_keep_their_colours() {
        let params = LightingParams::default();
        let colors: Vec<_> = animate(&params, 12.3).iter().map(|l| l.color).collect();
        assert_eq!(colors, params.light_colors);
    }
}
