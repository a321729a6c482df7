#[cfg(feature = "integration-tests")]
#[macro_use]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_mirror_below_the_camera() {
    use cgmath::Vector3;
    use common::test_utils::{FrameCounter, TestRender};
    use mirror_ngin::{
        camera::Camera,
        context::{Context, InitContext},
        data_structures::{
            instance::Instance, mesh_data::MeshData, model::MaterialParams, object::SceneObject,
            texture::Texture,
        },
        flow::ImageTestResult,
        resources,
        scenes::sakura::mirror_plane,
    };

    golden_image_test!(|ctx: InitContext| async move {
        let white = Texture::create_solid(&ctx.device, &ctx.queue, [255; 4], "mirror");
        let model = resources::build_model(
            &ctx.device,
            &[MeshData::plane()],
            "mirror",
            white,
            MaterialParams::default(),
        )?;
        let instance = Instance {
            scale: Vector3::new(5.0, 1.0, 5.0),
            ..Instance::new()
        };
        let plane = mirror_plane(&instance);

        let mut render = TestRender::new(
            |ctx: &mut Context| {
                ctx.camera = Camera::new((0.0, 10.0, 10.0), (0.0, 0.0, 0.0));
                ctx.clear_colour = wgpu::Color::BLACK;
            },
            |state: &FrameCounter, texture: &image::RgbaImage| {
                if state.frame() <= 1 {
                    return Ok(ImageTestResult::Waiting);
                }
                let (width, height) = texture.dimensions();
                let centre = texture.get_pixel(width / 2, height / 2);
                let top = texture.get_pixel(width / 2, 0);
                let is_black = |p: &image::Rgba<u8>| p.0[..3] == [0, 0, 0];
                // the mirror reflects nothing but still shows its ambient term
                if !is_black(centre) && is_black(top) {
                    Ok(ImageTestResult::Passed)
                } else {
                    Ok(ImageTestResult::Failed)
                }
            },
        );
        render.mirror = Some((SceneObject::new(&ctx.device, model, vec![instance]), plane));
        anyhow::Ok(render)
    });
}
