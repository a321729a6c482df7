#[cfg(feature = "integration-tests")]
#[macro_use]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_clear_colour() {
    use common::test_utils::{FrameCounter, TestRender};
    use mirror_ngin::{
        context::{Context, InitContext},
        flow::ImageTestResult,
    };

    golden_image_test!(|_ctx: InitContext| async move {
        anyhow::Ok(TestRender::new(
            |ctx: &mut Context| {
                ctx.clear_colour = wgpu::Color::WHITE;
                ctx.settings.shadows = None;
            },
            |state: &FrameCounter, texture: &image::RgbaImage| {
                if state.frame() <= 1 {
                    return Ok(ImageTestResult::Waiting);
                }
                let white = image::Rgba([255, 255, 255, 255]);
                if texture.pixels().all(|pixel| *pixel == white) {
                    Ok(ImageTestResult::Passed)
                } else {
                    Ok(ImageTestResult::Failed)
                }
            },
        ))
    });
}
