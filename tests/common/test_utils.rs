#![allow(dead_code)]

#[cfg(feature = "integration-tests")]
use mirror_ngin::{
    context::Context,
    data_structures::object::SceneObject,
    flow::{GraphicsFlow, ImageTestResult, Out},
    math::Plane,
    render::{MirrorSurface, Render},
};

#[derive(Default)]
pub(crate) struct FrameCounter(pub(crate) u32);

impl FrameCounter {
    pub(crate) fn frame(&self) -> u32 {
        self.0
    }

    pub(crate) fn progress(&mut self) {
        self.0 += 1;
    }
}

#[cfg(feature = "integration-tests")]
pub(crate) type Setup = Box<dyn Fn(&mut Context)>;

#[cfg(feature = "integration-tests")]
pub(crate) type Validate =
    Box<dyn Fn(&FrameCounter, &image::RgbaImage) -> anyhow::Result<ImageTestResult>>;

/// A flow that draws fixed objects and hands every frame to `validate`
/// until it passes.
#[cfg(feature = "integration-tests")]
pub(crate) struct TestRender {
    pub(crate) lit: Vec<SceneObject>,
    pub(crate) mirror: Option<(SceneObject, Plane)>,
    pub(crate) setup: Setup,
    pub(crate) validate: Validate,
}

#[cfg(feature = "integration-tests")]
impl TestRender {
    pub(crate) fn new(
        setup: impl Fn(&mut Context) + 'static,
        validate: impl Fn(&FrameCounter, &image::RgbaImage) -> anyhow::Result<ImageTestResult>
        + 'static,
    ) -> Self {
        Self {
            lit: Vec::new(),
            mirror: None,
            setup: Box::new(setup),
            validate: Box::new(validate),
        }
    }
}

#[cfg(feature = "integration-tests")]
impl GraphicsFlow<FrameCounter, ()> for TestRender {
    fn on_init(&mut self, ctx: &mut Context, _: &mut FrameCounter) -> Out<FrameCounter, ()> {
        (self.setup)(ctx);
        Out::Empty
    }

    fn on_update(
        &mut self,
        _: &mut Context,
        state: &mut FrameCounter,
        _: instant::Duration,
    ) -> Out<FrameCounter, ()> {
        state.progress();
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        let mut renders: Vec<Render<'_>> = self.lit.iter().map(|o| o.instanced().into()).collect();
        if let Some((surface, plane)) = &self.mirror {
            renders.push(Render::Mirror(MirrorSurface {
                instanced: surface.instanced(),
                plane: *plane,
            }));
        }
        Render::Composed(renders)
    }

    fn render_to_texture(
        &self,
        _: &Context,
        state: &mut FrameCounter,
        texture: &image::RgbaImage,
    ) -> anyhow::Result<ImageTestResult> {
        (self.validate)(state, texture)
    }
}

/// Run a single [`TestRender`] built by an async closure over the
/// `InitContext` until its validation passes.
#[macro_export]
macro_rules! golden_image_test {
    ($build:expr) => {{
        use mirror_ngin::flow::{FlowConstructor, GraphicsFlow};
        use $crate::common::test_utils::{FrameCounter, TestRender};

        let build = $build;
        let constructor: FlowConstructor<FrameCounter, ()> = Box::new(move |ctx| {
            Box::pin(async move {
                let render: TestRender = build(ctx).await?;
                anyhow::Ok(Box::new(render) as Box<dyn GraphicsFlow<FrameCounter, ()>>)
            })
        });

        mirror_ngin::flow::run(vec![constructor]).expect("Failed to run flow for integration test.");
    }};
}
