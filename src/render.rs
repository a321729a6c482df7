//! Render composition and the per-frame pass sequence.
//!
//! Flows describe what they want drawn with a [`Render`] tree. The engine
//! flattens all trees into [`Batches`], decides with a [`FramePlan`] which
//! passes are needed and records them in this order:
//!
//! 1. shadow pass: lit objects into the light's depth map
//! 2. reflection pass: skybox and lit objects seen through the mirror
//! 3. main pass: skybox, mirror surface, lit objects
//! 4. post pass: depth of field, fog, contrast and vignette onto the surface
//!
//! # Key types
//!
//! - [`Render<'a>`] is the enum flows return from `on_render`
//! - [`Instanced<'a>`] is a model plus the instance buffer it is drawn with
//! - [`MirrorSurface<'a>`] is an instanced plane together with its world-space plane

use crate::{
    context::{Context, RenderSettings},
    data_structures::model::DrawModel,
    math::Plane,
    pipelines::mirror,
};

/// Data for instanced object rendering: a model and its instance buffer.
#[derive(Clone)]
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a crate::data_structures::model::Model,
    pub amount: usize,
}

/// A reflective surface. `plane` is the world-space plane the surface lies
/// in, its normal pointing to the side the mirror is looked at from.
#[derive(Clone)]
pub struct MirrorSurface<'a> {
    pub instanced: Instanced<'a>,
    pub plane: Plane,
}

/// Specifies how a flow's objects should be rendered.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Lit(Instanced)` renders a single lit, textured object
/// - `Lits(Vec<Instanced>)` renders a batch of them
/// - `Mirror(MirrorSurface)` renders a planar mirror; at most one per frame
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
pub enum Render<'a> {
    None,
    Lit(Instanced<'a>),
    Lits(Vec<Instanced<'a>>),
    Mirror(MirrorSurface<'a>),
    Composed(Vec<Render<'a>>),
}

impl<'a> From<Instanced<'a>> for Render<'a> {
    fn from(instanced: Instanced<'a>) -> Self {
        Render::Lit(instanced)
    }
}

impl<'a> From<MirrorSurface<'a>> for Render<'a> {
    fn from(surface: MirrorSurface<'a>) -> Self {
        Render::Mirror(surface)
    }
}

/// Everything the flows want drawn this frame, sorted by pipeline.
#[derive(Default)]
pub struct Batches<'a> {
    pub lit: Vec<Instanced<'a>>,
    pub mirror: Option<MirrorSurface<'a>>,
}

impl<'a> Batches<'a> {
    pub fn collect<I: IntoIterator<Item = Render<'a>>>(renders: I) -> Self {
        let mut batches = Self::default();
        renders.into_iter().for_each(|render| batches.push(render));
        batches
    }

    fn push(&mut self, render: Render<'a>) {
        match render {
            Render::None => (),
            Render::Lit(instanced) => self.push_lit(instanced),
            Render::Lits(vec) => vec.into_iter().for_each(|instanced| self.push_lit(instanced)),
            Render::Mirror(surface) => {
                if self.mirror.is_some() {
                    log::warn!("More than one mirror this frame; only the first one is drawn");
                } else if surface.instanced.amount == 0 {
                    log::warn!("you attempted to render a mirror with zero instances");
                } else {
                    self.mirror = Some(surface);
                }
            }
            Render::Composed(renders) => renders.into_iter().for_each(|render| self.push(render)),
        }
    }

    fn push_lit(&mut self, instanced: Instanced<'a>) {
        if instanced.amount == 0 || instanced.instance.size() == 0 {
            log::warn!("you attempted to render something with zero instances");
            return;
        }
        self.lit.push(instanced);
    }
}

/// One render pass of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    Shadow,
    Reflection,
    Main,
    Post,
}

/// Which passes a frame needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FramePlan {
    pub shadow: bool,
    pub reflection: bool,
    pub skybox: bool,
    pub post: bool,
}

impl FramePlan {
    /// The mirror is the only shadow receiver, so without one (or without
    /// anything to cast a shadow) the shadow pass is skipped.
    pub fn new(settings: &RenderSettings, lit_objects: usize, has_mirror: bool, has_skybox: bool) -> Self {
        Self {
            shadow: settings.shadows.is_some() && has_mirror && lit_objects > 0,
            reflection: has_mirror,
            skybox: has_skybox,
            post: settings.post.is_some(),
        }
    }

    pub fn for_batches(settings: &RenderSettings, batches: &Batches, has_skybox: bool) -> Self {
        Self::new(settings, batches.lit.len(), batches.mirror.is_some(), has_skybox)
    }

    pub fn passes(&self) -> Vec<Pass> {
        let mut passes = Vec::with_capacity(4);
        if self.shadow {
            passes.push(Pass::Shadow);
        }
        if self.reflection {
            passes.push(Pass::Reflection);
        }
        passes.push(Pass::Main);
        if self.post {
            passes.push(Pass::Post);
        }
        passes
    }
}

/// Write every per-frame uniform the plan needs and resize targets whose
/// configured size changed.
pub fn prepare_frame(ctx: &mut Context, batches: &Batches) -> FramePlan {
    let plan = FramePlan::for_batches(&ctx.settings, batches, ctx.environment.has_skybox);
    let surface_size = ctx.surface_size();

    let mut view = ctx.camera.clone();
    ctx.controller.apply(&mut view);
    ctx.main_camera.uniform.update_view_proj(&view, &ctx.projection);
    ctx.main_camera.write(&ctx.queue);
    ctx.lights.write(&ctx.queue);

    if let Some(surface) = &batches.mirror {
        // Keep the clip plane facing the viewer so the reflection shows what
        // is in front of the mirror from wherever the camera orbits to.
        let plane = if surface.plane.signed_distance(view.eye) < 0.0 {
            Plane::new(-surface.plane.normal, -surface.plane.d)
        } else {
            surface.plane
        };
        ctx.mirror
            .camera
            .uniform
            .update_reflected(&view, &ctx.projection, &plane);
        ctx.mirror.camera.write(&ctx.queue);
        let size = mirror::target_size(surface_size, ctx.settings.mirror_resolution_scale);
        ctx.mirror.resize(&ctx.device, &ctx.layouts, size);
        ctx.mirror.write(&ctx.queue, surface_size);
    }

    if let Some(settings) = ctx.settings.shadows {
        ctx.shadow
            .ensure_resolution(&ctx.device, &ctx.layouts, settings.resolution);
    }
    let shadow_settings = ctx.settings.shadows.filter(|_| plan.shadow);
    ctx.shadow.write(&ctx.queue, shadow_settings.as_ref());

    if let Some(settings) = &ctx.settings.post {
        ctx.post.write(
            &ctx.queue,
            settings,
            ctx.projection.znear,
            ctx.projection.zfar,
            surface_size,
        );
    }
    plan
}

/// Record all passes of `plan` into `encoder`; the final image ends up in `target`.
pub fn encode_frame(
    ctx: &Context,
    plan: &FramePlan,
    batches: &Batches,
    target: &wgpu::TextureView,
    encoder: &mut wgpu::CommandEncoder,
) {
    for pass in plan.passes() {
        match pass {
            Pass::Shadow => shadow_pass(ctx, batches, encoder),
            Pass::Reflection => reflection_pass(ctx, plan, batches, encoder),
            Pass::Main => {
                let color = if plan.post {
                    &ctx.post.scene_target.view
                } else {
                    target
                };
                main_pass(ctx, plan, batches, color, encoder);
            }
            Pass::Post => post_pass(ctx, target, encoder),
        }
    }
}

fn color_attachment<'t>(
    view: &'t wgpu::TextureView,
    clear: wgpu::Color,
) -> Option<wgpu::RenderPassColorAttachment<'t>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(clear),
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    })
}

fn depth_attachment(view: &wgpu::TextureView) -> Option<wgpu::RenderPassDepthStencilAttachment<'_>> {
    Some(wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0),
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    })
}

fn shadow_pass(ctx: &Context, batches: &Batches, encoder: &mut wgpu::CommandEncoder) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Shadow Pass"),
        color_attachments: &[],
        depth_stencil_attachment: depth_attachment(&ctx.shadow.map.view),
        occlusion_query_set: None,
        timestamp_writes: None,
    });
    render_pass.set_pipeline(&ctx.pipelines.shadow);
    render_pass.set_bind_group(0, &ctx.shadow.light_camera.bind_group, &[]);
    for instanced in &batches.lit {
        render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
        render_pass.draw_model_geometry(instanced.model, 0..instanced.amount as u32);
    }
}

fn draw_skybox<'p>(ctx: &'p Context, render_pass: &mut wgpu::RenderPass<'p>, camera: &'p wgpu::BindGroup) {
    render_pass.set_pipeline(&ctx.pipelines.skybox);
    render_pass.set_bind_group(0, camera, &[]);
    render_pass.set_bind_group(1, &ctx.environment.bind_group, &[]);
    render_pass.draw_mesh_geometry(&ctx.environment.quad, 0..1);
}

fn draw_lit<'p>(
    ctx: &'p Context,
    render_pass: &mut wgpu::RenderPass<'p>,
    pipeline: &'p wgpu::RenderPipeline,
    camera: &'p wgpu::BindGroup,
    lit: &[Instanced<'p>],
) {
    render_pass.set_pipeline(pipeline);
    render_pass.set_bind_group(1, camera, &[]);
    render_pass.set_bind_group(2, &ctx.lights.bind_group, &[]);
    render_pass.set_bind_group(3, &ctx.environment.bind_group, &[]);
    for instanced in lit {
        render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
        render_pass.draw_model_instanced(instanced.model, 0..instanced.amount as u32);
    }
}

fn reflection_pass(
    ctx: &Context,
    plan: &FramePlan,
    batches: &Batches,
    encoder: &mut wgpu::CommandEncoder,
) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Reflection Pass"),
        color_attachments: &[color_attachment(&ctx.mirror.target.view, ctx.clear_colour)],
        depth_stencil_attachment: depth_attachment(&ctx.mirror.depth.view),
        occlusion_query_set: None,
        timestamp_writes: None,
    });
    if plan.skybox {
        draw_skybox(ctx, &mut render_pass, &ctx.mirror.camera.bind_group);
    }
    draw_lit(
        ctx,
        &mut render_pass,
        &ctx.pipelines.phong_reflected,
        &ctx.mirror.camera.bind_group,
        &batches.lit,
    );
}

fn main_pass(
    ctx: &Context,
    plan: &FramePlan,
    batches: &Batches,
    color: &wgpu::TextureView,
    encoder: &mut wgpu::CommandEncoder,
) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Render Pass"),
        color_attachments: &[color_attachment(color, ctx.clear_colour)],
        depth_stencil_attachment: depth_attachment(&ctx.depth_texture.view),
        occlusion_query_set: None,
        timestamp_writes: None,
    });
    if plan.skybox {
        draw_skybox(ctx, &mut render_pass, &ctx.main_camera.bind_group);
    }
    if let Some(surface) = &batches.mirror {
        render_pass.set_pipeline(&ctx.pipelines.mirror);
        render_pass.set_bind_group(0, &ctx.main_camera.bind_group, &[]);
        render_pass.set_bind_group(1, &ctx.shadow.bind_group, &[]);
        render_pass.set_bind_group(2, &ctx.mirror.bind_group, &[]);
        render_pass.set_vertex_buffer(1, surface.instanced.instance.slice(..));
        render_pass.draw_model_geometry(surface.instanced.model, 0..surface.instanced.amount as u32);
    }
    draw_lit(
        ctx,
        &mut render_pass,
        &ctx.pipelines.phong,
        &ctx.main_camera.bind_group,
        &batches.lit,
    );
}

fn post_pass(ctx: &Context, target: &wgpu::TextureView, encoder: &mut wgpu::CommandEncoder) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Post Pass"),
        color_attachments: &[color_attachment(target, ctx.clear_colour)],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    });
    render_pass.set_pipeline(&ctx.pipelines.post);
    render_pass.set_bind_group(0, &ctx.post.bind_group, &[]);
    render_pass.draw(0..3, 0..1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_structures::{
            instance::Instance, mesh_data::MeshData, model::MaterialParams, object::SceneObject,
            texture::Texture,
        },
        pipelines::{post::PostSettings, shadow::ShadowSettings},
        resources,
    };
    use cgmath::Vector3;

    fn settings(shadows: bool, post: bool) -> RenderSettings {
        RenderSettings {
            shadows: shadows.then(ShadowSettings::default),
            post: post.then(PostSettings::default),
            ..Default::default()
        }
    }

    #[test]
    fn plain_scene_only_needs_the_main_pass() {
        let plan = FramePlan::new(&settings(true, false), 2, false, false);
        assert_eq!(plan.passes(), vec![Pass::Main]);
        assert!(!plan.shadow);
    }

    #[test]
    fn passes_run_in_fixed_order() {
        let plan = FramePlan::new(&settings(true, true), 1, true, true);
        assert_eq!(
            plan.passes(),
            vec![Pass::Shadow, Pass::Reflection, Pass::Main, Pass::Post]
        );
    }

    #[test]
    fn shadow_pass_needs_a_receiver_and_a_caster() {
        assert!(!FramePlan::new(&settings(true, false), 0, true, false).shadow);
        assert!(!FramePlan::new(&settings(true, false), 3, false, false).shadow);
        assert!(!FramePlan::new(&settings(false, false), 3, true, false).shadow);
        assert!(FramePlan::new(&settings(true, false), 3, true, false).shadow);
    }

    #[test]
    fn mirror_without_lit_objects_still_reflects_the_sky() {
        let plan = FramePlan::new(&settings(true, false), 0, true, true);
        assert_eq!(plan.passes(), vec![Pass::Reflection, Pass::Main]);
        assert!(plan.skybox);
    }

    #[test]
    fn empty_renders_collect_to_nothing() {
        let batches = Batches::collect([
            Render::None,
            Render::Composed(vec![Render::None, Render::Lits(Vec::new())]),
        ]);
        assert!(batches.lit.is_empty());
        assert!(batches.mirror.is_none());
        let plan = FramePlan::for_batches(&RenderSettings::default(), &batches, false);
        assert_eq!(plan.passes(), vec![Pass::Main]);
    }

    fn test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = futures::executor::block_on(instance.request_adapter(
            &wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            },
        ))
        .ok()?;
        futures::executor::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default()))
            .ok()
    }

    fn mirror_object(device: &wgpu::Device, queue: &wgpu::Queue, instances: usize) -> SceneObject {
        let white = Texture::create_solid(device, queue, [255; 4], "mirror");
        let model = resources::build_model(
            device,
            &[MeshData::plane()],
            "mirror",
            white,
            MaterialParams::default(),
        )
        .unwrap();
        SceneObject::new(device, model, vec![Instance::new(); instances])
    }

    /// A mirror over `object` lying in the plane y = -d.
    fn mirror(object: &SceneObject, d: f32) -> Render<'_> {
        Render::Mirror(MirrorSurface {
            instanced: object.instanced(),
            plane: Plane::new(Vector3::unit_y(), d),
        })
    }

    #[test]
    fn first_drawable_mirror_wins() {
        let Some((device, queue)) = test_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };
        let empty = mirror_object(&device, &queue, 0);
        let nested = mirror_object(&device, &queue, 1);
        let later = mirror_object(&device, &queue, 1);

        let batches = Batches::collect([
            Render::Composed(vec![
                mirror(&empty, 1.0),
                Render::Composed(vec![Render::None, mirror(&nested, 2.0)]),
            ]),
            mirror(&later, 3.0),
        ]);

        let surface = batches.mirror.as_ref().expect("a mirror is drawn");
        assert_eq!(surface.plane.d, 2.0);
        assert_eq!(surface.instanced.amount, 1);
        assert!(batches.lit.is_empty());
    }

    #[test]
    fn mirror_without_instances_is_dropped() {
        let Some((device, queue)) = test_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };
        let empty = mirror_object(&device, &queue, 0);

        let batches = Batches::collect([Render::Composed(vec![mirror(&empty, 1.0)])]);
        assert!(batches.mirror.is_none());
        let plan = FramePlan::for_batches(&settings(true, false), &batches, false);
        assert_eq!(plan.passes(), vec![Pass::Main]);
    }
}
