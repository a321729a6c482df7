use crate::data_structures::texture::Texture;

/// The knobs that differ between the engine's pipelines; everything else is
/// shared in [`mk_render_pipeline`].
#[derive(Clone, Copy, Debug)]
pub struct PipelineOptions {
    /// `None` makes a depth-only pipeline without a fragment stage.
    pub color_format: Option<wgpu::TextureFormat>,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub cull_mode: Option<wgpu::Face>,
    pub front_face: wgpu::FrontFace,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub depth_bias: wgpu::DepthBiasState,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            color_format: None,
            depth_format: Some(Texture::DEPTH_FORMAT),
            cull_mode: Some(wgpu::Face::Back),
            front_face: wgpu::FrontFace::Ccw,
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
            depth_bias: wgpu::DepthBiasState::default(),
        }
    }
}

impl PipelineOptions {
    /// Render into `format` in addition to the depth target.
    pub fn with_color(self, format: wgpu::TextureFormat) -> Self {
        Self {
            color_format: Some(format),
            ..self
        }
    }

    /// Same as the default, but for geometry drawn through a reflection
    /// matrix, which turns counter-clockwise triangles clockwise.
    pub fn mirrored() -> Self {
        Self {
            front_face: wgpu::FrontFace::Cw,
            ..Default::default()
        }
    }

    /// Background geometry: drawn without culling and without touching depth.
    pub fn background() -> Self {
        Self {
            cull_mode: None,
            depth_write: false,
            depth_compare: wgpu::CompareFunction::Always,
            ..Default::default()
        }
    }
}

/// Build a triangle-list pipeline with `vs_main`/`fs_main` entry points.
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
    options: PipelineOptions,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);
    let targets = [options.color_format.map(|format| wgpu::ColorTargetState {
        format,
        blend: Some(wgpu::BlendState::REPLACE),
        write_mask: wgpu::ColorWrites::ALL,
    })];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: options.color_format.map(|_| wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: options.front_face,
            cull_mode: options.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: options.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: options.depth_write,
            depth_compare: options.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: options.depth_bias,
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

pub fn mk_pipeline_layout(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pipeline_is_depth_only() {
        let options = PipelineOptions::default();
        assert_eq!(options.color_format, None);
        assert_eq!(options.depth_format, Some(Texture::DEPTH_FORMAT));
    }

    #[test]
    fn presets_keep_their_targets() {
        let format = wgpu::TextureFormat::Bgra8UnormSrgb;
        let mirrored = PipelineOptions::mirrored().with_color(format);
        assert_eq!(mirrored.color_format, Some(format));
        assert_eq!(mirrored.front_face, wgpu::FrontFace::Cw);
        assert_eq!(mirrored.cull_mode, Some(wgpu::Face::Back));

        let background = PipelineOptions::background().with_color(format);
        assert_eq!(background.color_format, Some(format));
        assert_eq!(background.depth_compare, wgpu::CompareFunction::Always);
        assert!(!background.depth_write);
    }
}
