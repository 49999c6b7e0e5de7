//! [`Rasterizer`] over wgpu.
//!
//! Bind groups:
//! - 0: `Globals` (projection + atlas size), one per frame
//! - 1: view matrix, one 256-byte aligned slot per draw (dynamic offset)
//! - 2: font atlas texture + sampler (text program only)
//!
//! Topology and blending are baked into wgpu pipelines, so pipelines are
//! created lazily per `(program, topology, blend)` and cached.

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use rack_proto::{ProgramId, Topology, VertexLayout, VertexPool};

use super::atlas::FontAtlas;
use super::ctx::RenderCtx;
use super::executor::Rasterizer;
use super::programs::{BlendMode, ProgramEffects, effects_of};

const VIEW_SIZE: u64 = std::mem::size_of::<[f32; 16]>() as u64;
const MIN_VERTEX_CAPACITY: u64 = 64 * 1024;
const MIN_VIEW_SLOTS: u32 = 64;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Globals {
    projection: [f32; 16],
    atlas_size: [f32; 2],
    _pad: [f32; 2],
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct PipelineKey {
    program: ProgramId,
    topology: Topology,
    blend: BlendMode,
}

struct AtlasBinding {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// GPU resources for replaying draw streams of one vertex layout.
pub struct WgpuBackend {
    layout: VertexLayout,
    format: Option<wgpu::TextureFormat>,

    flat_shader: Option<wgpu::ShaderModule>,
    msdf_shader: Option<wgpu::ShaderModule>,
    globals_bgl: Option<wgpu::BindGroupLayout>,
    view_bgl: Option<wgpu::BindGroupLayout>,
    atlas_bgl: Option<wgpu::BindGroupLayout>,
    flat_layout: Option<wgpu::PipelineLayout>,
    msdf_layout: Option<wgpu::PipelineLayout>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    globals: Globals,
    globals_ubo: Option<wgpu::Buffer>,
    globals_bg: Option<wgpu::BindGroup>,

    view_stride: u64,
    view_slots: u32,
    view_ubo: Option<wgpu::Buffer>,
    view_bg: Option<wgpu::BindGroup>,
    view_staging: Vec<u8>,
    views_written: u32,

    vertex_vbo: Option<wgpu::Buffer>,
    vertex_capacity: u64,

    sampler: Option<wgpu::Sampler>,
    atlas: Option<AtlasBinding>,
}

impl WgpuBackend {
    pub fn new(layout: VertexLayout) -> Self {
        Self {
            layout,
            format: None,
            flat_shader: None,
            msdf_shader: None,
            globals_bgl: None,
            view_bgl: None,
            atlas_bgl: None,
            flat_layout: None,
            msdf_layout: None,
            pipelines: HashMap::new(),
            globals: Globals {
                projection: Mat4::IDENTITY.to_cols_array(),
                atlas_size: [1.0, 1.0],
                _pad: [0.0; 2],
            },
            globals_ubo: None,
            globals_bg: None,
            view_stride: 256,
            view_slots: 0,
            view_ubo: None,
            view_bg: None,
            view_staging: Vec::new(),
            views_written: 0,
            vertex_vbo: None,
            vertex_capacity: 0,
            sampler: None,
            atlas: None,
        }
    }

    #[inline]
    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    #[inline]
    pub fn has_atlas(&self) -> bool {
        self.atlas.is_some()
    }

    /// Whether draws of `program` can be issued with the current resources.
    pub fn supports(&self, program: ProgramId) -> bool {
        effects_of(program).is_some_and(|e| self.can_run(e))
    }

    fn can_run(&self, effects: &ProgramEffects) -> bool {
        (!effects.textured || self.layout == VertexLayout::Textured)
            && (!effects.atlas || self.atlas.is_some())
    }

    /// Creates or grows everything the next frame's pass will reference.
    /// Must run before the pass begins.
    pub fn prepare(&mut self, ctx: &RenderCtx<'_>, vertex_bytes: u64, draw_count: u32) {
        self.ensure_shared(ctx);
        self.ensure_vertex_capacity(ctx, vertex_bytes);
        self.ensure_view_slots(ctx, draw_count);
        self.views_written = 0;
    }

    /// Recorder for one pass. Call [`finish`](Self::finish) after the pass
    /// has ended.
    pub fn rasterizer<'a, 'p>(
        &'a mut self,
        ctx: &'a RenderCtx<'a>,
        pass: &'a mut wgpu::RenderPass<'p>,
    ) -> WgpuRasterizer<'a, 'p> {
        WgpuRasterizer {
            backend: self,
            ctx,
            pass,
            blend: BlendMode::Opaque,
            program: None,
            bound: None,
        }
    }

    /// Uploads the uniforms staged while recording. They land before the
    /// frame's command buffer runs.
    pub fn finish(&mut self, ctx: &RenderCtx<'_>) {
        if let Some(ubo) = self.globals_ubo.as_ref() {
            ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&self.globals));
        }
        if let Some(ubo) = self.view_ubo.as_ref() {
            let used = (self.views_written as u64 * self.view_stride) as usize;
            if used > 0 {
                ctx.queue.write_buffer(ubo, 0, &self.view_staging[..used]);
            }
        }
    }

    /// Replaces the font atlas texture.
    pub fn set_atlas(&mut self, ctx: &RenderCtx<'_>, atlas: &FontAtlas) {
        self.ensure_shared(ctx);
        let (Some(bgl), Some(sampler)) = (self.atlas_bgl.as_ref(), self.sampler.as_ref()) else {
            return;
        };

        let size = wgpu::Extent3d {
            width: atlas.size(),
            height: atlas.size(),
            depth_or_array_layers: 1,
        };
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("rack font atlas"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            // distances are linear data
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            atlas.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(atlas.bytes_per_row()),
                rows_per_image: Some(atlas.size()),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rack atlas bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        self.globals.atlas_size = [atlas.size() as f32; 2];
        self.atlas = Some(AtlasBinding {
            _texture: texture,
            bind_group,
        });
        log::debug!("font atlas uploaded ({0}x{0})", atlas.size());
    }

    // ── lazy init ─────────────────────────────────────────────────────────

    fn ensure_shared(&mut self, ctx: &RenderCtx<'_>) {
        if self.format != Some(ctx.surface_format) {
            // pipelines bake the target format
            self.pipelines.clear();
            self.format = Some(ctx.surface_format);
        }
        if self.flat_layout.is_some() {
            return;
        }

        let device = ctx.device;
        self.flat_shader = Some(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("rack flat shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/flat.wgsl").into()),
        }));
        self.msdf_shader = Some(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("rack msdf shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/msdf.wgsl").into()),
        }));

        let globals_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rack globals bgl"),
            entries: &[uniform_entry(
                wgpu::ShaderStages::VERTEX,
                false,
                NonZeroU64::new(std::mem::size_of::<Globals>() as u64),
            )],
        });
        let view_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rack view bgl"),
            entries: &[uniform_entry(
                wgpu::ShaderStages::VERTEX,
                true,
                NonZeroU64::new(VIEW_SIZE),
            )],
        });
        let atlas_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rack atlas bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        self.flat_layout = Some(device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("rack flat pipeline layout"),
            bind_group_layouts: &[&globals_bgl, &view_bgl],
            immediate_size: 0,
        }));
        self.msdf_layout = Some(device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("rack msdf pipeline layout"),
            bind_group_layouts: &[&globals_bgl, &view_bgl, &atlas_bgl],
            immediate_size: 0,
        }));

        let globals_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rack globals ubo"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.globals_bg = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rack globals bind group"),
            layout: &globals_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_ubo.as_entire_binding(),
            }],
        }));
        self.globals_ubo = Some(globals_ubo);

        self.sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("rack atlas sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        }));

        let align = device.limits().min_uniform_buffer_offset_alignment as u64;
        self.view_stride = align_up(VIEW_SIZE, align);

        self.globals_bgl = Some(globals_bgl);
        self.view_bgl = Some(view_bgl);
        self.atlas_bgl = Some(atlas_bgl);
        // the atlas bind group was built against the old layout
        self.atlas = None;
        self.view_ubo = None;
        self.view_bg = None;
        self.view_slots = 0;
    }

    fn ensure_vertex_capacity(&mut self, ctx: &RenderCtx<'_>, required: u64) {
        if required <= self.vertex_capacity && self.vertex_vbo.is_some() {
            return;
        }
        let capacity = required.next_power_of_two().max(MIN_VERTEX_CAPACITY);
        self.vertex_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rack vertex pool"),
            size: capacity,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.vertex_capacity = capacity;
        log::trace!("vertex pool buffer grown to {capacity} bytes");
    }

    fn ensure_view_slots(&mut self, ctx: &RenderCtx<'_>, draw_count: u32) {
        if draw_count <= self.view_slots && self.view_bg.is_some() {
            return;
        }
        let Some(bgl) = self.view_bgl.as_ref() else { return };

        let slots = draw_count.max(1).next_power_of_two().max(MIN_VIEW_SLOTS);
        let size = slots as u64 * self.view_stride;
        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rack view ubo"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.view_bg = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rack view bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &ubo,
                    offset: 0,
                    size: NonZeroU64::new(VIEW_SIZE),
                }),
            }],
        }));
        self.view_ubo = Some(ubo);
        self.view_slots = slots;
        self.view_staging.resize(size as usize, 0);
    }

    fn pipeline(&mut self, device: &wgpu::Device, key: PipelineKey) -> Option<&wgpu::RenderPipeline> {
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.create_pipeline(device, key)?;
            self.pipelines.insert(key, pipeline);
        }
        self.pipelines.get(&key)
    }

    fn create_pipeline(&self, device: &wgpu::Device, key: PipelineKey) -> Option<wgpu::RenderPipeline> {
        let effects = effects_of(key.program)?;
        let format = self.format?;
        let (shader, layout) = if effects.textured {
            (self.msdf_shader.as_ref()?, self.msdf_layout.as_ref()?)
        } else {
            (self.flat_shader.as_ref()?, self.flat_layout.as_ref()?)
        };

        let attributes = vertex_attributes(self.layout, effects.textured);
        let buffers = [wgpu::VertexBufferLayout {
            array_stride: self.layout.stride() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }];

        log::debug!(
            "creating pipeline: program {} {:?} {:?}",
            key.program.0,
            key.topology,
            key.blend
        );
        Some(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("rack draw pipeline"),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: blend_state(key.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: primitive_topology(key.topology),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        }))
    }
}

/// Records executor calls into one render pass.
pub struct WgpuRasterizer<'a, 'p> {
    backend: &'a mut WgpuBackend,
    ctx: &'a RenderCtx<'a>,
    pass: &'a mut wgpu::RenderPass<'p>,
    program: Option<ProgramId>,
    blend: BlendMode,
    bound: Option<PipelineKey>,
}

impl Rasterizer for WgpuRasterizer<'_, '_> {
    fn upload_vertices(&mut self, pool: &VertexPool<'_>) {
        let bytes = pool.as_bytes();
        let Some(vbo) = self.backend.vertex_vbo.as_ref() else { return };
        if bytes.is_empty() || bytes.len() as u64 > self.backend.vertex_capacity {
            return;
        }
        self.ctx.queue.write_buffer(vbo, 0, bytes);
        self.pass.set_vertex_buffer(0, vbo.slice(..bytes.len() as u64));
    }

    fn has_program(&self, program: ProgramId) -> bool {
        self.backend.supports(program)
    }

    fn bind_program(&mut self, program: ProgramId) {
        self.program = Some(program);
        if let Some(bg) = self.backend.globals_bg.as_ref() {
            self.pass.set_bind_group(0, bg, &[]);
        }
    }

    fn set_blend(&mut self, blend: BlendMode) {
        self.blend = blend;
    }

    fn bind_atlas(&mut self) {
        if let Some(atlas) = self.backend.atlas.as_ref() {
            self.pass.set_bind_group(2, &atlas.bind_group, &[]);
        }
    }

    fn upload_projection(&mut self, projection: &Mat4) {
        self.backend.globals.projection = projection.to_cols_array();
    }

    fn upload_view(&mut self, view: &Mat4) {
        let backend = &mut *self.backend;
        let Some(bg) = backend.view_bg.as_ref() else { return };
        if backend.views_written >= backend.view_slots {
            log::error!("more views than prepared slots ({})", backend.view_slots);
            return;
        }

        let offset = backend.views_written as u64 * backend.view_stride;
        let start = offset as usize;
        backend.view_staging[start..start + VIEW_SIZE as usize]
            .copy_from_slice(bytemuck::cast_slice(&view.to_cols_array()));
        backend.views_written += 1;
        self.pass.set_bind_group(1, bg, &[offset as u32]);
    }

    fn draw(&mut self, topology: Topology, vertices: Range<u32>) {
        let Some(program) = self.program else { return };
        let key = PipelineKey {
            program,
            topology,
            blend: self.blend,
        };
        if self.bound != Some(key) {
            let Some(pipeline) = self.backend.pipeline(self.ctx.device, key) else {
                return;
            };
            self.pass.set_pipeline(pipeline);
            self.bound = Some(key);
        }
        self.pass.draw(vertices, 0..1);
    }
}

fn uniform_entry(
    visibility: wgpu::ShaderStages,
    dynamic: bool,
    min_binding_size: Option<NonZeroU64>,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size,
        },
        count: None,
    }
}

const FLAT_ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x2, // pos
    1 => Unorm8x4   // color
];

const TEXTURED_ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x2, // pos
    1 => Unorm8x4,  // color
    2 => Uint32     // packed texel
];

/// Attributes a program reads from a pool of `layout`.
fn vertex_attributes(layout: VertexLayout, textured: bool) -> &'static [wgpu::VertexAttribute] {
    match (layout, textured) {
        (VertexLayout::Textured, true) => &TEXTURED_ATTRS,
        _ => &FLAT_ATTRS,
    }
}

fn primitive_topology(topology: Topology) -> wgpu::PrimitiveTopology {
    match topology {
        Topology::PointList => wgpu::PrimitiveTopology::PointList,
        Topology::LineList => wgpu::PrimitiveTopology::LineList,
        Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

fn blend_state(blend: BlendMode) -> Option<wgpu::BlendState> {
    match blend {
        BlendMode::Opaque => None,
        BlendMode::Alpha => {
            let component = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            };
            Some(wgpu::BlendState {
                color: component,
                alpha: component,
            })
        }
    }
}

#[inline]
fn align_up(value: u64, align: u64) -> u64 {
    let align = align.max(1);
    value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_match_wire_offsets() {
        let flat = vertex_attributes(VertexLayout::Flat, false);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[1].offset, VertexLayout::COLOR_OFFSET as u64);

        let textured = vertex_attributes(VertexLayout::Textured, true);
        assert_eq!(textured[2].offset, VertexLayout::TEXCOORD_OFFSET as u64);
        assert_eq!(textured[2].format, wgpu::VertexFormat::Uint32);

        // flat program on a textured pool ignores the texcoord
        assert_eq!(vertex_attributes(VertexLayout::Textured, false).len(), 2);
    }

    #[test]
    fn blend_table() {
        assert!(blend_state(BlendMode::Opaque).is_none());
        let alpha = blend_state(BlendMode::Alpha).unwrap();
        assert_eq!(alpha.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(alpha.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
    }

    #[test]
    fn every_topology_maps() {
        for t in Topology::ALL {
            let p = primitive_topology(t);
            assert_eq!(p.is_strip(), t.is_strip());
        }
    }

    #[test]
    fn view_slots_are_aligned() {
        assert_eq!(align_up(VIEW_SIZE, 256), 256);
        assert_eq!(align_up(VIEW_SIZE, 32), 64);
        assert_eq!(align_up(VIEW_SIZE, 0), 64);
    }

    #[test]
    fn text_needs_textured_layout_and_atlas() {
        let flat = WgpuBackend::new(VertexLayout::Flat);
        assert!(flat.supports(ProgramId::FLAT));
        assert!(!flat.supports(ProgramId::MSDF_TEXT));

        let textured = WgpuBackend::new(VertexLayout::Textured);
        // no atlas uploaded yet
        assert!(!textured.supports(ProgramId::MSDF_TEXT));
        assert!(!textured.supports(ProgramId(3)));
    }

    #[test]
    fn globals_layout() {
        assert_eq!(std::mem::size_of::<Globals>(), 80);
    }
}
