//! Render pipelines and static GPU buffers for the scene layers

use super::draw::{DrawCommand, FrameUniforms};
use crate::dataset::BackgroundImage;
use crate::scene::SceneGeometry;
use std::ops::Range;
use wgpu::util::{BufferInitDescriptor, DeviceExt};
use wgpu::*;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Uniforms shared by every scene shader
/// WGSL layout requirements:
/// - mat4x4 and vec4 require 16-byte alignment
/// - vec2 requires 8-byte alignment
/// - struct must be padded to 16-byte boundary
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Uniforms {
    view_proj: [[f32; 4]; 4], // offset 0  (align 16)
    color: [f32; 4],          // offset 64 (align 16)
    viewport: [f32; 2],       // offset 80 (align 8)
    point_scale: f32,         // offset 88
    line_width: f32,          // offset 92 (total 96, 16-byte boundary)
}

impl Uniforms {
    /// Lower a command's parameters into the shared uniform layout
    pub fn for_command(command: &DrawCommand, frame: &FrameUniforms) -> Self {
        let mut uniforms = Self {
            view_proj: frame.view_proj().to_cols_array_2d(),
            color: [1.0; 4],
            viewport: frame.viewport.to_array(),
            point_scale: 0.0,
            line_width: 0.0,
        };
        match command {
            DrawCommand::Background => {}
            DrawCommand::Spots(p) | DrawCommand::Circles(p) => {
                uniforms.point_scale = p.point_scale;
            }
            DrawCommand::Regions(p) => {
                uniforms.color = rgba(p.color);
            }
            DrawCommand::Outlines(p) => {
                uniforms.color = rgba(p.color);
                uniforms.line_width = p.width;
            }
        }
        uniforms
    }
}

fn rgba([r, g, b]: [f32; 3]) -> [f32; 4] {
    [r, g, b, 1.0]
}

/// Per-command uniform slots addressed with dynamic offsets
struct UniformArena {
    buffer: Buffer,
    bind_group: BindGroup,
    stride: u64,
    capacity: u64,
}

impl UniformArena {
    fn new(device: &Device, layout: &BindGroupLayout, capacity: u64) -> Self {
        let align = device.limits().min_uniform_buffer_offset_alignment as u64;
        let size = std::mem::size_of::<Uniforms>() as u64;
        let stride = size.div_ceil(align) * align;
        let capacity = capacity.max(1);

        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some("Scene Uniform Arena"),
            size: stride * capacity,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("Scene Uniform Bind Group"),
            layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: BindingResource::Buffer(BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: BufferSize::new(size),
                }),
            }],
        });

        Self {
            buffer,
            bind_group,
            stride,
            capacity,
        }
    }

    fn offset(&self, slot: usize) -> u32 {
        (slot as u64 * self.stride) as u32
    }
}

/// Static per-dataset GPU resources, uploaded once
pub struct SceneBuffers {
    positions: Buffer,
    sizes: Buffer,
    colors: Buffer,
    fill: Buffer,
    fill_ranges: Vec<Range<u32>>,
    outline: Buffer,
    outline_starts: Vec<u32>,
    background: BindGroup,
}

impl SceneBuffers {
    /// Overwrite the per-point colors after a selection change
    pub fn write_colors(&self, queue: &Queue, colors: &[[f32; 3]]) {
        if !colors.is_empty() {
            queue.write_buffer(&self.colors, 0, bytemuck::cast_slice(colors));
        }
    }
}

/// All scene pipelines plus the shared uniform arena
pub struct ScenePipelines {
    uniform_layout: BindGroupLayout,
    texture_layout: BindGroupLayout,
    arena: UniformArena,
    background: RenderPipeline,
    spots: RenderPipeline,
    circles: RenderPipeline,
    regions: RenderPipeline,
    outlines: RenderPipeline,
}

const VEC2: u64 = std::mem::size_of::<[f32; 2]>() as u64;
const ATTR_0_VEC2: [VertexAttribute; 1] = vertex_attr_array![0 => Float32x2];
const ATTR_1_VEC2: [VertexAttribute; 1] = vertex_attr_array![1 => Float32x2];
const ATTR_1_FLOAT: [VertexAttribute; 1] = vertex_attr_array![1 => Float32];
const ATTR_2_VEC3: [VertexAttribute; 1] = vertex_attr_array![2 => Float32x3];

impl ScenePipelines {
    pub fn new(device: &Device, format: TextureFormat) -> Self {
        let uniform_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Scene Uniform Layout"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: BufferSize::new(std::mem::size_of::<Uniforms>() as u64),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Background Texture Layout"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let background_shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Background Shader"),
            source: ShaderSource::Wgsl(include_str!("../shaders/background.wgsl").into()),
        });
        let marker_shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Marker Shader"),
            source: ShaderSource::Wgsl(include_str!("../shaders/markers.wgsl").into()),
        });
        let region_shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Region Shader"),
            source: ShaderSource::Wgsl(include_str!("../shaders/regions.wgsl").into()),
        });

        let uniform_only = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });
        let with_texture = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Background Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let marker_buffers = [
            VertexBufferLayout {
                array_stride: VEC2,
                step_mode: VertexStepMode::Instance,
                attributes: &ATTR_0_VEC2,
            },
            VertexBufferLayout {
                array_stride: std::mem::size_of::<f32>() as u64,
                step_mode: VertexStepMode::Instance,
                attributes: &ATTR_1_FLOAT,
            },
            VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                step_mode: VertexStepMode::Instance,
                attributes: &ATTR_2_VEC3,
            },
        ];
        let fill_buffers = [VertexBufferLayout {
            array_stride: VEC2,
            step_mode: VertexStepMode::Vertex,
            attributes: &ATTR_0_VEC2,
        }];
        // Same ring buffer bound twice, the second slot one vertex ahead
        let outline_buffers = [
            VertexBufferLayout {
                array_stride: VEC2,
                step_mode: VertexStepMode::Instance,
                attributes: &ATTR_0_VEC2,
            },
            VertexBufferLayout {
                array_stride: VEC2,
                step_mode: VertexStepMode::Instance,
                attributes: &ATTR_1_VEC2,
            },
        ];

        let background = scene_pipeline(
            device,
            format,
            "Background Pipeline",
            &with_texture,
            &background_shader,
            "vs_main",
            "fs_main",
            &[],
        );
        let spots = scene_pipeline(
            device,
            format,
            "Spots Pipeline",
            &uniform_only,
            &marker_shader,
            "vs_main",
            "fs_spot",
            &marker_buffers,
        );
        let circles = scene_pipeline(
            device,
            format,
            "Circles Pipeline",
            &uniform_only,
            &marker_shader,
            "vs_main",
            "fs_circle",
            &marker_buffers,
        );
        let regions = scene_pipeline(
            device,
            format,
            "Regions Pipeline",
            &uniform_only,
            &region_shader,
            "vs_fill",
            "fs_main",
            &fill_buffers,
        );
        let outlines = scene_pipeline(
            device,
            format,
            "Outlines Pipeline",
            &uniform_only,
            &region_shader,
            "vs_outline",
            "fs_main",
            &outline_buffers,
        );

        let arena = UniformArena::new(device, &uniform_layout, 64);

        Self {
            uniform_layout,
            texture_layout,
            arena,
            background,
            spots,
            circles,
            regions,
            outlines,
        }
    }

    /// Upload geometry, colors and the background texture
    pub fn upload(
        &self,
        device: &Device,
        queue: &Queue,
        geometry: &SceneGeometry,
        colors: &[[f32; 3]],
        image: &BackgroundImage,
    ) -> SceneBuffers {
        let vertex_buffer = |label: &str, contents: &[u8], extra: BufferUsages| {
            device.create_buffer_init(&BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: BufferUsages::VERTEX | extra,
            })
        };

        let positions = vertex_buffer(
            "Spot Positions",
            bytemuck::cast_slice(&geometry.positions),
            BufferUsages::empty(),
        );
        let sizes = vertex_buffer(
            "Spot Sizes",
            bytemuck::cast_slice(&geometry.sizes),
            BufferUsages::empty(),
        );
        let colors = vertex_buffer(
            "Spot Colors",
            bytemuck::cast_slice(colors),
            BufferUsages::COPY_DST,
        );
        let fill = vertex_buffer(
            "Region Fill Vertices",
            bytemuck::cast_slice(&geometry.fill_vertices),
            BufferUsages::empty(),
        );
        let outline = vertex_buffer(
            "Region Outline Vertices",
            bytemuck::cast_slice(&geometry.outline_vertices),
            BufferUsages::empty(),
        );

        let size = Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&TextureDescriptor {
            label: Some("Background Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            image.rgba.as_slice(),
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );
        let view = texture.create_view(&TextureViewDescriptor::default());
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("Background Sampler"),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });
        let background = device.create_bind_group(&BindGroupDescriptor {
            label: Some("Background Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&sampler),
                },
            ],
        });

        tracing::info!(
            "Uploaded scene: {} spots, {} fill vertices, {} outline vertices, {}x{} texture",
            geometry.positions.len(),
            geometry.fill_vertices.len(),
            geometry.outline_vertices.len(),
            image.width,
            image.height
        );

        SceneBuffers {
            positions,
            sizes,
            colors,
            fill,
            fill_ranges: geometry.fill_ranges.clone(),
            outline,
            outline_starts: geometry.outline_starts.clone(),
            background,
        }
    }

    /// Write one uniform slot per command, growing the arena if needed
    pub fn prepare(&mut self, device: &Device, queue: &Queue, commands: &[DrawCommand], frame: &FrameUniforms) {
        if commands.len() as u64 > self.arena.capacity {
            let capacity = (commands.len() as u64).next_power_of_two();
            tracing::debug!("Growing uniform arena to {} slots", capacity);
            self.arena = UniformArena::new(device, &self.uniform_layout, capacity);
        }

        let stride = self.arena.stride as usize;
        let mut bytes = vec![0u8; stride * commands.len()];
        for (slot, command) in commands.iter().enumerate() {
            let uniforms = Uniforms::for_command(command, frame);
            let start = slot * stride;
            bytes[start..start + std::mem::size_of::<Uniforms>()]
                .copy_from_slice(bytemuck::bytes_of(&uniforms));
        }
        if !bytes.is_empty() {
            queue.write_buffer(&self.arena.buffer, 0, &bytes);
        }
    }

    /// Record the commands prepared by [`Self::prepare`], in order
    pub fn render<'a>(&'a self, pass: &mut RenderPass<'a>, buffers: &'a SceneBuffers, commands: &[DrawCommand]) {
        for (slot, command) in commands.iter().enumerate() {
            pass.set_bind_group(0, &self.arena.bind_group, &[self.arena.offset(slot)]);

            match command {
                DrawCommand::Background => {
                    pass.set_pipeline(&self.background);
                    pass.set_bind_group(1, &buffers.background, &[]);
                    pass.draw(0..6, 0..1);
                }
                DrawCommand::Spots(p) | DrawCommand::Circles(p) => {
                    let pipeline = if matches!(command, DrawCommand::Spots(_)) {
                        &self.spots
                    } else {
                        &self.circles
                    };
                    pass.set_pipeline(pipeline);
                    pass.set_vertex_buffer(0, buffers.positions.slice(..));
                    pass.set_vertex_buffer(1, buffers.sizes.slice(..));
                    pass.set_vertex_buffer(2, buffers.colors.slice(..));
                    pass.draw(0..6, 0..p.count);
                }
                DrawCommand::Regions(p) => {
                    let range = buffers.fill_ranges[p.region].clone();
                    pass.set_pipeline(&self.regions);
                    pass.set_vertex_buffer(0, buffers.fill.slice(..));
                    pass.draw(range, 0..1);
                }
                DrawCommand::Outlines(p) => {
                    let start = buffers.outline_starts[p.region] as u64;
                    let n = p.vertex_count as u64;
                    pass.set_pipeline(&self.outlines);
                    pass.set_vertex_buffer(0, buffers.outline.slice(start * VEC2..(start + n) * VEC2));
                    pass.set_vertex_buffer(1, buffers.outline.slice((start + 1) * VEC2..(start + n + 1) * VEC2));
                    pass.draw(0..6, 0..p.vertex_count);
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn scene_pipeline(
    device: &Device,
    format: TextureFormat,
    label: &str,
    layout: &PipelineLayout,
    module: &ShaderModule,
    vs: &str,
    fs: &str,
    buffers: &[VertexBufferLayout],
) -> RenderPipeline {
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: VertexState {
            module,
            entry_point: vs,
            buffers,
        },
        fragment: Some(FragmentState {
            module,
            entry_point: fs,
            targets: &[Some(ColorTargetState {
                format,
                blend: Some(BlendState::ALPHA_BLENDING),
                write_mask: ColorWrites::ALL,
            })],
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        // Everything sits at z = 0; LessEqual keeps submission order
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: CompareFunction::LessEqual,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState::default(),
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::draw::{MarkerParams, OutlineParams};
    use glam::{Mat4, Vec2};

    fn frame() -> FrameUniforms {
        FrameUniforms {
            view: Mat4::from_scale(glam::Vec3::splat(0.5)),
            projection: Mat4::IDENTITY,
            distance: 2.0,
            viewport: Vec2::new(640.0, 480.0),
        }
    }

    #[test]
    fn test_uniform_layout_size() {
        assert_eq!(std::mem::size_of::<Uniforms>(), 96);
        assert_eq!(std::mem::size_of::<Uniforms>() % 16, 0);
    }

    #[test]
    fn test_lowering() {
        let frame = frame();
        let spots = Uniforms::for_command(
            &DrawCommand::Spots(MarkerParams {
                count: 10,
                point_scale: 2.0,
            }),
            &frame,
        );
        assert_eq!(spots.point_scale, 2.0);
        assert_eq!(spots.viewport, [640.0, 480.0]);
        assert_eq!(spots.view_proj, frame.view_proj().to_cols_array_2d());

        let outline = Uniforms::for_command(
            &DrawCommand::Outlines(OutlineParams {
                region: 0,
                vertex_count: 4,
                color: [0.2, 0.2, 0.2],
                width: 1.5,
            }),
            &frame,
        );
        assert_eq!(outline.color, [0.2, 0.2, 0.2, 1.0]);
        assert_eq!(outline.line_width, 1.5);
    }
}
