use wgpu::{BindGroupLayout, Device, RenderPass, RenderPipeline, ShaderModule, TextureFormat};

use super::Vertex;

/// The visualizer's one render pipeline: colored triangles in pixel space,
/// alpha-blended over the cleared background.
pub struct MeshPipeline {
    pipeline: RenderPipeline,
}

impl MeshPipeline {
    pub fn new(device: &Device, format: TextureFormat, uniforms: &BindGroupLayout) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/mesh.wgsl").into()),
        });
        Self {
            pipeline: Self::build(device, &module, format, uniforms),
        }
    }

    // Culling stays off: tessellated shapes are emitted with mixed winding.
    fn build(
        device: &Device,
        module: &ShaderModule,
        format: TextureFormat,
        uniforms: &BindGroupLayout,
    ) -> RenderPipeline {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[uniforms],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: "vs_main",
                buffers: &[Vertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })
    }

    pub fn draw<'a>(
        &'a self,
        pass: &mut RenderPass<'a>,
        uniforms: &'a wgpu::BindGroup,
        vertices: &'a wgpu::Buffer,
        count: u32,
    ) {
        if count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, uniforms, &[]);
        pass.set_vertex_buffer(0, vertices.slice(..));
        pass.draw(0..count, 0..1);
    }
}
