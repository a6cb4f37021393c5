//! The per-frame recording surface handed to draw code

use ash::vk;

use crate::render::model::DrawTarget;
use crate::render::vulkan::commands::ActiveRenderPass;

/// One frame being recorded inside the forward render pass
///
/// Viewport and scissor already cover the whole swapchain image. A pipeline
/// must be bound (through `ShaderProgram::activate`) before anything that
/// binds descriptor sets or draws.
pub struct Frame<'a> {
    pass: ActiveRenderPass<'a>,
    index: usize,
    extent: vk::Extent2D,
    bound_layout: Option<vk::PipelineLayout>,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(mut pass: ActiveRenderPass<'a>, index: usize, extent: vk::Extent2D) -> Self {
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        pass.set_viewport(&viewport);
        pass.set_scissor(&scissor);

        Self {
            pass,
            index,
            extent,
            bound_layout: None,
        }
    }

    /// Frame-in-flight slot, in `0..frames_in_flight`
    pub fn index(&self) -> usize {
        self.index
    }

    /// Render target size in pixels
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Width over height of the render target
    pub fn aspect_ratio(&self) -> f32 {
        if self.extent.height == 0 {
            1.0
        } else {
            self.extent.width as f32 / self.extent.height as f32
        }
    }

    pub(crate) fn bind_pipeline(&mut self, pipeline: vk::Pipeline, layout: vk::PipelineLayout) {
        self.pass.cmd_bind_pipeline(pipeline);
        self.bound_layout = Some(layout);
    }

    pub(crate) fn bind_descriptor_set(&mut self, set_index: u32, set: vk::DescriptorSet) {
        match self.bound_layout {
            Some(layout) => self.pass.cmd_bind_descriptor_set(layout, set_index, set),
            None => log::error!("Descriptor set {} bound before any pipeline", set_index),
        }
    }
}

impl DrawTarget for Frame<'_> {
    fn bind_material(&mut self, material: vk::DescriptorSet) {
        self.bind_descriptor_set(crate::render::material::MATERIAL_SET, material);
    }

    fn bind_geometry(&mut self, vertex_buffer: vk::Buffer, index_buffer: vk::Buffer) {
        self.pass.cmd_bind_vertex_buffer(vertex_buffer);
        self.pass.cmd_bind_index_buffer(index_buffer);
    }

    fn draw_indexed(&mut self, index_count: u32) {
        if self.bound_layout.is_none() {
            log::error!("Draw of {} indices skipped: no pipeline bound", index_count);
            return;
        }
        self.pass.cmd_draw_indexed(index_count);
    }
}
