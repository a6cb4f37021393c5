//! Swapchain-driven frame loop: acquire, record, submit, present
//!
//! The renderer owns everything tied to the surface (swapchain, depth buffer,
//! framebuffers) and the per-frame synchronization. Draw code never sees raw
//! command buffers: it records through [`Frame`] inside [`Renderer::render_frame`].

use ash::vk;

use crate::config::RendererConfig;
use crate::render::vulkan::commands::{CommandPool, CommandRecorder};
use crate::render::vulkan::descriptor_set::DescriptorSetLayout;
use crate::render::vulkan::frame::Frame;
use crate::render::vulkan::framebuffer::{DepthBuffer, Framebuffer};
use crate::render::vulkan::render_pass::RenderPass;
use crate::render::vulkan::swapchain::Swapchain;
use crate::render::vulkan::sync::{FrameSync, Semaphore};
use crate::render::vulkan::{VulkanContext, VulkanError, VulkanResult};
use crate::render::window::Window;

/// Borrowed device handles needed to create GPU resources
///
/// Obtained from [`Renderer::gpu`] and passed by value to constructors.
#[derive(Clone, Copy)]
pub struct GpuContext<'a> {
    pub(crate) device: &'a ash::Device,
    pub(crate) memory_properties: &'a vk::PhysicalDeviceMemoryProperties,
    pub(crate) command_pool: &'a CommandPool,
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) frame_layout: vk::DescriptorSetLayout,
    pub(crate) material_layout: vk::DescriptorSetLayout,
    pub(crate) frames_in_flight: usize,
}

/// What happened to a requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was recorded, submitted and queued for presentation
    Presented,
    /// Nothing was drawn (minimised window or a swapchain being rebuilt)
    Skipped,
}

struct FrameSlot {
    sync: FrameSync,
    command_buffer: vk::CommandBuffer,
}

/// Forward renderer over one window surface
pub struct Renderer {
    // Field order is drop order: surface-dependent objects before the context
    frames: Vec<FrameSlot>,
    // Indexed by swapchain image: presentation may still hold one after its fence signals
    present_semaphores: Vec<Semaphore>,
    framebuffers: Vec<Framebuffer>,
    depth_buffer: DepthBuffer,
    swapchain: Swapchain,
    frame_layout: DescriptorSetLayout,
    material_layout: DescriptorSetLayout,
    render_pass: RenderPass,
    command_pool: CommandPool,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    context: VulkanContext,
    current_frame: usize,
    pending_extent: Option<vk::Extent2D>,
    clear_color: [f32; 4],
}

impl Renderer {
    /// Bring up Vulkan on `window` and build the swapchain resources
    pub fn new(window: &mut Window, config: &RendererConfig, app_name: &str) -> VulkanResult<Self> {
        let context = VulkanContext::new(window, app_name, config.validation_enabled())?;
        let device = context.raw_device().clone();
        let memory_properties = unsafe {
            context
                .instance()
                .get_physical_device_memory_properties(context.physical_device.device)
        };

        let (width, height) = window.framebuffer_size();
        let swapchain = Swapchain::new(&context, vk::Extent2D { width, height }, vk::SwapchainKHR::null())?;
        let render_pass = RenderPass::new_forward_pass(device.clone(), swapchain.format().format)?;
        let command_pool = CommandPool::new(device.clone(), context.graphics_queue_family())?;
        let frame_layout = DescriptorSetLayout::frame_uniforms(&device)?;
        let material_layout = DescriptorSetLayout::material(&device)?;

        let frames_in_flight = config.max_frames_in_flight.max(1);
        let command_buffers = command_pool.allocate_command_buffers(frames_in_flight as u32)?;
        let frames = command_buffers
            .into_iter()
            .map(|command_buffer| {
                Ok(FrameSlot {
                    sync: FrameSync::new(device.clone())?,
                    command_buffer,
                })
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        let gpu = gpu_context(
            &context,
            &memory_properties,
            &command_pool,
            &render_pass,
            &frame_layout,
            &material_layout,
            frames_in_flight,
        );
        let depth_buffer = DepthBuffer::new(gpu, swapchain.extent())?;
        let framebuffers = create_framebuffers(&device, &render_pass, &swapchain, &depth_buffer)?;
        let present_semaphores = create_present_semaphores(&device, &swapchain)?;

        let [r, g, b] = config.clear_color;
        log::info!(
            "Renderer ready: {}x{}, {} frames in flight",
            swapchain.extent().width,
            swapchain.extent().height,
            frames_in_flight
        );

        Ok(Self {
            frames,
            present_semaphores,
            framebuffers,
            depth_buffer,
            swapchain,
            frame_layout,
            material_layout,
            render_pass,
            command_pool,
            memory_properties,
            context,
            current_frame: 0,
            pending_extent: None,
            clear_color: [r, g, b, 1.0],
        })
    }

    /// Device handles for resource creation
    pub fn gpu(&self) -> GpuContext<'_> {
        gpu_context(
            &self.context,
            &self.memory_properties,
            &self.command_pool,
            &self.render_pass,
            &self.frame_layout,
            &self.material_layout,
            self.frames.len(),
        )
    }

    /// Number of frames that may be in flight at once
    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    /// Current swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    /// Schedule swapchain recreation for a new framebuffer size
    pub fn resize(&mut self, width: u32, height: u32) {
        self.pending_extent = Some(vk::Extent2D { width, height });
    }

    /// Record and present one frame
    ///
    /// `record` runs inside the render pass with viewport and scissor set.
    /// Host writes to per-frame resources inside `record` are safe: the frame
    /// slot's fence has been waited on before it runs.
    pub fn render_frame<F>(&mut self, record: F) -> VulkanResult<FrameOutcome>
    where
        F: FnOnce(&mut Frame<'_>),
    {
        if let Some(extent) = self.pending_extent {
            if extent.width == 0 || extent.height == 0 {
                return Ok(FrameOutcome::Skipped);
            }
            self.recreate_swapchain(extent)?;
            self.pending_extent = None;
        }

        let slot = &self.frames[self.current_frame];
        slot.sync.in_flight.wait(u64::MAX)?;

        let acquired = unsafe {
            self.swapchain.loader().acquire_next_image(
                self.swapchain.handle(),
                u64::MAX,
                slot.sync.image_available.handle(),
                vk::Fence::null(),
            )
        };
        let image_index = match acquired {
            Ok((index, _suboptimal)) => index,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.pending_extent = Some(self.swapchain.extent());
                return Ok(FrameOutcome::Skipped);
            }
            Err(e) => return Err(VulkanError::Api(e)),
        };

        let framebuffer = per_image(&self.framebuffers, image_index)?.handle();
        let render_finished = per_image(&self.present_semaphores, image_index)?.handle();

        // Only reset once work is guaranteed to be submitted this frame
        slot.sync.in_flight.reset()?;

        let device = self.context.raw_device();
        let extent = self.swapchain.extent();
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };

        let mut recorder = CommandRecorder::new(slot.command_buffer, device.clone());
        recorder.begin()?;
        {
            let pass = recorder.begin_render_pass(
                self.render_pass.handle(),
                framebuffer,
                render_area,
                &clear_values,
            )?;
            let mut frame = Frame::new(pass, self.current_frame, extent);
            record(&mut frame);
        }
        let command_buffers = [recorder.end()?];

        let wait_semaphores = [slot.sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [render_finished];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            device
                .queue_submit(
                    self.context.graphics_queue(),
                    &[submit_info.build()],
                    slot.sync.in_flight.handle(),
                )
                .map_err(VulkanError::Api)?;
        }

        let swapchains = [self.swapchain.handle()];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let presented = unsafe {
            self.swapchain
                .loader()
                .queue_present(self.context.present_queue(), &present_info)
        };
        match presented {
            Ok(false) => {}
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                if self.pending_extent.is_none() {
                    self.pending_extent = Some(extent);
                }
            }
            Err(e) => return Err(VulkanError::Api(e)),
        }

        self.current_frame = (self.current_frame + 1) % self.frames.len();
        Ok(FrameOutcome::Presented)
    }

    /// Block until the GPU finished all submitted work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe {
            self.context
                .raw_device()
                .device_wait_idle()
                .map_err(VulkanError::Api)
        }
    }

    fn recreate_swapchain(&mut self, extent: vk::Extent2D) -> VulkanResult<()> {
        self.wait_idle()?;
        self.framebuffers.clear();
        self.present_semaphores.clear();

        let swapchain = Swapchain::new(&self.context, extent, self.swapchain.handle())?;
        self.swapchain = swapchain;

        let gpu = gpu_context(
            &self.context,
            &self.memory_properties,
            &self.command_pool,
            &self.render_pass,
            &self.frame_layout,
            &self.material_layout,
            self.frames.len(),
        );
        self.depth_buffer = DepthBuffer::new(gpu, self.swapchain.extent())?;
        self.framebuffers = create_framebuffers(
            self.context.raw_device(),
            &self.render_pass,
            &self.swapchain,
            &self.depth_buffer,
        )?;
        self.present_semaphores = create_present_semaphores(self.context.raw_device(), &self.swapchain)?;

        log::info!(
            "Swapchain recreated at {}x{}",
            self.swapchain.extent().width,
            self.swapchain.extent().height
        );
        Ok(())
    }
}

fn gpu_context<'a>(
    context: &'a VulkanContext,
    memory_properties: &'a vk::PhysicalDeviceMemoryProperties,
    command_pool: &'a CommandPool,
    render_pass: &RenderPass,
    frame_layout: &DescriptorSetLayout,
    material_layout: &DescriptorSetLayout,
    frames_in_flight: usize,
) -> GpuContext<'a> {
    GpuContext {
        device: context.raw_device(),
        memory_properties,
        command_pool,
        graphics_queue: context.graphics_queue(),
        render_pass: render_pass.handle(),
        frame_layout: frame_layout.handle(),
        material_layout: material_layout.handle(),
        frames_in_flight,
    }
}

fn create_framebuffers(
    device: &ash::Device,
    render_pass: &RenderPass,
    swapchain: &Swapchain,
    depth_buffer: &DepthBuffer,
) -> VulkanResult<Vec<Framebuffer>> {
    swapchain
        .image_views()
        .iter()
        .map(|&view| {
            Framebuffer::new(
                device.clone(),
                render_pass.handle(),
                &[view, depth_buffer.image_view()],
                swapchain.extent(),
            )
        })
        .collect()
}

fn create_present_semaphores(device: &ash::Device, swapchain: &Swapchain) -> VulkanResult<Vec<Semaphore>> {
    (0..swapchain.image_views().len())
        .map(|_| Semaphore::new(device.clone()))
        .collect()
}

/// Look up the resource belonging to an acquired swapchain image
fn per_image<T>(items: &[T], image_index: u32) -> VulkanResult<&T> {
    items
        .get(image_index as usize)
        .ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("Swapchain returned unknown image {image_index} ({} known)", items.len()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_image_follows_the_image_index() {
        let semaphores = ["image0", "image1", "image2"];

        assert_eq!(*per_image(&semaphores, 0).unwrap(), "image0");
        assert_eq!(*per_image(&semaphores, 2).unwrap(), "image2");
    }

    #[test]
    fn test_per_image_rejects_unknown_image() {
        let semaphores = [1u32, 2];

        let err = per_image(&semaphores, 2).unwrap_err();
        assert!(matches!(err, VulkanError::InvalidOperation { .. }));
        assert!(err.to_string().contains("unknown image 2"));
    }
}
