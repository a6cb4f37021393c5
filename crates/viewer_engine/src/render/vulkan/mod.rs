//! Vulkan rendering backend
//!
//! RAII wrappers over `ash` plus the [`Renderer`] that drives the swapchain.
//! Everything above this module talks to the GPU through [`GpuContext`] and
//! [`Frame`].

pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor_set;
pub mod frame;
pub mod framebuffer;
pub mod pipeline;
pub mod render_pass;
pub mod renderer;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod vertex_layout;

pub use buffer::{Buffer, IndexBuffer, UniformBuffer, VertexBuffer};
pub use commands::{ActiveRenderPass, CommandPool, CommandRecorder};
pub use context::{LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult};
pub use descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorSetWriter};
pub use frame::Frame;
pub use framebuffer::{DepthBuffer, Framebuffer};
pub use pipeline::{GraphicsPipeline, ShaderModule};
pub use render_pass::RenderPass;
pub use renderer::{FrameOutcome, GpuContext, Renderer};
pub use swapchain::Swapchain;
pub use sync::{Fence, FrameSync, Semaphore};
pub use texture::{GpuImage, Sampler, Texture};
pub use vertex_layout::VulkanVertexLayout;
