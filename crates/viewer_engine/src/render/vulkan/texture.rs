//! Device-local images, sampled textures and samplers

use ash::{vk, Device};

use crate::assets::ImageData;
use crate::render::vulkan::buffer::{allocate, Buffer};
use crate::render::vulkan::{GpuContext, VulkanError, VulkanResult};

/// Device-local 2D image with one view
pub struct GpuImage {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
    extent: vk::Extent2D,
    format: vk::Format,
}

impl GpuImage {
    /// Create a single-mip image and its view
    pub fn new(
        gpu: GpuContext<'_>,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        aspect_mask: vk::ImageAspectFlags,
    ) -> VulkanResult<Self> {
        let device = gpu.device.clone();
        let image_create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe {
            device
                .create_image(&image_create_info, None)
                .map_err(VulkanError::Api)?
        };

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory = match allocate(
            &device,
            gpu.memory_properties,
            requirements,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };

        let view_create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(subresource_range(aspect_mask));

        let view = unsafe {
            device
                .bind_image_memory(image, memory, 0)
                .and_then(|()| device.create_image_view(&view_create_info, None))
        };
        let view = match view {
            Ok(view) => view,
            Err(e) => {
                unsafe {
                    device.destroy_image(image, None);
                    device.free_memory(memory, None);
                }
                return Err(VulkanError::Api(e));
            }
        };

        Ok(Self {
            device,
            image,
            memory,
            view,
            extent,
            format,
        })
    }

    /// Image handle
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// View over the whole image
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Size in pixels
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Pixel format
    pub fn format(&self) -> vk::Format {
        self.format
    }
}

impl Drop for GpuImage {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image_view(self.view, None);
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Sampled RGBA8 texture in SHADER_READ_ONLY_OPTIMAL layout
pub struct Texture {
    image: GpuImage,
}

impl Texture {
    /// Upload decoded RGBA8 pixels through a staging buffer
    ///
    /// Colour textures use an sRGB `format`; data textures (specular masks,
    /// normal maps) use UNORM.
    pub fn from_image(gpu: GpuContext<'_>, pixels: &ImageData, format: vk::Format) -> VulkanResult<Self> {
        let expected = pixels.width as usize * pixels.height as usize * 4;
        if pixels.width == 0 || pixels.height == 0 || pixels.data.len() != expected {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "Texture {}x{} has {} bytes, expected {}",
                    pixels.width,
                    pixels.height,
                    pixels.data.len(),
                    expected
                ),
            });
        }

        let extent = vk::Extent2D {
            width: pixels.width,
            height: pixels.height,
        };
        let image = GpuImage::new(
            gpu,
            extent,
            format,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            vk::ImageAspectFlags::COLOR,
        )?;
        let staging = Buffer::with_data(gpu, vk::BufferUsageFlags::TRANSFER_SRC, &pixels.data)?;

        let to_transfer = vk::ImageMemoryBarrier::builder()
            .old_layout(vk::ImageLayout::UNDEFINED)
            .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image.handle())
            .subresource_range(subresource_range(vk::ImageAspectFlags::COLOR))
            .src_access_mask(vk::AccessFlags::empty())
            .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .build();
        let to_shader_read = vk::ImageMemoryBarrier::builder()
            .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image.handle())
            .subresource_range(subresource_range(vk::ImageAspectFlags::COLOR))
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::SHADER_READ)
            .build();

        gpu.command_pool.one_time_submit(gpu.graphics_queue, |recorder| {
            recorder.cmd_image_barrier(
                &to_transfer,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
            );
            recorder.cmd_copy_buffer_to_image(
                staging.handle(),
                image.handle(),
                vk::Extent3D {
                    width: extent.width,
                    height: extent.height,
                    depth: 1,
                },
            );
            recorder.cmd_image_barrier(
                &to_shader_read,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
            );
        })?;

        log::debug!(
            "Uploaded {}x{} texture ({:?})",
            extent.width,
            extent.height,
            format
        );

        Ok(Self { image })
    }

    /// 1x1 texture of a single colour
    pub fn solid_color(gpu: GpuContext<'_>, color: [u8; 4], format: vk::Format) -> VulkanResult<Self> {
        Self::from_image(gpu, &ImageData::solid_color(1, 1, color), format)
    }

    /// Image view for descriptor writes
    pub fn view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Size in pixels
    pub fn extent(&self) -> vk::Extent2D {
        self.image.extent()
    }
}

/// Linear, repeating sampler shared by every material texture
pub struct Sampler {
    device: Device,
    sampler: vk::Sampler,
}

impl Sampler {
    /// Create the material sampler
    pub fn new(gpu: GpuContext<'_>) -> VulkanResult<Self> {
        let device = gpu.device.clone();
        let sampler_create_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(false)
            .max_anisotropy(1.0)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR);

        let sampler = unsafe {
            device
                .create_sampler(&sampler_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, sampler })
    }

    /// Sampler handle
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}

fn subresource_range(aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}
