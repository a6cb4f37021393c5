//! Descriptor set layouts, pools and batched writes
//!
//! Two set layouts exist: set 0 carries the per-frame uniform block and set 1
//! carries one material (three role-indexed textures plus a sampler).

use ash::{vk, Device};

use crate::render::material::{TextureRole, FRAME_UNIFORM_BINDING, SAMPLER_BINDING};
use crate::render::vulkan::{VulkanError, VulkanResult};

/// Descriptor set layout builder for creating reusable layouts
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Create a new descriptor set layout builder
    pub fn new() -> Self {
        Self::default()
    }

    fn add(mut self, binding: u32, ty: vk::DescriptorType, stage_flags: vk::ShaderStageFlags) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(ty)
                .descriptor_count(1)
                .stage_flags(stage_flags)
                .build(),
        );
        self
    }

    /// Add a uniform buffer binding
    pub fn add_uniform_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::UNIFORM_BUFFER, stage_flags)
    }

    /// Add a sampled image binding (sampled through a separate sampler)
    pub fn add_sampled_image(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::SAMPLED_IMAGE, stage_flags)
    }

    /// Add a sampler binding
    pub fn add_sampler(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::SAMPLER, stage_flags)
    }

    /// Build the descriptor set layout
    pub fn build(self, device: &Device) -> VulkanResult<DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&self.bindings);

        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None) }
            .map_err(VulkanError::Api)?;

        Ok(DescriptorSetLayout {
            layout,
            device: device.clone(),
            bindings: self.bindings,
        })
    }
}

/// Descriptor set layout wrapper with automatic cleanup
pub struct DescriptorSetLayout {
    layout: vk::DescriptorSetLayout,
    device: Device,
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayout {
    /// Set 0: the frame uniform block, visible to both stages
    pub fn frame_uniforms(device: &Device) -> VulkanResult<Self> {
        DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(
                FRAME_UNIFORM_BINDING,
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
            )
            .build(device)
    }

    /// Set 1: one sampled image per texture role plus the shared sampler
    pub fn material(device: &Device) -> VulkanResult<Self> {
        TextureRole::ALL
            .iter()
            .fold(DescriptorSetLayoutBuilder::new(), |builder, role| {
                builder.add_sampled_image(role.binding(), vk::ShaderStageFlags::FRAGMENT)
            })
            .add_sampler(SAMPLER_BINDING, vk::ShaderStageFlags::FRAGMENT)
            .build(device)
    }

    /// Get the Vulkan descriptor set layout handle
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// Get the bindings used in this layout
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding] {
        &self.bindings
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Descriptor pool for allocating descriptor sets
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    device: Device,
}

impl DescriptorPool {
    /// Create a pool for `max_sets` sets drawing from `pool_sizes`
    pub fn new(device: Device, max_sets: u32, pool_sizes: &[vk::DescriptorPoolSize]) -> VulkanResult<Self> {
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets.max(1))
            .pool_sizes(pool_sizes);

        let pool = unsafe { device.create_descriptor_pool(&pool_info, None) }
            .map_err(VulkanError::Api)?;

        Ok(Self { pool, device })
    }

    /// Pool sized for `count` material sets
    pub fn for_materials(device: Device, count: u32) -> VulkanResult<Self> {
        let count = count.max(1);
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::SAMPLED_IMAGE,
                descriptor_count: count * TextureRole::ALL.len() as u32,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::SAMPLER,
                descriptor_count: count,
            },
        ];
        Self::new(device, count, &pool_sizes)
    }

    /// Pool sized for `count` frame uniform sets
    pub fn for_frame_uniforms(device: Device, count: u32) -> VulkanResult<Self> {
        let count = count.max(1);
        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: count,
        }];
        Self::new(device, count, &pool_sizes)
    }

    /// Allocate one set per entry of `layouts`
    pub fn allocate_descriptor_sets(
        &self,
        layouts: &[vk::DescriptorSetLayout],
    ) -> VulkanResult<Vec<vk::DescriptorSet>> {
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);

        unsafe { self.device.allocate_descriptor_sets(&alloc_info) }.map_err(VulkanError::Api)
    }

    /// Get the pool handle
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

struct BufferWrite {
    set: vk::DescriptorSet,
    binding: u32,
    info: vk::DescriptorBufferInfo,
}

struct ImageWrite {
    set: vk::DescriptorSet,
    binding: u32,
    ty: vk::DescriptorType,
    info: vk::DescriptorImageInfo,
}

/// Collects descriptor writes and submits them in one update
///
/// Infos are stored first and the `WriteDescriptorSet` array is built only in
/// [`update`](Self::update), so the info pointers stay valid.
#[derive(Default)]
pub struct DescriptorSetWriter {
    buffers: Vec<BufferWrite>,
    images: Vec<ImageWrite>,
}

impl DescriptorSetWriter {
    /// Create a new descriptor set writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a whole uniform buffer to `binding`
    pub fn write_uniform_buffer(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        buffer: vk::Buffer,
        range: vk::DeviceSize,
    ) -> Self {
        self.buffers.push(BufferWrite {
            set,
            binding,
            info: vk::DescriptorBufferInfo {
                buffer,
                offset: 0,
                range,
            },
        });
        self
    }

    /// Write a shader-readable image view to `binding`
    pub fn write_sampled_image(mut self, set: vk::DescriptorSet, binding: u32, view: vk::ImageView) -> Self {
        self.images.push(ImageWrite {
            set,
            binding,
            ty: vk::DescriptorType::SAMPLED_IMAGE,
            info: vk::DescriptorImageInfo {
                sampler: vk::Sampler::null(),
                image_view: view,
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            },
        });
        self
    }

    /// Write a sampler to `binding`
    pub fn write_sampler(mut self, set: vk::DescriptorSet, binding: u32, sampler: vk::Sampler) -> Self {
        self.images.push(ImageWrite {
            set,
            binding,
            ty: vk::DescriptorType::SAMPLER,
            info: vk::DescriptorImageInfo {
                sampler,
                image_view: vk::ImageView::null(),
                image_layout: vk::ImageLayout::UNDEFINED,
            },
        });
        self
    }

    /// Number of queued writes
    pub fn len(&self) -> usize {
        self.buffers.len() + self.images.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Execute all write operations
    pub fn update(self, device: &Device) {
        let buffer_writes = self.buffers.iter().map(|write| {
            vk::WriteDescriptorSet::builder()
                .dst_set(write.set)
                .dst_binding(write.binding)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(std::slice::from_ref(&write.info))
                .build()
        });
        let image_writes = self.images.iter().map(|write| {
            vk::WriteDescriptorSet::builder()
                .dst_set(write.set)
                .dst_binding(write.binding)
                .descriptor_type(write.ty)
                .image_info(std::slice::from_ref(&write.info))
                .build()
        });
        let writes: Vec<vk::WriteDescriptorSet> = buffer_writes.chain(image_writes).collect();

        unsafe {
            device.update_descriptor_sets(&writes, &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_queues_every_write() {
        let writer = DescriptorSetWriter::new()
            .write_uniform_buffer(vk::DescriptorSet::null(), 0, vk::Buffer::null(), 320)
            .write_sampled_image(vk::DescriptorSet::null(), 1, vk::ImageView::null())
            .write_sampler(vk::DescriptorSet::null(), SAMPLER_BINDING, vk::Sampler::null());
        assert_eq!(writer.len(), 3);
        assert!(DescriptorSetWriter::new().is_empty());
    }
}
