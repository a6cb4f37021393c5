//! Host-visible buffers for geometry and per-frame uniforms

use ash::{vk, Device};
use bytemuck::Pod;

use crate::render::vulkan::{GpuContext, VulkanError, VulkanResult};

/// Buffer wrapper with its own memory allocation
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a buffer and bind fresh memory with `properties`
    ///
    /// Zero-sized requests are rounded up to one byte; Vulkan rejects empty buffers.
    pub fn new(
        gpu: GpuContext<'_>,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let device = gpu.device.clone();
        let size = size.max(1);
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device
                .create_buffer(&buffer_info, None)
                .map_err(VulkanError::Api)?
        };

        let mem_requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory = match allocate(
            &device,
            gpu.memory_properties,
            mem_requirements,
            properties,
        ) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        if let Err(e) = unsafe { device.bind_buffer_memory(buffer, memory, 0) } {
            unsafe {
                device.destroy_buffer(buffer, None);
                device.free_memory(memory, None);
            }
            return Err(VulkanError::Api(e));
        }

        Ok(Self {
            device,
            buffer,
            memory,
            size,
        })
    }

    /// Host-visible buffer initialised with `data`
    pub fn with_data<T: Pod>(
        gpu: GpuContext<'_>,
        usage: vk::BufferUsageFlags,
        data: &[T],
    ) -> VulkanResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let buffer = Self::new(
            gpu,
            bytes.len() as vk::DeviceSize,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        buffer.write_bytes(bytes)?;
        Ok(buffer)
    }

    /// Copy `bytes` to the start of the buffer
    pub fn write_bytes(&self, bytes: &[u8]) -> VulkanResult<()> {
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("{} bytes do not fit a {} byte buffer", bytes.len(), self.size),
            });
        }
        if bytes.is_empty() {
            return Ok(());
        }

        unsafe {
            let ptr = self
                .device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
            self.device.unmap_memory(self.memory);
        }
        Ok(())
    }

    /// Buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Allocated size in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Vertex buffer for one sub-mesh
pub struct VertexBuffer {
    buffer: Buffer,
    vertex_count: u32,
}

impl VertexBuffer {
    /// Upload `vertices`
    pub fn new<T: Pod>(gpu: GpuContext<'_>, vertices: &[T]) -> VulkanResult<Self> {
        let buffer = Buffer::with_data(gpu, vk::BufferUsageFlags::VERTEX_BUFFER, vertices)?;
        Ok(Self {
            buffer,
            vertex_count: vertices.len() as u32,
        })
    }

    /// Buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Number of vertices uploaded
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

/// 32-bit index buffer for one sub-mesh
pub struct IndexBuffer {
    buffer: Buffer,
    index_count: u32,
}

impl IndexBuffer {
    /// Upload `indices`
    pub fn new(gpu: GpuContext<'_>, indices: &[u32]) -> VulkanResult<Self> {
        let buffer = Buffer::with_data(gpu, vk::BufferUsageFlags::INDEX_BUFFER, indices)?;
        Ok(Self {
            buffer,
            index_count: indices.len() as u32,
        })
    }

    /// Buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Number of indices uploaded
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// Uniform buffer that stays mapped for its whole life
///
/// The memory is HOST_COHERENT, so writes need no flush. Callers must only
/// write once the frame that last read the buffer has signalled its fence.
pub struct UniformBuffer {
    buffer: Buffer,
    mapped: *mut u8,
}

impl UniformBuffer {
    /// Allocate and map `size` bytes
    pub fn new(gpu: GpuContext<'_>, size: vk::DeviceSize) -> VulkanResult<Self> {
        let buffer = Buffer::new(
            gpu,
            size,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        let mapped = unsafe {
            buffer
                .device
                .map_memory(buffer.memory, 0, buffer.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?
        };

        Ok(Self {
            buffer,
            mapped: mapped.cast::<u8>(),
        })
    }

    /// Copy `bytes` at `offset`
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> VulkanResult<()> {
        let end = offset.checked_add(bytes.len());
        if end.map_or(true, |end| end as vk::DeviceSize > self.buffer.size) {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "Uniform write of {} bytes at offset {} overruns {} byte buffer",
                    bytes.len(),
                    offset,
                    self.buffer.size
                ),
            });
        }

        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.mapped.add(offset), bytes.len());
        }
        Ok(())
    }

    /// Buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Size in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.buffer.size()
    }
}

impl Drop for UniformBuffer {
    fn drop(&mut self) {
        unsafe {
            self.buffer.device.unmap_memory(self.buffer.memory);
        }
    }
}

/// Allocate memory satisfying `requirements` with `properties`
pub(crate) fn allocate(
    device: &Device,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    requirements: vk::MemoryRequirements,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<vk::DeviceMemory> {
    let memory_type_index =
        find_memory_type(memory_properties, requirements.memory_type_bits, properties)?;
    let alloc_info = vk::MemoryAllocateInfo::builder()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type_index);

    unsafe {
        device
            .allocate_memory(&alloc_info, None)
            .map_err(VulkanError::Api)
    }
}

/// Find memory type with required properties
pub(crate) fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    (0..memory_properties.memory_type_count)
        .find(|&i| {
            (type_filter & (1 << i)) != 0
                && memory_properties.memory_types[i as usize]
                    .property_flags
                    .contains(properties)
        })
        .ok_or(VulkanError::NoSuitableMemoryType)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties::default();
        props.memory_type_count = flags.len() as u32;
        for (i, &flag) in flags.iter().enumerate() {
            props.memory_types[i].property_flags = flag;
        }
        props
    }

    #[test]
    fn test_find_memory_type_respects_filter_and_flags() {
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        let props = properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL, host, host]);

        assert_eq!(find_memory_type(&props, 0b111, host).unwrap(), 1);
        assert_eq!(find_memory_type(&props, 0b100, host).unwrap(), 2);
        assert!(matches!(
            find_memory_type(&props, 0b001, host),
            Err(VulkanError::NoSuitableMemoryType)
        ));
    }
}
