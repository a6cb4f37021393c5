//! Vulkan vertex input state derived from the mesh vertex layout

use ash::vk;

use crate::render::mesh::{Vertex, VertexAttribute, VERTEX_ATTRIBUTES};

/// Vulkan vertex layout for the engine's [`Vertex`]
pub struct VulkanVertexLayout;

impl VulkanVertexLayout {
    /// Single interleaved binding advancing per vertex
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// One description per entry of [`VERTEX_ATTRIBUTES`]
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        VERTEX_ATTRIBUTES.map(|attribute| vk::VertexInputAttributeDescription {
            binding: 0,
            location: attribute.location,
            format: Self::format(attribute),
            offset: attribute.offset,
        })
    }

    fn format(attribute: VertexAttribute) -> vk::Format {
        match attribute.components {
            1 => vk::Format::R32_SFLOAT,
            2 => vk::Format::R32G32_SFLOAT,
            3 => vk::Format::R32G32B32_SFLOAT,
            _ => vk::Format::R32G32B32A32_SFLOAT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_formats_match_vertex_fields() {
        let attributes = VulkanVertexLayout::attribute_descriptions();
        assert_eq!(attributes[0].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attributes[1].offset, 12);
        assert_eq!(attributes[2].format, vk::Format::R32G32_SFLOAT);
        assert_eq!(VulkanVertexLayout::binding_description().stride, 32);
    }
}
