//! Vulkan-specific vertex layout definitions
//!
//! Translates the backend-agnostic attribute lists on
//! [`MeshVertex`](crate::render::vertex::MeshVertex) into vertex input state
//! for pipelines built by the caller.

use crate::render::vertex::{MeshVertex, VertexFormat};
use ash::vk;

/// Vulkan format for a vertex attribute format
pub const fn vk_format(format: VertexFormat) -> vk::Format {
    match format {
        VertexFormat::Float2 => vk::Format::R32G32_SFLOAT,
        VertexFormat::Float3 => vk::Format::R32G32B32_SFLOAT,
        VertexFormat::Float4 => vk::Format::R32G32B32A32_SFLOAT,
    }
}

/// Per-vertex binding description for `V` at binding 0
pub fn binding_description<V: MeshVertex>() -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription {
        binding: 0,
        stride: V::stride(),
        input_rate: vk::VertexInputRate::VERTEX,
    }
}

/// Attribute descriptions for `V` at binding 0
pub fn attribute_descriptions<V: MeshVertex>() -> Vec<vk::VertexInputAttributeDescription> {
    V::ATTRIBUTES
        .iter()
        .map(|attribute| vk::VertexInputAttributeDescription {
            location: attribute.location,
            binding: 0,
            format: vk_format(attribute.format),
            offset: attribute.offset,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::vertex::{ColoredVertex, TexturedVertex};

    #[test]
    fn test_textured_layout() {
        let binding = binding_description::<TexturedVertex>();
        assert_eq!(binding.stride, 48);

        let attributes = attribute_descriptions::<TexturedVertex>();
        assert_eq!(attributes.len(), 4);
        assert_eq!(attributes[2].format, vk::Format::R32G32B32A32_SFLOAT);
        assert_eq!(attributes[3].offset, 40);
        assert_eq!(attributes[3].format, vk::Format::R32G32_SFLOAT);
    }

    #[test]
    fn test_colored_layout_has_no_tex_coord() {
        let attributes = attribute_descriptions::<ColoredVertex>();
        assert_eq!(attributes.len(), 3);
        assert!(attributes.iter().all(|attribute| attribute.format != vk::Format::R32G32_SFLOAT));
    }
}
