//! Vulkan rendering backend
//!
//! Headless `ash` implementation of the device seam: context, RAII buffers,
//! one-shot command submission, draw recording, the transform descriptor
//! binding and vertex input layouts.
//!
//! The context, buffers and command pool back [`ModelRepository`] uploads
//! and flushes. Pipeline and render pass creation stay with the caller, so
//! the draw side is exposed for consumers that own a pipeline:
//!
//! ```rust,ignore
//! let binding = TransformBinding::new(device.clone(), 0, &repository.descriptor_info())?;
//! // Build the pipeline layout from `binding.layout()` and the vertex input
//! // state from `vertex_layout::binding_description::<ColoredVertex>()` and
//! // `vertex_layout::attribute_descriptions::<ColoredVertex>()`.
//!
//! // Inside a render pass with that pipeline bound:
//! let mut recorder =
//!     VulkanDrawRecorder::new(&device, command_buffer, pipeline_layout, binding.set(), 0);
//! repository.draw(&mut recorder);
//! ```
//!
//! [`ModelRepository`]: crate::render::instancing::ModelRepository

pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor;
pub mod vertex_layout;

pub use buffer::Buffer;
pub use commands::{CommandPool, VulkanDrawRecorder};
pub use context::{
    LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult,
};
pub use descriptor::TransformBinding;
