//! Rendering
//!
//! The backend-agnostic device seam and vertex types, the instancing
//! subsystem built on them, and the Vulkan and GLFW implementations.

pub mod device;
pub mod draw_stats;
pub mod instancing;
pub mod vertex;
pub mod vulkan;
pub mod window;

pub use device::{BufferCopy, BufferUsage, DrawRecorder, GpuDevice, MemoryLocation};
pub use draw_stats::DrawStats;
pub use vertex::{
    ColoredVertex, ImportedVertex, MeshVertex, TexturedVertex, VertexAttribute, VertexFormat,
};
pub use window::{Window, WindowError, WindowResult};
