//! Device seam for the instancing subsystem
//!
//! The instancing core only needs a handful of graphics-API primitives: buffer
//! allocation, host writes into host-visible memory, a synchronous
//! buffer-to-buffer copy and the four commands used to replay draws. They are
//! expressed here as traits so the core stays independent of the backend;
//! the Vulkan implementations live in [`crate::render::vulkan`].

use crate::render::instancing::{InstancingError, InstancingResult};
use bitflags::bitflags;

bitflags! {
    /// How a buffer will be used by the device
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Source of vertex input
        const VERTEX = 1 << 0;
        /// Source of index input
        const INDEX = 1 << 1;
        /// Read as a uniform buffer
        const UNIFORM = 1 << 2;
        /// Source of a transfer
        const TRANSFER_SRC = 1 << 3;
        /// Destination of a transfer
        const TRANSFER_DST = 1 << 4;
    }
}

/// Where buffer memory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// Mappable by the host
    HostVisible,
    /// Device-local, only reachable through transfers
    DeviceLocal,
}

/// One region of a buffer-to-buffer copy
#[derive(Debug)]
pub struct BufferCopy<'a, B> {
    /// Buffer read from
    pub src: &'a B,
    /// Buffer written to
    pub dst: &'a B,
    /// Byte offset into `src`
    pub src_offset: u64,
    /// Byte offset into `dst`
    pub dst_offset: u64,
    /// Bytes to copy
    pub size: u64,
}

/// Graphics device primitives used to build and update instancing resources
pub trait GpuDevice {
    /// Owned buffer handle; releasing the buffer happens on drop
    type Buffer;

    /// Minimum alignment for dynamic uniform buffer offsets
    fn min_uniform_buffer_offset_alignment(&self) -> u64;

    /// Allocate a buffer of `size` bytes
    fn create_buffer(
        &self,
        size: u64,
        usage: BufferUsage,
        location: MemoryLocation,
    ) -> InstancingResult<Self::Buffer>;

    /// Copy `data` into a host-visible buffer at `offset` and make it
    /// visible to the device
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]) -> InstancingResult<()>;

    /// Record all copies into one command buffer, submit it and block until
    /// the device has finished
    fn copy_buffers(&self, copies: &[BufferCopy<'_, Self::Buffer>]) -> InstancingResult<()>;
}

/// Draw-time commands issued while replaying instances
pub trait DrawRecorder<B> {
    /// Bind `buffer` at `offset` as the vertex source
    fn bind_vertex_buffer(&mut self, buffer: &B, offset: u64);

    /// Bind `buffer` at `offset` as the `u32` index source
    fn bind_index_buffer(&mut self, buffer: &B, offset: u64);

    /// Bind the transform descriptor at `dynamic_offset` into the slot buffer
    fn bind_transform(&mut self, dynamic_offset: u32);

    /// Issue an indexed draw
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );
}

/// Take the only command buffer out of an allocation result
///
/// One-shot uploads allocate exactly one buffer; any other count is an
/// upload failure.
pub fn expect_single_command_buffer<T>(mut buffers: Vec<T>) -> InstancingResult<T> {
    if buffers.len() != 1 {
        return Err(InstancingError::Upload {
            reason: format!("expected exactly one command buffer, got {}", buffers.len()),
        });
    }
    buffers.pop().ok_or_else(|| InstancingError::Upload {
        reason: "command buffer allocation returned nothing".to_string(),
    })
}
