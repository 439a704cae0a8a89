//! Mesh resources
//!
//! A mesh resource is uploaded once and never changes. Vertex and index data
//! share one device-local buffer: vertices first, indices directly after
//! them with no padding in between.

use crate::render::device::{BufferCopy, BufferUsage, DrawRecorder, GpuDevice, MemoryLocation};
use crate::render::instancing::{InstancingError, InstancingResult};
use crate::render::vertex::MeshVertex;
use std::collections::BTreeSet;

/// Immutable GPU-resident geometry
pub struct MeshResource<B> {
    buffer: B,
    vertex_count: u32,
    vertex_stride: u32,
    index_count: u32,
    index_offset: u64,
}

impl<B> MeshResource<B> {
    /// Upload `vertices` and `indices` to a new device-local buffer
    ///
    /// Blocks until the device has finished the copy. Staging buffers are
    /// released before returning.
    pub fn new<D, V>(device: &D, vertices: &[V], indices: &[u32]) -> InstancingResult<Self>
    where
        D: GpuDevice<Buffer = B>,
        V: MeshVertex,
    {
        validate_geometry(vertices.len(), indices)?;

        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(indices);
        let vertex_size = vertex_bytes.len() as u64;
        let index_size = index_bytes.len() as u64;

        let vertex_staging = device.create_buffer(
            vertex_size,
            BufferUsage::TRANSFER_SRC,
            MemoryLocation::HostVisible,
        )?;
        device.write_buffer(&vertex_staging, 0, vertex_bytes)?;

        let index_staging = device.create_buffer(
            index_size,
            BufferUsage::TRANSFER_SRC,
            MemoryLocation::HostVisible,
        )?;
        device.write_buffer(&index_staging, 0, index_bytes)?;

        let buffer = device.create_buffer(
            vertex_size + index_size,
            BufferUsage::VERTEX | BufferUsage::INDEX | BufferUsage::TRANSFER_DST,
            MemoryLocation::DeviceLocal,
        )?;

        device.copy_buffers(&[
            BufferCopy {
                src: &vertex_staging,
                dst: &buffer,
                src_offset: 0,
                dst_offset: 0,
                size: vertex_size,
            },
            BufferCopy {
                src: &index_staging,
                dst: &buffer,
                src_offset: 0,
                dst_offset: vertex_size,
                size: index_size,
            },
        ])?;

        log::debug!(
            "Uploaded mesh: {} vertices ({} bytes), {} indices ({} bytes)",
            vertices.len(),
            vertex_size,
            indices.len(),
            index_size
        );

        Ok(Self {
            buffer,
            vertex_count: vertices.len() as u32,
            vertex_stride: V::stride(),
            index_count: indices.len() as u32,
            index_offset: vertex_size,
        })
    }

    /// Replay one draw per dynamic offset
    ///
    /// Geometry is bound once; each offset then selects its transform slot
    /// and issues a single-instance indexed draw. The set's ordering is the
    /// draw order.
    pub fn draw<R>(&self, dynamic_offsets: &BTreeSet<u32>, target: &mut R)
    where
        R: DrawRecorder<B>,
    {
        if dynamic_offsets.is_empty() {
            return;
        }

        target.bind_vertex_buffer(&self.buffer, 0);
        target.bind_index_buffer(&self.buffer, self.index_offset);

        for &offset in dynamic_offsets {
            target.bind_transform(offset);
            target.draw_indexed(self.index_count, 1, 0, 0, 0);
        }
    }

    /// Number of vertices
    pub const fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Byte stride of one vertex
    pub const fn vertex_stride(&self) -> u32 {
        self.vertex_stride
    }

    /// Number of indices
    pub const fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Byte offset of the index region inside the buffer
    pub const fn index_offset(&self) -> u64 {
        self.index_offset
    }

    /// Device buffer holding vertices followed by indices
    pub const fn buffer(&self) -> &B {
        &self.buffer
    }
}

fn validate_geometry(vertex_count: usize, indices: &[u32]) -> InstancingResult<()> {
    let reject = |reason: String| Err(InstancingError::Upload { reason });

    if vertex_count == 0 {
        return reject("mesh has no vertices".to_string());
    }
    if u32::try_from(vertex_count).is_err() {
        return reject(format!("{vertex_count} vertices exceed the u32 index range"));
    }
    if indices.is_empty() {
        return reject("mesh has no indices".to_string());
    }
    if indices.len() % 3 != 0 {
        return reject(format!("{} indices do not form whole triangles", indices.len()));
    }
    if let Some(&index) = indices.iter().find(|&&index| index as usize >= vertex_count) {
        return reject(format!("index {index} references one of only {vertex_count} vertices"));
    }
    Ok(())
}
