//! Transform slot pool
//!
//! A fixed number of 4x4 model matrices packed into one dynamic uniform
//! buffer. Each slot is padded to the device's minimum uniform-buffer offset
//! alignment so that a draw can select its matrix with a dynamic offset.
//!
//! Writes go to a host mirror; [`TransformSlotPool::flush`] copies the whole
//! mirror to the device once per frame. There is no dirty tracking.

use crate::foundation::math::{Mat4, MAT4_SIZE};
use crate::render::device::{BufferUsage, GpuDevice, MemoryLocation};
use crate::render::instancing::slots::{FreeSlots, HostSlotBuffer, SlotLayout};
use crate::render::instancing::{InstancingError, InstancingResult};

/// Buffer range to bind as a dynamic uniform buffer descriptor
#[derive(Debug)]
pub struct TransformDescriptorInfo<'a, B> {
    /// Device buffer holding all slots
    pub buffer: &'a B,
    /// Base offset, always 0; the per-draw offset is dynamic
    pub offset: u64,
    /// Bytes visible through one binding: one aligned slot
    pub range: u64,
}

/// Pool of aligned transform slots backed by a host-visible uniform buffer
pub struct TransformSlotPool<B> {
    layout: SlotLayout,
    slots: FreeSlots,
    host: HostSlotBuffer,
    device_buffer: B,
}

impl<B> TransformSlotPool<B> {
    /// Create a pool of `capacity` slots for `device`
    pub fn new<D>(device: &D, capacity: u32) -> InstancingResult<Self>
    where
        D: GpuDevice<Buffer = B>,
    {
        Self::with_alignment(
            device,
            device.min_uniform_buffer_offset_alignment(),
            MAT4_SIZE,
            capacity,
        )
    }

    /// Create a pool with an explicit alignment requirement and element size
    pub fn with_alignment<D>(
        device: &D,
        device_alignment: u64,
        matrix_size: u64,
        capacity: u32,
    ) -> InstancingResult<Self>
    where
        D: GpuDevice<Buffer = B>,
    {
        if matrix_size < MAT4_SIZE {
            return Err(InstancingError::Allocation {
                reason: format!("slot size {matrix_size} cannot hold a 4x4 matrix"),
            });
        }

        let layout = SlotLayout::new(device_alignment, matrix_size, capacity)?;
        let host = HostSlotBuffer::new(layout)?;
        let device_buffer = device.create_buffer(
            layout.total_size(),
            BufferUsage::UNIFORM,
            MemoryLocation::HostVisible,
        )?;

        log::info!(
            "Created transform pool: {} slots, {} byte alignment, {} bytes",
            capacity,
            layout.alignment(),
            layout.total_size()
        );

        Ok(Self {
            layout,
            slots: FreeSlots::new(capacity),
            host,
            device_buffer,
        })
    }

    /// Take the lowest free slot
    pub fn allocate_slot(&mut self) -> InstancingResult<u32> {
        self.slots.allocate().ok_or(InstancingError::PoolExhausted {
            capacity: self.layout.capacity(),
            requested: 1,
        })
    }

    /// Return a slot to the free set
    ///
    /// The slot's matrix is left as is; it is overwritten on the next
    /// allocation through the repository.
    pub fn free_slot(&mut self, index: u32) -> InstancingResult<()> {
        self.slots.free(index)
    }

    /// Store `matrix` in slot `index`
    pub fn write(&mut self, index: u32, matrix: &Mat4) -> InstancingResult<()> {
        self.host.slot_mut(index)?.write(matrix);
        Ok(())
    }

    /// Matrix stored in slot `index`
    pub fn read(&self, index: u32) -> InstancingResult<Mat4> {
        Ok(self.host.slot(index)?.read())
    }

    /// Copy the whole host mirror to the device buffer
    pub fn flush<D>(&self, device: &D) -> InstancingResult<()>
    where
        D: GpuDevice<Buffer = B>,
    {
        log::trace!("Flushing {} transform bytes", self.layout.total_size());
        device.write_buffer(&self.device_buffer, 0, self.host.as_bytes())
    }

    /// Descriptor range for binding the pool as a dynamic uniform buffer
    pub const fn descriptor_info(&self) -> TransformDescriptorInfo<'_, B> {
        TransformDescriptorInfo {
            buffer: &self.device_buffer,
            offset: 0,
            range: self.layout.alignment(),
        }
    }

    /// Dynamic offset of slot `index`
    pub fn dynamic_offset(&self, index: u32) -> InstancingResult<u32> {
        self.layout
            .dynamic_offset(index)
            .ok_or(InstancingError::InvalidSlot {
                index,
                reason: "out of range",
            })
    }

    /// Whether slot `index` is handed out
    pub fn is_in_use(&self, index: u32) -> bool {
        self.slots.is_in_use(index)
    }

    /// Slot stride in bytes
    pub const fn alignment(&self) -> u64 {
        self.layout.alignment()
    }

    /// Total slots
    pub const fn capacity(&self) -> u32 {
        self.layout.capacity()
    }

    /// Slots available for allocation
    pub fn free_count(&self) -> u32 {
        self.slots.free_count()
    }

    /// Slots handed out
    pub fn in_use_count(&self) -> u32 {
        self.slots.in_use_count()
    }

    /// Device buffer backing the pool
    pub const fn device_buffer(&self) -> &B {
        &self.device_buffer
    }
}
