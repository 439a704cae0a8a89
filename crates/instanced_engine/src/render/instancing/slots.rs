//! Slot layout, free-slot allocation and the host-side slot buffer
//!
//! These are the pieces of the transform pool that do not touch the device,
//! kept separate so the allocation policy and byte layout can be reasoned
//! about on their own.

use crate::foundation::math::{align_up, mat4_from_columns, mat4_to_columns, Mat4, MAT4_SIZE};
use crate::render::instancing::{InstancingError, InstancingResult};
use std::collections::BTreeSet;

/// Byte layout of a fixed-capacity array of aligned slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    alignment: u64,
    capacity: u32,
}

impl SlotLayout {
    /// Compute the layout for `capacity` elements of `element_size` bytes
    ///
    /// The slot stride is `element_size` rounded up to `device_alignment`.
    /// Every dynamic offset must be representable as `u32`.
    pub fn new(device_alignment: u64, element_size: u64, capacity: u32) -> InstancingResult<Self> {
        if capacity == 0 {
            return Err(InstancingError::Allocation {
                reason: "transform pool capacity must be non-zero".to_string(),
            });
        }

        let alignment = align_up(element_size, device_alignment);
        let last_offset = u64::from(capacity - 1) * alignment;
        if u32::try_from(last_offset).is_err() {
            return Err(InstancingError::Allocation {
                reason: format!(
                    "{capacity} slots of {alignment} bytes exceed the dynamic offset range"
                ),
            });
        }

        Ok(Self {
            alignment,
            capacity,
        })
    }

    /// Layout for 4x4 `f32` matrices
    pub fn for_matrices(device_alignment: u64, capacity: u32) -> InstancingResult<Self> {
        Self::new(device_alignment, MAT4_SIZE, capacity)
    }

    /// Stride between slots in bytes
    pub const fn alignment(&self) -> u64 {
        self.alignment
    }

    /// Number of slots
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Total size of the slot array in bytes
    pub const fn total_size(&self) -> u64 {
        self.capacity as u64 * self.alignment
    }

    /// Dynamic offset of `index`, or `None` when out of range
    pub fn dynamic_offset(&self, index: u32) -> Option<u32> {
        if index < self.capacity {
            u32::try_from(u64::from(index) * self.alignment).ok()
        } else {
            None
        }
    }
}

/// Free-slot allocator handing out the lowest free index first
#[derive(Debug, Clone)]
pub struct FreeSlots {
    free: BTreeSet<u32>,
    in_use: Vec<bool>,
}

impl FreeSlots {
    /// All `capacity` slots start free
    pub fn new(capacity: u32) -> Self {
        Self {
            free: (0..capacity).collect(),
            in_use: vec![false; capacity as usize],
        }
    }

    /// Take the smallest free index
    pub fn allocate(&mut self) -> Option<u32> {
        let index = self.free.pop_first()?;
        self.in_use[index as usize] = true;
        Some(index)
    }

    /// Return `index` to the free set
    ///
    /// Freeing an index that is out of range or not in use is rejected and
    /// leaves the allocator unchanged.
    pub fn free(&mut self, index: u32) -> InstancingResult<()> {
        match self.in_use.get_mut(index as usize) {
            None => Err(InstancingError::InvalidSlot {
                index,
                reason: "out of range",
            }),
            Some(false) => Err(InstancingError::InvalidSlot {
                index,
                reason: "slot is not in use",
            }),
            Some(occupied) => {
                *occupied = false;
                self.free.insert(index);
                Ok(())
            }
        }
    }

    /// Whether `index` is currently handed out
    pub fn is_in_use(&self, index: u32) -> bool {
        self.in_use.get(index as usize).copied().unwrap_or(false)
    }

    /// Number of free slots
    pub fn free_count(&self) -> u32 {
        self.free.len() as u32
    }

    /// Number of slots in use
    pub fn in_use_count(&self) -> u32 {
        self.capacity() - self.free_count()
    }

    /// Total slots
    pub fn capacity(&self) -> u32 {
        self.in_use.len() as u32
    }
}

/// Owned host mirror of the slot array
///
/// A contiguous byte buffer of `capacity × alignment` bytes. The slot stride
/// carries the device alignment; typed access goes through [`SlotView`] and
/// [`SlotViewMut`], which read and write unaligned so the base address of the
/// allocation does not matter.
#[derive(Debug)]
pub struct HostSlotBuffer {
    layout: SlotLayout,
    bytes: Vec<u8>,
}

impl HostSlotBuffer {
    /// Allocate a zeroed buffer for `layout`
    pub fn new(layout: SlotLayout) -> InstancingResult<Self> {
        let size = usize::try_from(layout.total_size()).map_err(|_| InstancingError::Allocation {
            reason: format!("{} bytes do not fit the host address space", layout.total_size()),
        })?;

        let mut bytes = Vec::new();
        bytes.try_reserve_exact(size).map_err(|err| InstancingError::Allocation {
            reason: format!("host slot buffer of {size} bytes: {err}"),
        })?;
        bytes.resize(size, 0);

        Ok(Self { layout, bytes })
    }

    /// Layout of the buffer
    pub const fn layout(&self) -> &SlotLayout {
        &self.layout
    }

    /// Whole buffer as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Read-only view of one slot
    pub fn slot(&self, index: u32) -> InstancingResult<SlotView<'_>> {
        let range = self.slot_range(index)?;
        Ok(SlotView {
            bytes: &self.bytes[range],
        })
    }

    /// Writable view of one slot
    pub fn slot_mut(&mut self, index: u32) -> InstancingResult<SlotViewMut<'_>> {
        let range = self.slot_range(index)?;
        Ok(SlotViewMut {
            bytes: &mut self.bytes[range],
        })
    }

    fn slot_range(&self, index: u32) -> InstancingResult<std::ops::Range<usize>> {
        let start = self
            .layout
            .dynamic_offset(index)
            .ok_or(InstancingError::InvalidSlot {
                index,
                reason: "out of range",
            })? as usize;
        Ok(start..start + MAT4_SIZE as usize)
    }
}

/// Read access to the matrix stored in one slot
#[derive(Debug)]
pub struct SlotView<'a> {
    bytes: &'a [u8],
}

impl SlotView<'_> {
    /// Matrix currently stored in the slot
    pub fn read(&self) -> Mat4 {
        mat4_from_columns(&bytemuck::pod_read_unaligned::<[f32; 16]>(self.bytes))
    }
}

/// Write access to the matrix stored in one slot
#[derive(Debug)]
pub struct SlotViewMut<'a> {
    bytes: &'a mut [u8],
}

impl SlotViewMut<'_> {
    /// Matrix currently stored in the slot
    pub fn read(&self) -> Mat4 {
        mat4_from_columns(&bytemuck::pod_read_unaligned::<[f32; 16]>(self.bytes))
    }

    /// Overwrite the slot with `matrix`
    pub fn write(&mut self, matrix: &Mat4) {
        self.bytes.copy_from_slice(bytemuck::bytes_of(&mat4_to_columns(matrix)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_layout_alignment() {
        let layout = SlotLayout::for_matrices(64, 4).expect("layout");
        assert_eq!(layout.alignment(), 64);
        assert_eq!(layout.total_size(), 256);

        let layout = SlotLayout::for_matrices(256, 4).expect("layout");
        assert_eq!(layout.alignment(), 256);
        assert_eq!(layout.dynamic_offset(3), Some(768));
        assert_eq!(layout.dynamic_offset(4), None);
    }

    #[test]
    fn test_layout_rejects_zero_capacity_and_offset_overflow() {
        assert!(matches!(
            SlotLayout::for_matrices(64, 0),
            Err(InstancingError::Allocation { .. })
        ));
        assert!(matches!(
            SlotLayout::for_matrices(1 << 20, 1 << 13),
            Err(InstancingError::Allocation { .. })
        ));
    }

    #[test]
    fn test_lowest_free_index_first() {
        let mut slots = FreeSlots::new(4);
        assert_eq!(slots.allocate(), Some(0));
        assert_eq!(slots.allocate(), Some(1));
        assert_eq!(slots.allocate(), Some(2));

        slots.free(1).expect("free in-use slot");
        assert_eq!(slots.allocate(), Some(1));
        assert_eq!(slots.allocate(), Some(3));
        assert_eq!(slots.allocate(), None);
    }

    #[test]
    fn test_double_free_and_out_of_range_are_rejected() {
        let mut slots = FreeSlots::new(2);
        let index = slots.allocate().expect("slot");
        slots.free(index).expect("first free");

        assert!(matches!(slots.free(index), Err(InstancingError::InvalidSlot { .. })));
        assert!(matches!(slots.free(7), Err(InstancingError::InvalidSlot { .. })));
        assert_eq!(slots.free_count(), 2);
        assert_eq!(slots.allocate(), Some(0));
    }

    #[test]
    fn test_free_and_in_use_partition_capacity() {
        let mut slots = FreeSlots::new(8);
        let mut held = Vec::new();

        // Deterministic interleaving of allocations and frees
        for step in 0..40u32 {
            if step % 3 == 2 && !held.is_empty() {
                let index = held.remove((step as usize * 7) % held.len());
                slots.free(index).expect("free held slot");
            } else if let Some(index) = slots.allocate() {
                held.push(index);
            }

            assert_eq!(slots.free_count() + slots.in_use_count(), slots.capacity());
            assert_eq!(slots.in_use_count() as usize, held.len());
            for index in 0..slots.capacity() {
                assert_eq!(slots.is_in_use(index), held.contains(&index));
            }
        }
    }

    #[test]
    fn test_slot_write_does_not_touch_neighbours() {
        let layout = SlotLayout::for_matrices(256, 3).expect("layout");
        let mut buffer = HostSlotBuffer::new(layout).expect("host buffer");
        let moved = Mat4::new_translation(&Vec3::new(4.0, 5.0, 6.0));

        for index in 0..3 {
            buffer.slot_mut(index).expect("slot").write(&Mat4::identity());
        }
        buffer.slot_mut(1).expect("slot").write(&moved);

        assert_eq!(buffer.slot(0).expect("slot").read(), Mat4::identity());
        assert_eq!(buffer.slot(1).expect("slot").read(), moved);
        assert_eq!(buffer.slot(2).expect("slot").read(), Mat4::identity());

        // Bytes at offset 1 × alignment hold exactly the written columns
        let start = 256;
        let written: [f32; 16] =
            bytemuck::pod_read_unaligned(&buffer.as_bytes()[start..start + 64]);
        assert_eq!(written, mat4_to_columns(&moved));

        // Padding between slots stays zero
        assert!(buffer.as_bytes()[start + 64..start + 256].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_slot_access_is_bounds_checked() {
        let layout = SlotLayout::for_matrices(64, 2).expect("layout");
        let mut buffer = HostSlotBuffer::new(layout).expect("host buffer");
        assert!(buffer.slot(2).is_err());
        assert!(buffer.slot_mut(2).is_err());
    }
}
