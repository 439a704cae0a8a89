//! Buffer management
//!
//! Memory management following RAII patterns: a [`Buffer`] owns its
//! `vk::Buffer` and `vk::DeviceMemory` and releases both on drop.

use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};

/// Buffer wrapper with memory management
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a new buffer with memory allocation
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device.create_buffer(&buffer_info, None)
                .map_err(VulkanError::Api)?
        };

        let mem_requirements = unsafe {
            device.get_buffer_memory_requirements(buffer)
        };

        let memory_type_index = match find_memory_type(
            memory_properties,
            mem_requirements.memory_type_bits,
            properties,
        ) {
            Ok(index) => index,
            Err(err) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(err);
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(mem_requirements.size)
            .memory_type_index(memory_type_index);

        let memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(result) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(VulkanError::Api(result));
            }
        };

        if let Err(result) = unsafe { device.bind_buffer_memory(buffer, memory, 0) } {
            unsafe {
                device.destroy_buffer(buffer, None);
                device.free_memory(memory, None);
            }
            return Err(VulkanError::Api(result));
        }

        Ok(Self {
            device,
            buffer,
            memory,
            size,
        })
    }

    /// Copy `data` into the buffer at `offset` and flush the mapped range
    ///
    /// The buffer must live in host-visible memory. The whole mapping is
    /// flushed, so non-coherent memory needs no atom-size bookkeeping.
    pub fn write_bytes(&self, offset: vk::DeviceSize, data: &[u8]) -> VulkanResult<()> {
        let end = offset + data.len() as vk::DeviceSize;
        if end > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "write of {} bytes at {} overflows buffer of {}",
                    data.len(),
                    offset,
                    self.size
                ),
            });
        }

        unsafe {
            let mapped = self.device.map_memory(
                self.memory,
                0,
                vk::WHOLE_SIZE,
                vk::MemoryMapFlags::empty(),
            ).map_err(VulkanError::Api)?;

            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                mapped.cast::<u8>().add(offset as usize),
                data.len(),
            );

            let range = vk::MappedMemoryRange::builder()
                .memory(self.memory)
                .offset(0)
                .size(vk::WHOLE_SIZE)
                .build();
            let flushed = self.device.flush_mapped_memory_ranges(&[range]);
            self.device.unmap_memory(self.memory);
            flushed.map_err(VulkanError::Api)?;
        }

        Ok(())
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get size
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

/// Find memory type with required properties
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    (0..memory_properties.memory_type_count)
        .find(|&i| {
            (type_filter & (1 << i)) != 0
                && memory_properties.memory_types[i as usize].property_flags.contains(properties)
        })
        .ok_or(VulkanError::NoSuitableMemoryType)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (slot, &property_flags) in properties.memory_types.iter_mut().zip(flags) {
            slot.property_flags = property_flags;
        }
        properties
    }

    #[test]
    fn test_memory_type_respects_filter_and_flags() {
        let properties = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        ]);

        let host = find_memory_type(&properties, 0b111, vk::MemoryPropertyFlags::HOST_VISIBLE);
        assert_eq!(host.expect("host visible type"), 1);

        let filtered = find_memory_type(&properties, 0b100, vk::MemoryPropertyFlags::HOST_VISIBLE);
        assert_eq!(filtered.expect("filtered type"), 2);

        let missing = find_memory_type(&properties, 0b001, vk::MemoryPropertyFlags::HOST_VISIBLE);
        assert!(matches!(missing, Err(VulkanError::NoSuitableMemoryType)));
    }
}
