//! Descriptor binding for the transform buffer
//!
//! The transform pool is bound once as a dynamic uniform buffer; every draw
//! then picks its slot through the dynamic offset. Callers use the layout
//! when building their pipeline layout and pass the set to
//! [`VulkanDrawRecorder`](crate::render::vulkan::VulkanDrawRecorder).

use crate::render::instancing::TransformDescriptorInfo;
use crate::render::vulkan::{Buffer, VulkanError, VulkanResult};
use ash::{vk, Device};

/// Layout binding for one dynamic uniform buffer read by the vertex stage
pub fn dynamic_uniform_binding(binding: u32) -> vk::DescriptorSetLayoutBinding {
    vk::DescriptorSetLayoutBinding::builder()
        .binding(binding)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
        .descriptor_count(1)
        .stage_flags(vk::ShaderStageFlags::VERTEX)
        .build()
}

/// Buffer info for a transform pool descriptor
pub fn transform_buffer_info(
    info: &TransformDescriptorInfo<'_, Buffer>,
) -> vk::DescriptorBufferInfo {
    vk::DescriptorBufferInfo {
        buffer: info.buffer.handle(),
        offset: info.offset,
        range: info.range,
    }
}

/// Descriptor set layout, pool and set holding the transform buffer binding
pub struct TransformBinding {
    device: Device,
    layout: vk::DescriptorSetLayout,
    pool: vk::DescriptorPool,
    set: vk::DescriptorSet,
    binding: u32,
}

impl TransformBinding {
    /// Allocate a descriptor set and point `binding` at the transform buffer
    pub fn new(
        device: Device,
        binding: u32,
        info: &TransformDescriptorInfo<'_, Buffer>,
    ) -> VulkanResult<Self> {
        let bindings = [dynamic_uniform_binding(binding)];
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
        let layout = unsafe {
            device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(VulkanError::Api)?
        };

        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
            descriptor_count: 1,
        }];
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(1)
            .pool_sizes(&pool_sizes);
        let pool = match unsafe { device.create_descriptor_pool(&pool_info, None) } {
            Ok(pool) => pool,
            Err(result) => {
                unsafe { device.destroy_descriptor_set_layout(layout, None) };
                return Err(VulkanError::Api(result));
            }
        };

        // From here on the destructor releases layout and pool
        let mut binding_set = Self {
            device,
            layout,
            pool,
            set: vk::DescriptorSet::null(),
            binding,
        };

        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        let sets = unsafe {
            binding_set.device.allocate_descriptor_sets(&alloc_info)
                .map_err(VulkanError::Api)?
        };
        binding_set.set = sets.first().copied().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "descriptor set allocation returned no sets".to_string(),
        })?;

        binding_set.update(info);
        Ok(binding_set)
    }

    /// Point the binding at `info` again, e.g. after the pool was recreated
    pub fn update(&self, info: &TransformDescriptorInfo<'_, Buffer>) {
        let buffer_infos = [transform_buffer_info(info)];
        let write = vk::WriteDescriptorSet::builder()
            .dst_set(self.set)
            .dst_binding(self.binding)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
            .buffer_info(&buffer_infos)
            .build();

        unsafe {
            self.device.update_descriptor_sets(&[write], &[]);
        }
    }

    /// Descriptor set layout, for pipeline layout creation
    pub fn layout(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// The descriptor set
    pub fn set(&self) -> vk::DescriptorSet {
        self.set
    }
}

impl Drop for TransformBinding {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}
