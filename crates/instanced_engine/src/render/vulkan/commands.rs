//! Command buffer management
//!
//! One-shot transfer submission and the draw recorder used to replay
//! instanced draws into a caller-owned command buffer. The recorder is for
//! callers that own a graphics pipeline; this crate creates none.

use crate::render::device::DrawRecorder;
use crate::render::vulkan::{Buffer, VulkanError, VulkanResult};
use ash::{vk, Device};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
    queue: vk::Queue,
}

impl CommandPool {
    /// Create a pool for short-lived command buffers submitted to `queue`
    pub fn new(device: Device, queue_family_index: u32, queue: vk::Queue) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::TRANSIENT)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe {
            device.create_command_pool(&pool_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self {
            device,
            command_pool,
            queue,
        })
    }

    /// Allocate primary command buffers
    pub fn allocate_command_buffers(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe {
            self.device.allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)
        }
    }

    /// Record `record` into `command_buffer`, submit it and wait for the queue to go idle
    ///
    /// The command buffer is freed whether or not submission succeeds.
    pub fn submit_and_wait<F>(
        &self,
        command_buffer: vk::CommandBuffer,
        record: F,
    ) -> VulkanResult<()>
    where
        F: FnOnce(&Device, vk::CommandBuffer),
    {
        let result = self.record_and_submit(command_buffer, record);
        unsafe {
            self.device.free_command_buffers(self.command_pool, &[command_buffer]);
        }
        result
    }

    fn record_and_submit<F>(&self, command_buffer: vk::CommandBuffer, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&Device, vk::CommandBuffer),
    {
        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device.begin_command_buffer(command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        record(&self.device, command_buffer);

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder()
            .command_buffers(&command_buffers)
            .build();

        unsafe {
            self.device.end_command_buffer(command_buffer)
                .map_err(VulkanError::Api)?;
            self.device.queue_submit(self.queue, &[submit_info], vk::Fence::null())
                .map_err(VulkanError::Api)?;
            self.device.queue_wait_idle(self.queue)
                .map_err(VulkanError::Api)
        }
    }

    /// Get the command pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to be idle to ensure all command buffers are finished
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Replays instanced draws into a command buffer that is already recording
///
/// The caller begins the render pass and binds a pipeline whose layout has
/// the transform buffer as a dynamic uniform buffer in set `transform_set_index`.
pub struct VulkanDrawRecorder<'a> {
    device: &'a Device,
    command_buffer: vk::CommandBuffer,
    pipeline_layout: vk::PipelineLayout,
    transform_set: vk::DescriptorSet,
    transform_set_index: u32,
}

impl<'a> VulkanDrawRecorder<'a> {
    /// Create a recorder over `command_buffer`
    pub fn new(
        device: &'a Device,
        command_buffer: vk::CommandBuffer,
        pipeline_layout: vk::PipelineLayout,
        transform_set: vk::DescriptorSet,
        transform_set_index: u32,
    ) -> Self {
        Self {
            device,
            command_buffer,
            pipeline_layout,
            transform_set,
            transform_set_index,
        }
    }
}

impl DrawRecorder<Buffer> for VulkanDrawRecorder<'_> {
    fn bind_vertex_buffer(&mut self, buffer: &Buffer, offset: u64) {
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(self.command_buffer, 0, &[buffer.handle()], &[offset]);
        }
    }

    fn bind_index_buffer(&mut self, buffer: &Buffer, offset: u64) {
        unsafe {
            self.device.cmd_bind_index_buffer(
                self.command_buffer,
                buffer.handle(),
                offset,
                vk::IndexType::UINT32,
            );
        }
    }

    fn bind_transform(&mut self, dynamic_offset: u32) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout,
                self.transform_set_index,
                &[self.transform_set],
                &[dynamic_offset],
            );
        }
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }
}
