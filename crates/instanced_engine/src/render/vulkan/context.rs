//! Vulkan context management
//!
//! Owns the instance, physical and logical device, graphics queue and a
//! transient command pool. The context is headless: instancing only needs
//! buffer allocation and transfers, so no surface or swapchain is created.

use crate::render::device::{
    expect_single_command_buffer, BufferCopy, BufferUsage, GpuDevice, MemoryLocation,
};
use crate::render::instancing::{InstancingError, InstancingResult};
use crate::render::vulkan::{Buffer, CommandPool};
use ash::extensions::ext::DebugUtils;
use ash::{vk, Device, Entry, Instance};
use std::ffi::{c_char, c_void, CStr, CString};
use thiserror::Error;

const VALIDATION_LAYER: &[u8] = b"VK_LAYER_KHRONOS_validation\0";

/// Vulkan-specific errors
#[derive(Error, Debug)]
pub enum VulkanError {
    /// Setup of a Vulkan object failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// A Vulkan call returned an error code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// No physical device exposes a graphics queue
    #[error("No suitable physical device found")]
    NoSuitableDevice,

    /// No memory type satisfies the requested properties
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,

    /// The call was well-formed for Vulkan but not for this wrapper
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// What was wrong
        reason: String,
    },
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

/// Vulkan instance with optional debug messenger
pub struct VulkanInstance {
    // Keeps the loader library alive for as long as the instance exists
    _entry: Entry,
    instance: Instance,
    debug: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl VulkanInstance {
    /// Load the Vulkan loader and create an instance
    ///
    /// With `enable_validation` the Khronos validation layer is enabled when
    /// installed and its messages are forwarded to the `log` crate.
    pub fn new(app_name: &str, enable_validation: bool) -> VulkanResult<Self> {
        let entry = unsafe {
            Entry::load().map_err(|e| {
                VulkanError::InitializationFailed(format!("Failed to load Vulkan: {}", e))
            })?
        };

        let app_name = CString::new(app_name).map_err(|e| {
            VulkanError::InitializationFailed(format!("Invalid application name: {}", e))
        })?;
        let engine_name = CString::new("instanced_engine")
            .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(0)
            .engine_name(&engine_name)
            .engine_version(0)
            .api_version(vk::API_VERSION_1_0);

        let validation = enable_validation && validation_layer_available(&entry);
        if enable_validation && !validation {
            log::warn!("Validation requested but VK_LAYER_KHRONOS_validation is not installed");
        }

        let mut layers: Vec<*const c_char> = Vec::new();
        let mut extensions: Vec<*const c_char> = Vec::new();
        if validation {
            layers.push(VALIDATION_LAYER.as_ptr().cast());
            extensions.push(DebugUtils::name().as_ptr());
        }

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions);

        let instance = unsafe {
            entry.create_instance(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let debug = if validation {
            match create_debug_messenger(&entry, &instance) {
                Ok(debug) => Some(debug),
                Err(err) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(err);
                }
            }
        } else {
            None
        };

        log::info!("Created Vulkan instance (validation: {})", validation);

        Ok(Self {
            _entry: entry,
            instance,
            debug,
        })
    }

    /// Get the instance
    pub fn handle(&self) -> &Instance {
        &self.instance
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((loader, messenger)) = self.debug.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

fn validation_layer_available(entry: &Entry) -> bool {
    let Ok(properties) = entry.enumerate_instance_layer_properties() else {
        return false;
    };
    properties.iter().any(|layer| {
        let name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
        name.to_bytes_with_nul() == VALIDATION_LAYER
    })
}

fn create_debug_messenger(
    entry: &Entry,
    instance: &Instance,
) -> VulkanResult<(DebugUtils, vk::DebugUtilsMessengerEXT)> {
    let loader = DebugUtils::new(entry, instance);
    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback));

    let messenger = unsafe {
        loader.create_debug_utils_messenger(&create_info, None)
            .map_err(VulkanError::Api)?
    };
    Ok((loader, messenger))
}

/// Forwards validation messages to the logger. Must not call into Vulkan.
unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || (*callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!("[Vulkan {:?}] {}", message_type, message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!("[Vulkan {:?}] {}", message_type, message);
    } else {
        log::debug!("[Vulkan {:?}] {}", message_type, message);
    }
    vk::FALSE
}

/// Physical device with the properties the instancing code needs
pub struct PhysicalDeviceInfo {
    /// Device handle
    pub device: vk::PhysicalDevice,
    /// Device properties, including limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Memory heaps and types
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Queue family used for graphics and transfers
    pub graphics_family: u32,
}

impl PhysicalDeviceInfo {
    /// Pick the first physical device with a graphics queue family
    pub fn select(instance: &Instance) -> VulkanResult<Self> {
        let devices = unsafe {
            instance.enumerate_physical_devices()
                .map_err(VulkanError::Api)?
        };

        for device in devices {
            let families = unsafe { instance.get_physical_device_queue_family_properties(device) };
            let Some(graphics_family) = graphics_family_index(&families) else {
                continue;
            };

            let properties = unsafe { instance.get_physical_device_properties(device) };
            let memory_properties =
                unsafe { instance.get_physical_device_memory_properties(device) };
            let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) };
            log::info!("Selected physical device: {}", name.to_string_lossy());

            return Ok(Self {
                device,
                properties,
                memory_properties,
                graphics_family,
            });
        }

        Err(VulkanError::NoSuitableDevice)
    }
}

/// Index of the first queue family supporting graphics
pub fn graphics_family_index(families: &[vk::QueueFamilyProperties]) -> Option<u32> {
    families
        .iter()
        .position(|family| {
            family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        })
        .map(|index| index as u32)
}

/// Logical device and its graphics queue
pub struct LogicalDevice {
    /// Device
    pub device: Device,
    /// Graphics queue
    pub graphics_queue: vk::Queue,
}

impl LogicalDevice {
    /// Create a logical device with one graphics queue
    pub fn new(instance: &Instance, physical: &PhysicalDeviceInfo) -> VulkanResult<Self> {
        let queue_priorities = [1.0f32];
        let queue_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(physical.graphics_family)
            .queue_priorities(&queue_priorities);
        let device_create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(std::slice::from_ref(&queue_info));

        let device = unsafe {
            instance.create_device(physical.device, &device_create_info, None)
                .map_err(VulkanError::Api)?
        };
        let graphics_queue = unsafe { device.get_device_queue(physical.graphics_family, 0) };

        Ok(Self {
            device,
            graphics_queue,
        })
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

/// Headless Vulkan context implementing [`GpuDevice`]
pub struct VulkanContext {
    // Field order is drop order: pool, then device, then instance
    command_pool: CommandPool,
    device: LogicalDevice,
    physical_device: PhysicalDeviceInfo,
    instance: VulkanInstance,
}

impl VulkanContext {
    /// Create instance, device, queue and command pool
    pub fn new(app_name: &str, enable_validation: bool) -> VulkanResult<Self> {
        let instance = VulkanInstance::new(app_name, enable_validation)?;
        let physical_device = PhysicalDeviceInfo::select(instance.handle())?;
        let device = LogicalDevice::new(instance.handle(), &physical_device)?;
        let command_pool = CommandPool::new(
            device.device.clone(),
            physical_device.graphics_family,
            device.graphics_queue,
        )?;

        log::info!(
            "Vulkan context ready (uniform offset alignment {})",
            physical_device.properties.limits.min_uniform_buffer_offset_alignment
        );

        Ok(Self {
            command_pool,
            device,
            physical_device,
            instance,
        })
    }

    /// Get the instance
    pub fn instance(&self) -> &Instance {
        self.instance.handle()
    }

    /// Get the logical device
    pub fn raw_device(&self) -> &Device {
        &self.device.device
    }

    /// Get the selected physical device
    pub fn physical_device(&self) -> &PhysicalDeviceInfo {
        &self.physical_device
    }

    /// Get the graphics queue
    pub fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue
    }

    /// Get the transient command pool
    pub fn command_pool(&self) -> &CommandPool {
        &self.command_pool
    }

    /// Block until the device is idle
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe {
            self.device.device.device_wait_idle()
                .map_err(VulkanError::Api)
        }
    }
}

/// Vulkan usage flags for a [`BufferUsage`] set
pub fn vk_buffer_usage(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUsage::TRANSFER_SRC) {
        flags |= vk::BufferUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(BufferUsage::TRANSFER_DST) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    flags
}

/// Vulkan memory property flags for a [`MemoryLocation`]
pub fn vk_memory_properties(location: MemoryLocation) -> vk::MemoryPropertyFlags {
    match location {
        MemoryLocation::HostVisible => {
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
        }
        MemoryLocation::DeviceLocal => vk::MemoryPropertyFlags::DEVICE_LOCAL,
    }
}

impl GpuDevice for VulkanContext {
    type Buffer = Buffer;

    fn min_uniform_buffer_offset_alignment(&self) -> u64 {
        self.physical_device.properties.limits.min_uniform_buffer_offset_alignment
    }

    fn create_buffer(
        &self,
        size: u64,
        usage: BufferUsage,
        location: MemoryLocation,
    ) -> InstancingResult<Buffer> {
        Buffer::new(
            self.device.device.clone(),
            &self.physical_device.memory_properties,
            size,
            vk_buffer_usage(usage),
            vk_memory_properties(location),
        )
        .map_err(|e| InstancingError::Allocation {
            reason: format!("{} byte {:?} buffer: {}", size, location, e),
        })
    }

    fn write_buffer(&self, buffer: &Buffer, offset: u64, data: &[u8]) -> InstancingResult<()> {
        buffer.write_bytes(offset, data).map_err(|e| InstancingError::Allocation {
            reason: format!("host write of {} bytes: {}", data.len(), e),
        })
    }

    fn copy_buffers(&self, copies: &[BufferCopy<'_, Buffer>]) -> InstancingResult<()> {
        let upload_error = |e: VulkanError| InstancingError::Upload {
            reason: e.to_string(),
        };

        let allocated = self.command_pool.allocate_command_buffers(1).map_err(upload_error)?;
        let command_buffer = expect_single_command_buffer(allocated)?;

        self.command_pool
            .submit_and_wait(command_buffer, |device, command_buffer| {
                for copy in copies {
                    let region = vk::BufferCopy {
                        src_offset: copy.src_offset,
                        dst_offset: copy.dst_offset,
                        size: copy.size,
                    };
                    unsafe {
                        device.cmd_copy_buffer(
                            command_buffer,
                            copy.src.handle(),
                            copy.dst.handle(),
                            &[region],
                        );
                    }
                }
            })
            .map_err(upload_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_translation() {
        let flags =
            vk_buffer_usage(BufferUsage::VERTEX | BufferUsage::INDEX | BufferUsage::TRANSFER_DST);
        assert_eq!(
            flags,
            vk::BufferUsageFlags::VERTEX_BUFFER
                | vk::BufferUsageFlags::INDEX_BUFFER
                | vk::BufferUsageFlags::TRANSFER_DST
        );
        assert_eq!(vk_buffer_usage(BufferUsage::empty()), vk::BufferUsageFlags::empty());
    }

    #[test]
    fn test_memory_location_translation() {
        assert!(vk_memory_properties(MemoryLocation::HostVisible)
            .contains(vk::MemoryPropertyFlags::HOST_VISIBLE));
        assert_eq!(
            vk_memory_properties(MemoryLocation::DeviceLocal),
            vk::MemoryPropertyFlags::DEVICE_LOCAL
        );
    }

    #[test]
    fn test_graphics_family_skips_transfer_only() {
        let families = [
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::TRANSFER,
                queue_count: 1,
                ..Default::default()
            },
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER,
                queue_count: 0,
                ..Default::default()
            },
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
                queue_count: 2,
                ..Default::default()
            },
        ];
        assert_eq!(graphics_family_index(&families), Some(2));
        assert_eq!(graphics_family_index(&families[..2]), None);
    }
}
