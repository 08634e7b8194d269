//! Logical device creation for a selected adapter.

use crate::adapter::{AdapterInfo, SelectedAdapter};
use crate::error::Result;
use ash::vk;

/// Device extensions the renderer requires; also the extension set adapters
/// are scored against.
pub const REQUIRED_DEVICE_EXTENSIONS: &[&str] = &["VK_KHR_swapchain"];

/// Open the logical device and fetch the graphics and present queues.
///
/// One queue create info per unique family; when graphics and presentation
/// share a family, both returned queues are the same handle.
///
/// # Safety
/// The instance and the adapter's physical device handle must be valid.
pub unsafe fn create_logical_device(
    instance: &ash::Instance,
    adapter: &AdapterInfo,
    selected: &SelectedAdapter,
) -> Result<(ash::Device, vk::Queue, vk::Queue)> {
    let mut unique_families = vec![selected.graphics_family];
    if !selected.single_queue() {
        unique_families.push(selected.present_family);
    }

    let queue_priority = 1.0_f32;
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(&queue_priority))
        })
        .collect();

    let features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);

    let extension_names: Vec<*const i8> = [ash::khr::swapchain::NAME]
        .iter()
        .map(|ext| ext.as_ptr())
        .collect();

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    let device = instance.create_device(adapter.handle, &create_info, None)?;

    let graphics_queue = device.get_device_queue(selected.graphics_family, 0);
    let present_queue = if selected.single_queue() {
        graphics_queue
    } else {
        device.get_device_queue(selected.present_family, 0)
    };

    tracing::info!(
        graphics_family = selected.graphics_family,
        present_family = selected.present_family,
        "logical device created"
    );

    Ok((device, graphics_queue, present_queue))
}
