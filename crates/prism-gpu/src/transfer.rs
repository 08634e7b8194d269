//! Buffer and image creation plus staged host-to-device transfers.
//!
//! Allocation is explicit: every resource gets its own `vkAllocateMemory`
//! call with a memory type resolved from the adapter's memory properties.

use crate::adapter::find_memory_type;
use crate::command::{submit_once, CommandPool};
use crate::error::{GpuError, Result};
use ash::vk;

/// A buffer with its backing allocation.
pub struct DeviceBuffer {
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
    pub size: vk::DeviceSize,
}

impl DeviceBuffer {
    /// Destroy the buffer and free its memory.
    ///
    /// # Safety
    /// The device must be valid and the buffer must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_buffer(self.buffer, None);
        device.free_memory(self.memory, None);
    }
}

/// An image with its backing allocation and sampled view.
pub struct DeviceImage {
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub view: vk::ImageView,
    pub extent: vk::Extent2D,
}

impl DeviceImage {
    /// Destroy the view, image, and memory.
    ///
    /// # Safety
    /// The device must be valid and the image must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_image_view(self.view, None);
        device.destroy_image(self.image, None);
        device.free_memory(self.memory, None);
    }
}

/// Create a buffer and bind freshly allocated memory of a matching type.
///
/// Fatal when no memory type satisfies both the buffer's requirement mask and
/// the requested properties.
///
/// # Safety
/// The device must be valid and `memory` must describe its physical device.
pub unsafe fn create_buffer(
    device: &ash::Device,
    memory: &vk::PhysicalDeviceMemoryProperties,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    properties: vk::MemoryPropertyFlags,
) -> Result<DeviceBuffer> {
    let buffer_info = vk::BufferCreateInfo::default()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    let buffer = device.create_buffer(&buffer_info, None)?;
    let requirements = device.get_buffer_memory_requirements(buffer);

    let type_index = find_memory_type(memory, requirements.memory_type_bits, properties)
        .ok_or(GpuError::NoSuitableMemoryType {
            type_filter: requirements.memory_type_bits,
            properties,
        })?;

    let alloc_info = vk::MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(type_index);

    let device_memory = device.allocate_memory(&alloc_info, None)?;
    device.bind_buffer_memory(buffer, device_memory, 0)?;

    Ok(DeviceBuffer {
        buffer,
        memory: device_memory,
        size,
    })
}

/// Write bytes into a host-visible allocation via map/copy/unmap.
///
/// # Safety
/// The memory must be host-visible, host-coherent, and at least `data.len()`
/// bytes from `offset`.
pub unsafe fn write_host_visible(
    device: &ash::Device,
    memory: vk::DeviceMemory,
    offset: vk::DeviceSize,
    data: &[u8],
) -> Result<()> {
    let ptr = device.map_memory(
        memory,
        offset,
        data.len() as vk::DeviceSize,
        vk::MemoryMapFlags::empty(),
    )?;
    std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.cast::<u8>(), data.len());
    device.unmap_memory(memory);
    Ok(())
}

/// Upload bytes into a new device-local buffer through an exact-size staging
/// buffer.
///
/// The transfer runs on a one-time command buffer and is fully synchronous;
/// the staging buffer is destroyed before returning.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn upload_buffer(
    device: &ash::Device,
    memory: &vk::PhysicalDeviceMemoryProperties,
    pool: &CommandPool,
    queue: vk::Queue,
    data: &[u8],
    usage: vk::BufferUsageFlags,
) -> Result<DeviceBuffer> {
    let size = data.len() as vk::DeviceSize;

    let staging = create_buffer(
        device,
        memory,
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;
    if let Err(e) = write_host_visible(device, staging.memory, 0, data) {
        staging.destroy(device);
        return Err(e);
    }

    let dst = match create_buffer(
        device,
        memory,
        size,
        vk::BufferUsageFlags::TRANSFER_DST | usage,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    ) {
        Ok(dst) => dst,
        Err(e) => {
            staging.destroy(device);
            return Err(e);
        }
    };

    let result = submit_once(device, pool, queue, |cmd| {
        let region = vk::BufferCopy::default().size(size);
        // SAFETY: the command buffer is in the recording state inside
        // `submit_once` and every handle is owned by this call.
        unsafe { device.cmd_copy_buffer(cmd, staging.buffer, dst.buffer, &[region]) };
    });

    staging.destroy(device);

    match result {
        Ok(()) => Ok(dst),
        Err(e) => {
            dst.destroy(device);
            Err(e)
        }
    }
}

/// Create a 2D image with bound device-local memory.
///
/// # Safety
/// The device must be valid and `memory` must describe its physical device.
pub unsafe fn create_image(
    device: &ash::Device,
    memory: &vk::PhysicalDeviceMemoryProperties,
    extent: vk::Extent2D,
    format: vk::Format,
    usage: vk::ImageUsageFlags,
) -> Result<(vk::Image, vk::DeviceMemory)> {
    let image_info = vk::ImageCreateInfo::default()
        .image_type(vk::ImageType::TYPE_2D)
        .extent(vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        })
        .mip_levels(1)
        .array_layers(1)
        .format(format)
        .tiling(vk::ImageTiling::OPTIMAL)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE)
        .samples(vk::SampleCountFlags::TYPE_1);

    let image = device.create_image(&image_info, None)?;
    let requirements = device.get_image_memory_requirements(image);

    let type_index = find_memory_type(
        memory,
        requirements.memory_type_bits,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )
    .ok_or(GpuError::NoSuitableMemoryType {
        type_filter: requirements.memory_type_bits,
        properties: vk::MemoryPropertyFlags::DEVICE_LOCAL,
    })?;

    let alloc_info = vk::MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(type_index);

    let image_memory = device.allocate_memory(&alloc_info, None)?;
    device.bind_image_memory(image, image_memory, 0)?;

    Ok((image, image_memory))
}

/// Barrier parameters for one image layout transition.
#[derive(Debug, Clone, Copy)]
struct TransitionMasks {
    src_access: vk::AccessFlags,
    dst_access: vk::AccessFlags,
    src_stage: vk::PipelineStageFlags,
    dst_stage: vk::PipelineStageFlags,
}

/// Access masks and pipeline stages for a supported layout transition.
///
/// Only the two transitions the upload path needs are supported; any other
/// pair is rejected.
fn transition_masks(from: vk::ImageLayout, to: vk::ImageLayout) -> Result<TransitionMasks> {
    match (from, to) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => {
            Ok(TransitionMasks {
                src_access: vk::AccessFlags::empty(),
                dst_access: vk::AccessFlags::TRANSFER_WRITE,
                src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
                dst_stage: vk::PipelineStageFlags::TRANSFER,
            })
        }
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Ok(TransitionMasks {
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
            })
        }
        _ => Err(GpuError::UnsupportedLayoutTransition { from, to }),
    }
}

/// Record a full-subresource layout transition barrier with masks already
/// resolved through [`transition_masks`].
///
/// # Safety
/// The command buffer must be in the recording state.
unsafe fn record_transition(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    from: vk::ImageLayout,
    to: vk::ImageLayout,
    masks: TransitionMasks,
) {
    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(from)
        .new_layout(to)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1),
        )
        .src_access_mask(masks.src_access)
        .dst_access_mask(masks.dst_access);

    device.cmd_pipeline_barrier(
        cmd,
        masks.src_stage,
        masks.dst_stage,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[barrier],
    );
}

/// Upload RGBA pixels into a new sampled device-local image.
///
/// Stages the pixels, transitions the image for transfer, copies, then
/// transitions to shader-read layout. Synchronous like [`upload_buffer`].
///
/// # Safety
/// All handles must be valid and `pixels` must hold `width * height * 4`
/// bytes.
pub unsafe fn upload_image(
    device: &ash::Device,
    memory: &vk::PhysicalDeviceMemoryProperties,
    pool: &CommandPool,
    queue: vk::Queue,
    pixels: &[u8],
    extent: vk::Extent2D,
    format: vk::Format,
) -> Result<DeviceImage> {
    let size = pixels.len() as vk::DeviceSize;

    // Both barriers are validated before anything is allocated.
    let to_transfer = transition_masks(
        vk::ImageLayout::UNDEFINED,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    )?;
    let to_shader = transition_masks(
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    )?;

    let staging = create_buffer(
        device,
        memory,
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;
    if let Err(e) = write_host_visible(device, staging.memory, 0, pixels) {
        staging.destroy(device);
        return Err(e);
    }

    let (image, image_memory) = match create_image(
        device,
        memory,
        extent,
        format,
        vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
    ) {
        Ok(pair) => pair,
        Err(e) => {
            staging.destroy(device);
            return Err(e);
        }
    };

    // SAFETY: the command buffer is in the recording state inside
    // `submit_once` and every handle is owned by this call.
    let result = submit_once(device, pool, queue, |cmd| unsafe {
        record_transition(
            device,
            cmd,
            image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            to_transfer,
        );

        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(
                vk::ImageSubresourceLayers::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .mip_level(0)
                    .base_array_layer(0)
                    .layer_count(1),
            )
            .image_offset(vk::Offset3D::default())
            .image_extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            });
        device.cmd_copy_buffer_to_image(
            cmd,
            staging.buffer,
            image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );

        record_transition(
            device,
            cmd,
            image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            to_shader,
        );
    });

    staging.destroy(device);

    if let Err(e) = result {
        device.destroy_image(image, None);
        device.free_memory(image_memory, None);
        return Err(e);
    }

    let view = match crate::swapchain::create_color_view(device, image, format) {
        Ok(view) => view,
        Err(e) => {
            device.destroy_image(image, None);
            device.free_memory(image_memory, None);
            return Err(e);
        }
    };

    tracing::debug!(
        width = extent.width,
        height = extent.height,
        bytes = pixels.len(),
        "texture uploaded"
    );

    Ok(DeviceImage {
        image,
        memory: image_memory,
        view,
        extent,
    })
}

/// Create a linear repeat sampler with 16x anisotropy.
///
/// # Safety
/// The device must be valid and must have been created with the
/// sampler-anisotropy feature enabled.
pub unsafe fn create_sampler(device: &ash::Device) -> Result<vk::Sampler> {
    let create_info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .anisotropy_enable(true)
        .max_anisotropy(16.0)
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .unnormalized_coordinates(false)
        .compare_enable(false)
        .compare_op(vk::CompareOp::ALWAYS)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR);

    Ok(device.create_sampler(&create_info, None)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_path_transitions_are_supported() {
        assert!(transition_masks(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL
        )
        .is_ok());
        assert!(transition_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        )
        .is_ok());
    }

    #[test]
    fn unknown_transition_pair_is_rejected() {
        let err = transition_masks(
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GpuError::UnsupportedLayoutTransition { .. }
        ));
    }

    #[test]
    fn transfer_dst_barrier_waits_in_transfer_stage() {
        let masks = transition_masks(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )
        .unwrap();
        assert_eq!(masks.src_access, vk::AccessFlags::empty());
        assert_eq!(masks.dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(masks.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(masks.dst_stage, vk::PipelineStageFlags::TRANSFER);
    }
}
