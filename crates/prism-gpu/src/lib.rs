//! Vulkan abstraction layer for the Prism renderer.
//!
//! This crate provides:
//! - Vulkan instance and logical device management
//! - Adapter enumeration, scoring, and selection
//! - Explicit buffer/image allocation and staged transfers
//! - Command buffer and swapchain handling
//! - Frame synchronization

pub mod adapter;
pub mod command;
pub mod descriptors;
pub mod device;
pub mod error;
pub mod instance;
pub mod pipeline;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod transfer;

pub use adapter::{
    enumerate_adapters, find_memory_type, score_adapter, select_adapter, AdapterInfo,
    QueueFamily, SelectedAdapter, SurfaceSupport,
};
pub use command::{submit_frame, submit_once, CommandPool};
pub use descriptors::{
    write_combined_image_sampler, write_uniform_buffer, DescriptorPool, DescriptorSetLayoutBuilder,
};
pub use device::{create_logical_device, REQUIRED_DEVICE_EXTENSIONS};
pub use error::{GpuError, Result};
pub use instance::{create_debug_messenger, create_instance};
pub use pipeline::{create_render_pass, GraphicsPipeline, GraphicsPipelineConfig};
pub use surface::SurfaceContext;
pub use swapchain::{
    choose_present_mode, choose_surface_format, preferred_image_count, ImageAcquire,
    PresentOutcome, Swapchain,
};
pub use sync::{
    create_fence, create_semaphore, next_frame_slot, FrameSync, FrameSyncManager, FRAMES_IN_FLIGHT,
};
pub use transfer::{
    create_buffer, create_image, create_sampler, upload_buffer, upload_image, write_host_visible,
    DeviceBuffer, DeviceImage,
};
