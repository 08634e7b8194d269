//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// No GPU passed selection.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// The selected device lacks a memory type the renderer requires.
    #[error("No suitable memory type (filter {type_filter:#x}, properties {properties:?})")]
    NoSuitableMemoryType {
        type_filter: u32,
        properties: vk::MemoryPropertyFlags,
    },

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Shader module creation failed.
    #[error("Shader module creation failed: {0}")]
    ShaderModule(String),

    /// Pipeline creation failed.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// A layout transition pair the transfer subsystem does not handle.
    #[error("Unsupported image layout transition: {from:?} -> {to:?}")]
    UnsupportedLayoutTransition {
        from: vk::ImageLayout,
        to: vk::ImageLayout,
    },

    /// The renderer lost state it cannot restore; rendering must stop.
    #[error("Unrecoverable renderer state: {0}")]
    Unrecoverable(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl GpuError {
    /// Whether the frame loop must stop after this error.
    ///
    /// Most presentation errors are logged and the frame is dropped, but a
    /// lost chain or sync slot leaves dangling handles behind and the caller
    /// has to tear down instead of drawing again.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unrecoverable(_))
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecoverable_errors_are_fatal() {
        assert!(GpuError::Unrecoverable("chain destroyed but not rebuilt".into()).is_fatal());
    }

    #[test]
    fn presentation_errors_are_not_fatal() {
        assert!(!GpuError::Vulkan(vk::Result::ERROR_DEVICE_LOST).is_fatal());
        assert!(!GpuError::SwapchainCreation("out of memory".into()).is_fatal());
    }
}
