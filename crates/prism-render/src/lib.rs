//! Swapchain-backed quad renderer.
//!
//! This crate provides:
//! - The [`Renderer`] owning the full Vulkan object graph
//! - The rebuildable swapchain-dependent [`RenderChain`]
//! - Vertex layout, fixed quad geometry, and the orthographic camera

pub mod camera;
pub mod chain;
pub mod renderer;
pub mod vertex;

pub use camera::{FrameUniforms, OrthoCamera};
pub use chain::{ChainInputs, RenderChain};
pub use renderer::{surface_extent, Renderer, TextureData};
pub use vertex::{Vertex, QUAD_INDICES, QUAD_VERTICES};
