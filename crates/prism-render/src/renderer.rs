//! Renderer initialization and the per-frame draw loop.

use std::time::Instant;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use prism_gpu::{
    create_debug_messenger, create_instance, create_logical_device, create_sampler,
    enumerate_adapters, select_adapter, submit_frame, upload_buffer, upload_image, AdapterInfo,
    CommandPool, DescriptorSetLayoutBuilder, DeviceBuffer, DeviceImage, FrameSyncManager,
    GpuError, ImageAcquire, PresentOutcome, Result, SelectedAdapter, SurfaceContext,
    FRAMES_IN_FLIGHT, REQUIRED_DEVICE_EXTENSIONS,
};

use crate::camera::OrthoCamera;
use crate::chain::{ChainInputs, RenderChain};
use crate::vertex::{QUAD_INDICES, QUAD_VERTICES};

/// RGBA8 pixel data for the quad texture.
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// A small magenta-and-black checkerboard, used when no texture file is
    /// available.
    pub fn checkerboard(size: u32) -> Self {
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let on = (x / 4 + y / 4) % 2 == 0;
                if on {
                    pixels.extend_from_slice(&[255, 0, 255, 255]);
                } else {
                    pixels.extend_from_slice(&[0, 0, 0, 255]);
                }
            }
        }
        Self {
            width: size,
            height: size,
            pixels,
        }
    }
}

/// Result of the post-acquisition half of a frame.
enum FrameOutcome {
    /// The submission retired and presentation returned.
    Completed(PresentOutcome),
    /// The uniform write, fence reset, or queue submission failed; nothing
    /// reached presentation and the slot's sync objects are stale.
    SubmitFailed(GpuError),
    /// The submission went through but presentation returned an error other
    /// than out-of-date.
    PresentFailed(GpuError),
}

/// What the frame loop does once the submission/presentation stage returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameDisposition {
    /// The frame is on screen.
    Complete,
    /// The frame was handled but the chain must be rebuilt.
    Rebuild,
    /// The slot's sync objects must be replaced; the frame is dropped.
    RecycleSlot,
    /// The frame is dropped and the loop carries on.
    Skip,
}

fn frame_disposition(
    outcome: &FrameOutcome,
    suboptimal_acquire: bool,
    resized: bool,
) -> FrameDisposition {
    match outcome {
        FrameOutcome::Completed(PresentOutcome::Presented) if !suboptimal_acquire && !resized => {
            FrameDisposition::Complete
        }
        FrameOutcome::Completed(_) => FrameDisposition::Rebuild,
        FrameOutcome::SubmitFailed(_) => FrameDisposition::RecycleSlot,
        FrameOutcome::PresentFailed(_) => FrameDisposition::Skip,
    }
}

/// Objects created so far during [`Renderer::new`].
///
/// On a failed step [`Bootstrap::abort`] destroys the populated fields in
/// reverse creation order.
struct Bootstrap {
    entry: ash::Entry,
    instance: ash::Instance,
    debug: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface: Option<SurfaceContext>,
    device: Option<ash::Device>,
    swapchain_loader: Option<ash::khr::swapchain::Device>,
    command_pool: Option<CommandPool>,
    descriptor_layout: Option<vk::DescriptorSetLayout>,
    vertex_buffer: Option<DeviceBuffer>,
    index_buffer: Option<DeviceBuffer>,
    texture: Option<DeviceImage>,
    sampler: Option<vk::Sampler>,
    chain: Option<RenderChain>,
}

impl Bootstrap {
    /// Destroy whatever was partially created, in reverse creation order.
    ///
    /// # Safety
    /// No GPU work may reference the partially built state.
    unsafe fn abort(self) {
        if let Some(device) = &self.device {
            if device.device_wait_idle().is_err() {
                tracing::warn!("device wait failed during aborted initialization");
            }
            if let (Some(chain), Some(loader), Some(pool)) =
                (&self.chain, &self.swapchain_loader, &self.command_pool)
            {
                chain.destroy(device, loader, pool);
            }
            if let Some(sampler) = self.sampler {
                device.destroy_sampler(sampler, None);
            }
            if let Some(texture) = &self.texture {
                texture.destroy(device);
            }
            if let Some(buffer) = &self.index_buffer {
                buffer.destroy(device);
            }
            if let Some(buffer) = &self.vertex_buffer {
                buffer.destroy(device);
            }
            if let Some(layout) = self.descriptor_layout {
                device.destroy_descriptor_set_layout(layout, None);
            }
            if let Some(pool) = &self.command_pool {
                pool.destroy(device);
            }
            device.destroy_device(None);
        }
        if let Some(surface) = &self.surface {
            surface.destroy();
        }
        if let Some((loader, messenger)) = &self.debug {
            loader.destroy_debug_utils_messenger(*messenger, None);
        }
        self.instance.destroy_instance(None);
    }
}

/// Values produced during assembly that need no unwinding of their own.
struct Assembled {
    adapter: AdapterInfo,
    selected: SelectedAdapter,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    sync: FrameSyncManager,
    desired_extent: vk::Extent2D,
}

/// Full renderer state, from the Vulkan instance down to per-frame sync.
pub struct Renderer {
    _entry: ash::Entry,
    instance: ash::Instance,
    debug: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface: SurfaceContext,
    adapter: AdapterInfo,
    selected: SelectedAdapter,
    device: ash::Device,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    swapchain_loader: ash::khr::swapchain::Device,
    command_pool: CommandPool,
    descriptor_layout: vk::DescriptorSetLayout,
    vertex_buffer: DeviceBuffer,
    index_buffer: DeviceBuffer,
    texture: DeviceImage,
    sampler: vk::Sampler,
    camera: OrthoCamera,
    chain: RenderChain,
    /// Set when a rebuild destroyed the chain but could not replace it; the
    /// stale handles must never be touched again.
    chain_lost: bool,
    sync: FrameSyncManager,
    resized: bool,
    desired_extent: vk::Extent2D,
    frames_this_second: u32,
    fps_marker: Instant,
}

impl Renderer {
    /// Bring up the whole rendering stack against the given window.
    ///
    /// `required_extensions` are the platform surface extensions the window
    /// system needs on the instance. A failure at any step destroys what was
    /// already created before the error is returned.
    ///
    /// # Safety
    /// The window handles must stay valid for the renderer's lifetime.
    pub unsafe fn new<W>(
        window: &W,
        app_name: &str,
        required_extensions: &[*const i8],
        width: u32,
        height: u32,
        texture: &TextureData,
    ) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let entry = ash::Entry::load()
            .map_err(|e| GpuError::Other(format!("Failed to load Vulkan library: {e}")))?;

        let enable_validation = cfg!(debug_assertions);
        let instance = create_instance(&entry, app_name, required_extensions, enable_validation)?;

        let mut boot = Bootstrap {
            entry,
            instance,
            debug: None,
            surface: None,
            device: None,
            swapchain_loader: None,
            command_pool: None,
            descriptor_layout: None,
            vertex_buffer: None,
            index_buffer: None,
            texture: None,
            sampler: None,
            chain: None,
        };

        match Self::assemble(&mut boot, window, enable_validation, width, height, texture) {
            Ok(assembled) => Self::from_bootstrap(boot, assembled),
            Err(e) => {
                boot.abort();
                Err(e)
            }
        }
    }

    /// Create every renderer object, storing each one in `boot` as soon as
    /// it exists so a later failure can unwind it.
    unsafe fn assemble<W>(
        boot: &mut Bootstrap,
        window: &W,
        enable_validation: bool,
        width: u32,
        height: u32,
        texture: &TextureData,
    ) -> Result<Assembled>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        if enable_validation {
            boot.debug = Some(create_debug_messenger(&boot.entry, &boot.instance)?);
        }

        let surface = boot
            .surface
            .insert(SurfaceContext::from_window(&boot.entry, &boot.instance, window)?);

        let mut adapters =
            enumerate_adapters(&boot.instance, &surface.surface_loader, surface.surface)?;
        let selected = select_adapter(&adapters, REQUIRED_DEVICE_EXTENSIONS)
            .ok_or(GpuError::NoSuitableDevice)?;
        let adapter = adapters.swap_remove(selected.adapter_index);
        tracing::info!(
            name = %adapter.name,
            graphics_family = selected.graphics_family,
            present_family = selected.present_family,
            "adapter selected"
        );

        let (device, graphics_queue, present_queue) =
            create_logical_device(&boot.instance, &adapter, &selected)?;
        let device = boot.device.insert(device);
        let swapchain_loader = boot
            .swapchain_loader
            .insert(ash::khr::swapchain::Device::new(&boot.instance, device));

        let command_pool = boot
            .command_pool
            .insert(CommandPool::new(device, selected.graphics_family)?);

        let descriptor_layout = DescriptorSetLayoutBuilder::new()
            .uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
            .sampled_image(1, vk::ShaderStageFlags::FRAGMENT)
            .build(device)?;
        boot.descriptor_layout = Some(descriptor_layout);

        let vertex_buffer = boot.vertex_buffer.insert(upload_buffer(
            device,
            &adapter.memory,
            command_pool,
            graphics_queue,
            bytemuck::cast_slice(&QUAD_VERTICES),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?);
        let index_buffer = boot.index_buffer.insert(upload_buffer(
            device,
            &adapter.memory,
            command_pool,
            graphics_queue,
            bytemuck::cast_slice(&QUAD_INDICES),
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?);

        let texture_image = boot.texture.insert(upload_image(
            device,
            &adapter.memory,
            command_pool,
            graphics_queue,
            &texture.pixels,
            vk::Extent2D {
                width: texture.width,
                height: texture.height,
            },
            vk::Format::R8G8B8A8_SRGB,
        )?);
        let sampler = create_sampler(device)?;
        boot.sampler = Some(sampler);

        let desired_extent = vk::Extent2D { width, height };
        let extent = surface_extent(&adapter.surface.capabilities, desired_extent);

        boot.chain = Some(RenderChain::build(
            device,
            swapchain_loader,
            command_pool,
            &ChainInputs {
                surface: surface.surface,
                capabilities: adapter.surface.capabilities,
                formats: &adapter.surface.formats,
                present_modes: &adapter.surface.present_modes,
                memory: &adapter.memory,
                selected: &selected,
                descriptor_layout,
                vertex_buffer: vertex_buffer.buffer,
                index_buffer: index_buffer.buffer,
                index_count: QUAD_INDICES.len() as u32,
                texture_view: texture_image.view,
                sampler,
                extent,
            },
        )?);

        let sync = FrameSyncManager::new(device, FRAMES_IN_FLIGHT)?;

        Ok(Assembled {
            adapter,
            selected,
            graphics_queue,
            present_queue,
            sync,
            desired_extent,
        })
    }

    fn from_bootstrap(boot: Bootstrap, assembled: Assembled) -> Result<Self> {
        let Bootstrap {
            entry,
            instance,
            debug,
            surface,
            device,
            swapchain_loader,
            command_pool,
            descriptor_layout,
            vertex_buffer,
            index_buffer,
            texture,
            sampler,
            chain,
        } = boot;
        let (
            Some(surface),
            Some(device),
            Some(swapchain_loader),
            Some(command_pool),
            Some(descriptor_layout),
            Some(vertex_buffer),
            Some(index_buffer),
            Some(texture),
            Some(sampler),
            Some(chain),
        ) = (
            surface,
            device,
            swapchain_loader,
            command_pool,
            descriptor_layout,
            vertex_buffer,
            index_buffer,
            texture,
            sampler,
            chain,
        )
        else {
            return Err(GpuError::Other(
                "renderer bootstrap left a stage unbuilt".into(),
            ));
        };

        Ok(Self {
            _entry: entry,
            instance,
            debug,
            surface,
            adapter: assembled.adapter,
            selected: assembled.selected,
            device,
            graphics_queue: assembled.graphics_queue,
            present_queue: assembled.present_queue,
            swapchain_loader,
            command_pool,
            descriptor_layout,
            vertex_buffer,
            index_buffer,
            texture,
            sampler,
            camera: OrthoCamera::default(),
            chain,
            chain_lost: false,
            sync: assembled.sync,
            resized: false,
            desired_extent: assembled.desired_extent,
            frames_this_second: 0,
            fps_marker: Instant::now(),
        })
    }

    /// Record that the window surface changed size; consumed by the next
    /// [`Self::draw_frame`].
    pub fn note_resized(&mut self, width: u32, height: u32) {
        self.desired_extent = vk::Extent2D { width, height };
        self.resized = true;
    }

    /// Render and present one frame.
    ///
    /// Skips the frame and rebuilds the chain when the swapchain is out of
    /// date at acquisition; rebuilds after presenting when the chain is
    /// suboptimal or a resize was noted. Submission and presentation errors
    /// drop the frame without stopping the loop; errors where the renderer
    /// cannot keep going come back as [`GpuError::Unrecoverable`].
    ///
    /// # Safety
    /// The renderer must have been fully initialized and not destroyed.
    pub unsafe fn draw_frame(&mut self) -> Result<()> {
        if self.chain_lost {
            return Err(GpuError::Unrecoverable(
                "render chain was lost by a failed rebuild".into(),
            ));
        }

        self.sync.current().wait(&self.device)?;

        let acquire = self.chain.swapchain.acquire_next_image(
            &self.swapchain_loader,
            self.sync.current().image_available,
            u64::MAX,
        )?;
        let (image_index, suboptimal_acquire) = match acquire {
            ImageAcquire::Ready {
                image_index,
                suboptimal,
            } => (image_index, suboptimal),
            ImageAcquire::OutOfDate => {
                return self.rebuild_chain();
            }
        };

        let outcome = self.submit_and_present(image_index);

        // The slot moves on after every successful acquisition, whatever
        // happened at submission or presentation.
        match frame_disposition(&outcome, suboptimal_acquire, self.resized) {
            FrameDisposition::Complete => {
                self.sync.advance();
                self.count_frame();
                Ok(())
            }
            FrameDisposition::Rebuild => {
                self.sync.advance();
                self.count_frame();
                self.resized = false;
                self.rebuild_chain()
            }
            FrameDisposition::RecycleSlot => {
                if let FrameOutcome::SubmitFailed(e) = &outcome {
                    tracing::error!(error = %e, "frame submission failed, frame dropped");
                }
                self.recycle_slot()?;
                self.sync.advance();
                Ok(())
            }
            FrameDisposition::Skip => {
                if let FrameOutcome::PresentFailed(e) = &outcome {
                    tracing::error!(error = %e, "presentation failed, frame dropped");
                }
                self.sync.advance();
                Ok(())
            }
        }
    }

    /// Update uniforms, submit the pre-recorded commands, and present.
    ///
    /// Failures before the queue submission leave the slot's fence reset or
    /// its acquire semaphore signaled; they come back as
    /// [`FrameOutcome::SubmitFailed`] so the caller recycles the slot.
    unsafe fn submit_and_present(&self, image_index: u32) -> FrameOutcome {
        // Uniforms are tied to the acquired image, not the frame slot, since
        // the descriptor sets are indexed per swapchain image.
        if let Err(e) = self.update_uniforms(image_index) {
            return FrameOutcome::SubmitFailed(e);
        }

        // The fence is only reset once a submit is expected to follow.
        let sync = self.sync.current();
        if let Err(e) = sync.reset(&self.device) {
            return FrameOutcome::SubmitFailed(e);
        }
        if let Err(e) = submit_frame(
            &self.device,
            self.graphics_queue,
            &[self.chain.command_buffers[image_index as usize]],
            &[sync.image_available],
            &[vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT],
            &[sync.render_finished],
            sync.in_flight,
        ) {
            return FrameOutcome::SubmitFailed(e);
        }

        let render_finished = [sync.render_finished];
        match self.chain.swapchain.present(
            &self.swapchain_loader,
            self.present_queue,
            image_index,
            &render_finished,
        ) {
            Ok(outcome) => FrameOutcome::Completed(outcome),
            Err(e) => FrameOutcome::PresentFailed(e),
        }
    }

    /// Replace the current slot's sync objects after a failed submission.
    ///
    /// The slot's fence was reset with nothing left to signal it; waiting on
    /// it again would block forever, so the objects are recreated. A failure
    /// here is unrecoverable.
    unsafe fn recycle_slot(&mut self) -> Result<()> {
        // The acquire's semaphore signal must retire before the slot's
        // objects are destroyed.
        let drained = self.device.device_wait_idle().map_err(GpuError::from);
        let recycled = match drained {
            Ok(()) => self.sync.recycle_current(&self.device),
            Err(e) => Err(e),
        };
        recycled.map_err(|e| {
            GpuError::Unrecoverable(format!(
                "sync slot not recycled after a failed submission: {e}"
            ))
        })
    }

    /// Tear down the swapchain-dependent state and build it again at the
    /// current surface size.
    ///
    /// When the new chain cannot be built the old one is already gone; the
    /// renderer marks itself lost and every further [`Self::draw_frame`]
    /// returns [`GpuError::Unrecoverable`].
    ///
    /// # Safety
    /// The renderer must have been fully initialized and not destroyed.
    pub unsafe fn rebuild_chain(&mut self) -> Result<()> {
        self.device.device_wait_idle()?;
        self.chain
            .destroy(&self.device, &self.swapchain_loader, &self.command_pool);
        // From here until a new chain lands the old handles are dangling.
        self.chain_lost = true;

        match self.build_chain_at_surface_size() {
            Ok(chain) => {
                tracing::info!(
                    width = chain.swapchain.extent.width,
                    height = chain.swapchain.extent.height,
                    "render chain rebuilt"
                );
                self.chain = chain;
                self.chain_lost = false;
                Ok(())
            }
            Err(e) => Err(GpuError::Unrecoverable(format!(
                "render chain destroyed but not rebuilt: {e}"
            ))),
        }
    }

    /// Requery the surface and build a chain at its current size.
    ///
    /// Surface properties are requeried every time: the old capabilities
    /// describe the old window size.
    unsafe fn build_chain_at_surface_size(&self) -> Result<RenderChain> {
        let loader = &self.surface.surface_loader;
        let capabilities = loader
            .get_physical_device_surface_capabilities(self.adapter.handle, self.surface.surface)?;
        let formats = loader
            .get_physical_device_surface_formats(self.adapter.handle, self.surface.surface)?;
        let present_modes = loader
            .get_physical_device_surface_present_modes(self.adapter.handle, self.surface.surface)?;

        let extent = surface_extent(&capabilities, self.desired_extent);

        RenderChain::build(
            &self.device,
            &self.swapchain_loader,
            &self.command_pool,
            &ChainInputs {
                surface: self.surface.surface,
                capabilities,
                formats: &formats,
                present_modes: &present_modes,
                memory: &self.adapter.memory,
                selected: &self.selected,
                descriptor_layout: self.descriptor_layout,
                vertex_buffer: self.vertex_buffer.buffer,
                index_buffer: self.index_buffer.buffer,
                index_count: QUAD_INDICES.len() as u32,
                texture_view: self.texture.view,
                sampler: self.sampler,
                extent,
            },
        )
    }

    unsafe fn update_uniforms(&self, image_index: u32) -> Result<()> {
        let uniforms = self.camera.uniforms();
        let buffer = &self.chain.uniform_buffers[image_index as usize];
        prism_gpu::write_host_visible(
            &self.device,
            buffer.memory,
            0,
            bytemuck::bytes_of(&uniforms),
        )
    }

    fn count_frame(&mut self) {
        self.frames_this_second += 1;
        if self.fps_marker.elapsed().as_secs() >= 1 {
            tracing::debug!(fps = self.frames_this_second, "frame rate");
            self.frames_this_second = 0;
            self.fps_marker = Instant::now();
        }
    }

    /// Destroy every Vulkan object the renderer owns, in reverse creation
    /// order.
    ///
    /// # Safety
    /// Must be called exactly once, after which the renderer must not be
    /// used.
    pub unsafe fn destroy(&mut self) {
        if self.device.device_wait_idle().is_err() {
            tracing::warn!("device wait failed during teardown");
        }

        self.sync.destroy(&self.device);
        // A lost chain was already destroyed by the rebuild that failed.
        if !self.chain_lost {
            self.chain
                .destroy(&self.device, &self.swapchain_loader, &self.command_pool);
        }
        self.device.destroy_sampler(self.sampler, None);
        self.texture.destroy(&self.device);
        self.index_buffer.destroy(&self.device);
        self.vertex_buffer.destroy(&self.device);
        self.device
            .destroy_descriptor_set_layout(self.descriptor_layout, None);
        self.command_pool.destroy(&self.device);
        self.device.destroy_device(None);
        self.surface.destroy();
        if let Some((loader, messenger)) = &self.debug {
            loader.destroy_debug_utils_messenger(*messenger, None);
        }
        self.instance.destroy_instance(None);
    }
}

/// Resolve the swapchain extent from the surface capabilities.
///
/// When the surface pins the extent it is used as-is; otherwise the desired
/// size is clamped into the supported range.
pub fn surface_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    vk::Extent2D {
        width: desired.width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: desired.height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_surface_extent_wins_over_desired() {
        let mut caps = vk::SurfaceCapabilitiesKHR::default();
        caps.current_extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let extent = surface_extent(
            &caps,
            vk::Extent2D {
                width: 1280,
                height: 720,
            },
        );
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn unpinned_extent_clamps_desired_size() {
        let mut caps = vk::SurfaceCapabilitiesKHR::default();
        caps.current_extent = vk::Extent2D {
            width: u32::MAX,
            height: u32::MAX,
        };
        caps.min_image_extent = vk::Extent2D {
            width: 64,
            height: 64,
        };
        caps.max_image_extent = vk::Extent2D {
            width: 1024,
            height: 1024,
        };
        let extent = surface_extent(
            &caps,
            vk::Extent2D {
                width: 1280,
                height: 32,
            },
        );
        assert_eq!((extent.width, extent.height), (1024, 64));
    }

    #[test]
    fn checkerboard_texture_is_rgba8() {
        let tex = TextureData::checkerboard(8);
        assert_eq!(tex.pixels.len(), 8 * 8 * 4);
        assert_eq!(&tex.pixels[0..4], &[255, 0, 255, 255]);
    }

    #[test]
    fn failed_submission_recycles_the_slot() {
        let outcome = FrameOutcome::SubmitFailed(GpuError::Vulkan(vk::Result::ERROR_DEVICE_LOST));
        assert_eq!(
            frame_disposition(&outcome, false, false),
            FrameDisposition::RecycleSlot
        );
        // A pending resize stays pending; the next completed frame rebuilds.
        assert_eq!(
            frame_disposition(&outcome, false, true),
            FrameDisposition::RecycleSlot
        );
    }

    #[test]
    fn failed_presentation_skips_without_recycling() {
        let outcome =
            FrameOutcome::PresentFailed(GpuError::Vulkan(vk::Result::ERROR_SURFACE_LOST_KHR));
        assert_eq!(frame_disposition(&outcome, false, false), FrameDisposition::Skip);
    }

    #[test]
    fn completed_frames_rebuild_only_when_flagged() {
        let presented = FrameOutcome::Completed(PresentOutcome::Presented);
        assert_eq!(
            frame_disposition(&presented, false, false),
            FrameDisposition::Complete
        );
        assert_eq!(
            frame_disposition(&presented, true, false),
            FrameDisposition::Rebuild
        );
        assert_eq!(
            frame_disposition(&presented, false, true),
            FrameDisposition::Rebuild
        );

        let suboptimal = FrameOutcome::Completed(PresentOutcome::Suboptimal);
        assert_eq!(
            frame_disposition(&suboptimal, false, false),
            FrameDisposition::Rebuild
        );
        let out_of_date = FrameOutcome::Completed(PresentOutcome::OutOfDate);
        assert_eq!(
            frame_disposition(&out_of_date, false, false),
            FrameDisposition::Rebuild
        );
    }
}
