//! Swapchain-dependent render state.
//!
//! Everything here has the swapchain's lifetime: when the surface changes
//! size or the chain goes out of date, the whole bundle is destroyed in
//! reverse creation order and rebuilt.

use ash::vk;
use prism_gpu::{
    choose_present_mode, choose_surface_format, create_buffer, create_render_pass,
    write_combined_image_sampler, write_uniform_buffer, CommandPool, DescriptorPool, DeviceBuffer,
    GraphicsPipeline, GraphicsPipelineConfig, Result, SelectedAdapter, Swapchain,
};

use crate::camera::FrameUniforms;
use crate::vertex::Vertex;

/// Preferred swap surface format.
pub const PREFERRED_FORMAT: vk::Format = vk::Format::B8G8R8A8_UNORM;
/// Preferred color space paired with [`PREFERRED_FORMAT`].
pub const PREFERRED_COLOR_SPACE: vk::ColorSpaceKHR = vk::ColorSpaceKHR::SRGB_NONLINEAR;
/// Preferred present mode; FIFO is the fallback.
pub const PREFERRED_PRESENT_MODE: vk::PresentModeKHR = vk::PresentModeKHR::MAILBOX;

/// Long-lived inputs a chain build needs; all of these survive rebuilds.
pub struct ChainInputs<'a> {
    pub surface: vk::SurfaceKHR,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: &'a [vk::SurfaceFormatKHR],
    pub present_modes: &'a [vk::PresentModeKHR],
    pub memory: &'a vk::PhysicalDeviceMemoryProperties,
    pub selected: &'a SelectedAdapter,
    pub descriptor_layout: vk::DescriptorSetLayout,
    pub vertex_buffer: vk::Buffer,
    pub index_buffer: vk::Buffer,
    pub index_count: u32,
    pub texture_view: vk::ImageView,
    pub sampler: vk::Sampler,
    pub extent: vk::Extent2D,
}

/// The per-swapchain resource bundle.
///
/// All of the `Vec` fields hold exactly one element per swapchain image.
pub struct RenderChain {
    pub swapchain: Swapchain,
    pub render_pass: vk::RenderPass,
    pub pipeline: GraphicsPipeline,
    pub framebuffers: Vec<vk::Framebuffer>,
    pub uniform_buffers: Vec<DeviceBuffer>,
    pub descriptor_pool: DescriptorPool,
    pub descriptor_sets: Vec<vk::DescriptorSet>,
    pub command_buffers: Vec<vk::CommandBuffer>,
}

impl RenderChain {
    /// Build the full chain, unwinding everything created so far on the
    /// first failure.
    ///
    /// # Safety
    /// All handles in `inputs` must be valid.
    pub unsafe fn build(
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
        pool: &CommandPool,
        inputs: &ChainInputs<'_>,
    ) -> Result<Self> {
        let surface_format = choose_surface_format(
            inputs.formats,
            PREFERRED_FORMAT,
            PREFERRED_COLOR_SPACE,
        );
        let present_mode = choose_present_mode(inputs.present_modes, PREFERRED_PRESENT_MODE);

        let swapchain = Swapchain::create(
            device,
            swapchain_loader,
            inputs.surface,
            &inputs.capabilities,
            surface_format,
            present_mode,
            inputs.extent,
            inputs.selected,
        )?;

        let render_pass = match create_render_pass(device, swapchain.format) {
            Ok(render_pass) => render_pass,
            Err(e) => {
                swapchain.destroy(device, swapchain_loader);
                return Err(e);
            }
        };

        let config = GraphicsPipelineConfig {
            vertex_shader: prism_shaders::quad_vertex_shader().to_vec(),
            fragment_shader: prism_shaders::quad_fragment_shader().to_vec(),
            vertex_bindings: vec![Vertex::binding_description()],
            vertex_attributes: Vertex::attribute_descriptions(),
        };
        let pipeline = match GraphicsPipeline::new(
            device,
            &config,
            render_pass,
            swapchain.extent,
            &[inputs.descriptor_layout],
        ) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                device.destroy_render_pass(render_pass, None);
                swapchain.destroy(device, swapchain_loader);
                return Err(e);
            }
        };

        let framebuffers = match create_framebuffers(device, &swapchain, render_pass) {
            Ok(framebuffers) => framebuffers,
            Err(e) => {
                pipeline.destroy(device);
                device.destroy_render_pass(render_pass, None);
                swapchain.destroy(device, swapchain_loader);
                return Err(e);
            }
        };

        let uniform_buffers =
            match create_uniform_buffers(device, inputs.memory, swapchain.images.len()) {
                Ok(buffers) => buffers,
                Err(e) => {
                    destroy_framebuffers(device, &framebuffers);
                    pipeline.destroy(device);
                    device.destroy_render_pass(render_pass, None);
                    swapchain.destroy(device, swapchain_loader);
                    return Err(e);
                }
            };

        let image_count = swapchain.images.len();
        let (descriptor_pool, descriptor_sets) =
            match create_descriptor_sets(device, inputs, &uniform_buffers, image_count) {
                Ok(pair) => pair,
                Err(e) => {
                    for buffer in &uniform_buffers {
                        buffer.destroy(device);
                    }
                    destroy_framebuffers(device, &framebuffers);
                    pipeline.destroy(device);
                    device.destroy_render_pass(render_pass, None);
                    swapchain.destroy(device, swapchain_loader);
                    return Err(e);
                }
            };

        let command_buffers = match record_command_buffers(
            device,
            pool,
            inputs,
            &swapchain,
            render_pass,
            &pipeline,
            &framebuffers,
            &descriptor_sets,
        ) {
            Ok(buffers) => buffers,
            Err(e) => {
                descriptor_pool.destroy(device);
                for buffer in &uniform_buffers {
                    buffer.destroy(device);
                }
                destroy_framebuffers(device, &framebuffers);
                pipeline.destroy(device);
                device.destroy_render_pass(render_pass, None);
                swapchain.destroy(device, swapchain_loader);
                return Err(e);
            }
        };

        tracing::debug!(images = image_count, "render chain built");

        Ok(Self {
            swapchain,
            render_pass,
            pipeline,
            framebuffers,
            uniform_buffers,
            descriptor_pool,
            descriptor_sets,
            command_buffers,
        })
    }

    /// Number of swapchain images this chain was built for.
    pub fn image_count(&self) -> usize {
        self.swapchain.images.len()
    }

    /// Destroy the chain in reverse creation order.
    ///
    /// # Safety
    /// The device must be idle with respect to this chain.
    pub unsafe fn destroy(
        &self,
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
        pool: &CommandPool,
    ) {
        pool.free(device, &self.command_buffers);
        self.descriptor_pool.destroy(device);
        for buffer in &self.uniform_buffers {
            buffer.destroy(device);
        }
        destroy_framebuffers(device, &self.framebuffers);
        self.pipeline.destroy(device);
        device.destroy_render_pass(self.render_pass, None);
        self.swapchain.destroy(device, swapchain_loader);
    }
}

unsafe fn create_framebuffers(
    device: &ash::Device,
    swapchain: &Swapchain,
    render_pass: vk::RenderPass,
) -> Result<Vec<vk::Framebuffer>> {
    let mut framebuffers = Vec::with_capacity(swapchain.image_views.len());
    for &view in &swapchain.image_views {
        let attachments = [view];
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(swapchain.extent.width)
            .height(swapchain.extent.height)
            .layers(1);

        match device.create_framebuffer(&create_info, None) {
            Ok(framebuffer) => framebuffers.push(framebuffer),
            Err(e) => {
                destroy_framebuffers(device, &framebuffers);
                return Err(e.into());
            }
        }
    }
    Ok(framebuffers)
}

unsafe fn destroy_framebuffers(device: &ash::Device, framebuffers: &[vk::Framebuffer]) {
    for &framebuffer in framebuffers {
        device.destroy_framebuffer(framebuffer, None);
    }
}

unsafe fn create_uniform_buffers(
    device: &ash::Device,
    memory: &vk::PhysicalDeviceMemoryProperties,
    count: usize,
) -> Result<Vec<DeviceBuffer>> {
    let size = std::mem::size_of::<FrameUniforms>() as vk::DeviceSize;
    let mut buffers = Vec::with_capacity(count);
    for _ in 0..count {
        match create_buffer(
            device,
            memory,
            size,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ) {
            Ok(buffer) => buffers.push(buffer),
            Err(e) => {
                for buffer in &buffers {
                    buffer.destroy(device);
                }
                return Err(e);
            }
        }
    }
    Ok(buffers)
}

unsafe fn create_descriptor_sets(
    device: &ash::Device,
    inputs: &ChainInputs<'_>,
    uniform_buffers: &[DeviceBuffer],
    image_count: usize,
) -> Result<(DescriptorPool, Vec<vk::DescriptorSet>)> {
    let pool = DescriptorPool::new(device, image_count as u32)?;

    let layouts = vec![inputs.descriptor_layout; image_count];
    let sets = match pool.allocate(device, &layouts) {
        Ok(sets) => sets,
        Err(e) => {
            pool.destroy(device);
            return Err(e);
        }
    };

    for (set, buffer) in sets.iter().zip(uniform_buffers) {
        write_uniform_buffer(
            device,
            *set,
            0,
            buffer.buffer,
            std::mem::size_of::<FrameUniforms>() as u64,
        );
        write_combined_image_sampler(device, *set, 1, inputs.texture_view, inputs.sampler);
    }

    Ok((pool, sets))
}

#[allow(clippy::too_many_arguments)]
unsafe fn record_command_buffers(
    device: &ash::Device,
    pool: &CommandPool,
    inputs: &ChainInputs<'_>,
    swapchain: &Swapchain,
    render_pass: vk::RenderPass,
    pipeline: &GraphicsPipeline,
    framebuffers: &[vk::Framebuffer],
    descriptor_sets: &[vk::DescriptorSet],
) -> Result<Vec<vk::CommandBuffer>> {
    let command_buffers = pool.allocate(device, framebuffers.len() as u32)?;

    let clear_values = [vk::ClearValue {
        color: vk::ClearColorValue {
            float32: [0.0, 0.0, 0.0, 1.0],
        },
    }];

    for (i, &cmd) in command_buffers.iter().enumerate() {
        if let Err(e) = record_one(
            device,
            inputs,
            swapchain,
            render_pass,
            pipeline,
            framebuffers[i],
            descriptor_sets[i],
            &clear_values,
            cmd,
        ) {
            pool.free(device, &command_buffers);
            return Err(e);
        }
    }

    Ok(command_buffers)
}

#[allow(clippy::too_many_arguments)]
unsafe fn record_one(
    device: &ash::Device,
    inputs: &ChainInputs<'_>,
    swapchain: &Swapchain,
    render_pass: vk::RenderPass,
    pipeline: &GraphicsPipeline,
    framebuffer: vk::Framebuffer,
    descriptor_set: vk::DescriptorSet,
    clear_values: &[vk::ClearValue],
    cmd: vk::CommandBuffer,
) -> Result<()> {
    let begin_info = vk::CommandBufferBeginInfo::default();
    device.begin_command_buffer(cmd, &begin_info)?;

    let pass_info = vk::RenderPassBeginInfo::default()
        .render_pass(render_pass)
        .framebuffer(framebuffer)
        .render_area(vk::Rect2D::default().extent(swapchain.extent))
        .clear_values(clear_values);

    device.cmd_begin_render_pass(cmd, &pass_info, vk::SubpassContents::INLINE);
    device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline);
    device.cmd_bind_vertex_buffers(cmd, 0, &[inputs.vertex_buffer], &[0]);
    device.cmd_bind_index_buffer(cmd, inputs.index_buffer, 0, vk::IndexType::UINT16);
    device.cmd_bind_descriptor_sets(
        cmd,
        vk::PipelineBindPoint::GRAPHICS,
        pipeline.layout,
        0,
        &[descriptor_set],
        &[],
    );
    device.cmd_draw_indexed(cmd, inputs.index_count, 1, 0, 0, 0);
    device.cmd_end_render_pass(cmd);
    device.end_command_buffer(cmd)?;
    Ok(())
}
