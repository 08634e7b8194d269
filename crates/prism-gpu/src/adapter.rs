//! Physical device catalog and selection.
//!
//! Enumeration snapshots every adapter's capabilities once; selection then
//! works purely on those snapshots, so scoring and queue resolution never
//! touch the Vulkan API again.

use crate::error::{GpuError, Result};
use ash::vk;
use std::ffi::CStr;

/// One command queue family on an adapter.
#[derive(Debug, Clone, Copy)]
pub struct QueueFamily {
    /// Index into the adapter's queue family list.
    pub index: u32,
    /// Capability flags (graphics, compute, transfer, ...).
    pub flags: vk::QueueFlags,
    /// Whether this family can present to the enumeration surface.
    pub supports_present: bool,
}

/// Surface support facts queried per adapter at enumeration time.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

/// Immutable facts about one physical adapter.
///
/// Created once at enumeration time, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub queue_families: Vec<QueueFamily>,
    pub extensions: Vec<String>,
    pub max_image_dimension_2d: u32,
    pub surface: SurfaceSupport,
    pub memory: vk::PhysicalDeviceMemoryProperties,
}

impl AdapterInfo {
    /// First queue family advertising the given capability.
    pub fn queue_family_for(&self, flags: vk::QueueFlags) -> Option<u32> {
        self.queue_families
            .iter()
            .find(|f| f.flags.contains(flags))
            .map(|f| f.index)
    }

    /// First queue family that can present to the surface.
    pub fn present_family(&self) -> Option<u32> {
        self.queue_families
            .iter()
            .find(|f| f.supports_present)
            .map(|f| f.index)
    }

    /// First queue family supporting both graphics and presentation.
    pub fn combined_family(&self) -> Option<u32> {
        self.queue_families
            .iter()
            .find(|f| f.flags.contains(vk::QueueFlags::GRAPHICS) && f.supports_present)
            .map(|f| f.index)
    }

    pub fn is_discrete(&self) -> bool {
        self.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
    }

    /// Check that every required extension name is advertised.
    pub fn supports_extensions(&self, required: &[&str]) -> bool {
        for name in required {
            if !self.extensions.iter().any(|e| e == name) {
                tracing::debug!(adapter = %self.name, extension = name, "missing required extension");
                return false;
            }
        }
        true
    }
}

/// The chosen adapter plus resolved queue family indices.
///
/// Exactly one exists after successful initialization; the swapchain may be
/// rebuilt at runtime, the device selection never is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedAdapter {
    /// Index into the enumerated adapter list.
    pub adapter_index: usize,
    pub graphics_family: u32,
    pub present_family: u32,
}

impl SelectedAdapter {
    /// Whether graphics and presentation share one queue family.
    pub fn single_queue(&self) -> bool {
        self.graphics_family == self.present_family
    }
}

/// Enumerate all physical adapters and snapshot their capabilities.
///
/// Fails with [`GpuError::NoSuitableDevice`] when the platform reports zero
/// adapters.
///
/// # Safety
/// The instance and surface must be valid.
pub unsafe fn enumerate_adapters(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<Vec<AdapterInfo>> {
    let devices = instance.enumerate_physical_devices()?;
    if devices.is_empty() {
        tracing::error!("no GPUs with Vulkan support found");
        return Err(GpuError::NoSuitableDevice);
    }

    let mut adapters = Vec::with_capacity(devices.len());
    for device in devices {
        let info = query_adapter(instance, surface_loader, surface, device)?;
        log_adapter(&info);
        adapters.push(info);
    }

    Ok(adapters)
}

/// Snapshot one adapter's capabilities.
///
/// # Safety
/// The instance, surface, and physical device must be valid.
unsafe fn query_adapter(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    device: vk::PhysicalDevice,
) -> Result<AdapterInfo> {
    let properties = instance.get_physical_device_properties(device);
    let name = CStr::from_ptr(properties.device_name.as_ptr())
        .to_string_lossy()
        .into_owned();

    let queue_families = instance
        .get_physical_device_queue_family_properties(device)
        .iter()
        .enumerate()
        .map(|(i, family)| {
            let index = i as u32;
            // SAFETY: the device and surface are valid per the caller's contract.
            let supports_present = unsafe {
                surface_loader.get_physical_device_surface_support(device, index, surface)
            }
            .unwrap_or(false);
            QueueFamily {
                index,
                flags: family.queue_flags,
                supports_present,
            }
        })
        .collect();

    let extensions = instance
        .enumerate_device_extension_properties(device)?
        .iter()
        .filter_map(|ext| {
            // SAFETY: extension_name is a NUL-terminated array filled by the driver.
            unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }
                .to_str()
                .ok()
                .map(String::from)
        })
        .collect();

    let surface_support = SurfaceSupport {
        capabilities: surface_loader.get_physical_device_surface_capabilities(device, surface)?,
        formats: surface_loader.get_physical_device_surface_formats(device, surface)?,
        present_modes: surface_loader
            .get_physical_device_surface_present_modes(device, surface)?,
    };

    let memory = instance.get_physical_device_memory_properties(device);

    Ok(AdapterInfo {
        handle: device,
        name,
        device_type: properties.device_type,
        queue_families,
        extensions,
        max_image_dimension_2d: properties.limits.max_image_dimension2_d,
        surface: surface_support,
        memory,
    })
}

/// Log an adapter's capability summary.
fn log_adapter(info: &AdapterInfo) {
    tracing::debug!(
        adapter = %info.name,
        device_type = ?info.device_type,
        queue_families = info.queue_families.len(),
        extensions = info.extensions.len(),
        max_texture = info.max_image_dimension_2d,
        "enumerated adapter"
    );
    for family in &info.queue_families {
        tracing::trace!(
            queue = family.index,
            flags = ?family.flags,
            present = family.supports_present,
            "queue family"
        );
    }
    for format in &info.surface.formats {
        tracing::trace!(format = ?format.format, color_space = ?format.color_space, "surface format");
    }
    tracing::trace!(modes = ?info.surface.present_modes, "present modes");
}

/// Score an adapter against the requirements.
///
/// A device that cannot present, has no graphics-capable family, or is
/// missing a required extension scores 0 and is never selected. Otherwise a
/// discrete GPU earns a flat 1000 bonus and every device adds its maximum 2D
/// texture dimension as a capability proxy.
pub fn score_adapter(info: &AdapterInfo, required_extensions: &[&str]) -> u32 {
    if info.queue_family_for(vk::QueueFlags::GRAPHICS).is_none()
        || info.present_family().is_none()
    {
        return 0;
    }

    if !info.supports_extensions(required_extensions) {
        return 0;
    }

    let mut score = 0;

    // Discrete GPUs have a significant performance advantage
    if info.is_discrete() {
        score += 1000;
    }

    // Maximum texture size is a proxy for overall capability
    score += info.max_image_dimension_2d;

    score
}

/// Pick the highest-scoring adapter and resolve its queue families.
///
/// Ties break towards the first-seen adapter. Returns `None` when no adapter
/// scores above zero.
pub fn select_adapter(
    adapters: &[AdapterInfo],
    required_extensions: &[&str],
) -> Option<SelectedAdapter> {
    let mut best: Option<(usize, u32)> = None;
    for (index, info) in adapters.iter().enumerate() {
        let score = score_adapter(info, required_extensions);
        tracing::debug!(adapter = %info.name, score, "scored adapter");
        if score > 0 && best.map_or(true, |(_, max)| score > max) {
            best = Some((index, score));
        }
    }

    let (adapter_index, score) = best?;
    let info = &adapters[adapter_index];

    // One family doing both graphics and present avoids cross-queue
    // synchronization entirely.
    let (graphics_family, present_family) = match info.combined_family() {
        Some(family) => (family, family),
        None => (
            info.queue_family_for(vk::QueueFlags::GRAPHICS)?,
            info.present_family()?,
        ),
    };

    tracing::info!(
        adapter = %info.name,
        score,
        graphics_family,
        present_family,
        "selected adapter"
    );

    Some(SelectedAdapter {
        adapter_index,
        graphics_family,
        present_family,
    })
}

/// Find the first memory type satisfying the filter bitmask and property flags.
pub fn find_memory_type(
    memory: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..memory.memory_type_count).find(|&i| {
        (type_filter & (1 << i)) != 0
            && memory.memory_types[i as usize]
                .property_flags
                .contains(properties)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SWAPCHAIN_EXT: &str = "VK_KHR_swapchain";

    fn family(index: u32, flags: vk::QueueFlags, supports_present: bool) -> QueueFamily {
        QueueFamily {
            index,
            flags,
            supports_present,
        }
    }

    fn adapter(
        name: &str,
        device_type: vk::PhysicalDeviceType,
        max_texture: u32,
        families: Vec<QueueFamily>,
        extensions: &[&str],
    ) -> AdapterInfo {
        AdapterInfo {
            handle: vk::PhysicalDevice::null(),
            name: name.to_string(),
            device_type,
            queue_families: families,
            extensions: extensions.iter().map(|s| (*s).to_string()).collect(),
            max_image_dimension_2d: max_texture,
            surface: SurfaceSupport::default(),
            memory: vk::PhysicalDeviceMemoryProperties::default(),
        }
    }

    fn capable_adapter(name: &str, device_type: vk::PhysicalDeviceType, max_texture: u32) -> AdapterInfo {
        adapter(
            name,
            device_type,
            max_texture,
            vec![family(0, vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, true)],
            &[SWAPCHAIN_EXT],
        )
    }

    #[test]
    fn discrete_gpu_gets_flat_bonus_plus_texture_size() {
        let discrete = capable_adapter("dgpu", vk::PhysicalDeviceType::DISCRETE_GPU, 16384);
        let integrated = capable_adapter("igpu", vk::PhysicalDeviceType::INTEGRATED_GPU, 8192);

        assert_eq!(score_adapter(&discrete, &[SWAPCHAIN_EXT]), 1000 + 16384);
        assert_eq!(score_adapter(&integrated, &[SWAPCHAIN_EXT]), 8192);
    }

    #[test]
    fn integrated_can_outscore_discrete_past_exact_threshold() {
        let discrete = capable_adapter("dgpu", vk::PhysicalDeviceType::DISCRETE_GPU, 4096);
        // 1000 + 4096 = 5096; an integrated device needs a strictly higher score.
        let at_threshold = capable_adapter("igpu-eq", vk::PhysicalDeviceType::INTEGRATED_GPU, 5096);
        let past_threshold =
            capable_adapter("igpu-gt", vk::PhysicalDeviceType::INTEGRATED_GPU, 5097);

        let tied = vec![discrete.clone(), at_threshold];
        let selected = select_adapter(&tied, &[SWAPCHAIN_EXT]).unwrap();
        assert_eq!(selected.adapter_index, 0, "equal score keeps first-seen device");

        let beaten = vec![discrete, past_threshold];
        let selected = select_adapter(&beaten, &[SWAPCHAIN_EXT]).unwrap();
        assert_eq!(selected.adapter_index, 1);
    }

    #[test]
    fn missing_extension_disqualifies_even_superior_device() {
        let superior = adapter(
            "dgpu",
            vk::PhysicalDeviceType::DISCRETE_GPU,
            32768,
            vec![family(0, vk::QueueFlags::GRAPHICS, true)],
            &[],
        );
        assert_eq!(score_adapter(&superior, &[SWAPCHAIN_EXT]), 0);
        assert!(select_adapter(&[superior], &[SWAPCHAIN_EXT]).is_none());
    }

    #[test]
    fn no_present_capable_family_disqualifies() {
        let headless = adapter(
            "dgpu",
            vk::PhysicalDeviceType::DISCRETE_GPU,
            16384,
            vec![family(0, vk::QueueFlags::GRAPHICS, false)],
            &[SWAPCHAIN_EXT],
        );
        assert_eq!(score_adapter(&headless, &[SWAPCHAIN_EXT]), 0);
    }

    #[test]
    fn no_graphics_family_disqualifies() {
        let compute_only = adapter(
            "accel",
            vk::PhysicalDeviceType::DISCRETE_GPU,
            16384,
            vec![family(0, vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, true)],
            &[SWAPCHAIN_EXT],
        );
        assert_eq!(score_adapter(&compute_only, &[SWAPCHAIN_EXT]), 0);
    }

    #[test]
    fn maximum_score_wins_not_last_qualifying() {
        // Guards against the selection loop degenerating into "last nonzero
        // score wins": a weaker qualifying device enumerated later must not
        // displace the earlier maximum.
        let best = capable_adapter("dgpu", vk::PhysicalDeviceType::DISCRETE_GPU, 16384);
        let weaker = capable_adapter("igpu", vk::PhysicalDeviceType::INTEGRATED_GPU, 2048);

        let selected = select_adapter(&[best, weaker], &[SWAPCHAIN_EXT]).unwrap();
        assert_eq!(selected.adapter_index, 0);
    }

    #[test]
    fn combined_family_resolves_to_single_queue() {
        let info = capable_adapter("dgpu", vk::PhysicalDeviceType::DISCRETE_GPU, 16384);
        let selected = select_adapter(std::slice::from_ref(&info), &[SWAPCHAIN_EXT]).unwrap();
        assert_eq!(selected.graphics_family, selected.present_family);
        assert!(selected.single_queue());
    }

    #[test]
    fn disjoint_families_resolve_to_two_valid_indices() {
        let info = adapter(
            "split",
            vk::PhysicalDeviceType::DISCRETE_GPU,
            16384,
            vec![
                family(0, vk::QueueFlags::GRAPHICS, false),
                family(1, vk::QueueFlags::TRANSFER, true),
            ],
            &[SWAPCHAIN_EXT],
        );
        let selected = select_adapter(std::slice::from_ref(&info), &[SWAPCHAIN_EXT]).unwrap();
        assert_eq!(selected.graphics_family, 0);
        assert_eq!(selected.present_family, 1);
        assert!(!selected.single_queue());
        assert!((selected.graphics_family as usize) < info.queue_families.len());
        assert!((selected.present_family as usize) < info.queue_families.len());
    }

    #[test]
    fn combined_family_preferred_over_split_graphics() {
        // Family 0 does graphics but not present; family 1 does both. The
        // resolver must land on family 1 for both roles.
        let info = adapter(
            "mixed",
            vk::PhysicalDeviceType::DISCRETE_GPU,
            16384,
            vec![
                family(0, vk::QueueFlags::GRAPHICS, false),
                family(1, vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, true),
            ],
            &[SWAPCHAIN_EXT],
        );
        let selected = select_adapter(&[info], &[SWAPCHAIN_EXT]).unwrap();
        assert_eq!(selected.graphics_family, 1);
        assert_eq!(selected.present_family, 1);
    }

    #[test]
    fn empty_catalog_selects_nothing() {
        assert!(select_adapter(&[], &[SWAPCHAIN_EXT]).is_none());
    }

    #[test]
    fn discrete_vs_integrated_end_to_end() {
        // Scenario from the selection contract: one discrete device
        // (16384, combined queue) against an otherwise equal integrated
        // device (8192).
        let discrete = capable_adapter("dgpu", vk::PhysicalDeviceType::DISCRETE_GPU, 16384);
        let integrated = capable_adapter("igpu", vk::PhysicalDeviceType::INTEGRATED_GPU, 8192);

        let selected = select_adapter(&[integrated, discrete], &[SWAPCHAIN_EXT]).unwrap();
        assert_eq!(selected.adapter_index, 1);
        assert_eq!(selected.graphics_family, 0);
        assert_eq!(selected.present_family, 0);
    }

    #[test]
    fn memory_type_scan_honors_filter_and_properties() {
        let mut memory = vk::PhysicalDeviceMemoryProperties::default();
        memory.memory_type_count = 3;
        memory.memory_types[0].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        memory.memory_types[1].property_flags =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        memory.memory_types[2].property_flags =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;

        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;

        // First satisfying index wins.
        assert_eq!(find_memory_type(&memory, 0b111, host), Some(1));
        // The filter bitmask can exclude the first candidate.
        assert_eq!(find_memory_type(&memory, 0b100, host), Some(2));
        assert_eq!(find_memory_type(&memory, 0b001, host), None);
        assert_eq!(
            find_memory_type(&memory, 0b111, vk::MemoryPropertyFlags::DEVICE_LOCAL),
            Some(0)
        );
    }
}
