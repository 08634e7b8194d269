//! Frame synchronization primitives.

use crate::error::Result;
use ash::vk;

/// Number of frames the CPU may record ahead of the GPU.
pub const FRAMES_IN_FLIGHT: usize = 2;

/// Create a semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    Ok(device.create_semaphore(&create_info, None)?)
}

/// Create a fence, optionally pre-signaled.
///
/// Frame fences start signaled so the first wait on each slot returns
/// immediately.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };

    let create_info = vk::FenceCreateInfo::default().flags(flags);
    Ok(device.create_fence(&create_info, None)?)
}

/// Per-slot synchronization objects for one in-flight frame.
pub struct FrameSync {
    /// Signaled when the acquired image is ready for rendering.
    pub image_available: vk::Semaphore,
    /// Signaled when rendering commands have finished.
    pub render_finished: vk::Semaphore,
    /// Signaled when the slot's last submission has retired.
    pub in_flight: vk::Fence,
}

impl FrameSync {
    /// Create the slot's semaphores and fence.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device) -> Result<Self> {
        let image_available = create_semaphore(device)?;
        let render_finished = match create_semaphore(device) {
            Ok(semaphore) => semaphore,
            Err(e) => {
                device.destroy_semaphore(image_available, None);
                return Err(e);
            }
        };
        let in_flight = match create_fence(device, true) {
            Ok(fence) => fence,
            Err(e) => {
                device.destroy_semaphore(render_finished, None);
                device.destroy_semaphore(image_available, None);
                return Err(e);
            }
        };

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }

    /// Block until the slot's previous submission has retired.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn wait(&self, device: &ash::Device) -> Result<()> {
        device.wait_for_fences(&[self.in_flight], true, u64::MAX)?;
        Ok(())
    }

    /// Unsignal the fence. Called only once a submission is guaranteed to
    /// follow, so a rebuild bail-out never leaves the fence unsignaled.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn reset(&self, device: &ash::Device) -> Result<()> {
        device.reset_fences(&[self.in_flight])?;
        Ok(())
    }

    /// Destroy the slot's objects.
    ///
    /// # Safety
    /// The device must be valid and the objects must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_semaphore(self.image_available, None);
        device.destroy_semaphore(self.render_finished, None);
        device.destroy_fence(self.in_flight, None);
    }
}

/// Round-robin set of [`FrameSync`] slots.
pub struct FrameSyncManager {
    slots: Vec<FrameSync>,
    current: usize,
}

impl FrameSyncManager {
    /// Create `frames_in_flight` slots.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device, frames_in_flight: usize) -> Result<Self> {
        let mut slots = Vec::with_capacity(frames_in_flight);
        for _ in 0..frames_in_flight {
            match FrameSync::new(device) {
                Ok(slot) => slots.push(slot),
                Err(e) => {
                    for slot in &slots {
                        slot.destroy(device);
                    }
                    return Err(e);
                }
            }
        }

        Ok(Self { slots, current: 0 })
    }

    pub fn current(&self) -> &FrameSync {
        &self.slots[self.current]
    }

    pub fn current_slot(&self) -> usize {
        self.current
    }

    /// Advance to the next slot, wrapping around.
    pub fn advance(&mut self) {
        self.current = next_frame_slot(self.current, self.slots.len());
    }

    /// Replace the current slot's objects with freshly created ones.
    ///
    /// Needed when a submission failed after the slot's fence was reset: the
    /// fence would otherwise never signal again and the image-available
    /// semaphore may be left signaled. The fresh fence starts signaled so the
    /// slot's next wait returns immediately.
    ///
    /// # Safety
    /// The device must be valid and no pending GPU work may reference the
    /// slot's objects.
    pub unsafe fn recycle_current(&mut self, device: &ash::Device) -> Result<()> {
        let fresh = FrameSync::new(device)?;
        let stale = std::mem::replace(&mut self.slots[self.current], fresh);
        stale.destroy(device);
        Ok(())
    }

    /// Destroy every slot.
    ///
    /// # Safety
    /// The device must be valid and no slot may be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        for slot in &self.slots {
            slot.destroy(device);
        }
    }
}

/// Successor of `current` in a ring of `n` slots.
pub fn next_frame_slot(current: usize, n: usize) -> usize {
    (current + 1) % n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_cycle_modulo_frame_count() {
        assert_eq!(next_frame_slot(0, FRAMES_IN_FLIGHT), 1);
        assert_eq!(next_frame_slot(1, FRAMES_IN_FLIGHT), 0);
    }

    #[test]
    fn slot_after_k_frames_is_k_mod_n() {
        let mut slot = 0;
        for _ in 0..7 {
            slot = next_frame_slot(slot, FRAMES_IN_FLIGHT);
        }
        assert_eq!(slot, 7 % FRAMES_IN_FLIGHT);
    }
}
