//! Frame slots and the round-robin slot pool.
//!
//! The pool implements the "frames in flight" pattern: while the GPU renders
//! frame K, the CPU records frame K+1 into a different slot. A slot is only
//! reused after its fence proves the GPU finished the frame that last used it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use manaburn_rhi::device::Device;
//! use manaburn_renderer::frame::{FramePool, slot_index};
//!
//! # fn example(device: Arc<Device>) -> Result<(), manaburn_rhi::RhiError> {
//! let mut pool = FramePool::new(device)?;
//!
//! let frame_number = 0;
//! let slot = pool.slot_at_mut(slot_index(frame_number));
//! slot.render_fence().wait(100_000_000)?;
//! slot.render_fence().reset()?;
//! slot.deletion_queue_mut().flush();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use manaburn_rhi::command::{CommandBuffer, CommandPool};
use manaburn_rhi::device::Device;
use manaburn_rhi::sync::{Fence, Semaphore};
use manaburn_rhi::{RhiError, RhiResult};

use crate::MAX_FRAMES_IN_FLIGHT;
use crate::deletion_queue::DeletionQueue;

/// Slot index used by frame `frame_number`.
#[inline]
pub fn slot_index(frame_number: u64) -> usize {
    (frame_number % MAX_FRAMES_IN_FLIGHT as u64) as usize
}

/// Slot whose deletion queue receives a release requested once
/// `frame_number` frames have been submitted.
///
/// That is the slot of the last submitted frame. Its fence is the next one
/// waited on that covers every submission so far; the current slot's fence
/// only covers the frame before last. Before any submission this is slot 0.
#[inline]
pub fn release_slot(frame_number: u64) -> usize {
    slot_index(frame_number.saturating_sub(1))
}

/// Resources owned by one in-flight frame.
///
/// Fields drop in declaration order: pending releases first, then the
/// command buffer wrapper before its pool.
pub struct FrameSlot {
    deletion_queue: DeletionQueue,
    command_buffer: CommandBuffer,
    command_pool: CommandPool,
    image_available: Semaphore,
    render_complete: Semaphore,
    render_fence: Fence,
}

impl FrameSlot {
    fn new(device: Arc<Device>, graphics_family: u32) -> RhiResult<Self> {
        let command_pool = CommandPool::new(device.clone(), graphics_family)?;
        let command_buffer = CommandBuffer::new(device.clone(), &command_pool)?;
        let image_available = Semaphore::new(device.clone())?;
        let render_complete = Semaphore::new(device.clone())?;
        // Signaled so the first wait on this slot returns immediately
        let render_fence = Fence::new(device, true)?;

        Ok(Self {
            deletion_queue: DeletionQueue::new(),
            command_buffer,
            command_pool,
            image_available,
            render_complete,
            render_fence,
        })
    }

    #[inline]
    pub fn command_buffer(&self) -> &CommandBuffer {
        &self.command_buffer
    }

    #[inline]
    pub fn command_buffer_mut(&mut self) -> &mut CommandBuffer {
        &mut self.command_buffer
    }

    #[inline]
    pub fn command_pool(&self) -> &CommandPool {
        &self.command_pool
    }

    /// Signaled by acquire when the swapchain image is ready.
    #[inline]
    pub fn image_available(&self) -> &Semaphore {
        &self.image_available
    }

    /// Signaled by the submit when rendering finished; waited on by present.
    #[inline]
    pub fn render_complete(&self) -> &Semaphore {
        &self.render_complete
    }

    /// Signaled when the slot's last submission completed on the GPU.
    #[inline]
    pub fn render_fence(&self) -> &Fence {
        &self.render_fence
    }

    #[inline]
    pub fn deletion_queue_mut(&mut self) -> &mut DeletionQueue {
        &mut self.deletion_queue
    }
}

/// Fixed pool of [`MAX_FRAMES_IN_FLIGHT`] frame slots.
pub struct FramePool {
    slots: Vec<FrameSlot>,
}

impl FramePool {
    /// Creates every slot up front on the device's graphics queue family.
    ///
    /// # Errors
    ///
    /// Returns an error if any pool, buffer, semaphore or fence cannot be
    /// created. Slots created before the failure are released.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let graphics_family = device.queue_families().graphics_family.ok_or_else(|| {
            RhiError::InvalidHandle("device has no graphics queue family".to_string())
        })?;

        let mut slots = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for i in 0..MAX_FRAMES_IN_FLIGHT {
            slots.push(FrameSlot::new(device.clone(), graphics_family)?);
            debug!("Created frame slot {}", i);
        }

        info!(
            "Frame pool created with {} frames in flight",
            MAX_FRAMES_IN_FLIGHT
        );

        Ok(Self { slots })
    }

    #[inline]
    pub fn slot_at(&self, index: usize) -> &FrameSlot {
        &self.slots[index]
    }

    #[inline]
    pub fn slot_at_mut(&mut self, index: usize) -> &mut FrameSlot {
        &mut self.slots[index]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Flushes every slot's deletion queue. Only valid once the device is
    /// idle. Returns the total number of releases run.
    pub fn flush_all(&mut self) -> usize {
        self.slots
            .iter_mut()
            .map(|slot| slot.deletion_queue.flush())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_index_round_robin() {
        assert_eq!(slot_index(0), 0);
        assert_eq!(slot_index(1), 1);
        assert_eq!(slot_index(2), 0);
        assert_eq!(slot_index(3), 1);
    }

    #[test]
    fn test_slot_index_period_is_frames_in_flight() {
        for k in 0..64u64 {
            assert_eq!(
                slot_index(k),
                slot_index(k + MAX_FRAMES_IN_FLIGHT as u64)
            );
        }
    }

    #[test]
    fn test_slot_index_large_counter() {
        assert!(slot_index(u64::MAX) < MAX_FRAMES_IN_FLIGHT);
    }

    #[test]
    fn test_release_slot_is_last_submitted_frames_slot() {
        // One frame submitted (frame 0 on slot 0)
        assert_eq!(release_slot(1), 0);
        // Frame 1 went to slot 1
        assert_eq!(release_slot(2), 1);
        assert_eq!(release_slot(3), 0);
        for k in 1..64u64 {
            assert_eq!(release_slot(k), slot_index(k - 1));
            assert_ne!(release_slot(k), slot_index(k));
        }
    }

    #[test]
    fn test_release_slot_before_first_submit() {
        assert_eq!(release_slot(0), 0);
    }

    #[test]
    fn test_frame_slot_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<FrameSlot>();
    }
}
