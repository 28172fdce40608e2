//! Per-frame CPU/GPU ordering protocol.
//!
//! [`FrameSynchronizer::draw_frame`] runs one frame through a
//! [`FrameBackend`]:
//!
//! 1. wait on the slot fence, reset it, then release deferred resources
//! 2. acquire a swapchain image (stale surface: skip the frame)
//! 3. record the command buffer
//! 4. submit, waiting on image-available and signaling render-complete
//! 5. present, waiting on render-complete
//! 6. advance the frame counter
//!
//! The fence wait in step 1 for frame K+N cannot pass until the submit of
//! frame K completed on the GPU; that is the only backpressure in the loop.
//!
//! A stale surface marks a rebuild as pending. While one is pending no
//! fence is touched: a stale acquire leaves its slot's fence unsignaled, and
//! only the fresh slots created by [`FrameBackend::rebuild`] make the next
//! wait safe.

use manaburn_rhi::RhiResult;
use manaburn_rhi::swapchain::{AcquireOutcome, PresentOutcome};
use tracing::{debug, trace, warn};

use crate::frame::slot_index;

/// Result of one [`FrameSynchronizer::draw_frame`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// The surface is stale; rebuild the swapchain before the next frame.
    ResizeRequired,
}

/// GPU operations the synchronizer sequences, one method per protocol step.
///
/// All methods take the slot index chosen for the current frame.
pub trait FrameBackend {
    /// Blocks until the slot's previous submission completed.
    fn wait_fence(&mut self, slot: usize) -> RhiResult<()>;

    /// Returns the slot's fence to the unsignaled state.
    fn reset_fence(&mut self, slot: usize) -> RhiResult<()>;

    /// Runs releases deferred by the frame that last used the slot.
    fn flush_deletions(&mut self, slot: usize);

    fn acquire_image(&mut self, slot: usize) -> RhiResult<AcquireOutcome>;

    fn record(&mut self, slot: usize, image_index: u32) -> RhiResult<()>;

    fn submit(&mut self, slot: usize) -> RhiResult<()>;

    fn present(&mut self, slot: usize, image_index: u32) -> RhiResult<PresentOutcome>;

    /// Rebuilds the swapchain targets and replaces every slot with fresh
    /// ones whose fences start signaled.
    ///
    /// Returns `false` when the surface has no area yet. Nothing is torn
    /// down in that case and the rebuild is retried on the next frame.
    fn rebuild(&mut self) -> RhiResult<bool>;
}

/// Owns the monotonic frame counter and drives the per-frame protocol.
#[derive(Debug, Default)]
pub struct FrameSynchronizer {
    frame_number: u64,
    rebuild_pending: bool,
}

impl FrameSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames submitted so far.
    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Slot the next frame will use.
    #[inline]
    pub fn current_slot(&self) -> usize {
        slot_index(self.frame_number)
    }

    /// Whether the next frame starts with a rebuild.
    #[inline]
    pub fn rebuild_pending(&self) -> bool {
        self.rebuild_pending
    }

    /// Schedules a rebuild before the next frame, e.g. after a window resize.
    pub fn request_rebuild(&mut self) {
        self.rebuild_pending = true;
    }

    /// Runs one frame.
    ///
    /// A pending rebuild runs first; if it has to wait for a drawable
    /// surface the frame is skipped with [`FrameOutcome::ResizeRequired`]
    /// before any fence is touched.
    ///
    /// A stale acquire returns [`FrameOutcome::ResizeRequired`] without
    /// recording or submitting, and the counter does not advance. A stale
    /// present still advances the counter because the frame was submitted.
    /// Both rebuild right away.
    ///
    /// # Errors
    ///
    /// Any backend error is fatal, including a fence wait timeout.
    pub fn draw_frame<B: FrameBackend>(&mut self, backend: &mut B) -> RhiResult<FrameOutcome> {
        if self.rebuild_pending && !self.rebuild(backend)? {
            return Ok(FrameOutcome::ResizeRequired);
        }

        let slot = self.current_slot();
        trace!("Frame {} on slot {}", self.frame_number, slot);

        backend.wait_fence(slot)?;
        backend.reset_fence(slot)?;
        backend.flush_deletions(slot);

        let image_index = match backend.acquire_image(slot)? {
            AcquireOutcome::Ready(index) => index,
            AcquireOutcome::Stale => {
                warn!(
                    "Swapchain stale on acquire (frame {}), skipping frame",
                    self.frame_number
                );
                self.rebuild_pending = true;
                self.rebuild(backend)?;
                return Ok(FrameOutcome::ResizeRequired);
            }
        };

        backend.record(slot, image_index)?;
        backend.submit(slot)?;
        let presented = backend.present(slot, image_index)?;

        self.frame_number += 1;

        match presented {
            PresentOutcome::Presented => Ok(FrameOutcome::Presented),
            PresentOutcome::Stale => {
                warn!("Swapchain stale on present (frame {})", self.frame_number - 1);
                self.rebuild_pending = true;
                self.rebuild(backend)?;
                Ok(FrameOutcome::ResizeRequired)
            }
        }
    }

    fn rebuild<B: FrameBackend>(&mut self, backend: &mut B) -> RhiResult<bool> {
        let rebuilt = backend.rebuild()?;
        if rebuilt {
            self.rebuild_pending = false;
        } else {
            debug!("Rebuild deferred until the surface has an area");
        }
        Ok(rebuilt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use manaburn_rhi::RhiError;

    use crate::deletion_queue::DeletionQueue;
    use crate::frame::release_slot;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Call {
        WaitFence(usize),
        ResetFence(usize),
        Flush(usize),
        Acquire(usize),
        Record(usize, u32),
        Submit(usize),
        Present(usize, u32),
        Rebuild,
    }

    /// Records every call and simulates fences: a fence is signaled when
    /// created, unsignaled by reset, and signaled again once its submit
    /// "completes" (immediately, in this mock). A rebuild replaces every
    /// slot, so all fences are signaled again and pending releases run.
    struct MockBackend {
        calls: Vec<Call>,
        fence_signaled: Vec<bool>,
        deletions: Vec<DeletionQueue>,
        drawable: bool,
        next_image: u32,
        image_count: u32,
        acquire_results: Vec<AcquireOutcome>,
        present_results: Vec<PresentOutcome>,
        fail_wait: bool,
    }

    impl MockBackend {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                fence_signaled: vec![true; crate::MAX_FRAMES_IN_FLIGHT],
                deletions: (0..crate::MAX_FRAMES_IN_FLIGHT)
                    .map(|_| DeletionQueue::new())
                    .collect(),
                drawable: true,
                next_image: 0,
                image_count: 3,
                acquire_results: Vec::new(),
                present_results: Vec::new(),
                fail_wait: false,
            }
        }

        fn slots_waited(&self) -> Vec<usize> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    Call::WaitFence(slot) => Some(*slot),
                    _ => None,
                })
                .collect()
        }

        fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| pred(c)).count()
        }
    }

    impl FrameBackend for MockBackend {
        fn wait_fence(&mut self, slot: usize) -> RhiResult<()> {
            self.calls.push(Call::WaitFence(slot));
            if self.fail_wait {
                return Err(RhiError::FenceTimeout {
                    timeout_ns: 100_000_000,
                });
            }
            assert!(self.fence_signaled[slot], "waited on a fence that never signals");
            Ok(())
        }

        fn reset_fence(&mut self, slot: usize) -> RhiResult<()> {
            self.calls.push(Call::ResetFence(slot));
            self.fence_signaled[slot] = false;
            Ok(())
        }

        fn flush_deletions(&mut self, slot: usize) {
            self.calls.push(Call::Flush(slot));
            self.deletions[slot].flush();
        }

        fn acquire_image(&mut self, slot: usize) -> RhiResult<AcquireOutcome> {
            self.calls.push(Call::Acquire(slot));
            if !self.acquire_results.is_empty() {
                return Ok(self.acquire_results.remove(0));
            }
            let index = self.next_image;
            self.next_image = (self.next_image + 1) % self.image_count;
            Ok(AcquireOutcome::Ready(index))
        }

        fn record(&mut self, slot: usize, image_index: u32) -> RhiResult<()> {
            self.calls.push(Call::Record(slot, image_index));
            Ok(())
        }

        fn submit(&mut self, slot: usize) -> RhiResult<()> {
            self.calls.push(Call::Submit(slot));
            // GPU completes instantly
            self.fence_signaled[slot] = true;
            Ok(())
        }

        fn present(&mut self, slot: usize, image_index: u32) -> RhiResult<PresentOutcome> {
            self.calls.push(Call::Present(slot, image_index));
            if !self.present_results.is_empty() {
                return Ok(self.present_results.remove(0));
            }
            Ok(PresentOutcome::Presented)
        }

        fn rebuild(&mut self) -> RhiResult<bool> {
            self.calls.push(Call::Rebuild);
            if !self.drawable {
                return Ok(false);
            }
            for queue in &mut self.deletions {
                queue.flush();
            }
            self.fence_signaled = vec![true; crate::MAX_FRAMES_IN_FLIGHT];
            Ok(true)
        }
    }

    fn counting_release(counter: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_three_frames_use_slots_0_1_0() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();

        for _ in 0..3 {
            assert_eq!(sync.draw_frame(&mut backend).unwrap(), FrameOutcome::Presented);
        }

        assert_eq!(backend.slots_waited(), vec![0, 1, 0]);
        assert_eq!(sync.frame_number(), 3);
    }

    #[test]
    fn test_third_frame_waits_on_first_frames_fence() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();

        for _ in 0..3 {
            sync.draw_frame(&mut backend).unwrap();
        }

        // The fence frame 0 submitted with is the one frame 2 waits on
        let first_submit = backend
            .calls
            .iter()
            .position(|c| *c == Call::Submit(0))
            .unwrap();
        let third_wait = backend
            .calls
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == Call::WaitFence(0))
            .nth(1)
            .map(|(i, _)| i)
            .unwrap();
        assert!(first_submit < third_wait);
    }

    #[test]
    fn test_protocol_order_within_frame() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();

        sync.draw_frame(&mut backend).unwrap();

        assert_eq!(
            backend.calls,
            vec![
                Call::WaitFence(0),
                Call::ResetFence(0),
                Call::Flush(0),
                Call::Acquire(0),
                Call::Record(0, 0),
                Call::Submit(0),
                Call::Present(0, 0),
            ]
        );
    }

    #[test]
    fn test_fence_waited_before_every_reuse() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();

        for _ in 0..10 {
            sync.draw_frame(&mut backend).unwrap();
        }

        // Every Record(slot) is preceded by WaitFence(slot) and ResetFence(slot)
        // since the slot's previous Record
        let mut waited = [false; crate::MAX_FRAMES_IN_FLIGHT];
        let mut reset = [false; crate::MAX_FRAMES_IN_FLIGHT];
        for call in &backend.calls {
            match *call {
                Call::WaitFence(s) => waited[s] = true,
                Call::ResetFence(s) => {
                    assert!(waited[s], "reset before wait on slot {}", s);
                    reset[s] = true;
                }
                Call::Record(s, _) => {
                    assert!(waited[s] && reset[s], "slot {} reused unfenced", s);
                    waited[s] = false;
                    reset[s] = false;
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_stale_acquire_skips_frame_without_advancing() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();
        backend.acquire_results.push(AcquireOutcome::Stale);

        let outcome = sync.draw_frame(&mut backend).unwrap();

        assert_eq!(outcome, FrameOutcome::ResizeRequired);
        assert_eq!(sync.frame_number(), 0);
        assert_eq!(backend.count(|c| matches!(c, Call::Record(..))), 0);
        assert_eq!(backend.count(|c| matches!(c, Call::Submit(_))), 0);
        assert_eq!(backend.count(|c| matches!(c, Call::Present(..))), 0);
    }

    #[test]
    fn test_stale_present_advances_counter() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();
        backend.present_results.push(PresentOutcome::Stale);

        let outcome = sync.draw_frame(&mut backend).unwrap();

        assert_eq!(outcome, FrameOutcome::ResizeRequired);
        assert_eq!(sync.frame_number(), 1);
        assert_eq!(sync.current_slot(), 1);
    }

    #[test]
    fn test_fence_timeout_is_fatal() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();
        backend.fail_wait = true;

        let err = sync.draw_frame(&mut backend).unwrap_err();

        assert!(matches!(err, RhiError::FenceTimeout { .. }));
        assert_eq!(backend.calls, vec![Call::WaitFence(0)]);
        assert_eq!(sync.frame_number(), 0);
    }

    #[test]
    fn test_image_index_flows_to_record_and_present() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();
        backend.acquire_results.push(AcquireOutcome::Ready(2));

        sync.draw_frame(&mut backend).unwrap();

        assert!(backend.calls.contains(&Call::Record(0, 2)));
        assert!(backend.calls.contains(&Call::Present(0, 2)));
    }

    #[test]
    fn test_stale_acquire_rebuilds_before_returning() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();
        backend.acquire_results.push(AcquireOutcome::Stale);

        sync.draw_frame(&mut backend).unwrap();

        assert_eq!(
            backend.calls,
            vec![
                Call::WaitFence(0),
                Call::ResetFence(0),
                Call::Flush(0),
                Call::Acquire(0),
                Call::Rebuild,
            ]
        );
        assert!(!sync.rebuild_pending());
    }

    #[test]
    fn test_frame_after_stale_acquire_waits_on_fresh_fence() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();
        backend.acquire_results.push(AcquireOutcome::Stale);

        assert_eq!(
            sync.draw_frame(&mut backend).unwrap(),
            FrameOutcome::ResizeRequired
        );
        // Slot 0 was reset but never submitted; the rebuild replaced it
        assert!(backend.fence_signaled[0]);

        backend.calls.clear();
        assert_eq!(sync.draw_frame(&mut backend).unwrap(), FrameOutcome::Presented);

        assert_eq!(backend.calls[0], Call::WaitFence(0));
        assert_eq!(backend.count(|c| matches!(c, Call::Record(0, _))), 1);
        assert_eq!(sync.frame_number(), 1);
    }

    #[test]
    fn test_stale_present_rebuilds_once() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();
        backend.present_results.push(PresentOutcome::Stale);

        sync.draw_frame(&mut backend).unwrap();
        sync.draw_frame(&mut backend).unwrap();

        assert_eq!(backend.count(|c| *c == Call::Rebuild), 1);
        assert_eq!(backend.slots_waited(), vec![0, 1]);
    }

    #[test]
    fn test_deferred_rebuild_touches_no_fence() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();
        backend.drawable = false;
        sync.request_rebuild();

        for _ in 0..3 {
            assert_eq!(
                sync.draw_frame(&mut backend).unwrap(),
                FrameOutcome::ResizeRequired
            );
        }

        assert!(backend.calls.iter().all(|c| *c == Call::Rebuild));
        assert!(sync.rebuild_pending());
        assert_eq!(sync.frame_number(), 0);

        backend.drawable = true;
        assert_eq!(sync.draw_frame(&mut backend).unwrap(), FrameOutcome::Presented);
        assert!(!sync.rebuild_pending());
        assert_eq!(sync.frame_number(), 1);
    }

    #[test]
    fn test_stale_acquire_on_minimized_surface_waits_for_rebuild() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();
        backend.acquire_results.push(AcquireOutcome::Stale);
        backend.drawable = false;

        sync.draw_frame(&mut backend).unwrap();
        // Slot 0's fence stays unsignaled until a rebuild succeeds
        assert!(!backend.fence_signaled[0]);

        backend.calls.clear();
        sync.draw_frame(&mut backend).unwrap();
        assert_eq!(backend.calls, vec![Call::Rebuild]);

        backend.drawable = true;
        backend.calls.clear();
        assert_eq!(sync.draw_frame(&mut backend).unwrap(), FrameOutcome::Presented);
        assert_eq!(backend.calls[0], Call::Rebuild);
        assert_eq!(backend.calls[1], Call::WaitFence(0));
    }

    #[test]
    fn test_release_runs_two_frames_later_on_same_slot() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();
        let released = Arc::new(AtomicUsize::new(0));

        // Frames 0..=2 submitted, release requested after frame 2 (slot 0)
        for _ in 0..3 {
            sync.draw_frame(&mut backend).unwrap();
        }
        let slot = release_slot(sync.frame_number());
        assert_eq!(slot, 0);
        backend.deletions[slot].push(counting_release(&released));

        // Frame 3 on slot 1 must not run it: frame 2 may still be in flight
        sync.draw_frame(&mut backend).unwrap();
        assert_eq!(released.load(Ordering::SeqCst), 0);
        assert_eq!(backend.deletions[slot].len(), 1);

        // Frame 4 waits on slot 0's fence, which frame 2 signals
        sync.draw_frame(&mut backend).unwrap();
        assert_eq!(released.load(Ordering::SeqCst), 1);

        let wait = backend
            .calls
            .iter()
            .rposition(|c| *c == Call::WaitFence(0))
            .unwrap();
        assert_eq!(backend.calls[wait + 2], Call::Flush(0));
    }

    #[test]
    fn test_release_after_first_frame_survives_second() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();
        let released = Arc::new(AtomicUsize::new(0));

        sync.draw_frame(&mut backend).unwrap();
        backend.deletions[release_slot(sync.frame_number())].push(counting_release(&released));

        sync.draw_frame(&mut backend).unwrap();
        assert_eq!(released.load(Ordering::SeqCst), 0);

        sync.draw_frame(&mut backend).unwrap();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_before_any_frame_runs_at_first_flush() {
        let mut sync = FrameSynchronizer::new();
        let mut backend = MockBackend::new();
        let released = Arc::new(AtomicUsize::new(0));

        backend.deletions[release_slot(sync.frame_number())].push(counting_release(&released));
        sync.draw_frame(&mut backend).unwrap();

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
