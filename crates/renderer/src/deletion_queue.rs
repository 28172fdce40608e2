//! Deferred release of GPU resources.
//!
//! A resource retired during frame K may still be referenced by commands the
//! GPU has not finished. It is parked in the deletion queue of the slot that
//! recorded frame K and only dropped after that slot's fence has been waited
//! on again.

use tracing::{debug, warn};

type Release = Box<dyn FnOnce() + Send>;

/// Pending releases for one frame slot.
#[derive(Default)]
pub struct DeletionQueue {
    pending: Vec<Release>,
}

impl DeletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an arbitrary release action.
    pub fn push(&mut self, release: impl FnOnce() + Send + 'static) {
        self.pending.push(Box::new(release));
    }

    /// Takes ownership of `resource` and drops it on the next flush.
    pub fn defer<T: Send + 'static>(&mut self, resource: T) {
        self.push(move || drop(resource));
    }

    /// Runs every pending release, most recent first. Returns how many ran.
    ///
    /// The caller must have proven the GPU no longer uses the resources,
    /// either by a fence wait on the owning slot or by a device idle wait.
    pub fn flush(&mut self) -> usize {
        let count = self.pending.len();
        while let Some(release) = self.pending.pop() {
            release();
        }
        if count > 0 {
            debug!("Flushed {} deferred release(s)", count);
        }
        count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl std::fmt::Debug for DeletionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionQueue")
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Drop for DeletionQueue {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                "Deletion queue dropped with {} pending release(s), flushing",
                self.pending.len()
            );
            self.flush();
        }
    }
}
