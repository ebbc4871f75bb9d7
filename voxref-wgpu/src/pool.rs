//! Frame-scoped render-target pool.
//!
//! The blur ping-pong pair is leased at the top of the composite routine and
//! handed back when the lease drops, so every exit path (debug early return
//! included) returns its temporaries. Returned targets are kept and reused
//! across frames when the requested size matches.

use std::cell::RefCell;
use std::ops::Deref;

use crate::render_targets::{self, RenderTarget};

/// Pool of reusable HDR targets.
pub struct TargetPool {
    free: RefCell<Vec<RenderTarget>>,
}

impl TargetPool {
    pub fn new() -> Self {
        Self {
            free: RefCell::new(Vec::new()),
        }
    }

    /// Borrow a target of the given size, reusing a pooled one when possible.
    pub fn lease<'a>(
        &'a self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
        label: &str,
    ) -> TargetLease<'a> {
        let mut free = self.free.borrow_mut();
        let target = match free.iter().position(|t| t.width == width && t.height == height) {
            Some(idx) => free.swap_remove(idx),
            None => render_targets::create_hdr_target(device, width, height, label),
        };
        TargetLease {
            pool: self,
            target: Some(target),
        }
    }

    /// Drop all retained targets (e.g. after a resize).
    pub fn purge(&self) {
        self.free.borrow_mut().clear();
    }

    /// Targets currently parked in the pool.
    pub fn idle_count(&self) -> usize {
        self.free.borrow().len()
    }

    fn give_back(&self, target: RenderTarget) {
        self.free.borrow_mut().push(target);
    }
}

impl Default for TargetPool {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII borrow of a pooled target; returns it to the pool on drop.
pub struct TargetLease<'a> {
    pool: &'a TargetPool,
    target: Option<RenderTarget>,
}

impl Deref for TargetLease<'_> {
    type Target = RenderTarget;

    fn deref(&self) -> &RenderTarget {
        self.target.as_ref().expect("lease already returned")
    }
}

impl Drop for TargetLease<'_> {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            self.pool.give_back(target);
        }
    }
}
