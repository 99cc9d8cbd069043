//! Shared camera handle
//!
//! The calibration and question screens can hold the camera at the same time
//! while navigating. The device starts on the first lease and stops when the
//! last lease is dropped.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info};

use crate::error::GameError;

/// A camera the host can start and stop
pub trait CameraDevice {
    fn start(&mut self) -> Result<(), GameError>;
    fn stop(&mut self);
}

#[derive(Debug)]
struct CameraState<D> {
    device: D,
    leases: usize,
    running: bool,
    /// Bumped by `stop_all` so older leases release nothing
    generation: u64,
}

/// Reference-counted handle over one camera device
#[derive(Debug)]
pub struct SharedCamera<D: CameraDevice> {
    inner: Rc<RefCell<CameraState<D>>>,
}

impl<D: CameraDevice> Clone for SharedCamera<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: CameraDevice> SharedCamera<D> {
    pub fn new(device: D) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CameraState {
                device,
                leases: 0,
                running: false,
                generation: 0,
            })),
        }
    }

    /// Take a lease, starting the device if nobody holds it yet
    pub fn acquire(&self) -> Result<CameraLease<D>, GameError> {
        let mut state = self.inner.borrow_mut();
        if !state.running {
            state.device.start()?;
            state.running = true;
            info!("camera started");
        }
        state.leases += 1;
        debug!(leases = state.leases, "camera lease acquired");

        Ok(CameraLease {
            inner: Rc::clone(&self.inner),
            generation: state.generation,
        })
    }

    /// Stop the device immediately; outstanding leases become inert
    pub fn stop_all(&self) {
        let mut state = self.inner.borrow_mut();
        if state.running {
            state.device.stop();
            state.running = false;
            info!(leases = state.leases, "camera force-stopped");
        }
        state.leases = 0;
        state.generation += 1;
    }

    pub fn lease_count(&self) -> usize {
        self.inner.borrow().leases
    }

    pub fn is_running(&self) -> bool {
        self.inner.borrow().running
    }
}

/// A consumer's hold on the shared camera, released on drop
#[derive(Debug)]
pub struct CameraLease<D: CameraDevice> {
    inner: Rc<RefCell<CameraState<D>>>,
    generation: u64,
}

impl<D: CameraDevice> Drop for CameraLease<D> {
    fn drop(&mut self) {
        let mut state = self.inner.borrow_mut();
        if state.generation != self.generation {
            return;
        }
        state.leases = state.leases.saturating_sub(1);
        debug!(leases = state.leases, "camera lease released");
        if state.leases == 0 && state.running {
            state.device.stop();
            state.running = false;
            info!("camera stopped");
        }
    }
}
