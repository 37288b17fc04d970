//! Host display surface: a width that can change and a mount point for the
//! engine's output.

use log::debug;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Debug)]
struct SurfaceState {
    attached: bool,
    attach_count: u64,
}

/// Cloneable handle to the region the engine draws into.
///
/// Width changes are published on a watch channel, so an observer that falls
/// behind only ever sees the latest width.
#[derive(Debug, Clone)]
pub struct DisplaySurface {
    width: Arc<watch::Sender<u32>>,
    state: Arc<Mutex<SurfaceState>>,
}

impl DisplaySurface {
    pub fn new(width: u32) -> Self {
        let (tx, _) = watch::channel(width);
        Self {
            width: Arc::new(tx),
            state: Arc::new(Mutex::new(SurfaceState {
                attached: false,
                attach_count: 0,
            })),
        }
    }

    pub fn width(&self) -> u32 {
        *self.width.borrow()
    }

    /// Publishes a new width to every observer. Unchanged widths are not
    /// re-sent.
    pub fn set_width(&self, width: u32) {
        let changed = self.width.send_if_modified(|current| {
            if *current == width {
                false
            } else {
                *current = width;
                true
            }
        });
        if changed {
            debug!("surface width changed to {}", width);
        }
    }

    /// Subscribes to width changes. The current width counts as seen.
    pub fn observe(&self) -> watch::Receiver<u32> {
        self.width.subscribe()
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        self.width.receiver_count()
    }

    pub fn attach(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.attached = true;
            state.attach_count += 1;
        }
    }

    pub fn detach(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.attached = false;
        }
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().map(|s| s.attached).unwrap_or(false)
    }

    /// How many times output has been mounted here.
    pub fn attach_count(&self) -> u64 {
        self.state.lock().map(|s| s.attach_count).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observers_see_only_real_changes() {
        let surface = DisplaySurface::new(800);
        let mut rx = surface.observe();
        assert!(!rx.has_changed().unwrap());

        surface.set_width(800);
        assert!(!rx.has_changed().unwrap());

        surface.set_width(640);
        surface.set_width(1024);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1024);
        assert_eq!(surface.observer_count(), 1);

        drop(rx);
        assert_eq!(surface.observer_count(), 0);
    }

    #[test]
    fn attach_and_detach() {
        let surface = DisplaySurface::new(800);
        let clone = surface.clone();
        surface.attach();
        assert!(clone.is_attached());
        clone.detach();
        assert!(!surface.is_attached());
        assert_eq!(surface.attach_count(), 1);
    }
}
