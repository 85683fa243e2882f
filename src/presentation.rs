//! Foreground presentation context.
//!
//! Background tasks never touch the [`Surface`] directly. They post
//! [`UiEvent`]s through a [`Dispatcher`] (non-blocking) and a single
//! foreground thread drains the queue in order and applies each event.
use std::thread::{self, JoinHandle};

use crossbeam_channel as xchan;
use tracing::{debug, info, trace, warn};

use crate::VISIBLE_SLOTS;
use crate::events::{ImageRef, ModeState, Notification, UiEvent};

/// The visible widget layer. Only ever called from the foreground thread.
pub trait Surface {
    fn set_slot(&mut self, index: usize, image: &ImageRef);
    fn set_mode(&mut self, mode: ModeState);
    /// Cumulative progress, already clamped to `[0, 1]`.
    fn set_progress(&mut self, fraction: f64);
    fn set_controls_enabled(&mut self, enabled: bool);
    /// Blocking, user-acknowledged alert.
    fn notify(&mut self, notification: &Notification);
}

/// Post-and-return handle onto the foreground queue.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: xchan::Sender<UiEvent>,
}

pub fn channel() -> (Dispatcher, xchan::Receiver<UiEvent>) {
    let (tx, rx) = xchan::unbounded::<UiEvent>();
    (Dispatcher { tx }, rx)
}

impl Dispatcher {
    pub fn post(&self, event: UiEvent) {
        if let Err(err) = self.tx.send(event) {
            trace!(event = ?err.into_inner(), "presentation closed; dropping event");
        }
    }

    pub fn set_slot(&self, index: usize, image: ImageRef) {
        self.post(UiEvent::Slot { index, image });
    }

    pub fn set_mode(&self, mode: ModeState) {
        self.post(UiEvent::Mode(mode));
    }

    pub fn reset_progress(&self) {
        self.post(UiEvent::ProgressReset);
    }

    pub fn advance_progress(&self, delta: f64) {
        self.post(UiEvent::ProgressAdvance(delta));
    }

    pub fn set_controls_enabled(&self, enabled: bool) {
        self.post(UiEvent::ControlsEnabled(enabled));
    }

    pub fn notify(&self, notification: Notification) {
        self.post(UiEvent::Notify(notification));
    }

    pub fn shutdown(&self) {
        self.post(UiEvent::Shutdown);
    }
}

/// Drains `rx` into `surface` until shutdown or until every dispatcher is gone.
pub fn run_foreground<S: Surface + ?Sized>(rx: xchan::Receiver<UiEvent>, surface: &mut S) {
    let mut progress = 0.0_f64;
    while let Ok(event) = rx.recv() {
        match event {
            UiEvent::Slot { index, image } => surface.set_slot(index, &image),
            UiEvent::Mode(mode) => surface.set_mode(mode),
            UiEvent::ProgressReset => {
                progress = 0.0;
                surface.set_progress(progress);
            }
            UiEvent::ProgressAdvance(delta) => {
                progress = (progress + delta).clamp(0.0, 1.0);
                surface.set_progress(progress);
            }
            UiEvent::ControlsEnabled(enabled) => surface.set_controls_enabled(enabled),
            UiEvent::Notify(notification) => surface.notify(&notification),
            UiEvent::Shutdown => break,
        }
    }
    debug!("presentation loop finished");
}

/// Runs [`run_foreground`] on a dedicated thread and hands the surface back on exit.
pub fn spawn_foreground<S>(
    rx: xchan::Receiver<UiEvent>,
    mut surface: S,
) -> std::io::Result<JoinHandle<S>>
where
    S: Surface + Send + 'static,
{
    thread::Builder::new()
        .name("presentation".into())
        .spawn(move || {
            run_foreground(rx, &mut surface);
            surface
        })
}

/// Headless surface: keeps the gallery state and reports changes through `tracing`.
#[derive(Debug)]
pub struct ConsoleSurface {
    slots: Vec<Option<ImageRef>>,
    mode: Option<ModeState>,
    progress: f64,
    controls_enabled: bool,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self {
            slots: vec![None; VISIBLE_SLOTS],
            mode: None,
            progress: 0.0,
            controls_enabled: true,
        }
    }

    pub fn slots(&self) -> &[Option<ImageRef>] {
        &self.slots
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }
}

impl Default for ConsoleSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for ConsoleSurface {
    fn set_slot(&mut self, index: usize, image: &ImageRef) {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = Some(image.clone());
                info!(slot = index, image = %image, "cover updated");
            }
            None => warn!(slot = index, "ignoring update for unknown slot"),
        }
    }

    fn set_mode(&mut self, mode: ModeState) {
        if self.mode != Some(mode) {
            info!(%mode, button = mode.control_label(), "play/pause control updated");
        }
        self.mode = Some(mode);
    }

    fn set_progress(&mut self, fraction: f64) {
        self.progress = fraction;
        let percent = (fraction * 100.0).round() as u32;
        if fraction <= 0.0 || fraction >= 1.0 - 1e-9 {
            info!(percent, "progress");
        } else {
            debug!(percent, "progress");
        }
    }

    fn set_controls_enabled(&mut self, enabled: bool) {
        if self.controls_enabled != enabled {
            debug!(enabled, "controls toggled");
        }
        self.controls_enabled = enabled;
    }

    fn notify(&mut self, notification: &Notification) {
        warn!(title = %notification.title, "{}", notification.message);
    }
}
