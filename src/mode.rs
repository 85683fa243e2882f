use tokio::sync::watch;
use tracing::info;

use crate::events::ModeState;
use crate::presentation::Dispatcher;

/// Play/pause state shared by the rotation loop, the refresh path and the controls.
///
/// Changing the mode only flips the shared flag and refreshes the control
/// label; it never starts or stops a rotation task.
#[derive(Debug, Clone)]
pub struct ModeController {
    state: watch::Sender<ModeState>,
    ui: Dispatcher,
}

impl ModeController {
    pub fn new(initial: ModeState, ui: Dispatcher) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state, ui }
    }

    pub fn current(&self) -> ModeState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ModeState> {
        self.state.subscribe()
    }

    /// Posts the new label before flipping the flag, so a resumed rotation's
    /// first substitution is always queued after it.
    pub fn set(&self, mode: ModeState) {
        self.ui.set_mode(mode);
        let previous = self.state.send_replace(mode);
        if previous != mode {
            info!(from = %previous, to = %mode, "mode changed");
        }
    }

    /// Flips the mode and returns the new value.
    pub fn toggle(&self) -> ModeState {
        let mut next = ModeState::Running;
        self.state.send_modify(|mode| {
            *mode = mode.toggled();
            next = *mode;
            self.ui.set_mode(next);
        });
        info!(to = %next, "mode toggled");
        next
    }
}
