use std::fmt;
use std::sync::Arc;

/// Opaque reference to a fetchable image (an artwork URL in practice).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef(Arc<str>);

impl ImageRef {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ImageRef {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeState {
    Running,
    Paused,
}

impl ModeState {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Running => Self::Paused,
            Self::Paused => Self::Running,
        }
    }

    /// Label for the play/pause control: names the action available in this mode.
    pub fn control_label(self) -> &'static str {
        match self {
            Self::Running => "Pause",
            Self::Paused => "Play",
        }
    }
}

impl fmt::Display for ModeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Paused => f.write_str("paused"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

/// Presentation mutation posted from a background context to the foreground thread.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Slot { index: usize, image: ImageRef },
    Mode(ModeState),
    ProgressReset,
    ProgressAdvance(f64),
    ControlsEnabled(bool),
    Notify(Notification),
    Shutdown,
}

/// User action arriving from the command console (or a signal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Toggle,
    SetMode(ModeState),
    /// Refresh from the given query, or from the current query field when `None`.
    Refresh(Option<String>),
    SetQuery(String),
    Status,
    About,
    Quit,
}
