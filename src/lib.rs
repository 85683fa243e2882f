pub mod candidates;
pub mod config;
pub mod error;
pub mod events;
pub mod mode;
pub mod presentation;
pub mod slots;
pub mod tasks {
    pub mod controls;
    pub mod fetcher;
    pub mod refresh;
    pub mod rotation;
}

/// Number of covers shown at once.
pub const VISIBLE_SLOTS: usize = 20;
